pub mod aggregator;
pub mod behavior;
pub mod catalog;
pub mod page;
pub mod personalization;
pub mod session;

pub use aggregator::LiveDataAggregator;
pub use behavior::BehavioralStore;
pub use catalog::Catalog;
pub use page::CityPage;
pub use personalization::PersonalizationEngine;
pub use session::SessionRegistry;
