/// Behavior tracking
///
/// In-memory, session-scoped store of user signals (visits, saves, explored
/// sections, interactions) consumed by the personalization engine.
mod store;
mod visit;

pub use store::{BehaviorSnapshot, BehavioralStore};
pub use visit::VisitRecord;
