use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use discovery_service::{
    handlers::{self, AppState},
    services::aggregator::sources_from_config,
    Catalog, Config, PersonalizationEngine, SessionRegistry,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(fmt::layer().json().with_target(true).with_line_number(true))
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!(
        "Starting {} on HTTP:{}",
        config.service.service_name, config.service.http_port
    );

    let catalog = Arc::new(
        Catalog::load(&config.catalog.path)
            .with_context(|| format!("Failed to load catalog from {}", config.catalog.path))?,
    );

    let client = reqwest::Client::builder()
        .timeout(config.aggregator.source_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let sources = sources_from_config(&config.sources, client);
    info!(sources = sources.len(), "Live-data sources configured");

    let sessions = Arc::new(SessionRegistry::new(
        Arc::clone(&catalog),
        sources,
        config.behavior.clone(),
        config.aggregator.clone(),
    )?);
    let _sweeper = sessions.spawn_sweeper();
    info!(
        ttl_secs = config.behavior.session_idle_ttl.as_secs(),
        "Idle session sweep scheduled"
    );
    let engine = Arc::new(PersonalizationEngine::new(
        config.personalization.clone(),
        Arc::clone(&catalog),
    ));

    let state = web::Data::new(AppState {
        service_name: config.service.service_name.clone(),
        catalog,
        engine,
        sessions,
    });

    let addr = format!("0.0.0.0:{}", config.service.http_port);
    info!("HTTP server listening on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind(&addr)
    .with_context(|| format!("Failed to bind {}", addr))?
    .run()
    .await?;

    Ok(())
}
