//! Crisis pipeline service: binary entrypoint.
//! Loads config and credentials, builds the pipeline and serves it over Axum.

use crisis_pipeline::ingest::config::{load_config_default, Credentials};
use crisis_pipeline::metrics::Metrics;
use crisis_pipeline::{build_state, create_router};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs filtered by `RUST_LOG`. `try_init` so a subscriber already
/// installed by the host runtime wins.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crisis_pipeline=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = load_config_default()?;
    let creds = Credentials::from_env();
    let metrics = Metrics::init(cfg.events_ttl_ms)?;

    let router = create_router(build_state(&cfg, &creds)).merge(metrics.router());

    Ok(router.into())
}
