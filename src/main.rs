//! TechScope carousel service: binary entrypoint.
//! Loads config, wires feed sources, activates the news section and serves
//! the control API.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use techscope_carousel::api::{self, AppState};
use techscope_carousel::config::CarouselConfig;
use techscope_carousel::ingest::Section;
use techscope_carousel::metrics::Metrics;
use techscope_carousel::render::TracingRenderer;
use techscope_carousel::{build_assembler, SectionController};

/// `RUST_LOG` filters (default `techscope_carousel=info,warn`);
/// `CAROUSEL_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("techscope_carousel=info,warn"));
    let json = std::env::var("CAROUSEL_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = CarouselConfig::load_default().context("loading carousel config")?;
    let metrics = Metrics::init(&cfg.rotation)?;

    let assembler = build_assembler(&cfg)?;
    let controller = SectionController::new(assembler, Arc::new(TracingRenderer), cfg.rotation);
    drop(controller.activate(Section::News));

    let app = api::router(AppState::new(controller)).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("binding {}", cfg.server.bind))?;
    tracing::info!(bind = %cfg.server.bind, "carousel service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("http server")?;
    Ok(())
}
