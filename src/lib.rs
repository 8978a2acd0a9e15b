// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cards;
pub mod config;
pub mod controller;
pub mod ingest;
pub mod markup;
pub mod metrics;
pub mod normalize;
pub mod render;
pub mod rotation;

// `crate_root::router` as well as `crate_root::api::router`
pub use crate::api::router;
pub use crate::controller::SectionController;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CarouselConfig, SourceMode};
use crate::ingest::providers::google_rss::GoogleNewsRssProvider;
use crate::ingest::providers::json_api::JsonApiProvider;
use crate::ingest::providers::ChainProvider;
use crate::ingest::types::FeedProvider;
use crate::ingest::FeedAssembler;
use crate::normalize::Normalizer;

/// Demo documents served in `fixtures` mode.
pub const FIXTURE_BREAKING: &str = include_str!("../tests/fixtures/breaking_news.json");
pub const FIXTURE_NEWS: &str = include_str!("../tests/fixtures/news.json");
pub const FIXTURE_STOCKS: &str = include_str!("../tests/fixtures/stocks.json");

/// Wire providers for every section from config.
pub fn build_assembler(cfg: &CarouselConfig) -> Result<FeedAssembler> {
    let normalizer = Normalizer::new(cfg.normalizer.clone());
    let src = &cfg.sources;

    let (breaking, news, quotes): (
        Arc<dyn FeedProvider>,
        Arc<dyn FeedProvider>,
        Arc<dyn FeedProvider>,
    ) = match src.mode {
        SourceMode::Fixtures => (
            Arc::new(JsonApiProvider::from_fixture("breaking", FIXTURE_BREAKING)),
            Arc::new(JsonApiProvider::from_fixture("news", FIXTURE_NEWS)),
            Arc::new(JsonApiProvider::from_fixture("stocks", FIXTURE_STOCKS)),
        ),
        SourceMode::Http => {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(src.timeout_secs))
                .build()
                .context("building http client")?;

            let api_breaking: Arc<dyn FeedProvider> = Arc::new(
                JsonApiProvider::from_url("breaking", src.url_for(&src.breaking_path), client.clone())
                    .with_limit(src.limit),
            );
            let breaking = match &src.breaking_rss_url {
                Some(url) => Arc::new(ChainProvider::new(
                    "breaking",
                    vec![
                        api_breaking,
                        Arc::new(GoogleNewsRssProvider::from_url(url.clone(), client.clone()))
                            as Arc<dyn FeedProvider>,
                    ],
                )) as Arc<dyn FeedProvider>,
                None => api_breaking,
            };
            (
                breaking,
                Arc::new(
                    JsonApiProvider::from_url("news", src.url_for(&src.news_path), client.clone())
                        .with_limit(src.limit),
                ),
                Arc::new(JsonApiProvider::from_url(
                    "stocks",
                    src.url_for(&src.quotes_path),
                    client,
                )),
            )
        }
    };

    tracing::info!(target: "ingest", mode = ?src.mode, base_url = %src.base_url, "feed sources wired");
    Ok(FeedAssembler::new(breaking, news, quotes, normalizer))
}
