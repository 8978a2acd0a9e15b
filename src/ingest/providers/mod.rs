// src/ingest/providers/mod.rs
pub mod google_rss;
pub mod json_api;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::ingest::types::{FeedProvider, RawRecord};

/// Several providers presented as one feed, records concatenated in
/// provider order. Fails only when every member fails.
pub struct ChainProvider {
    name: &'static str,
    members: Vec<Arc<dyn FeedProvider>>,
}

impl ChainProvider {
    pub fn new(name: &'static str, members: Vec<Arc<dyn FeedProvider>>) -> Self {
        Self { name, members }
    }
}

#[async_trait]
impl FeedProvider for ChainProvider {
    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let mut out = Vec::new();
        let mut last_err = None;
        let mut any_ok = false;
        for p in &self.members {
            match p.fetch().await {
                Ok(mut v) => {
                    any_ok = true;
                    out.append(&mut v);
                }
                Err(e) => {
                    tracing::warn!(target: "ingest", error = ?e, provider = p.name(), chain = self.name, "chained provider error");
                    last_err = Some(e);
                }
            }
        }
        match (any_ok, last_err) {
            (false, Some(e)) => Err(e.context(format!("all providers of {} failed", self.name))),
            (false, None) => Err(anyhow!("{} has no providers", self.name)),
            _ => Ok(out),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::json_api::JsonApiProvider;
    use super::*;

    #[tokio::test]
    async fn chain_survives_partial_failure() {
        let ok: Arc<dyn FeedProvider> =
            Arc::new(JsonApiProvider::from_fixture("a", r#"[{"title": "A"}]"#));
        let bad: Arc<dyn FeedProvider> = Arc::new(JsonApiProvider::from_fixture("b", "not json"));
        let chain = ChainProvider::new("breaking", vec![bad.clone(), ok]);
        assert_eq!(chain.fetch().await.unwrap().len(), 1);

        let all_bad = ChainProvider::new("breaking", vec![bad]);
        assert!(all_bad.fetch().await.is_err());
        assert!(ChainProvider::new("empty", vec![]).fetch().await.is_err());
    }
}
