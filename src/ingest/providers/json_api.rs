// src/ingest/providers/json_api.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use serde::Deserialize;

use crate::ingest::types::{FeedProvider, RawRecord};

fn yes() -> bool {
    true
}

/// The backend wraps lists as `{"success": true, "data": [...]}`; bare
/// arrays are accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    Envelope {
        #[serde(default = "yes")]
        success: bool,
        data: Vec<RawRecord>,
    },
    Bare(Vec<RawRecord>),
}

/// Parse a JSON feed body. Any syntax error, including a body cut off
/// mid-stream, fails the whole document.
pub fn parse_payload(body: &str) -> Result<Vec<RawRecord>> {
    let payload: Payload = serde_json::from_str(body).context("parsing feed json")?;
    match payload {
        Payload::Envelope { success: false, .. } => Err(anyhow!("feed reported success=false")),
        Payload::Envelope { data, .. } => Ok(data),
        Payload::Bare(data) => Ok(data),
    }
}

pub struct JsonApiProvider {
    name: &'static str,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        limit: Option<usize>,
        client: reqwest::Client,
    },
}

impl JsonApiProvider {
    /// Serve a fixed JSON document instead of calling out.
    pub fn from_fixture(name: &'static str, body: &str) -> Self {
        Self {
            name,
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn from_url(name: &'static str, url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name,
            mode: Mode::Http {
                url: url.into(),
                limit: None,
                client,
            },
        }
    }

    /// Ask the backend for at most `limit` records (`?limit=N`).
    pub fn with_limit(mut self, limit: usize) -> Self {
        if let Mode::Http { limit: l, .. } = &mut self.mode {
            *l = Some(limit);
        }
        self
    }
}

#[async_trait]
impl FeedProvider for JsonApiProvider {
    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let t0 = std::time::Instant::now();
        let records = match &self.mode {
            Mode::Fixture(body) => parse_payload(body),
            Mode::Http { url, limit, client } => {
                let mut req = client.get(url.as_str());
                if let Some(n) = limit {
                    req = req.query(&[("limit", n)]);
                }
                let body = req
                    .send()
                    .await
                    .with_context(|| format!("{} http get()", self.name))?
                    .error_for_status()
                    .with_context(|| format!("{} http status", self.name))?
                    .text()
                    .await
                    .with_context(|| format!("{} http .text()", self.name))?;
                parse_payload(&body)
            }
        }
        .with_context(|| format!("{} feed", self.name))?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_fetch_ms", "provider" => self.name).record(ms);
        Ok(records)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
