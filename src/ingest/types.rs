// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream identifier: the original backend hands out integer row ids,
/// RSS-derived records use strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Number(n) => write!(f, "{n}"),
            RawId::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// One record as a provider returned it. Every field is optional and unknown
/// fields are ignored; the normalizer decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    pub id: Option<RawId>,

    // news-like
    pub title: Option<String>,
    #[serde(alias = "description", alias = "body")]
    pub content: Option<String>,
    pub source: Option<String>,
    pub url: Option<String>,
    pub is_breaking: Option<bool>,
    pub is_critical: Option<bool>,
    pub importance_score: Option<f64>,
    pub impact_level: Option<String>,
    pub sentiment: Option<String>,
    pub published_at: Option<String>,

    // quote-like
    pub symbol: Option<String>,
    pub company_name: Option<String>,
    #[serde(alias = "price")]
    pub current_price: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub previous_close: Option<f64>,
    pub volume: Option<f64>,
    pub market_cap: Option<f64>,
}

/// Which policy a raw record is normalized under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    BreakingNews,
    News,
    Quote,
}

impl RecordKind {
    /// Prefix used to namespace card ids coming from this kind of feed.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            RecordKind::BreakingNews => "breaking",
            RecordKind::News => "news",
            RecordKind::Quote => "quote",
        }
    }
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawRecord>>;
    fn name(&self) -> &'static str;
}
