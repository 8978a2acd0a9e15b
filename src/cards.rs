// src/cards.rs
//! # Cards
//! The uniform display model every upstream record is normalized into.
//!
//! A [`Card`] is a closed two-variant union; [`kind_of`] is the exhaustive
//! discriminator the presentation layer uses to pick a renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_IMPORTANCE: f32 = 0.5;
pub const DEFAULT_SOURCE_NAME: &str = "Tech News";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl ImpactLevel {
    /// Case-insensitive parse; anything unrecognised is `Medium`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => Self::Low,
            Some("high") => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Case-insensitive parse; anything unrecognised is `Neutral`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("positive") => Self::Positive,
            Some("negative") => Self::Negative,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsCard {
    pub id: String,
    pub title: String,
    pub body: String,
    pub source_name: String,
    pub is_breaking: bool,
    pub is_critical: bool,
    /// Always within `[0.0, 1.0]`.
    pub importance_score: f32,
    pub impact_level: ImpactLevel,
    pub sentiment: Sentiment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteCard {
    pub id: String,
    pub symbol: String,
    pub price: f64,
    pub change_abs: f64,
    pub change_percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Card {
    News(NewsCard),
    Quote(QuoteCard),
}

impl Card {
    pub fn id(&self) -> &str {
        match self {
            Card::News(n) => &n.id,
            Card::Quote(q) => &q.id,
        }
    }

    pub fn as_news(&self) -> Option<&NewsCard> {
        match self {
            Card::News(n) => Some(n),
            Card::Quote(_) => None,
        }
    }

    pub fn as_quote(&self) -> Option<&QuoteCard> {
        match self {
            Card::Quote(q) => Some(q),
            Card::News(_) => None,
        }
    }
}

impl From<NewsCard> for Card {
    fn from(n: NewsCard) -> Self {
        Card::News(n)
    }
}

impl From<QuoteCard> for Card {
    fn from(q: QuoteCard) -> Self {
        Card::Quote(q)
    }
}

/// Renderer routing tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    News,
    Quote,
}

/// Which renderer a card needs.
pub fn kind_of(card: &Card) -> CardKind {
    match card {
        Card::News(_) => CardKind::News,
        Card::Quote(_) => CardKind::Quote,
    }
}
