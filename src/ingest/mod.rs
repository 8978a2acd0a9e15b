// src/ingest/mod.rs
//! # Feed Assembler
//! Fetches the raw records a section needs, normalizes them, and guarantees
//! a non-empty card sequence.

pub mod providers;
pub mod types;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::cards::{
    Card, ImpactLevel, NewsCard, QuoteCard, Sentiment, DEFAULT_IMPORTANCE, DEFAULT_SOURCE_NAME,
};
use crate::ingest::types::{FeedProvider, RawRecord, RecordKind};
use crate::normalize::Normalizer;

pub const PLACEHOLDER_NEWS_ID: &str = "placeholder-news";
pub const PLACEHOLDER_QUOTE_ID: &str = "placeholder-quote";

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_records_total", "Raw records returned by providers.");
        describe_counter!(
            "feed_records_dropped_total",
            "Raw records rejected by the normalizer."
        );
        describe_counter!(
            "feed_duplicates_total",
            "Cards removed because their id was already in the sequence."
        );
        describe_counter!(
            "feed_source_errors_total",
            "Provider fetch/parse failures."
        );
        describe_counter!(
            "feed_placeholder_total",
            "Sections that fell back to a placeholder card."
        );
        describe_counter!(
            "feed_stale_responses_total",
            "Assembled feeds discarded because a newer generation superseded them."
        );
        describe_counter!("rotation_advances_total", "Timer-driven card advances.");
        describe_gauge!("carousel_generation", "Current fetch generation.");
        describe_histogram!(
            "feed_fetch_ms",
            metrics::Unit::Milliseconds,
            "Provider fetch + parse time."
        );
    });
}

/// A switchable carousel section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    News,
    Stocks,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::News => "news",
            Section::Stocks => "stocks",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "news" => Ok(Section::News),
            "stocks" => Ok(Section::Stocks),
            other => Err(anyhow::anyhow!("unknown section: {other}")),
        }
    }
}

/// Bookkeeping for one assembly run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyCounts {
    pub fetched: usize,
    pub dropped: usize,
    pub duplicates: usize,
    pub failed_sources: usize,
    pub placeholder: bool,
}

/// Owns the upstream providers for every section.
#[derive(Clone)]
pub struct FeedAssembler {
    breaking: Arc<dyn FeedProvider>,
    news: Arc<dyn FeedProvider>,
    quotes: Arc<dyn FeedProvider>,
    normalizer: Normalizer,
}

impl FeedAssembler {
    pub fn new(
        breaking: Arc<dyn FeedProvider>,
        news: Arc<dyn FeedProvider>,
        quotes: Arc<dyn FeedProvider>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            breaking,
            news,
            quotes,
            normalizer,
        }
    }

    /// Card sequence for `section`; never empty.
    pub async fn assemble(&self, section: Section) -> Vec<Card> {
        self.assemble_counted(section).await.0
    }

    /// Like [`assemble`](Self::assemble), also reporting what happened.
    ///
    /// Exactly one fetch per source, no retries. News fetches the breaking
    /// and regular feeds concurrently; breaking cards always come first.
    pub async fn assemble_counted(&self, section: Section) -> (Vec<Card>, AssemblyCounts) {
        ensure_metrics_described();
        let mut counts = AssemblyCounts::default();

        let mut cards = match section {
            Section::News => {
                let (breaking, regular) =
                    tokio::join!(self.breaking.fetch(), self.news.fetch());
                let mut out = self.collect(
                    self.breaking.name(),
                    breaking,
                    RecordKind::BreakingNews,
                    &mut counts,
                );
                out.extend(self.collect(self.news.name(), regular, RecordKind::News, &mut counts));
                out
            }
            Section::Stocks => {
                let quotes = self.quotes.fetch().await;
                self.collect(self.quotes.name(), quotes, RecordKind::Quote, &mut counts)
            }
        };

        counts.duplicates = dedup_by_id(&mut cards);
        counter!("feed_duplicates_total").increment(counts.duplicates as u64);

        if cards.is_empty() {
            counts.placeholder = true;
            counter!("feed_placeholder_total", "section" => section.as_str()).increment(1);
            tracing::warn!(
                target: "ingest",
                %section,
                failed_sources = counts.failed_sources,
                dropped = counts.dropped,
                "no usable cards, substituting placeholder"
            );
            cards.push(placeholder_card(section));
        }

        tracing::info!(
            target: "ingest",
            %section,
            cards = cards.len(),
            fetched = counts.fetched,
            dropped = counts.dropped,
            duplicates = counts.duplicates,
            failed_sources = counts.failed_sources,
            "feed assembled"
        );
        (cards, counts)
    }

    fn collect(
        &self,
        provider: &'static str,
        fetched: anyhow::Result<Vec<RawRecord>>,
        kind: RecordKind,
        counts: &mut AssemblyCounts,
    ) -> Vec<Card> {
        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider, "provider error");
                counter!("feed_source_errors_total", "provider" => provider).increment(1);
                counts.failed_sources += 1;
                return Vec::new();
            }
        };

        counts.fetched += records.len();
        counter!("feed_records_total", "provider" => provider).increment(records.len() as u64);

        let mut out = Vec::with_capacity(records.len());
        for raw in records {
            match self.normalizer.normalize(raw, kind) {
                Ok(card) => out.push(card),
                Err(reason) => {
                    counts.dropped += 1;
                    counter!("feed_records_dropped_total", "reason" => reason.as_str())
                        .increment(1);
                    tracing::debug!(target: "ingest", provider, %reason, "record dropped");
                }
            }
        }
        out
    }
}

/// Keep the first card for every id. Returns how many were removed.
pub fn dedup_by_id(cards: &mut Vec<Card>) -> usize {
    let before = cards.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(before);
    cards.retain(|c| seen.insert(c.id().to_string()));
    before - cards.len()
}

/// The synthetic card a section shows when nothing real is available.
pub fn placeholder_card(section: Section) -> Card {
    match section {
        Section::News => Card::News(NewsCard {
            id: PLACEHOLDER_NEWS_ID.to_string(),
            title: "Welcome to TechScope Daily".to_string(),
            body: "Today's technology headlines are not available right now. \
                   The carousel will pick them up as soon as the news feeds respond."
                .to_string(),
            source_name: DEFAULT_SOURCE_NAME.to_string(),
            is_breaking: false,
            is_critical: false,
            importance_score: DEFAULT_IMPORTANCE,
            impact_level: ImpactLevel::Medium,
            sentiment: Sentiment::Neutral,
            external_url: None,
            published_at: None,
        }),
        Section::Stocks => Card::Quote(QuoteCard {
            id: PLACEHOLDER_QUOTE_ID.to_string(),
            symbol: "N/A".to_string(),
            price: 0.0,
            change_abs: 0.0,
            change_percent: 0.0,
            company_name: Some("Market data unavailable".to_string()),
            volume: None,
            market_cap: None,
        }),
    }
}
