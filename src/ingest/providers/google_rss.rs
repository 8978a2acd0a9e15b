// src/ingest/providers/google_rss.rs
//! Breaking-news candidates from a Google News RSS search.
//!
//! RSS items carry no urgency flags, so only items that score as breaking
//! under a keyword heuristic are kept.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::types::{FeedProvider, RawId, RawRecord};

pub const DEFAULT_GOOGLE_NEWS_URL: &str = "https://news.google.com/rss/search?q=technology+OR+%22artificial+intelligence%22+OR+%22machine+learning%22+OR+%22tech+company%22&hl=en-US&gl=US&ceid=US:en";
pub const MAX_ITEMS: usize = 20;
pub const BREAKING_SCORE_THRESHOLD: u32 = 3;

const BREAKING_INDICATORS: &[&str] = &[
    "breaking", "just in", "urgent", "alert", "announcement", "launches", "releases", "acquires",
    "merges", "partners", "funding", "ipo", "layoffs", "hiring", "expansion",
];

const TECH_COMPANIES: &[&str] = &[
    "google", "apple", "microsoft", "amazon", "meta", "facebook", "tesla", "nvidia", "intel",
    "amd", "netflix", "spotify", "uber", "lyft", "airbnb", "stripe", "openai", "anthropic",
];

const AI_KEYWORDS: &[&str] = &[
    "artificial intelligence", "machine learning", "deep learning", "neural network", "gpt",
    "llm", "ai model", "algorithm",
];

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    source: Option<SourceTag>,
}

/// `<source url="...">Publisher</source>`; only the text is used.
#[derive(Debug, Deserialize)]
struct SourceTag {
    #[serde(rename = "$text", default)]
    name: Option<String>,
}

/// Substring score: indicators +2, company names +3, AI keywords +2.
pub fn breaking_score(title: &str, content: &str) -> u32 {
    let text = format!("{title} {content}").to_lowercase();
    let hits = |words: &[&str]| words.iter().filter(|w| text.contains(*w)).count() as u32;
    hits(BREAKING_INDICATORS) * 2 + hits(TECH_COMPANIES) * 3 + hits(AI_KEYWORDS) * 2
}

pub fn is_breaking(title: &str, content: &str) -> bool {
    breaking_score(title, content) >= BREAKING_SCORE_THRESHOLD
}

pub struct GoogleNewsRssProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl GoogleNewsRssProvider {
    pub fn from_fixture(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    fn parse_items_from_str(s: &str) -> Result<Vec<RawRecord>> {
        let t0 = std::time::Instant::now();
        let xml = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml).context("parsing google news rss xml")?;

        let out = rss
            .channel
            .item
            .into_iter()
            .take(MAX_ITEMS)
            .filter(|it| {
                is_breaking(
                    it.title.as_deref().unwrap_or_default(),
                    it.description.as_deref().unwrap_or_default(),
                )
            })
            .map(|it| RawRecord {
                id: it.guid.or_else(|| it.link.clone()).map(RawId::Text),
                title: it.title,
                content: it.description,
                source: Some(
                    it.source
                        .and_then(|s| s.name)
                        .unwrap_or_else(|| "Google News".to_string()),
                ),
                url: it.link,
                published_at: it.pub_date,
                ..Default::default()
            })
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_fetch_ms", "provider" => "google-news").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl FeedProvider for GoogleNewsRssProvider {
    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .context("google news http get()")?
                    .error_for_status()
                    .context("google news http status")?
                    .text()
                    .await
                    .context("google news http .text()")?;
                Self::parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "google-news"
    }
}

/// XML only knows five named entities; HTML ones in descriptions would make
/// the whole document unparseable.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
