// src/normalize.rs
//! # Card Normalizer
//! Maps raw upstream records into [`Card`]s.
//!
//! News policy, in order:
//! 1. strip markup from title and content;
//! 2. empty content falls back to the title;
//! 3. a body that repeats the title as a prefix loses it (plus a leading
//!    `-`, `•`, `|` or `:` separator);
//! 4. a body that is empty, equal to the title, or shorter than
//!    `min_body_chars` is replaced by a fixed placeholder sentence;
//! 5. long bodies are cut at a late sentence boundary, or hard-cut with an
//!    ellipsis when no such boundary exists.
//!
//! Quote policy: missing numbers are zero, the symbol is mandatory.
//!
//! Records without their identity field are rejected with a [`DropReason`];
//! the caller decides how to count and log that.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cards::{
    Card, ImpactLevel, NewsCard, QuoteCard, Sentiment, DEFAULT_IMPORTANCE, DEFAULT_SOURCE_NAME,
};
use crate::ingest::types::{RawRecord, RecordKind};
use crate::markup::{strip, strip_opt};

pub const DEFAULT_MIN_BODY_CHARS: usize = 100;
pub const DEFAULT_MAX_BODY_CHARS: usize = 800;
pub const DEFAULT_SENTENCE_BOUNDARY_RATIO: f64 = 0.7;
pub const DEFAULT_PLACEHOLDER_BODY: &str =
    "The full story is available from the original source. Open the article link to read it in full.";
pub const ELLIPSIS: &str = "...";

const SEPARATORS: [char; 4] = ['-', '•', '|', ':'];

fn default_min_body_chars() -> usize {
    DEFAULT_MIN_BODY_CHARS
}
fn default_max_body_chars() -> usize {
    DEFAULT_MAX_BODY_CHARS
}
fn default_ratio() -> f64 {
    DEFAULT_SENTENCE_BOUNDARY_RATIO
}
fn default_placeholder_body() -> String {
    DEFAULT_PLACEHOLDER_BODY.to_string()
}

/// Body shaping knobs (the `[normalizer]` config section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPolicy {
    #[serde(default = "default_min_body_chars")]
    pub min_body_chars: usize,
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
    /// How late in the truncation window a sentence boundary must sit to be
    /// used as the cut point. Clamped to `[0.0, 1.0]`.
    #[serde(default = "default_ratio")]
    pub sentence_boundary_ratio: f64,
    #[serde(default = "default_placeholder_body")]
    pub placeholder_body: String,
}

impl Default for BodyPolicy {
    fn default() -> Self {
        Self {
            min_body_chars: DEFAULT_MIN_BODY_CHARS,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
            sentence_boundary_ratio: DEFAULT_SENTENCE_BOUNDARY_RATIO,
            placeholder_body: DEFAULT_PLACEHOLDER_BODY.to_string(),
        }
    }
}

impl BodyPolicy {
    /// Repair values a hand-edited config may get wrong.
    pub fn sanitized(mut self) -> Self {
        if !self.sentence_boundary_ratio.is_finite() {
            self.sentence_boundary_ratio = DEFAULT_SENTENCE_BOUNDARY_RATIO;
        }
        self.sentence_boundary_ratio = self.sentence_boundary_ratio.clamp(0.0, 1.0);
        if self.max_body_chars == 0 {
            self.max_body_chars = DEFAULT_MAX_BODY_CHARS;
        }
        if strip(&self.placeholder_body).is_empty() {
            self.placeholder_body = default_placeholder_body();
        }
        self
    }
}

/// Why a raw record produced no card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DropReason {
    #[error("news record without a title")]
    MissingTitle,
    #[error("quote record without a symbol")]
    MissingSymbol,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingTitle => "missing_title",
            DropReason::MissingSymbol => "missing_symbol",
        }
    }
}

/// Stateless record → card converter. Cheap to clone and safe to share.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    policy: BodyPolicy,
}

impl Normalizer {
    pub fn new(policy: BodyPolicy) -> Self {
        Self {
            policy: policy.sanitized(),
        }
    }

    pub fn policy(&self) -> &BodyPolicy {
        &self.policy
    }

    pub fn normalize(&self, raw: RawRecord, kind: RecordKind) -> Result<Card, DropReason> {
        match kind {
            RecordKind::BreakingNews | RecordKind::News => {
                self.normalize_news(raw, kind).map(Card::News)
            }
            RecordKind::Quote => normalize_quote(raw).map(Card::Quote),
        }
    }

    fn normalize_news(&self, raw: RawRecord, kind: RecordKind) -> Result<NewsCard, DropReason> {
        let title = strip_opt(raw.title.as_deref());
        if title.is_empty() {
            return Err(DropReason::MissingTitle);
        }
        let body = shape_body(&title, &strip_opt(raw.content.as_deref()), &self.policy);

        let breaking = kind == RecordKind::BreakingNews;
        let source_name = match strip_opt(raw.source.as_deref()) {
            s if s.is_empty() => DEFAULT_SOURCE_NAME.to_string(),
            s => s,
        };
        let id = match raw.id.as_ref().map(|id| id.to_string()) {
            Some(id) if !id.is_empty() => format!("{}-{}", kind.id_prefix(), id),
            _ => format!("{}-{}", kind.id_prefix(), slug(&title)),
        };

        Ok(NewsCard {
            id,
            title,
            body,
            source_name,
            is_breaking: breaking || raw.is_breaking.unwrap_or(false),
            is_critical: breaking && raw.is_critical.unwrap_or(false),
            importance_score: importance(raw.importance_score),
            impact_level: ImpactLevel::parse_lenient(raw.impact_level.as_deref()),
            sentiment: Sentiment::parse_lenient(raw.sentiment.as_deref()),
            external_url: raw
                .url
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
            published_at: raw.published_at.as_deref().and_then(parse_timestamp),
        })
    }
}

/// Normalize with the default [`BodyPolicy`].
pub fn normalize(raw: RawRecord, kind: RecordKind) -> Result<Card, DropReason> {
    Normalizer::default().normalize(raw, kind)
}

/// Steps 2–5 of the news policy on already-stripped text.
pub fn shape_body(title: &str, content: &str, policy: &BodyPolicy) -> String {
    let body = if content.is_empty() { title } else { content };
    let body = drop_title_prefix(title, body);

    let body = if is_thin(title, body, policy) {
        policy.placeholder_body.as_str()
    } else {
        body
    };

    truncate_body(body, policy)
}

fn drop_title_prefix<'a>(title: &str, body: &'a str) -> &'a str {
    match strip_prefix_ci(body, title) {
        Some(rest) => rest.trim_start_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c)),
        None => body,
    }
}

/// Case-insensitive prefix strip that only matches on a word boundary
/// ("Apple" does not eat the front of "Applesauce").
fn strip_prefix_ci<'a>(haystack: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    let mut chars = haystack.char_indices();
    let mut end = 0;
    for pc in prefix.chars() {
        let (i, hc) = chars.next()?;
        if !chars_eq_ci(pc, hc) {
            return None;
        }
        end = i + hc.len_utf8();
    }
    let rest = &haystack[end..];
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() => None,
        _ => Some(rest),
    }
}

fn chars_eq_ci(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.chars().count() == b.chars().count() && a.chars().zip(b.chars()).all(|(x, y)| chars_eq_ci(x, y))
}

/// Empty, the title again, or under the minimum length.
fn is_thin(title: &str, body: &str, policy: &BodyPolicy) -> bool {
    body.is_empty() || eq_ci(body, title) || body.chars().count() < policy.min_body_chars
}

/// Bound `body` to `max_body_chars` characters, preferring to end on a
/// sentence boundary in the last part of the window.
pub fn truncate_body(body: &str, policy: &BodyPolicy) -> String {
    let max = policy.max_body_chars;
    if body.chars().count() <= max {
        return body.to_string();
    }

    let window_end = body
        .char_indices()
        .nth(max)
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    let window = &body[..window_end];

    let boundary = window
        .char_indices()
        .enumerate()
        .filter(|(_, (_, c))| matches!(c, '.' | '!' | '?'))
        .last();

    if let Some((nth, (byte_idx, c))) = boundary {
        let kept_chars = nth + 1;
        if kept_chars as f64 >= max as f64 * policy.sentence_boundary_ratio {
            return window[..byte_idx + c.len_utf8()].to_string();
        }
    }

    format!("{}{}", window.trim_end(), ELLIPSIS)
}

fn importance(raw: Option<f64>) -> f32 {
    match raw {
        Some(v) if v.is_finite() && (0.0..=1.0).contains(&v) => v as f32,
        _ => DEFAULT_IMPORTANCE,
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

fn normalize_quote(raw: RawRecord) -> Result<QuoteCard, DropReason> {
    let symbol = strip_opt(raw.symbol.as_deref()).to_uppercase();
    if symbol.is_empty() {
        return Err(DropReason::MissingSymbol);
    }

    let price = finite(raw.current_price);
    let previous_close = finite(raw.previous_close).filter(|p| *p != 0.0);
    let percent = finite(raw.change_percent);

    let (change_abs, change_percent) = match (finite(raw.change), price, previous_close) {
        (Some(change), _, _) => (change, percent.unwrap_or(0.0)),
        (None, Some(p), Some(prev)) => {
            let change = p - prev;
            (change, percent.unwrap_or(change / prev * 100.0))
        }
        (None, _, _) => (0.0, percent.unwrap_or(0.0)),
    };

    Ok(QuoteCard {
        id: format!("{}-{}", RecordKind::Quote.id_prefix(), symbol),
        symbol,
        price: price.unwrap_or(0.0),
        change_abs,
        change_percent,
        company_name: Some(strip_opt(raw.company_name.as_deref())).filter(|s| !s.is_empty()),
        volume: finite(raw.volume),
        market_cap: finite(raw.market_cap),
    })
}

/// RFC 3339, RFC 2822, or a naive ISO timestamp taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(64));
    let mut dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
        if out.chars().count() >= 64 {
            break;
        }
    }
    out.trim_end_matches('-').to_string()
}
