// src/render.rs
//! Renderer contract between the rotation core and whatever paints cards.
//!
//! The core hands a [`Frame`] to a [`Renderer`] after every visible change.
//! The display helpers below hold the presentation-side derivations (signs,
//! compact money, badges) so every renderer formats cards the same way.

use serde::Serialize;

use crate::cards::{Card, CardKind, NewsCard, QuoteCard};
use crate::ingest::Section;
use crate::rotation::RotationState;

/// Immutable snapshot of what should be on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub section: Section,
    pub generation: u64,
    pub index: usize,
    pub total: usize,
    pub kind: CardKind,
    pub card: Card,
    pub state: RotationState,
}

/// Paints frames. Called synchronously from the controller while it holds
/// its state lock, so implementations must not call back into the
/// controller. A panic here poisons that lock; the controller recovers the
/// guard and keeps its last consistent state, but the frame is lost.
pub trait Renderer: Send + Sync {
    fn render(&self, frame: &Frame);
}

/// Renderer that only logs; the default for the headless binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRenderer;

impl Renderer for TracingRenderer {
    fn render(&self, frame: &Frame) {
        // Progress ticks are frequent; only card changes are worth `info`.
        if frame.state.progress_fraction == 0.0 {
            let headline = match &frame.card {
                Card::News(n) => n.title.as_str(),
                Card::Quote(q) => q.symbol.as_str(),
            };
            tracing::info!(
                target: "render",
                section = %frame.section,
                index = frame.index,
                total = frame.total,
                playing = frame.state.is_playing,
                headline,
                "card"
            );
        } else {
            tracing::trace!(target: "render", progress = frame.state.progress_fraction, "tick");
        }
    }
}

/// Money in compact form: `$2.75T`, `$1.20B`, `$950.00`.
pub fn format_money(v: f64) -> String {
    let (scaled, unit) = scale(v, true);
    format!("${scaled:.2}{unit}")
}

/// Share volume in compact form: `52.30M`, `900`.
pub fn format_volume(v: f64) -> String {
    let (scaled, unit) = scale(v, false);
    if unit.is_empty() {
        format!("{scaled:.0}")
    } else {
        format!("{scaled:.2}{unit}")
    }
}

fn scale(v: f64, with_trillions: bool) -> (f64, &'static str) {
    if with_trillions && v >= 1e12 {
        (v / 1e12, "T")
    } else if v >= 1e9 {
        (v / 1e9, "B")
    } else if v >= 1e6 {
        (v / 1e6, "M")
    } else if v >= 1e3 {
        (v / 1e3, "K")
    } else {
        (v, "")
    }
}

/// Display strings for a quote card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteDisplay {
    pub is_positive: bool,
    pub price: String,
    pub change_percent: String,
    pub change_abs: String,
    pub volume: String,
    pub market_cap: String,
}

impl From<&QuoteCard> for QuoteDisplay {
    fn from(q: &QuoteCard) -> Self {
        let is_positive = q.change_percent >= 0.0;
        let sign = if q.change_abs >= 0.0 { "+" } else { "-" };
        Self {
            is_positive,
            price: format!("${:.2}", q.price),
            change_percent: format!("{}{:.2}%", if is_positive { "+" } else { "" }, q.change_percent),
            change_abs: format!("{sign}${:.2}", q.change_abs.abs()),
            volume: q.volume.map(format_volume).unwrap_or_else(|| "N/A".to_string()),
            market_cap: q
                .market_cap
                .filter(|m| *m > 0.0)
                .map(format_money)
                .unwrap_or_else(|| "N/A".to_string()),
        }
    }
}

/// Display strings for a news card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsDisplay {
    pub badge: Option<String>,
    pub byline: String,
    pub impact_percent: u32,
    pub impact_label: String,
    pub sentiment_label: String,
}

impl From<&NewsCard> for NewsDisplay {
    fn from(n: &NewsCard) -> Self {
        let badge = n.is_critical.then(|| "CRITICAL BREAKING NEWS".to_string());
        let byline = if n.is_breaking {
            format!("Breaking News • {}", n.source_name)
        } else {
            n.source_name.clone()
        };
        Self {
            badge,
            byline,
            impact_percent: (n.importance_score * 100.0).round().clamp(0.0, 100.0) as u32,
            impact_label: format!("{} IMPACT", n.impact_level.as_str().to_uppercase()),
            sentiment_label: n.sentiment.as_str().to_uppercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{ImpactLevel, Sentiment};

    fn quote(pct: f64, change: f64) -> QuoteCard {
        QuoteCard {
            id: "quote-GOOGL".into(),
            symbol: "GOOGL".into(),
            price: 2750.5,
            change_abs: change,
            change_percent: pct,
            company_name: Some("Alphabet Inc.".into()),
            volume: Some(23_450_000.0),
            market_cap: Some(1.8e12),
        }
    }

    #[test]
    fn quote_sign_follows_percent() {
        let d = QuoteDisplay::from(&quote(-0.5, -13.75));
        assert!(!d.is_positive);
        assert_eq!(d.change_percent, "-0.50%");
        assert_eq!(d.change_abs, "-$13.75");
        assert_eq!(d.price, "$2750.50");
        assert_eq!(d.volume, "23.45M");
        assert_eq!(d.market_cap, "$1.80T");

        let up = QuoteDisplay::from(&quote(0.0, 0.0));
        assert!(up.is_positive);
        assert_eq!(up.change_percent, "+0.00%");
    }

    #[test]
    fn absolute_change_keeps_its_own_sign() {
        let d = QuoteDisplay::from(&quote(0.5, -1.0));
        assert!(d.is_positive);
        assert_eq!(d.change_percent, "+0.50%");
        assert_eq!(d.change_abs, "-$1.00");

        let d = QuoteDisplay::from(&quote(-0.2, 3.0));
        assert_eq!(d.change_abs, "+$3.00");
    }

    #[test]
    fn zero_market_cap_is_not_available() {
        let mut q = quote(1.0, 1.0);
        q.market_cap = Some(0.0);
        q.volume = None;
        let d = QuoteDisplay::from(&q);
        assert_eq!(d.market_cap, "N/A");
        assert_eq!(d.volume, "N/A");
    }

    #[test]
    fn compact_numbers() {
        assert_eq!(format_money(950.0), "$950.00");
        assert_eq!(format_money(2.5e9), "$2.50B");
        assert_eq!(format_volume(900.0), "900");
        assert_eq!(format_volume(1.5e12), "1500.00B");
    }

    #[test]
    fn critical_news_gets_badge() {
        let n = NewsCard {
            id: "breaking-1".into(),
            title: "CRITICAL: breach".into(),
            body: "Details.".into(),
            source_name: "Security Alert".into(),
            is_breaking: true,
            is_critical: true,
            importance_score: 0.95,
            impact_level: ImpactLevel::High,
            sentiment: Sentiment::Negative,
            external_url: None,
            published_at: None,
        };
        let d = NewsDisplay::from(&n);
        assert_eq!(d.badge.as_deref(), Some("CRITICAL BREAKING NEWS"));
        assert_eq!(d.byline, "Breaking News • Security Alert");
        assert_eq!(d.impact_percent, 95);
        assert_eq!(d.impact_label, "HIGH IMPACT");
        assert_eq!(d.sentiment_label, "NEGATIVE");
    }
}
