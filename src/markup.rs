// src/markup.rs
//! Markup stripping for upstream titles and bodies.
//!
//! Feeds hand us anything from clean sentences to RSS descriptions full of
//! `<a>` tags and double-escaped entities. [`strip`] turns all of it into a
//! single line of plain text.

use once_cell::sync::OnceCell;
use regex::Regex;

fn re_blocks() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("block regex")
    })
}

fn re_tags() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    // A tag must open with a name, `/`, `!` (comments, doctype) or `?`, so
    // plain comparisons like "5 < 6" survive.
    RE.get_or_init(|| Regex::new(r"(?is)</?[a-z!?][^>]*>").expect("tag regex"))
}

fn re_ws() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"))
}

/// Convert rich/HTML text into clean plain text.
///
/// Entities are decoded and tags removed repeatedly until the text stops
/// changing, so `&amp;lt;b&amp;gt;` ends up as plain text in one call and
/// `strip(strip(x)) == strip(x)` holds. Every pass that changes the text
/// makes it strictly shorter, so the loop terminates.
pub fn strip(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let mut out = input.to_string();
    loop {
        let decoded = html_escape::decode_html_entities(&out).to_string();
        let no_blocks = re_blocks().replace_all(&decoded, " ");
        let no_tags = re_tags().replace_all(&no_blocks, " ").to_string();
        if no_tags == out {
            break;
        }
        out = no_tags;
    }

    re_ws().replace_all(&out, " ").trim().to_string()
}

/// [`strip`] for optional upstream fields; `None` yields an empty string.
pub fn strip_opt(input: Option<&str>) -> String {
    input.map(strip).unwrap_or_default()
}
