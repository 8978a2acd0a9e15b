// tests/markup_strip.rs
use rand::{rngs::StdRng, Rng, SeedableRng};
use techscope_carousel::markup::strip;

#[test]
fn rss_description_becomes_plain_text() {
    let html = r##"<a href="https://news.example/x" target="_blank">Nvidia ships Blackwell</a>&nbsp;&nbsp;<font color="#6f6f6f">The Verge</font>"##;
    assert_eq!(strip(html), "Nvidia ships Blackwell The Verge");
}

#[test]
fn double_escaped_markup_is_removed_in_one_call() {
    assert_eq!(strip("&amp;lt;b&amp;gt;bold&amp;lt;/b&amp;gt; move"), "bold move");
}

#[test]
fn scripts_and_comments_are_dropped() {
    let s = "<p>Intro</p><script>alert('x')</script><!-- hidden --><style>p{}</style>Outro";
    assert_eq!(strip(s), "Intro Outro");
}

#[test]
fn comparisons_are_not_tags() {
    assert_eq!(strip("5 < 6 and 7 > 3"), "5 < 6 and 7 > 3");
}

#[test]
fn strip_is_idempotent_on_noisy_input() {
    const ALPHABET: &[&str] = &[
        "<", ">", "&", ";", "amp", "lt", "gt", "nbsp", "#39", "b", "p", "/", " ", "\n", "\t", "a",
        "script", "Tech", "!", "?", "-", "é",
    ];
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    for _ in 0..2_000 {
        let len = rng.random_range(0..40);
        let s: String = (0..len)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())])
            .collect();
        let once = strip(&s);
        assert_eq!(strip(&once), once, "input: {s:?}");
        assert_eq!(once.trim(), once);
        assert!(!once.contains("  "));
    }
}
