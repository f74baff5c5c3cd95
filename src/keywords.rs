//! Heuristic keyword extraction from article HTML. The result feeds the
//! related-article matcher, so the policy here (which elements are mined,
//! the 4-word phrase window, the length and digit filters) is part of the
//! engine's observable behavior, not an implementation detail. There is
//! deliberately no stemming and no stopword removal.

use regex::Regex;
use std::collections::BTreeSet;

/// Derives an article's topical terms from its HTML body. Collects the text
/// of `h2`/`h3` headings, the text of emphasized inline elements
/// (`strong`/`em`/`b`), and sliding 4-word phrases from tag-stripped
/// paragraph text. Phrases are kept only when longer than 10 characters and
/// free of digits; every candidate is stripped of markup and punctuation,
/// lowercased, and dropped unless longer than one character.
pub fn extract(html: &str) -> BTreeSet<String> {
    // Static patterns; compilation can't fail.
    let headings = Regex::new(r"(?is)<h[23][^>]*>(.*?)</h[23]>").unwrap();
    let emphasis = Regex::new(r"(?is)<(?:strong|em|b)[^>]*>(.*?)</(?:strong|em|b)>").unwrap();
    let paragraphs = Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap();

    let mut found = BTreeSet::new();

    for cap in headings.captures_iter(html) {
        keep(&mut found, clean(&cap[1]));
    }
    for cap in emphasis.captures_iter(html) {
        keep(&mut found, clean(&cap[1]));
    }
    for cap in paragraphs.captures_iter(html) {
        let text = clean(&cap[1]);
        let words: Vec<&str> = text.split_whitespace().collect();
        for window in words.windows(4) {
            let phrase = window.join(" ");
            if phrase.len() > 10 && !phrase.chars().any(|c| c.is_ascii_digit()) {
                keep(&mut found, phrase);
            }
        }
    }

    found
}

fn keep(found: &mut BTreeSet<String>, candidate: String) {
    if candidate.chars().count() > 1 {
        found.insert(candidate);
    }
}

// Strips nested markup and punctuation, collapses whitespace, lowercases.
fn clean(raw: &str) -> String {
    let tags = Regex::new(r"<[^>]+>").unwrap();
    let text = tags.replace_all(raw, " ");
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}
