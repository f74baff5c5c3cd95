//! Removes and re-inserts one auto-generated block in a document. Removal
//! is exact for marker-bracketed instances; for content written by the
//! pre-marker era of this tool there is a best-effort structural fallback.
//! All pattern matching against the document lives here and in
//! [`crate::blocks`], so the matching strategy could be swapped for a real
//! parser without touching the orchestrator.

use crate::blocks::BlockKind;
use regex::Regex;
use std::fmt;

/// The result of refreshing one block: the new document text, and whether
/// the bytes actually differ from the input. Pure no-op passes must report
/// `changed: false` so the orchestrator does not record a spurious refresh.
pub struct Refreshed {
    pub html: String,
    pub changed: bool,
}

/// Replaces the `kind` block in `html` with a freshly rendered instance.
///
/// In order: if `instance_id` is already present the document was refreshed
/// today and passes through unchanged; otherwise the marked span is removed
/// (exact), or failing that the kind's legacy pattern is applied (may remove
/// nothing); the anchor is located on the post-removal text (offsets are
/// never reused across the removal) and the rendered body is spliced in,
/// bracketed by the kind's markers.
///
/// A missing anchor is a soft, per-block failure: the caller gets
/// [`Error::AnchorNotFound`] and the document is left as it was.
pub fn refresh<R, A>(
    html: &str,
    kind: BlockKind,
    instance_id: &str,
    render: R,
    anchor: A,
) -> Result<Refreshed>
where
    R: FnOnce() -> String,
    A: Fn(&str) -> Option<usize>,
{
    let token = instance_token(instance_id);
    if html.contains(&token) {
        return Ok(Refreshed {
            html: html.to_owned(),
            changed: false,
        });
    }

    let stripped = match strip_span(html, kind) {
        Some(stripped) => stripped,
        None => strip_legacy(html, kind),
    };

    let at = anchor(&stripped).ok_or(Error::AnchorNotFound { kind })?;

    let body = render();
    let mut out = String::with_capacity(stripped.len() + body.len() + 128);
    out.push_str(&stripped[..at]);
    out.push_str(&format!(
        "\n{}\n{}\n{}\n{}\n",
        kind.begin_marker(),
        token,
        body,
        kind.end_marker()
    ));
    out.push_str(&stripped[at..]);

    let changed = out != html;
    Ok(Refreshed { html: out, changed })
}

fn instance_token(instance_id: &str) -> String {
    format!("<!-- instance:{} -->", instance_id)
}

/// Removes the first begin..end marked span of `kind`, markers included.
/// `None` when no complete span exists.
pub(crate) fn strip_span(html: &str, kind: BlockKind) -> Option<String> {
    let begin = html.find(kind.begin_marker())?;
    let end_offset = html[begin..].find(kind.end_marker())?;
    let end = begin + end_offset + kind.end_marker().len();
    // eat the newline padding the wrapper added, so repeated passes don't
    // accumulate blank lines
    let cut = if html[..begin].ends_with('\n') {
        begin - 1
    } else {
        begin
    };
    let rest = html[end..].strip_prefix('\n').unwrap_or(&html[end..]);
    let mut out = String::with_capacity(html.len());
    out.push_str(&html[..cut]);
    out.push_str(rest);
    Some(out)
}

// Best-effort removal of fragments produced before markers existed. These
// are structural guesses with no grammar behind them and can under- or
// over-match hand-authored HTML that happens to look like old generated
// output; that accuracy limit is accepted.
fn strip_legacy(html: &str, kind: BlockKind) -> String {
    // Static patterns; compilation can't fail.
    let pattern = match kind {
        BlockKind::LatestUpdate => r#"(?s)<div class="info-box">\s*<h4>[^<]*</h4>.*?</div>\s*"#,
        BlockKind::Insight => r#"(?s)<h[34]>\d{4}[^<]*</h[34]>\s*<p>.*?</p>\s*<ul>.*?</ul>\s*"#,
        BlockKind::RelatedArticles => r#"(?s)<div class="related-articles">.*?</ul>\s*</div>\s*"#,
        BlockKind::SchemaMarkup => r#"(?s)<script type="application/ld\+json">.*?</script>\s*"#,
        BlockKind::SocialMeta => {
            r#"(?:<meta (?:property="og:|name="twitter:)[^>]*>\s*)+"#
        }
        BlockKind::MobileStyle => r#"(?s)<style id="mobile-optimize">.*?</style>\s*"#,
    };
    Regex::new(pattern)
        .unwrap()
        .replace_all(html, "")
        .into_owned()
}

/// Anchor just after the first level-1 heading's closing tag.
pub fn after_title(html: &str) -> Option<usize> {
    html.find("</h1>").map(|i| i + "</h1>".len())
}

/// Anchor just before the conclusion heading, falling back to the article
/// footer.
pub fn before_conclusion(html: &str) -> Option<usize> {
    html.find("<h2>Conclusion</h2>")
        .or_else(|| html.find(r#"<div class="article-footer">"#))
}

/// Anchor just before the article footer, falling back to the end of the
/// document body.
pub fn before_footer(html: &str) -> Option<usize> {
    html.find(r#"<div class="article-footer">"#)
        .or_else(|| html.find("</body>"))
}

/// Anchor just before the closing head tag.
pub fn in_head(html: &str) -> Option<usize> {
    html.find("</head>")
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for refreshing a block.
#[derive(Debug)]
pub enum Error {
    /// Returned when the document lacks the structural landmark the block
    /// anchors to. Recoverable: the orchestrator skips this block and
    /// continues with the rest of the article.
    AnchorNotFound { kind: BlockKind },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::AnchorNotFound { kind } => {
                write!(f, "No anchor found for {} block", kind)
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::blocks;
    use chrono::NaiveDate;

    const PAGE: &str = "<html><head><title>t</title></head><body>\
                        <h1>SEO Guide</h1><p>Intro.</p>\
                        <h2>Conclusion</h2><p>Done.</p>\
                        <div class=\"article-footer\"></div></body></html>";

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    fn count(html: &str, needle: &str) -> usize {
        html.matches(needle).count()
    }

    fn refresh_update(html: &str, d: u32) -> Refreshed {
        let id = blocks::instance_id(BlockKind::LatestUpdate, "a.html", day(d));
        refresh(
            html,
            BlockKind::LatestUpdate,
            &id,
            || "<div class=\"update-box\">fresh</div>".to_owned(),
            after_title,
        )
        .unwrap()
    }

    #[test]
    fn test_insert_brackets_body_with_markers() {
        let out = refresh_update(PAGE, 5);
        assert!(out.changed);
        assert_eq!(count(&out.html, BlockKind::LatestUpdate.begin_marker()), 1);
        assert_eq!(count(&out.html, BlockKind::LatestUpdate.end_marker()), 1);
        let begin = out.html.find(BlockKind::LatestUpdate.begin_marker()).unwrap();
        let body = out.html.find("fresh").unwrap();
        let end = out.html.find(BlockKind::LatestUpdate.end_marker()).unwrap();
        assert!(begin < body && body < end);
        // spliced right after the title
        assert!(begin > out.html.find("</h1>").unwrap());
    }

    #[test]
    fn test_same_day_refresh_is_a_no_op() {
        let first = refresh_update(PAGE, 5);
        let second = refresh_update(&first.html, 5);
        assert!(!second.changed);
        assert_eq!(second.html, first.html);
    }

    #[test]
    fn test_next_day_refresh_replaces_not_accumulates() {
        let first = refresh_update(PAGE, 5);
        let second = refresh_update(&first.html, 6);
        assert!(second.changed);
        assert_eq!(count(&second.html, BlockKind::LatestUpdate.begin_marker()), 1);
        assert_eq!(count(&second.html, BlockKind::LatestUpdate.end_marker()), 1);
        assert_eq!(count(&second.html, "fresh"), 1);
    }

    #[test]
    fn test_missing_anchor_fails_softly() {
        let headless = "<p>no heading at all</p>";
        let id = blocks::instance_id(BlockKind::LatestUpdate, "a.html", day(5));
        let result = refresh(
            headless,
            BlockKind::LatestUpdate,
            &id,
            || "x".to_owned(),
            after_title,
        );
        assert!(matches!(result, Err(Error::AnchorNotFound { .. })));
    }

    #[test]
    fn test_legacy_fallback_removes_unmarked_fragment() {
        let with_legacy = PAGE.replace(
            "<p>Intro.</p>",
            "<p>Intro.</p><div class=\"info-box\">\n<h4>Old tip (2024)</h4>\
             <p>stale advice</p></div>\n",
        );
        let out = refresh_update(&with_legacy, 5);
        assert!(!out.html.contains("stale advice"));
        assert_eq!(count(&out.html, BlockKind::LatestUpdate.begin_marker()), 1);
    }

    #[test]
    fn test_legacy_fallback_may_remove_nothing() {
        let out = refresh_update(PAGE, 5);
        assert!(out.html.contains("<p>Intro.</p>"));
    }

    #[test]
    fn test_author_content_survives_refresh() {
        let first = refresh_update(PAGE, 5);
        let second = refresh_update(&first.html, 6);
        for fragment in &["<h1>SEO Guide</h1>", "<p>Intro.</p>", "<h2>Conclusion</h2>"] {
            assert!(second.html.contains(fragment));
        }
    }

    #[test]
    fn test_anchor_policies() {
        assert_eq!(after_title(PAGE), Some(PAGE.find("</h1>").unwrap() + 5));
        assert_eq!(before_conclusion(PAGE), PAGE.find("<h2>Conclusion</h2>"));
        assert_eq!(
            before_footer(PAGE),
            PAGE.find("<div class=\"article-footer\">")
        );
        assert_eq!(in_head(PAGE), PAGE.find("</head>"));

        let bare = "<html><body><p>x</p></body></html>";
        assert_eq!(before_conclusion(bare), None);
        assert_eq!(before_footer(bare), bare.find("</body>"));
        assert_eq!(in_head(bare), None);
    }
}
