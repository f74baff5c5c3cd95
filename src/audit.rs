//! Detects and repairs marker corruption: a document should never hold more
//! than one instance of any block kind. Repair is deliberately maximal and
//! blunt: every marked span of every kind is stripped and the next refresh
//! pass regenerates them, because partial reconciliation is more fragile
//! than regeneration is expensive.

use crate::blocks::BlockKind;
use crate::mutate;

/// Returns the block kinds whose begin marker occurs more than once in
/// `html`. An empty result means the document is healthy.
pub fn scan(html: &str) -> Vec<BlockKind> {
    BlockKind::ALL
        .iter()
        .copied()
        .filter(|kind| html.matches(kind.begin_marker()).count() > 1)
        .collect()
}

/// Strips every marked span of every kind, duplicated or not.
pub fn repair_all(html: &str) -> String {
    let mut out = html.to_owned();
    for kind in BlockKind::ALL.iter().copied() {
        while let Some(stripped) = mutate::strip_span(&out, kind) {
            out = stripped;
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn span(kind: BlockKind, body: &str) -> String {
        format!(
            "\n{}\n{}\n{}\n",
            kind.begin_marker(),
            body,
            kind.end_marker()
        )
    }

    #[test]
    fn test_scan_reports_only_duplicated_kinds() {
        let html = format!(
            "<body><h1>t</h1>{}{}{}</body>",
            span(BlockKind::LatestUpdate, "one"),
            span(BlockKind::LatestUpdate, "two"),
            span(BlockKind::Insight, "fine")
        );
        assert_eq!(scan(&html), vec![BlockKind::LatestUpdate]);
    }

    #[test]
    fn test_scan_clean_document() {
        assert!(scan("<body><h1>t</h1></body>").is_empty());
    }

    #[test]
    fn test_repair_all_is_maximal() {
        let html = format!(
            "<body><h1>t</h1>{}{}{}</body>",
            span(BlockKind::LatestUpdate, "one"),
            span(BlockKind::LatestUpdate, "two"),
            span(BlockKind::Insight, "fine")
        );
        let repaired = repair_all(&html);
        for kind in BlockKind::ALL.iter() {
            assert_eq!(repaired.matches(kind.begin_marker()).count(), 0);
            assert_eq!(repaired.matches(kind.end_marker()).count(), 0);
        }
        // author content survives
        assert!(repaired.contains("<h1>t</h1>"));
        assert!(!repaired.contains("one"));
        assert!(!repaired.contains("two"));
        assert!(!repaired.contains("fine"));
    }

    #[test]
    fn test_self_heal_round_trip() {
        use crate::blocks;
        use chrono::NaiveDate;

        // two latest-update pairs: corrupt
        let html = format!(
            "<html><head></head><body><h1>t</h1>{}{}<div class=\"article-footer\"></div></body></html>",
            span(BlockKind::LatestUpdate, "one"),
            span(BlockKind::LatestUpdate, "two"),
        );
        assert_eq!(scan(&html), vec![BlockKind::LatestUpdate]);

        // one audit+repair pass: zero markers
        let repaired = repair_all(&html);
        assert_eq!(
            repaired.matches(BlockKind::LatestUpdate.begin_marker()).count(),
            0
        );

        // a subsequent normal refresh: exactly one
        let day = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
        let id = blocks::instance_id(BlockKind::LatestUpdate, "a.html", day);
        let out = mutate::refresh(
            &repaired,
            BlockKind::LatestUpdate,
            &id,
            || "fresh".to_owned(),
            mutate::after_title,
        )
        .unwrap();
        assert_eq!(
            out.html.matches(BlockKind::LatestUpdate.begin_marker()).count(),
            1
        );
        assert_eq!(
            out.html.matches(BlockKind::LatestUpdate.end_marker()).count(),
            1
        );
    }
}
