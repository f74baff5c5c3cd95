//! The catalog of auto-generated block kinds. Every fragment the engine
//! injects into an article is bracketed by a pair of literal marker comments
//! specific to its [`BlockKind`], which is what makes removal on the next
//! pass exact rather than heuristic.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

/// One kind of auto-generated fragment. Each kind owns a begin/end marker
/// pair; the markers are literal strings chosen so they can never appear in
/// author-written content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// The "latest update" box under the article title.
    LatestUpdate,

    /// An in-body insight insertion (fresh numbers, keyword call-outs).
    /// Only `data` articles receive these.
    Insight,

    /// The related-reading link list near the article footer.
    RelatedArticles,

    /// JSON-LD `Article` metadata in the document head.
    SchemaMarkup,

    /// Open Graph and Twitter card tags in the document head.
    SocialMeta,

    /// Mobile media-query styles. Created once, never refreshed.
    MobileStyle,
}

impl BlockKind {
    pub const ALL: [BlockKind; 6] = [
        BlockKind::LatestUpdate,
        BlockKind::Insight,
        BlockKind::RelatedArticles,
        BlockKind::SchemaMarkup,
        BlockKind::SocialMeta,
        BlockKind::MobileStyle,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            BlockKind::LatestUpdate => "latest-update",
            BlockKind::Insight => "insight",
            BlockKind::RelatedArticles => "related-articles",
            BlockKind::SchemaMarkup => "schema-markup",
            BlockKind::SocialMeta => "social-meta",
            BlockKind::MobileStyle => "mobile-style",
        }
    }

    pub fn begin_marker(self) -> &'static str {
        match self {
            BlockKind::LatestUpdate => "<!-- evergreen:latest-update -->",
            BlockKind::Insight => "<!-- evergreen:insight -->",
            BlockKind::RelatedArticles => "<!-- evergreen:related-articles -->",
            BlockKind::SchemaMarkup => "<!-- evergreen:schema-markup -->",
            BlockKind::SocialMeta => "<!-- evergreen:social-meta -->",
            BlockKind::MobileStyle => "<!-- evergreen:mobile-style -->",
        }
    }

    pub fn end_marker(self) -> &'static str {
        match self {
            BlockKind::LatestUpdate => "<!-- /evergreen:latest-update -->",
            BlockKind::Insight => "<!-- /evergreen:insight -->",
            BlockKind::RelatedArticles => "<!-- /evergreen:related-articles -->",
            BlockKind::SchemaMarkup => "<!-- /evergreen:schema-markup -->",
            BlockKind::SocialMeta => "<!-- /evergreen:social-meta -->",
            BlockKind::MobileStyle => "<!-- /evergreen:mobile-style -->",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Returns whether `html` already contains an instance of `kind`. A literal
/// substring test on the begin marker; no parsing.
pub fn has_block(html: &str, kind: BlockKind) -> bool {
    html.contains(kind.begin_marker())
}

/// Derives the fingerprint for one rendered block instance. The same kind,
/// article file, and calendar day always produce the same id, which lets the
/// mutator recognize a block it already rendered today and report a no-op
/// instead of rewriting it.
pub fn instance_id(kind: BlockKind, file: &str, day: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.slug().as_bytes());
    hasher.update(b":");
    hasher.update(file.as_bytes());
    hasher.update(b":");
    hasher.update(day.format("%Y-%m-%d").to_string().as_bytes());
    hasher
        .finalize()
        .iter()
        .take(6)
        .map(|b| format!("{:02x}", b))
        .collect()
}
