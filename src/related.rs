//! Ranks the rest of the catalog against one article by keyword overlap.
//! Candidates missing a cached keyword set get one computed from their
//! document on the spot and written back into the catalog: matching
//! deliberately warms the cache as a side effect, so a full pass only ever
//! extracts each document's keywords once.

use crate::audit;
use crate::catalog::Catalog;
use crate::document::Document;
use crate::keywords;
use std::path::Path;

/// One selected related article: the link target, its display title, and
/// the size of the keyword intersection that ranked it.
#[derive(Clone, Debug)]
pub struct Related {
    pub file: String,
    pub title: String,
    pub shared: usize,
}

/// Selects up to `limit` articles related to `catalog.articles[source]`,
/// ordered by descending keyword overlap. Zero-overlap candidates never
/// appear; ties keep catalog order. The source article is never returned.
pub fn find_related(
    source: usize,
    catalog: &mut Catalog,
    articles_directory: &Path,
    limit: usize,
) -> Vec<Related> {
    // Warm missing keyword caches. Keywords are extracted from a copy with
    // all marked spans stripped, so one article's generated blocks can't
    // leak into another's ranking. Unreadable candidates keep an empty set
    // and simply never match.
    for article in catalog.articles.iter_mut() {
        if !article.keywords.is_empty() {
            continue;
        }
        if let Ok(doc) = Document::load(&articles_directory.join(&article.file)) {
            article.keywords = keywords::extract(&audit::repair_all(&doc.html));
        }
    }

    let source_keywords = catalog.articles[source].keywords.clone();
    let mut ranked: Vec<(usize, usize)> = Vec::new();
    for (index, other) in catalog.articles.iter().enumerate() {
        if index == source {
            continue;
        }
        let shared = other.keywords.intersection(&source_keywords).count();
        if shared > 0 {
            ranked.push((index, shared));
        }
    }
    // stable sort: catalog-order ties are preserved, never re-sorted
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .map(|(index, shared)| {
            let article = &catalog.articles[index];
            let title = Document::load(&articles_directory.join(&article.file))
                .ok()
                .and_then(|doc| doc.title())
                .unwrap_or_else(|| humanize(&article.file));
            Related {
                file: article.file.clone(),
                title,
                shared,
            }
        })
        .collect()
}

// Fallback display title from a file name: "seo-guide.html" -> "seo guide".
fn humanize(file: &str) -> String {
    file.trim_end_matches(".html").replace('-', " ").replace('_', " ")
}
