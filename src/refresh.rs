//! Drives one full refresh pass over the article catalog: schedule check,
//! duplicate audit, backup, date stamp, block refreshes, related-link
//! refresh, and catalog persistence. Articles are processed one at a time in
//! catalog order; no failure on one article is allowed to stop the batch.

use crate::audit;
use crate::blocks::{self, BlockKind};
use crate::catalog::{self, Catalog, CatalogStore, Category};
use crate::config::Config;
use crate::document::{self, Document};
use crate::journal::Journal;
use crate::keywords;
use crate::mutate;
use crate::related;
use crate::render::{self, FactSource};
use crate::schedule;
use crate::stylesheet;
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use std::fmt;

/// Totals for one pass over the catalog.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Articles whose content changed and whose refresh date was advanced.
    pub refreshed: usize,

    /// Articles not yet due.
    pub skipped: usize,

    /// Articles abandoned mid-processing (missing document, failed backup).
    pub failed: usize,
}

/// Runs one refresh pass. The catalog is loaded up front, threaded through
/// every stage, and written back exactly once at the end, even when no
/// article changed. If that final write fails after documents were already
/// mutated, a best-effort sweep strips every marked span so no document is
/// left carrying a dangling pair, and the error is surfaced.
pub fn run(
    config: &Config,
    store: &dyn CatalogStore,
    facts: &mut dyn FactSource,
    journal: &Journal,
    now: NaiveDateTime,
) -> Result<Summary> {
    let mut catalog = store.load()?;
    let summary = process_all(config, &mut catalog, facts, journal, now);
    if let Err(e) = store.save(&catalog) {
        journal.record(&format!("catalog save failed: {}", e));
        sweep(config, &catalog, journal);
        return Err(Error::Catalog(e));
    }
    Ok(summary)
}

fn process_all(
    config: &Config,
    catalog: &mut Catalog,
    facts: &mut dyn FactSource,
    journal: &Journal,
    now: NaiveDateTime,
) -> Summary {
    let today = now.date();
    let mut summary = Summary::default();
    let mut touched: Vec<usize> = Vec::new();

    for index in 0..catalog.articles.len() {
        let file = catalog.articles[index].file.clone();
        if !schedule::is_due(&catalog.articles[index], today) {
            journal.record(&format!("not due: {}", file));
            summary.skipped += 1;
            continue;
        }
        journal.record(&format!("due: {}", file));
        match process_article(config, catalog, index, facts, journal, now) {
            Ok(true) => {
                catalog.articles[index].last_updated = Some(today);
                summary.refreshed += 1;
                touched.push(index);
                journal.record(&format!("updated: {}", file));
            }
            Ok(false) => touched.push(index),
            Err(e) => {
                journal.record(&format!("skipping {}: {}", file, e));
                summary.failed += 1;
            }
        }
    }

    // Safety net: a duplicate that survives a full refresh means something
    // upstream mis-matched; report it for manual inspection rather than
    // retrying.
    for &index in &touched {
        let file = &catalog.articles[index].file;
        let path = config.articles_directory.join(file);
        if let Ok(doc) = Document::load(&path) {
            let duplicated = audit::scan(&doc.html);
            if !duplicated.is_empty() {
                warn!("{} still duplicated after refresh: {}", file, kinds(&duplicated));
                journal.record(&format!(
                    "{} still has duplicate {} markers after refresh",
                    file,
                    kinds(&duplicated)
                ));
            }
        }
    }

    summary
}

// One article, in stage order. The `Ok(bool)` says whether any bytes
// changed; only then does the caller advance `last_updated`.
fn process_article(
    config: &Config,
    catalog: &mut Catalog,
    index: usize,
    facts: &mut dyn FactSource,
    journal: &Journal,
    now: NaiveDateTime,
) -> std::result::Result<bool, document::Error> {
    let today = now.date();
    let file = catalog.articles[index].file.clone();
    let category = catalog.articles[index].category;
    let path = config.articles_directory.join(&file);

    let mut doc = Document::load(&path)?;

    // duplicate markers mean an interrupted earlier pass; strip everything
    // and let this pass regenerate it
    let duplicated = audit::scan(&doc.html);
    let healed = !duplicated.is_empty();
    if healed {
        journal.record(&format!(
            "duplicate {} markers in {}; repairing",
            kinds(&duplicated),
            file
        ));
        doc.html = audit::repair_all(&doc.html);
    }

    // no safe mutation without a backup of the on-disk file
    let backup = doc.backup(&config.backup_directory, now)?;
    debug!("backed up {} to {}", file, backup.display());

    let (stamped, date_changed) = doc.stamp_date(today);
    let mut doc = stamped;
    let mut changed = healed || date_changed;

    // derived from author content, so capture before new blocks go in
    let title = doc
        .title()
        .unwrap_or_else(|| file.trim_end_matches(".html").replace('-', " "));
    let description = doc.description(160).unwrap_or_else(|| title.clone());
    if catalog.articles[index].keywords.is_empty() {
        catalog.articles[index].keywords = keywords::extract(&audit::repair_all(&doc.html));
    }

    let (next, latest_changed) = apply(
        &doc.html,
        BlockKind::LatestUpdate,
        &file,
        today,
        || render::latest_update(&title, today, &mut *facts),
        mutate::after_title,
        journal,
    );
    doc.html = next;
    let mut body_changed = latest_changed;

    if category == Category::Data {
        let article_keywords = catalog.articles[index].keywords.clone();
        let (next, insight_changed) = apply(
            &doc.html,
            BlockKind::Insight,
            &file,
            today,
            || render::insight(&title, &article_keywords, today, &mut *facts),
            mutate::before_conclusion,
            journal,
        );
        doc.html = next;
        body_changed = body_changed || insight_changed;
    }
    changed = changed || body_changed;

    let links = related::find_related(
        index,
        catalog,
        &config.articles_directory,
        config.related_limit,
    );
    if links.is_empty() {
        debug!("no related articles for {}", file);
    } else {
        let (next, links_changed) = apply(
            &doc.html,
            BlockKind::RelatedArticles,
            &file,
            today,
            || render::related_articles(&links),
            mutate::before_footer,
            journal,
        );
        doc.html = next;
        changed = changed || links_changed;
    }

    match config.site_root.join(&format!("articles/{}", file)) {
        Err(e) => journal.record(&format!("bad page url for {}: {}", file, e)),
        Ok(page_url) => {
            let (next, schema_changed) = apply(
                &doc.html,
                BlockKind::SchemaMarkup,
                &file,
                today,
                || render::schema_markup(&title, &page_url, today),
                mutate::in_head,
                journal,
            );
            doc.html = next;
            changed = changed || schema_changed;

            let (next, social_changed) = apply(
                &doc.html,
                BlockKind::SocialMeta,
                &file,
                today,
                || render::social_meta(&title, &description, &page_url),
                mutate::in_head,
                journal,
            );
            doc.html = next;
            changed = changed || social_changed;
        }
    }

    // created once; simple presence check, never a marker-pair refresh
    if !blocks::has_block(&doc.html, BlockKind::MobileStyle) {
        let (next, style_changed) = apply(
            &doc.html,
            BlockKind::MobileStyle,
            &file,
            today,
            render::mobile_style,
            mutate::in_head,
            journal,
        );
        doc.html = next;
        changed = changed || style_changed;
    }

    let (next, link_changed) = stylesheet::ensure_link(&doc.html);
    if link_changed {
        journal.record(&format!("linked update stylesheet in {}", file));
    }
    doc.html = next;
    changed = changed || link_changed;

    if changed {
        doc.save()?;
    }
    Ok(changed)
}

// Refreshes one block, translating the soft anchor failure into a journal
// line and an unchanged document.
fn apply<R>(
    html: &str,
    kind: BlockKind,
    file: &str,
    today: NaiveDate,
    render: R,
    anchor: fn(&str) -> Option<usize>,
    journal: &Journal,
) -> (String, bool)
where
    R: FnOnce() -> String,
{
    let id = blocks::instance_id(kind, file, today);
    match mutate::refresh(html, kind, &id, render, anchor) {
        Ok(refreshed) => {
            if refreshed.changed {
                journal.record(&format!("refreshed {} block in {}", kind, file));
            }
            (refreshed.html, refreshed.changed)
        }
        Err(e) => {
            journal.record(&format!("skipped {} block in {}: {}", kind, file, e));
            (html.to_owned(), false)
        }
    }
}

// Last-resort cleanup when a pass fails after documents may already have
// been mutated: strip all marked spans everywhere so no document keeps a
// dangling pair. The next healthy pass regenerates everything.
fn sweep(config: &Config, catalog: &Catalog, journal: &Journal) {
    for article in &catalog.articles {
        let path = config.articles_directory.join(&article.file);
        let doc = match Document::load(&path) {
            Ok(doc) => doc,
            Err(_) => continue,
        };
        let repaired = audit::repair_all(&doc.html);
        if repaired != doc.html {
            let doc = Document {
                html: repaired,
                ..doc
            };
            if doc.save().is_ok() {
                journal.record(&format!("stripped auto-content from {}", article.file));
            }
        }
    }
}

fn kinds(duplicated: &[BlockKind]) -> String {
    duplicated
        .iter()
        .map(|kind| kind.slug())
        .collect::<Vec<&str>>()
        .join(", ")
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for a refresh pass. Per-article problems never surface
/// here; only catalog persistence can fail the pass as a whole.
#[derive(Debug)]
pub enum Error {
    Catalog(catalog::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Catalog(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Catalog(err) => Some(err),
        }
    }
}

impl From<catalog::Error> for Error {
    /// Converts [`catalog::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: catalog::Error) -> Error {
        Error::Catalog(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::{Article, JsonCatalogStore};
    use crate::render::FixedFacts;
    use std::collections::BTreeSet;
    use std::fs;
    use std::path::Path;
    use url::Url;

    const ARTICLE: &str = "<html><head><title>t</title></head><body>\n\
        <h1>Search Ranking Guide</h1>\n\
        <span class=\"article-date\"><i class=\"far fa-calendar-alt\"></i> 2024-01-10</span>\n\
        <p>Fast pages keep visitors engaged and protect search positions.</p>\n\
        <h2>Response Time</h2>\n\
        <p>Shaving latency pays for itself in retention terms.</p>\n\
        <h2>Conclusion</h2>\n\
        <p>Keep measuring.</p>\n\
        <div class=\"article-footer\"></div>\n\
        </body></html>";

    fn test_config(root: &Path) -> Config {
        Config {
            site_root: Url::parse("https://example.com/").unwrap(),
            articles_directory: root.join("articles"),
            backup_directory: root.join("backups"),
            catalog_path: root.join("catalog.json"),
            log_path: root.join("update_log.txt"),
            sitemap_path: root.join("sitemap.xml"),
            related_limit: 3,
        }
    }

    fn entry(file: &str, category: Category, cadence: u32) -> Article {
        Article {
            file: file.to_owned(),
            update_frequency: cadence,
            category,
            last_updated: None,
            keywords: BTreeSet::new(),
        }
    }

    fn facts() -> FixedFacts {
        FixedFacts(vec!["traffic is up".to_owned()])
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn setup(root: &Path, articles: Vec<Article>) -> (Config, JsonCatalogStore) {
        let config = test_config(root);
        fs::create_dir_all(&config.articles_directory).unwrap();
        for article in &articles {
            fs::write(config.articles_directory.join(&article.file), ARTICLE).unwrap();
        }
        let store = JsonCatalogStore::new(
            config.catalog_path.clone(),
            config.articles_directory.clone(),
        );
        store.save(&Catalog { articles }).unwrap();
        (config, store)
    }

    fn marker_counts(html: &str, kind: BlockKind) -> (usize, usize) {
        (
            html.matches(kind.begin_marker()).count(),
            html.matches(kind.end_marker()).count(),
        )
    }

    #[test]
    fn test_first_pass_on_data_article() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (config, store) = setup(dir.path(), vec![entry("a.html", Category::Data, 1)]);

        let summary = run(&config, &store, &mut facts(), &Journal::disabled(), now())?;
        assert_eq!(summary.refreshed, 1);
        assert_eq!(summary.failed, 0);

        let html = fs::read_to_string(config.articles_directory.join("a.html"))?;
        assert_eq!(marker_counts(&html, BlockKind::LatestUpdate), (1, 1));
        assert_eq!(marker_counts(&html, BlockKind::Insight), (1, 1));
        assert!(html.contains("2026-08-05"));
        assert!(html.contains("traffic is up"));

        let catalog = store.load()?;
        assert_eq!(
            catalog.articles[0].last_updated,
            NaiveDate::from_ymd_opt(2026, 8, 5)
        );
        assert!(!catalog.articles[0].keywords.is_empty());
        Ok(())
    }

    #[test]
    fn test_core_article_gets_no_insight() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (config, store) = setup(dir.path(), vec![entry("a.html", Category::Core, 1)]);

        run(&config, &store, &mut facts(), &Journal::disabled(), now())?;
        let html = fs::read_to_string(config.articles_directory.join("a.html"))?;
        assert_eq!(marker_counts(&html, BlockKind::LatestUpdate), (1, 1));
        assert_eq!(marker_counts(&html, BlockKind::Insight), (0, 0));
        Ok(())
    }

    #[test]
    fn test_idempotent_when_no_time_elapsed() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (config, store) = setup(
            dir.path(),
            vec![
                entry("core.html", Category::Core, 1),
                entry("data.html", Category::Data, 1),
            ],
        );

        run(&config, &store, &mut facts(), &Journal::disabled(), now())?;
        // force a second same-day pass by clearing the refresh dates
        let mut catalog = store.load()?;
        for article in catalog.articles.iter_mut() {
            article.last_updated = None;
        }
        store.save(&catalog)?;
        run(&config, &store, &mut facts(), &Journal::disabled(), now())?;

        for file in &["core.html", "data.html"] {
            let html = fs::read_to_string(config.articles_directory.join(file))?;
            for kind in BlockKind::ALL.iter().copied() {
                let (begin, end) = marker_counts(&html, kind);
                assert_eq!(begin, end, "{} in {}", kind, file);
                assert!(begin <= 1, "{} duplicated in {}", kind, file);
            }
            assert_eq!(marker_counts(&html, BlockKind::LatestUpdate), (1, 1));
        }
        Ok(())
    }

    #[test]
    fn test_not_due_article_untouched() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut article = entry("a.html", Category::Data, 1);
        article.last_updated = NaiveDate::from_ymd_opt(2026, 8, 5);
        let (config, store) = setup(dir.path(), vec![article]);

        let summary = run(&config, &store, &mut facts(), &Journal::disabled(), now())?;
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.refreshed, 0);
        assert_eq!(
            fs::read_to_string(config.articles_directory.join("a.html"))?,
            ARTICLE
        );
        Ok(())
    }

    #[test]
    fn test_missing_document_does_not_stop_the_batch() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (config, store) = setup(dir.path(), vec![entry("a.html", Category::Data, 1)]);
        let mut catalog = store.load()?;
        catalog
            .articles
            .insert(0, entry("gone.html", Category::Data, 1));
        store.save(&catalog)?;

        let summary = run(&config, &store, &mut facts(), &Journal::disabled(), now())?;
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.refreshed, 1);
        Ok(())
    }

    #[test]
    fn test_duplicates_self_heal_during_pass() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (config, store) = setup(dir.path(), vec![entry("a.html", Category::Core, 1)]);

        // corrupt the document with two latest-update pairs
        let kind = BlockKind::LatestUpdate;
        let corrupted = ARTICLE.replace(
            "</h1>",
            &format!(
                "</h1>\n{b}\nold one\n{e}\n{b}\nold two\n{e}\n",
                b = kind.begin_marker(),
                e = kind.end_marker()
            ),
        );
        fs::write(config.articles_directory.join("a.html"), &corrupted)?;
        assert_eq!(audit::scan(&corrupted), vec![kind]);

        run(&config, &store, &mut facts(), &Journal::disabled(), now())?;
        let html = fs::read_to_string(config.articles_directory.join("a.html"))?;
        assert_eq!(marker_counts(&html, kind), (1, 1));
        assert!(!html.contains("old one"));
        assert!(!html.contains("old two"));
        Ok(())
    }

    #[test]
    fn test_backup_written_before_mutation() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (config, store) = setup(dir.path(), vec![entry("a.html", Category::Data, 1)]);

        run(&config, &store, &mut facts(), &Journal::disabled(), now())?;
        let backups: Vec<_> = fs::read_dir(&config.backup_directory)?
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(backups, vec!["a_20260805_100000.html"]);
        // the backup holds the pre-mutation bytes
        assert_eq!(
            fs::read_to_string(config.backup_directory.join(&backups[0]))?,
            ARTICLE
        );
        Ok(())
    }

    #[test]
    fn test_related_links_between_overlapping_articles() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (config, store) = setup(
            dir.path(),
            vec![
                entry("a.html", Category::Data, 1),
                entry("b.html", Category::Data, 1),
            ],
        );

        run(&config, &store, &mut facts(), &Journal::disabled(), now())?;
        let html = fs::read_to_string(config.articles_directory.join("a.html"))?;
        assert_eq!(marker_counts(&html, BlockKind::RelatedArticles), (1, 1));
        assert!(html.contains("href=\"b.html\""));
        assert!(!html.contains("href=\"a.html\""));
        Ok(())
    }

    #[test]
    fn test_mobile_style_created_once() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let (config, store) = setup(dir.path(), vec![entry("a.html", Category::Core, 1)]);

        run(&config, &store, &mut facts(), &Journal::disabled(), now())?;
        let first = fs::read_to_string(config.articles_directory.join("a.html"))?;
        assert_eq!(marker_counts(&first, BlockKind::MobileStyle), (1, 1));

        // next-day pass leaves the style block alone
        let mut catalog = store.load()?;
        catalog.articles[0].last_updated = None;
        store.save(&catalog)?;
        let later = NaiveDate::from_ymd_opt(2026, 8, 7)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        run(&config, &store, &mut facts(), &Journal::disabled(), later)?;
        let second = fs::read_to_string(config.articles_directory.join("a.html"))?;
        assert_eq!(marker_counts(&second, BlockKind::MobileStyle), (1, 1));
        let before = first.find(BlockKind::MobileStyle.begin_marker());
        let after = second.find(BlockKind::MobileStyle.begin_marker());
        assert!(before.is_some() && after.is_some());
        Ok(())
    }
}
