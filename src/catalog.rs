//! The persisted article catalog: which documents the engine manages, how
//! often each one may be refreshed, and the per-article state that survives
//! between passes (last refresh date, cached keywords). The whole catalog is
//! loaded at the start of a pass, mutated in memory, and written back once
//! at the end.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Policy tier for an article. `Core` articles only ever receive the
/// latest-update box and are refreshed less eagerly; `Data` articles
/// additionally get in-body insight insertions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Core,
    Data,
}

impl Default for Category {
    fn default() -> Self {
        Category::Core
    }
}

/// One managed document, keyed by its file name under the articles
/// directory.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Article {
    pub file: String,

    /// Minimum interval between refreshes, in whole days. Always positive;
    /// validated on load.
    pub update_frequency: u32,

    #[serde(rename = "type", default)]
    pub category: Category,

    /// Absent until the first refresh. On the wire this is an ISO date
    /// string, with the empty string standing in for "never".
    #[serde(default, with = "wire_date")]
    pub last_updated: Option<chrono::NaiveDate>,

    /// Lazily populated keyword cache. Set semantics: no duplicates, order
    /// irrelevant.
    #[serde(default)]
    pub keywords: BTreeSet<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub articles: Vec<Article>,
}

impl Catalog {
    /// Synthesizes a catalog by scanning the articles directory: one entry
    /// per `*.html` file, weekly cadence, `core` category. Used when no
    /// catalog file exists yet.
    pub fn bootstrap(articles_directory: &Path) -> Result<Catalog> {
        let mut articles = Vec::new();
        for result in WalkDir::new(articles_directory).min_depth(1).max_depth(1) {
            let entry = result?;
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_file() && name.ends_with(".html") {
                articles.push(Article {
                    file: name.into_owned(),
                    update_frequency: 7,
                    category: Category::Core,
                    last_updated: None,
                    keywords: BTreeSet::new(),
                });
            }
        }
        articles.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(Catalog { articles })
    }

    fn validate(self) -> Result<Catalog> {
        for article in &self.articles {
            if article.update_frequency == 0 {
                return Err(Error::InvalidCadence {
                    file: article.file.clone(),
                });
            }
        }
        Ok(self)
    }
}

/// Where catalogs come from and go to. The orchestrator only ever talks to
/// this trait, so tests and other front ends can substitute their own
/// persistence.
pub trait CatalogStore {
    fn load(&self) -> Result<Catalog>;
    fn save(&self, catalog: &Catalog) -> Result<()>;
}

/// The production store: a single pretty-printed JSON file. When the file
/// does not exist, a default catalog is bootstrapped from the articles
/// directory and written out immediately, so the next run starts from a
/// stable on-disk state.
pub struct JsonCatalogStore {
    path: PathBuf,
    articles_directory: PathBuf,
}

impl JsonCatalogStore {
    pub fn new(path: PathBuf, articles_directory: PathBuf) -> JsonCatalogStore {
        JsonCatalogStore {
            path,
            articles_directory,
        }
    }
}

impl CatalogStore for JsonCatalogStore {
    fn load(&self) -> Result<Catalog> {
        if !self.path.exists() {
            let catalog = Catalog::bootstrap(&self.articles_directory)?;
            self.save(&catalog)?;
            return Ok(catalog);
        }
        let file = File::open(&self.path).map_err(|err| Error::Io {
            path: self.path.clone(),
            err,
        })?;
        let catalog: Catalog = serde_json::from_reader(file)?;
        catalog.validate()
    }

    fn save(&self, catalog: &Catalog) -> Result<()> {
        let file = File::create(&self.path).map_err(|err| Error::Io {
            path: self.path.clone(),
            err,
        })?;
        serde_json::to_writer_pretty(file, catalog)?;
        Ok(())
    }
}

// ISO date <-> optional date, with "" meaning absent. The empty-string
// convention is the catalog's wire format and must round-trip.
mod wire_date {
    use chrono::NaiveDate;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveDate::parse_from_str(&raw, FORMAT)
            .map(Some)
            .map_err(|e| D::Error::custom(format!("date `{}`: {}", raw, e)))
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for loading and saving catalogs.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems reading or writing the catalog file.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when the catalog file is not valid JSON or not a catalog.
    Json(serde_json::Error),

    /// Returned when an article declares a zero-day cadence.
    InvalidCadence { file: String },

    /// Returned for problems scanning the articles directory during
    /// bootstrap.
    Scan(walkdir::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => {
                write!(f, "Catalog file '{}': {}", path.display(), err)
            }
            Error::Json(err) => write!(f, "Parsing catalog: {}", err),
            Error::InvalidCadence { file } => {
                write!(f, "Article '{}' has update_frequency 0", file)
            }
            Error::Scan(err) => write!(f, "Scanning articles directory: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            Error::Json(err) => Some(err),
            Error::InvalidCadence { file: _ } => None,
            Error::Scan(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for Error {
    /// Converts [`serde_json::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: serde_json::Error) -> Error {
        Error::Json(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts [`walkdir::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: walkdir::Error) -> Error {
        Error::Scan(err)
    }
}
