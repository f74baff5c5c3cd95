//! The [`Document`] value object: one article's HTML text plus the path it
//! was loaded from. Pipeline stages take a `Document` and return a new one
//! instead of mutating a shared buffer, which keeps block operations
//! composable and lets tests exercise each stage in isolation.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct Document {
    pub path: PathBuf,
    pub html: String,
}

impl Document {
    /// Reads the whole file as UTF-8. A file that is missing on disk is
    /// reported as [`Error::Missing`] so callers can skip the article
    /// rather than treat it as a hard failure.
    pub fn load(path: &Path) -> Result<Document> {
        match fs::read_to_string(path) {
            Ok(html) => Ok(Document {
                path: path.to_owned(),
                html,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(Error::Missing {
                path: path.to_owned(),
            }),
            Err(err) => Err(Error::Read {
                path: path.to_owned(),
                err,
            }),
        }
    }

    /// Writes the current HTML back to the document's path.
    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, &self.html).map_err(|err| Error::Write {
            path: self.path.clone(),
            err,
        })
    }

    /// Copies the on-disk file (not the in-memory text) to
    /// `{stem}_{YYYYMMDD_HHMMSS}{ext}` under `backup_directory`, creating
    /// the directory as needed. Backups are append-only; nothing in the
    /// engine ever reads them back.
    pub fn backup(&self, backup_directory: &Path, at: NaiveDateTime) -> Result<PathBuf> {
        fs::create_dir_all(backup_directory).map_err(|err| Error::Backup {
            path: backup_directory.to_owned(),
            err,
        })?;
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self
            .path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let target = backup_directory.join(format!(
            "{}_{}{}",
            stem,
            at.format("%Y%m%d_%H%M%S"),
            ext
        ));
        fs::copy(&self.path, &target).map_err(|err| Error::Backup {
            path: target.clone(),
            err,
        })?;
        Ok(target)
    }

    /// Rewrites the visible publish-date text to `today`, returning the new
    /// document and whether anything changed. Documents without a date span
    /// pass through untouched.
    pub fn stamp_date(self, today: NaiveDate) -> (Document, bool) {
        // Static pattern; compilation can't fail.
        let date_span = Regex::new(
            r#"<span class="article-date"><i class="far fa-calendar-alt"></i>\s*\d{4}-\d{2}-\d{2}</span>"#,
        )
        .unwrap();
        let replacement = format!(
            r#"<span class="article-date"><i class="far fa-calendar-alt"></i> {}</span>"#,
            today.format("%Y-%m-%d")
        );
        let stamped = date_span.replace_all(&self.html, replacement.as_str());
        let changed = stamped != self.html;
        let html = stamped.into_owned();
        (Document { html, ..self }, changed)
    }

    /// The text of the document's first level-1 heading, with nested markup
    /// stripped. Absent when the document has no `h1`.
    pub fn title(&self) -> Option<String> {
        let h1 = Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap();
        let tags = Regex::new(r"<[^>]+>").unwrap();
        h1.captures(&self.html).map(|cap| {
            tags.replace_all(&cap[1], " ")
                .split_whitespace()
                .collect::<Vec<&str>>()
                .join(" ")
        })
    }

    /// A short plain-text summary taken from the first paragraph, truncated
    /// at a character boundary. Used for social-meta descriptions.
    pub fn description(&self, max_chars: usize) -> Option<String> {
        let p = Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap();
        let tags = Regex::new(r"<[^>]+>").unwrap();
        p.captures(&self.html).map(|cap| {
            let text = tags
                .replace_all(&cap[1], " ")
                .split_whitespace()
                .collect::<Vec<&str>>()
                .join(" ");
            if text.chars().count() <= max_chars {
                text
            } else {
                let mut truncated: String = text.chars().take(max_chars).collect();
                truncated.push_str("...");
                truncated
            }
        })
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for document I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned when the catalog references a file that does not exist.
    Missing { path: PathBuf },

    /// Returned for I/O problems reading a document.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems writing a document back.
    Write { path: PathBuf, err: std::io::Error },

    /// Returned when the pre-mutation backup copy fails.
    Backup { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Missing { path } => write!(f, "Document '{}' does not exist", path.display()),
            Error::Read { path, err } => {
                write!(f, "Reading document '{}': {}", path.display(), err)
            }
            Error::Write { path, err } => {
                write!(f, "Writing document '{}': {}", path.display(), err)
            }
            Error::Backup { path, err } => {
                write!(f, "Backing up to '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Missing { path: _ } => None,
            Error::Read { path: _, err } => Some(err),
            Error::Write { path: _, err } => Some(err),
            Error::Backup { path: _, err } => Some(err),
        }
    }
}
