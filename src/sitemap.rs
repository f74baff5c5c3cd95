//! Rewrites every `<lastmod>` date in the sitemap to today. Whole-file text
//! substitution, same as the rest of the engine; a missing sitemap is a
//! logged skip, not a failure.

use crate::journal::Journal;
use chrono::NaiveDate;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Returns whether the sitemap was rewritten.
pub fn update_lastmod(path: &Path, today: NaiveDate, journal: &Journal) -> Result<bool> {
    if !path.exists() {
        journal.record(&format!("sitemap not found: {}", path.display()));
        return Ok(false);
    }
    let content = fs::read_to_string(path).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })?;

    // Static pattern; compilation can't fail.
    let lastmod = Regex::new(r"<lastmod>\d{4}-\d{2}-\d{2}</lastmod>").unwrap();
    let replacement = format!("<lastmod>{}</lastmod>", today.format("%Y-%m-%d"));
    let updated = lastmod.replace_all(&content, replacement.as_str());

    if updated == content {
        return Ok(false);
    }
    fs::write(path, updated.as_ref()).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })?;
    journal.record(&format!(
        "sitemap lastmod dates set to {}",
        today.format("%Y-%m-%d")
    ));
    Ok(true)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for sitemap rewriting.
#[derive(Debug)]
pub enum Error {
    Io { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => write!(f, "Sitemap '{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
        }
    }
}
