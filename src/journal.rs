//! The append-only update journal: one timestamped line per notable event
//! (skip, refresh, duplicate found, error). Lines also mirror through the
//! `log` facade so `RUST_LOG` controls console verbosity. The journal is
//! write-only from the engine's perspective; nothing ever parses it back.

use chrono::Local;
use log::{info, warn};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct Journal {
    path: Option<PathBuf>,
}

impl Journal {
    /// A journal appending to `path`. The file is opened per record, so a
    /// single failed write never poisons the rest of the pass.
    pub fn open(path: &Path) -> Journal {
        Journal {
            path: Some(path.to_owned()),
        }
    }

    /// A journal that only mirrors to the `log` facade. Used by tests.
    pub fn disabled() -> Journal {
        Journal { path: None }
    }

    /// Appends one timestamped line. Journal failures are reported on the
    /// log facade and otherwise swallowed; losing a log line must never
    /// fail a refresh.
    pub fn record(&self, message: &str) {
        info!("{}", message);
        let path = match &self.path {
            None => return,
            Some(path) => path,
        };
        let line = format!(
            "[{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(err) = result {
            warn!("journal write to '{}' failed: {}", path.display(), err);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_appends_timestamped_lines() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("update_log.txt");
        let journal = Journal::open(&path);
        journal.record("first");
        journal.record("second");

        let contents = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] first"));
        assert!(lines[1].ends_with("] second"));
        Ok(())
    }

    #[test]
    fn test_disabled_journal_writes_nothing() {
        // must not panic or create files
        Journal::disabled().record("ignored");
    }
}
