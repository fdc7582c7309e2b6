// Calendurr: Persisted Date
//
// The last sent date lives in a tiny text file, "<month>,<day>".  It is read
// once at boot and replaced (delete, then write) after every successful send.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};

use crate::calendar::Date;

pub struct DateFile {
    path: PathBuf,
}

impl DateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<Date> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        Date::parse(&text).ok_or_else(|| anyhow!("malformed date {:?} in {}", text, self.path.display()))
    }

    /// Stored date, or 1 January if the file is missing or unreadable.
    pub fn load_or_default(&self) -> Date {
        match self.load() {
            Ok(date) => {
                log::info!("restored date {} from {}", date, self.path.display());
                date
            }
            Err(e) => {
                log::warn!("no stored date ({:#}), starting at {}", e, Date::DEFAULT);
                Date::DEFAULT
            }
        }
    }

    pub fn save(&self, date: Date) -> anyhow::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| format!("removing {}", self.path.display()))?;
        }
        fs::write(&self.path, date.to_string()).with_context(|| format!("writing {}", self.path.display()))?;
        log::debug!("saved date {} to {}", date, self.path.display());
        Ok(())
    }
}
