// src/progress.rs

use chrono::{DateTime, Local, TimeZone};
use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::error::{error_chain, EtlError, Result};

const TIMESTAMP_FORMAT: &str = "%d-%B-%Y-%H:%M:%S";

/// Append-only run log: one `<timestamp> : <message>` entry per event,
/// each followed by a blank line.
pub struct ProgressLog {
    path: PathBuf,
    file: File,
}

impl ProgressLog {
    /// Open (creating if needed) the log for appending. An unwritable
    /// destination is a configuration error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                EtlError::Config(format!(
                    "log file {} is not writable: {}",
                    path.display(),
                    error_chain(&e)
                ))
            })?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `message`. Write failures are reported but never abort the run.
    pub fn log(&self, message: &str) {
        info!(target: "progress", "{}", message);
        let entry = format_entry(&Local::now(), message);
        if let Err(e) = (&self.file).write_all(entry.as_bytes()) {
            warn!(path = %self.path.display(), error = %e, "failed to append progress log");
        }
    }
}

fn format_entry<Tz: TimeZone>(at: &DateTime<Tz>, message: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{} : {}\n\n", at.format(TIMESTAMP_FORMAT), message)
}
