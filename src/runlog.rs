use log::error;
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::Path,
};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

const TIMESTAMP_FORMAT: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// The append-only record of every run's observations and decisions.
///
/// One timestamped line per event, plain text, meant for the operator to
/// read after the fact. It is never read back by the pipeline itself, so a
/// write failure only degrades diagnosis and never aborts a run.
pub struct RunLog {
    file: File,
}

impl RunLog {
    /// Open the run log for appending, creating it if it doesn't exist yet.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(RunLog { file })
    }

    /// Append one timestamped line. Best-effort: failures are logged
    /// and swallowed.
    pub fn append(&mut self, line: &str) {
        if let Err(err) = self.try_append(line) {
            error!("Cannot write run log: {err}.");
        }
    }

    fn try_append(&mut self, line: &str) -> io::Result<()> {
        let timestamp = OffsetDateTime::now_utc()
            .format(TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string());

        writeln!(self.file, "{timestamp} {line}")?;
        self.file.flush()
    }
}
