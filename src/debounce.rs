use log::warn;
use std::{fs, io, path::PathBuf, time::Duration};

/// Decide whether a notification should be suppressed.
///
/// The decision is pure: the caller reads the wall clock once and passes it
/// in, so a single run always compares against a consistent `now`. A missing
/// last-notified timestamp means a notification was never sent, which always
/// allows the first one.
pub fn is_gated(last_notified_at: Option<i64>, now: i64, cooldown: Duration) -> bool {
    match last_notified_at {
        None => false,
        Some(last) => now - last < cooldown.as_secs() as i64,
    }
}

/// The single last-notified timestamp, persisted as a plain text file.
///
/// The store survives between invocations and is the only thing that makes
/// the debounce work across otherwise stateless runs. It is written once per
/// run at most, and only after a notification was actually delivered.
pub struct DebounceStore {
    path: PathBuf,
}

impl DebounceStore {
    pub fn new(path: PathBuf) -> Self {
        DebounceStore { path }
    }

    /// Read the last-notified Unix timestamp. A missing or unreadable file
    /// means "never notified": the worst case is one extra notification,
    /// which beats never notifying again.
    pub fn read(&self) -> Option<i64> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("Cannot read debounce state {}: {err}.", self.path.display());
                return None;
            }
        };

        match content.trim().parse() {
            Ok(timestamp) => Some(timestamp),
            Err(_) => {
                warn!("Corrupt debounce state {}, treating as never notified.", self.path.display());
                None
            }
        }
    }

    /// Overwrite the last-notified Unix timestamp.
    pub fn write(&self, timestamp: i64) -> io::Result<()> {
        fs::write(&self.path, format!("{timestamp}\n"))
    }
}
