//! Commit pending work across managed git projects and notify the operator.
//!
//! ## How it works
//!
//! `gac` is built up from a **tracker**, the **pipeline** and a **notifier**.
//! The tracker scans a root directory of project repositories and knows which
//! of them carry uncommitted work. The pipeline runs once per invocation
//! (usually from cron or a systemd timer): it scans, commits every dirty
//! project and decides whether the operator should hear about it. The
//! notifier delivers a single best-effort message, rate limited by a
//! cooldown window that survives between invocations on disk.
//!
//! ```ignore
//! +---------+       +----------+       +----------+
//! | tracker | ----> | pipeline | ----> | notifier |
//! +---------+       +----------+       +----------+
//!                         |
//!                         +---> run log + debounce state (on disk)
//! ```
//!

/// The debounce gate and the file-backed timestamp it is evaluated against.
pub mod debounce;
/// A scoped exclusive lock that keeps overlapping invocations from racing.
pub mod lock;
/// A notifier delivers a single message about committed work
/// (e.g. [over Telegram](notify::telegram::TelegramNotifier)).
pub mod notify;
/// The append-only record of every run's observations and decisions.
pub mod runlog;
/// A tracker knows which managed projects have uncommitted work and
/// can commit it (e.g. [with git](tracker::git::GitTracker)).
pub mod tracker;

/// The single end-to-end run: scan, commit, debounced notification.
pub mod pipeline;
