use args::{parse_args, Args};
use gac_bin::{
    debounce::DebounceStore,
    lock::{LockError, RunLock},
    notify::{telegram::TelegramNotifier, Notifier, NullNotifier},
    pipeline::{run_once, PipelineError, RunOutcome},
    runlog::RunLog,
    tracker::{git::GitTracker, TrackerError},
};
use log::{info, warn};
use logger::init_logger;
use std::{
    env, fs, io,
    path::{Path, PathBuf},
    process,
};
use thiserror::Error;

mod args;
mod logger;

const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

/// A custom error implementation for the main function
#[derive(Debug, Error)]
pub enum MainError {
    #[error("You have to pass a root directory of managed projects.")]
    NoDirectory,
    #[error("Cannot get local timezone for logging.")]
    FailedLoggerTimezones,
    #[error("Cannot initialize logger: {0}.")]
    FailedLogger(#[from] log::SetLoggerError),
    #[error("Cannot prepare state files: {0}.")]
    FailedStateFiles(#[from] io::Error),
    #[error("Cannot lock the run: {0}.")]
    FailedLock(#[from] LockError),
    #[error("Tracker failed: {0}.")]
    FailedTracker(#[from] TrackerError),
    #[error("{0}")]
    FailedPipeline(#[from] PipelineError),
}

fn main() {
    let args = parse_args();

    if args.version {
        println!("gac {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Err(err) = run(args) {
        eprintln!("ERROR: {err}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), MainError> {
    init_logger(&args)?;

    let directory = args.directory.clone().ok_or(MainError::NoDirectory)?;

    let state_dir = default_state_dir();
    let state_file = resolve_path(&args.state_file, &state_dir, "last_notified")?;
    let log_file = resolve_path(&args.log_file, &state_dir, "run.log")?;
    let lock_file = resolve_path(&args.lock_file, &state_dir, "run.lock")?;

    // Hold the lock for the whole run, it releases on every exit path
    let _lock = if args.no_lock {
        None
    } else {
        Some(RunLock::acquire(&lock_file)?)
    };

    let mut tracker = GitTracker::open(&directory)?;
    let notifier = setup_notifier(&args);
    let store = DebounceStore::new(state_file);
    let mut run_log = RunLog::open(&log_file)?;

    let outcome = run_once(
        &mut tracker,
        notifier.as_ref(),
        &store,
        &mut run_log,
        args.cooldown.into(),
    )?;

    match outcome {
        RunOutcome::NoPendingChanges => info!("No pending changes."),
        RunOutcome::NothingCommitted { attempted } => {
            info!("No actual commits made in {attempted} pending project(s).")
        }
        RunOutcome::Suppressed { committed } => {
            info!("Committed {committed} project(s), notification suppressed by the cooldown.")
        }
        RunOutcome::Notified { committed } => {
            info!("Committed {committed} project(s) and notified the operator.")
        }
        RunOutcome::NotificationFailed { committed } => {
            warn!("Committed {committed} project(s), but the notification failed.")
        }
    }

    Ok(())
}

/// The notification endpoint is optional: without a chat and a token the run
/// still commits and logs, the message is simply dropped.
fn setup_notifier(args: &Args) -> Box<dyn Notifier> {
    let token = args.token.clone().or_else(|| env::var(TOKEN_ENV).ok());
    let chat_id = args.chat_id.clone().or_else(|| env::var(CHAT_ID_ENV).ok());

    match (token, chat_id) {
        (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
            match &args.endpoint {
                Some(endpoint) => Box::new(TelegramNotifier::new_with_base_url(
                    endpoint.clone(),
                    token,
                    chat_id,
                )),
                None => Box::new(TelegramNotifier::new(token, chat_id)),
            }
        }
        _ => {
            warn!("No Telegram chat configured, notifications are disabled.");
            Box::new(NullNotifier)
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gac")
}

fn resolve_path(
    overridden: &Option<String>,
    state_dir: &Path,
    filename: &str,
) -> Result<PathBuf, io::Error> {
    let path = match overridden {
        Some(path) => PathBuf::from(path),
        None => state_dir.join(filename),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    Ok(path)
}
