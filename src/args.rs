use duration_string::DurationString;
use gumdrop::Options;

/// Commit pending work in every managed project and notify the operator.
#[derive(Debug, Options)]
pub struct Args {
    /// The root directory containing the managed project repositories.
    #[options(free)]
    pub directory: Option<String>,

    /// The minimum time between two notifications.
    ///
    /// Can be a number postfixed with s(econd), m(inutes), h(ours), d(ays)
    #[options(no_short, long = "cooldown", default = "1h")]
    pub cooldown: DurationString,

    /// The Telegram chat to notify (defaults to $TELEGRAM_CHAT_ID).
    #[options(no_short, long = "chat")]
    pub chat_id: Option<String>,

    /// The Telegram bot token (defaults to $TELEGRAM_BOT_TOKEN).
    #[options(no_short, long = "token")]
    pub token: Option<String>,

    /// Override the notification endpoint, mostly for self-hosted relays.
    #[options(no_short, long = "endpoint")]
    pub endpoint: Option<String>,

    /// The file holding the last-notified timestamp.
    #[options(no_short, long = "state-file")]
    pub state_file: Option<String>,

    /// The append-only log of run records.
    #[options(no_short, long = "log-file")]
    pub log_file: Option<String>,

    /// The lock file guarding against overlapping runs.
    #[options(no_short, long = "lock-file")]
    pub lock_file: Option<String>,

    /// Don't guard the run with an exclusive lock.
    #[options(no_short)]
    pub no_lock: bool,

    /// Increase verbosity, can be set multiple times (-v debug, -vv tracing)
    #[options(count)]
    pub verbose: u8,

    /// Only print errors.
    #[options()]
    pub quiet: bool,

    /// Print the current version.
    #[options(short = "V")]
    pub version: bool,

    /// Print this help.
    #[options()]
    pub help: bool,
}

pub fn parse_args() -> Args {
    Args::parse_args_default_or_exit()
}
