use mockall::automock;
use std::fmt;
use thiserror::Error;

/// A tracker that scans and commits local git repositories.
pub mod git;

/// A custom error for describing the error cases for trackers
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The root of the managed projects doesn't exist or is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(String),
    /// The root of the managed projects cannot be listed.
    #[error("cannot list projects under {0}: {1}")]
    UnreadableRoot(String, String),
    /// Scanning one of the managed projects failed. This aborts the run,
    /// because the pending knowledge would be incomplete.
    #[error("cannot scan {0}: {1}")]
    FailedScan(String, String),
}

/// The result of one commit attempt during [Tracker::commit_all].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitStatus {
    /// A commit was created in the project.
    Committed,
    /// The project had nothing left to commit (e.g. it raced clean).
    NoOp,
    /// The commit attempt failed, the detail explains why.
    Failed,
}

impl fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitStatus::Committed => write!(f, "committed"),
            CommitStatus::NoOp => write!(f, "no-op"),
            CommitStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One record per project attempted during a commit phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The name of the managed project.
    pub project: String,
    /// Whether the attempt produced a commit.
    pub status: CommitStatus,
    /// An explanation for failed attempts.
    pub detail: Option<String>,
}

impl CommitOutcome {
    pub fn committed(project: &str) -> Self {
        CommitOutcome {
            project: String::from(project),
            status: CommitStatus::Committed,
            detail: None,
        }
    }

    pub fn no_op(project: &str) -> Self {
        CommitOutcome {
            project: String::from(project),
            status: CommitStatus::NoOp,
            detail: None,
        }
    }

    pub fn failed(project: &str, detail: String) -> Self {
        CommitOutcome {
            project: String::from(project),
            status: CommitStatus::Failed,
            detail: Some(detail),
        }
    }
}

/// A tracker knows which managed projects have uncommitted work
/// and can commit it.
///
/// Trackers may include:
///   - scan and commit with git ([git::GitTracker])
///   - etc.
#[automock]
pub trait Tracker {
    /// Refresh the knowledge of which managed projects have uncommitted
    /// work. Idempotent and safe to call repeatedly, it never commits.
    fn scan(&mut self) -> Result<(), TrackerError>;

    /// The number of projects with uncommitted work as of the last scan.
    /// It never rescans, staleness is the caller's responsibility.
    fn pending_count(&self) -> usize;

    /// Attempt to commit every project that was pending at the last scan,
    /// one at a time and in scan order. A single failing project never
    /// aborts the batch, it is recorded as failed and the batch continues.
    fn commit_all(&mut self) -> Vec<CommitOutcome>;
}
