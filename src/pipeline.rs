use crate::{
    debounce::{is_gated, DebounceStore},
    notify::Notifier,
    runlog::RunLog,
    tracker::{CommitStatus, Tracker, TrackerError},
};
use log::{debug, error, info, warn};
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;

/// A custom error implementation for the run_once function
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The scan failed, so the pending knowledge is unusable. This is the
    /// only failure that aborts a run, and it aborts before any mutation.
    #[error("Scan failed: {0}.")]
    FailedScan(#[from] TrackerError),
}

/// How a run terminated. Every variant except a scan failure is a success
/// from the scheduler's point of view.
#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// No project had uncommitted work, nothing was attempted.
    NoPendingChanges,
    /// Projects were pending but every attempt was a no-op or failed.
    NothingCommitted { attempted: usize },
    /// Work was committed, but a recent notification suppressed this one.
    Suppressed { committed: usize },
    /// Work was committed and the operator was notified.
    Notified { committed: usize },
    /// Work was committed, but the notification could not be delivered.
    /// The cooldown is not armed, so the next eligible run tries again.
    NotificationFailed { committed: usize },
}

/// One end-to-end run: scan, commit everything pending, then notify the
/// operator unless a recent notification is still within the cooldown.
pub fn run_once(
    tracker: &mut dyn Tracker,
    notifier: &dyn Notifier,
    store: &DebounceStore,
    run_log: &mut RunLog,
    cooldown: Duration,
) -> Result<RunOutcome, PipelineError> {
    tracker.scan()?;

    let pending = tracker.pending_count();
    if pending == 0 {
        debug!("There are no pending changes.");
        run_log.append("no pending changes");
        return Ok(RunOutcome::NoPendingChanges);
    }
    info!("There are pending changes in {pending} project(s), committing.");
    run_log.append(&format!("pending changes in {pending} project(s)"));

    let outcomes = tracker.commit_all();
    for outcome in &outcomes {
        match &outcome.detail {
            Some(detail) => run_log.append(&format!("{}: {} ({detail})", outcome.project, outcome.status)),
            None => run_log.append(&format!("{}: {}", outcome.project, outcome.status)),
        }
    }

    let committed = outcomes
        .iter()
        .filter(|outcome| outcome.status == CommitStatus::Committed)
        .count();
    if committed == 0 {
        info!("No actual commits were made.");
        run_log.append("no actual commits made");
        return Ok(RunOutcome::NothingCommitted {
            attempted: outcomes.len(),
        });
    }

    // Read the clock once, the whole gate decision compares against it
    let now = OffsetDateTime::now_utc().unix_timestamp();
    if is_gated(store.read(), now, cooldown) {
        debug!("A notification was sent recently, suppressing this one.");
        run_log.append(&format!(
            "notification suppressed, {committed} commit(s) within cooldown"
        ));
        return Ok(RunOutcome::Suppressed { committed });
    }

    match notifier.notify(committed) {
        Ok(()) => {
            // Arm the cooldown only now that the message went through
            if let Err(err) = store.write(now) {
                error!("Cannot persist the notification time: {err}.");
                run_log.append(&format!("failed to persist notification time ({err})"));
            }
            run_log.append(&format!("notification sent for {committed} commit(s)"));
            Ok(RunOutcome::Notified { committed })
        }
        Err(err) => {
            warn!("Notification failed, it will be retried on the next eligible run: {err}.");
            run_log.append(&format!("notification failed ({err})"));
            Ok(RunOutcome::NotificationFailed { committed })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        notify::{MockNotifier, NotifyError},
        tracker::{CommitOutcome, MockTracker},
    };
    use mockall::predicate::eq;
    use rand::distributions::{Alphanumeric, DistString};
    use std::{error::Error, fs, path::PathBuf, time::Duration};

    const HOUR: Duration = Duration::from_secs(3600);

    struct TestFiles {
        root: PathBuf,
        store: DebounceStore,
        run_log: RunLog,
    }

    fn setup_files() -> Result<TestFiles, Box<dyn Error>> {
        let id = Alphanumeric.sample_string(&mut rand::thread_rng(), 16);
        let root = PathBuf::from(format!("test_directories/{id}"));
        fs::create_dir_all(&root)?;

        Ok(TestFiles {
            store: DebounceStore::new(root.join("last_notified")),
            run_log: RunLog::open(&root.join("run.log"))?,
            root,
        })
    }

    fn read_run_log(files: &TestFiles) -> Result<String, Box<dyn Error>> {
        Ok(fs::read_to_string(files.root.join("run.log"))?)
    }

    fn cleanup_files(files: TestFiles) -> Result<(), Box<dyn Error>> {
        drop(files.run_log);
        fs::remove_dir_all(files.root)?;

        Ok(())
    }

    fn now() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }

    #[test]
    fn it_should_do_nothing_without_pending_changes() -> Result<(), Box<dyn Error>> {
        let mut files = setup_files()?;

        let mut mock_tracker = MockTracker::new();
        mock_tracker.expect_scan().times(1).returning(|| Ok(()));
        mock_tracker.expect_pending_count().times(1).returning(|| 0);
        mock_tracker.expect_commit_all().times(0);

        let mut mock_notifier = MockNotifier::new();
        mock_notifier.expect_notify().times(0);

        let outcome = run_once(
            &mut mock_tracker,
            &mock_notifier,
            &files.store,
            &mut files.run_log,
            HOUR,
        )?;
        assert_eq!(RunOutcome::NoPendingChanges, outcome);

        // The debounce state is untouched
        assert_eq!(None, files.store.read());
        assert!(read_run_log(&files)?.contains("no pending changes"));

        cleanup_files(files)?;

        Ok(())
    }

    #[test]
    fn it_should_not_notify_if_nothing_was_committed() -> Result<(), Box<dyn Error>> {
        let mut files = setup_files()?;

        let mut mock_tracker = MockTracker::new();
        mock_tracker.expect_scan().times(1).returning(|| Ok(()));
        mock_tracker.expect_pending_count().times(1).returning(|| 2);
        mock_tracker.expect_commit_all().times(1).returning(|| {
            vec![
                CommitOutcome::no_op("first"),
                CommitOutcome::failed("second", String::from("index is locked")),
            ]
        });

        let mut mock_notifier = MockNotifier::new();
        mock_notifier.expect_notify().times(0);

        let outcome = run_once(
            &mut mock_tracker,
            &mock_notifier,
            &files.store,
            &mut files.run_log,
            HOUR,
        )?;
        assert_eq!(RunOutcome::NothingCommitted { attempted: 2 }, outcome);
        assert_eq!(None, files.store.read());

        let run_log = read_run_log(&files)?;
        assert!(run_log.contains("first: no-op"));
        assert!(run_log.contains("second: failed (index is locked)"));
        assert!(run_log.contains("no actual commits made"));

        cleanup_files(files)?;

        Ok(())
    }

    #[test]
    fn it_should_notify_and_arm_the_cooldown_on_committed_work() -> Result<(), Box<dyn Error>> {
        let mut files = setup_files()?;

        let mut mock_tracker = MockTracker::new();
        mock_tracker.expect_scan().times(1).returning(|| Ok(()));
        mock_tracker.expect_pending_count().times(1).returning(|| 3);
        mock_tracker.expect_commit_all().times(1).returning(|| {
            vec![
                CommitOutcome::committed("first"),
                CommitOutcome::failed("second", String::from("merge conflict")),
                CommitOutcome::committed("third"),
            ]
        });

        let mut mock_notifier = MockNotifier::new();
        mock_notifier
            .expect_notify()
            .with(eq(2))
            .times(1)
            .returning(|_| Ok(()));

        let outcome = run_once(
            &mut mock_tracker,
            &mock_notifier,
            &files.store,
            &mut files.run_log,
            HOUR,
        )?;
        assert_eq!(RunOutcome::Notified { committed: 2 }, outcome);

        // The cooldown is armed with the current time
        let last_notified = files.store.read().unwrap();
        assert!(now() - last_notified < 5);

        // Every outcome is in the run log, including the failure detail
        let run_log = read_run_log(&files)?;
        assert!(run_log.contains("first: committed"));
        assert!(run_log.contains("second: failed (merge conflict)"));
        assert!(run_log.contains("third: committed"));
        assert!(run_log.contains("notification sent for 2 commit(s)"));

        cleanup_files(files)?;

        Ok(())
    }

    #[test]
    fn it_should_suppress_within_the_cooldown_but_still_commit() -> Result<(), Box<dyn Error>> {
        let mut files = setup_files()?;

        // A notification went out ten minutes ago
        files.store.write(now() - 600)?;

        let mut mock_tracker = MockTracker::new();
        mock_tracker.expect_scan().times(1).returning(|| Ok(()));
        mock_tracker.expect_pending_count().times(1).returning(|| 1);
        mock_tracker
            .expect_commit_all()
            .times(1)
            .returning(|| vec![CommitOutcome::committed("only")]);

        let mut mock_notifier = MockNotifier::new();
        mock_notifier.expect_notify().times(0);

        let outcome = run_once(
            &mut mock_tracker,
            &mock_notifier,
            &files.store,
            &mut files.run_log,
            HOUR,
        )?;
        assert_eq!(RunOutcome::Suppressed { committed: 1 }, outcome);

        // The commit is still recorded
        let run_log = read_run_log(&files)?;
        assert!(run_log.contains("only: committed"));
        assert!(run_log.contains("notification suppressed"));

        cleanup_files(files)?;

        Ok(())
    }

    #[test]
    fn it_should_notify_again_after_the_cooldown() -> Result<(), Box<dyn Error>> {
        let mut files = setup_files()?;

        // The last notification is older than the cooldown
        files.store.write(now() - 7200)?;

        let mut mock_tracker = MockTracker::new();
        mock_tracker.expect_scan().times(1).returning(|| Ok(()));
        mock_tracker.expect_pending_count().times(1).returning(|| 1);
        mock_tracker
            .expect_commit_all()
            .times(1)
            .returning(|| vec![CommitOutcome::committed("only")]);

        let mut mock_notifier = MockNotifier::new();
        mock_notifier
            .expect_notify()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(()));

        let outcome = run_once(
            &mut mock_tracker,
            &mock_notifier,
            &files.store,
            &mut files.run_log,
            HOUR,
        )?;
        assert_eq!(RunOutcome::Notified { committed: 1 }, outcome);

        cleanup_files(files)?;

        Ok(())
    }

    #[test]
    fn it_should_not_arm_the_cooldown_on_a_failed_notification() -> Result<(), Box<dyn Error>> {
        let mut files = setup_files()?;

        let mut mock_tracker = MockTracker::new();
        mock_tracker.expect_scan().times(1).returning(|| Ok(()));
        mock_tracker.expect_pending_count().times(1).returning(|| 1);
        mock_tracker
            .expect_commit_all()
            .times(1)
            .returning(|| vec![CommitOutcome::committed("only")]);

        let mut mock_notifier = MockNotifier::new();
        mock_notifier
            .expect_notify()
            .times(1)
            .returning(|_| Err(NotifyError::UnexpectedStatus(500)));

        let outcome = run_once(
            &mut mock_tracker,
            &mock_notifier,
            &files.store,
            &mut files.run_log,
            HOUR,
        )?;
        assert_eq!(RunOutcome::NotificationFailed { committed: 1 }, outcome);

        // The store is untouched, so the next run is still allowed to send
        assert_eq!(None, files.store.read());
        assert!(!is_gated(files.store.read(), now(), HOUR));

        cleanup_files(files)?;

        Ok(())
    }

    #[test]
    fn it_should_abort_on_a_scan_failure() -> Result<(), Box<dyn Error>> {
        let mut files = setup_files()?;

        let mut mock_tracker = MockTracker::new();
        mock_tracker.expect_scan().times(1).returning(|| {
            Err(TrackerError::UnreadableRoot(
                String::from("/projects"),
                String::from("permission denied"),
            ))
        });
        mock_tracker.expect_pending_count().times(0);
        mock_tracker.expect_commit_all().times(0);

        let mut mock_notifier = MockNotifier::new();
        mock_notifier.expect_notify().times(0);

        let result = run_once(
            &mut mock_tracker,
            &mock_notifier,
            &files.store,
            &mut files.run_log,
            HOUR,
        );
        assert!(
            matches!(result, Err(PipelineError::FailedScan(_))),
            "{result:?} should be FailedScan"
        );

        // Nothing was mutated
        assert_eq!(None, files.store.read());
        assert_eq!("", read_run_log(&files)?);

        cleanup_files(files)?;

        Ok(())
    }

    #[test]
    fn it_should_suppress_the_second_run_after_a_first_notification() -> Result<(), Box<dyn Error>> {
        let mut files = setup_files()?;

        // First run: two projects committed, never notified before
        let mut mock_tracker = MockTracker::new();
        mock_tracker.expect_scan().times(1).returning(|| Ok(()));
        mock_tracker.expect_pending_count().times(1).returning(|| 2);
        mock_tracker.expect_commit_all().times(1).returning(|| {
            vec![
                CommitOutcome::committed("first"),
                CommitOutcome::committed("second"),
            ]
        });
        let mut mock_notifier = MockNotifier::new();
        mock_notifier
            .expect_notify()
            .with(eq(2))
            .times(1)
            .returning(|_| Ok(()));

        let outcome = run_once(
            &mut mock_tracker,
            &mock_notifier,
            &files.store,
            &mut files.run_log,
            HOUR,
        )?;
        assert_eq!(RunOutcome::Notified { committed: 2 }, outcome);

        // Second run shortly after: one more commit, but within the cooldown
        let mut mock_tracker = MockTracker::new();
        mock_tracker.expect_scan().times(1).returning(|| Ok(()));
        mock_tracker.expect_pending_count().times(1).returning(|| 1);
        mock_tracker
            .expect_commit_all()
            .times(1)
            .returning(|| vec![CommitOutcome::committed("first")]);
        let mut mock_notifier = MockNotifier::new();
        mock_notifier.expect_notify().times(0);

        let outcome = run_once(
            &mut mock_tracker,
            &mock_notifier,
            &files.store,
            &mut files.run_log,
            HOUR,
        )?;
        assert_eq!(RunOutcome::Suppressed { committed: 1 }, outcome);

        cleanup_files(files)?;

        Ok(())
    }
}
