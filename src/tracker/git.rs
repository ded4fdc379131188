use super::{CommitOutcome, Tracker, TrackerError};
use git2::{ErrorCode, IndexAddOption, Repository, Signature, StatusOptions, Statuses};
use log::debug;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// The name and email used for commits when the repository
/// has no signature configured.
const FALLBACK_SIGNATURE: (&str, &str) = ("gac", "gac@localhost");

/// One managed project and whether it had uncommitted work at the last
/// scan. Recomputed on every scan, never persisted.
struct ProjectChangeSet {
    name: String,
    path: PathBuf,
    dirty: bool,
}

/// A tracker that scans and commits local git repositories.
///
/// Every immediate subdirectory of the root that contains a `.git` entry is
/// treated as a managed project. Projects are scanned and committed in name
/// order, so consecutive runs see them in a stable order.
pub struct GitTracker {
    root: PathBuf,
    changes: Vec<ProjectChangeSet>,
}

impl GitTracker {
    /// Open the root directory of the managed projects.
    pub fn open(root: &str) -> Result<Self, TrackerError> {
        let path = PathBuf::from(root);
        if !path.is_dir() {
            return Err(TrackerError::NotADirectory(String::from(root)));
        }

        Ok(GitTracker {
            root: path,
            changes: vec![],
        })
    }

    fn discover_projects(&self) -> Result<Vec<(String, PathBuf)>, TrackerError> {
        let root = self.root.display().to_string();
        let entries =
            fs::read_dir(&self.root).map_err(|err| TrackerError::UnreadableRoot(root.clone(), err.to_string()))?;

        let mut projects = vec![];
        for entry in entries {
            let entry = entry.map_err(|err| TrackerError::UnreadableRoot(root.clone(), err.to_string()))?;
            let path = entry.path();
            if path.join(".git").exists() {
                let name = entry.file_name().to_string_lossy().into_owned();
                projects.push((name, path));
            }
        }
        projects.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(projects)
    }

    fn has_uncommitted_changes(name: &str, path: &Path) -> Result<bool, TrackerError> {
        let repo =
            Repository::open(path).map_err(|err| TrackerError::FailedScan(String::from(name), err.message().to_string()))?;

        let mut options = status_options();
        let statuses = repo
            .statuses(Some(&mut options))
            .map_err(|err| TrackerError::FailedScan(String::from(name), err.message().to_string()))?;

        Ok(!statuses.is_empty())
    }

    fn commit_project(path: &Path, name: &str) -> Result<Option<String>, git2::Error> {
        let repo = Repository::open(path)?;

        let mut options = status_options();
        let statuses = repo.statuses(Some(&mut options))?;
        if statuses.is_empty() {
            // The work raced away between the scan and the commit phase.
            return Ok(None);
        }
        let message = commit_message(name, &statuses);

        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let signature = repo
            .signature()
            .or_else(|_| Signature::now(FALLBACK_SIGNATURE.0, FALLBACK_SIGNATURE.1))?;

        // A repository without any commit yet has an unborn HEAD,
        // the commit simply has no parent then.
        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(err) if err.code() == ErrorCode::UnbornBranch || err.code() == ErrorCode::NotFound => None,
            Err(err) => return Err(err),
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        repo.commit(Some("HEAD"), &signature, &signature, &message, &tree, &parents)?;

        Ok(Some(message))
    }
}

impl Tracker for GitTracker {
    /// Rediscover the managed projects and check each for uncommitted work.
    fn scan(&mut self) -> Result<(), TrackerError> {
        let projects = self.discover_projects()?;
        debug!("Scanning {} managed project(s).", projects.len());

        let mut changes = Vec::with_capacity(projects.len());
        for (name, path) in projects {
            let dirty = GitTracker::has_uncommitted_changes(&name, &path)?;
            changes.push(ProjectChangeSet { name, path, dirty });
        }
        self.changes = changes;

        Ok(())
    }

    fn pending_count(&self) -> usize {
        self.changes.iter().filter(|change| change.dirty).count()
    }

    fn commit_all(&mut self) -> Vec<CommitOutcome> {
        let mut outcomes = vec![];
        for change in self.changes.iter().filter(|change| change.dirty) {
            let outcome = match GitTracker::commit_project(&change.path, &change.name) {
                Ok(Some(message)) => {
                    debug!("Committed {}: {message}.", change.name);
                    CommitOutcome::committed(&change.name)
                }
                Ok(None) => CommitOutcome::no_op(&change.name),
                Err(err) => CommitOutcome::failed(&change.name, err.message().to_string()),
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}

fn status_options() -> StatusOptions {
    let mut options = StatusOptions::new();
    options
        .include_untracked(true)
        .recurse_untracked_dirs(true)
        .exclude_submodules(true);
    options
}

/// Describe the pending work the same way a human would in a quick commit:
/// the single changed file by name, or just the number of files.
fn commit_message(project: &str, statuses: &Statuses) -> String {
    let paths: Vec<String> = statuses
        .iter()
        .filter_map(|entry| entry.path().map(String::from))
        .collect();

    match paths.as_slice() {
        [single] => format!("[{project}] Update {single}"),
        paths => format!("[{project}] Update {} files", paths.len()),
    }
}
