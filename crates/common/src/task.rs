// The fixed publishing target and the files pushed to it.
//
// Coordinates and task list are compiled in. Nothing here reads the
// environment or the command line.

use std::fmt;
use std::path::PathBuf;

const OWNER: &str = "IKEMENLTD";
const REPO: &str = "gasgenerator";
const BRANCH: &str = "main";

/// Every commit message is sent with this prefix.
pub const COMMIT_MESSAGE_PREFIX: &str = "Fix: ";

/// Owner, repository and branch that commits land on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinates {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl RepoCoordinates {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self { owner: owner.into(), repo: repo.into(), branch: branch.into() }
    }

    /// Web URL of the branch's commit history.
    pub fn commits_url(&self) -> String {
        format!("https://github.com/{}/{}/commits/{}", self.owner, self.repo, self.branch)
    }
}

impl fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

/// One local file to upload to one remote path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdateTask {
    /// Path read from disk, relative to the working directory unless absolute.
    pub local_path: PathBuf,
    /// Slash-separated path inside the remote repository.
    pub remote_path: String,
    /// Message without the `Fix: ` prefix.
    pub commit_message: String,
}

impl FileUpdateTask {
    pub fn new(
        local_path: impl Into<PathBuf>,
        remote_path: impl Into<String>,
        commit_message: impl Into<String>,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            commit_message: commit_message.into(),
        }
    }

    /// Task whose local path mirrors the remote path.
    pub fn mirrored(remote_path: &str, commit_message: impl Into<String>) -> Self {
        Self::new(PathBuf::from(remote_path), remote_path, commit_message)
    }

    /// The message actually sent with the commit.
    pub fn full_commit_message(&self) -> String {
        format!("{COMMIT_MESSAGE_PREFIX}{}", self.commit_message)
    }
}

pub fn default_coordinates() -> RepoCoordinates {
    RepoCoordinates::new(OWNER, REPO, BRANCH)
}

/// The files this tool publishes, in commit order.
pub fn default_tasks() -> Vec<FileUpdateTask> {
    vec![
        FileUpdateTask::mirrored(
            "lib/config/environment.ts",
            "Move ADMIN_API_TOKEN to optional environment variables",
        ),
        FileUpdateTask::mirrored(
            "lib/auth/jwt-manager.ts",
            "Change ADMIN_API_TOKEN to optional with default value",
        ),
    ]
}
