// Sequential create-or-update of each task's file on the remote branch.
//
// Per task: read local text, look up the remote blob SHA (best effort),
// then write. A read or write failure stops the run; files committed
// before it stay committed.

use std::io::Write;

use direct_commit_common::{
    CommitRequest, FileUpdateTask, PublishError, RemoteBlobReference, RepoCoordinates,
};
use tracing::{debug, info, warn};

use crate::github::ContentsApi;
use crate::output::Console;

/// One file that made it onto the remote branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedFile {
    pub remote_path: String,
    /// `false` when an existing remote file was overwritten.
    pub created: bool,
    pub commit_sha: Option<String>,
    pub commit_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub committed: Vec<CommittedFile>,
}

pub struct CommitPublisher<A> {
    api: A,
    coords: RepoCoordinates,
}

impl<A: ContentsApi> CommitPublisher<A> {
    pub fn new(api: A, coords: RepoCoordinates) -> Self {
        Self { api, coords }
    }

    pub fn coordinates(&self) -> &RepoCoordinates {
        &self.coords
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Publish every task in order, stopping at the first fatal error.
    pub async fn publish<O: Write, E: Write>(
        &self,
        tasks: &[FileUpdateTask],
        console: &mut Console<O, E>,
    ) -> Result<PublishSummary, PublishError> {
        console.info(&format!("Preparing direct commits to {}...", self.coords));

        let mut summary = PublishSummary::default();
        for task in tasks {
            let committed = self.publish_one(task, console).await?;
            summary.committed.push(committed);
        }
        Ok(summary)
    }

    async fn publish_one<O: Write, E: Write>(
        &self,
        task: &FileUpdateTask,
        console: &mut Console<O, E>,
    ) -> Result<CommittedFile, PublishError> {
        console.blank();
        console.info(&format!("Updating {}...", task.remote_path));

        let text = read_task_file(task).await?;
        let blob = self.fetch_blob_or_absent(task, console).await;
        let request = CommitRequest::new(task, &text, &self.coords, &blob);
        debug!(
            path = %request.path,
            bytes = text.len(),
            update = request.sha.is_some(),
            "sending contents write"
        );

        let response = self.api.put_contents(&self.coords, &request).await?;

        let commit_sha = response.commit_sha().map(str::to_string);
        info!(
            path = %task.remote_path,
            commit = ?commit_sha,
            blob = ?response.blob_sha(),
            "file committed"
        );
        match response.short_commit_sha() {
            Some(short) => console.success(&format!("{} updated ({short})", task.remote_path)),
            None => console.success(&format!("{} updated", task.remote_path)),
        }
        let commit_url = response.commit_url().map(str::to_string);
        if let Some(url) = &commit_url {
            console.info(&format!("  {url}"));
        }

        Ok(CommittedFile {
            remote_path: task.remote_path.clone(),
            created: !blob.exists(),
            commit_sha,
            commit_url,
        })
    }

    /// Revision lookup never fails the run. Without a SHA the write is
    /// sent as a create, which GitHub rejects if the file does exist.
    async fn fetch_blob_or_absent<O: Write, E: Write>(
        &self,
        task: &FileUpdateTask,
        console: &mut Console<O, E>,
    ) -> RemoteBlobReference {
        match self.api.fetch_blob(&self.coords, &task.remote_path).await {
            Ok(blob) => blob,
            Err(err) => {
                warn!(path = %task.remote_path, error = %err, "revision fetch failed");
                console.warning(&format!(
                    "could not fetch the current SHA of {}; sending it as a new file",
                    task.remote_path
                ));
                RemoteBlobReference::absent(&task.remote_path)
            }
        }
    }
}

async fn read_task_file(task: &FileUpdateTask) -> Result<String, PublishError> {
    tokio::fs::read_to_string(&task.local_path)
        .await
        .map_err(|source| PublishError::FileRead { path: task.local_path.clone(), source })
}
