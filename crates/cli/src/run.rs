// Top-level flow: token pre-flight, client, publish, final report.

use std::io::Write;

use anyhow::Context;
use direct_commit_common::{FileUpdateTask, PublishError, RepoCoordinates};

use crate::credential::{setup_guidance, Credential};
use crate::exit_code::ExitCode;
use crate::github::ContentsApi;
use crate::output::Console;
use crate::publisher::{CommitPublisher, PublishSummary};

/// Publish `tasks` to `coords`.
///
/// `connect` builds the API client from the credential. It is never called
/// when the token is missing, so a missing token cannot reach the network.
pub async fn run<A, F, O, E>(
    token: Option<String>,
    coords: RepoCoordinates,
    tasks: &[FileUpdateTask],
    connect: F,
    console: &mut Console<O, E>,
) -> anyhow::Result<PublishSummary>
where
    A: ContentsApi,
    F: FnOnce(Credential) -> Result<A, PublishError>,
    O: Write,
    E: Write,
{
    let credential = Credential::from_lookup(token)?;
    let api = connect(credential).context("failed to set up the GitHub client")?;

    let publisher = CommitPublisher::new(api, coords);
    publisher
        .publish(tasks, console)
        .await
        .with_context(|| format!("publishing to {} stopped", publisher.coordinates()))
}

/// Report the outcome on the console and pick the exit code.
pub fn finish<O: Write, E: Write>(
    result: anyhow::Result<PublishSummary>,
    coords: &RepoCoordinates,
    console: &mut Console<O, E>,
) -> ExitCode {
    match &result {
        Ok(summary) => report_success(summary, coords, console),
        Err(err) => report_failure(err, console),
    }
    ExitCode::from_result(&result)
}

fn report_success<O: Write, E: Write>(
    summary: &PublishSummary,
    coords: &RepoCoordinates,
    console: &mut Console<O, E>,
) {
    let total = summary.committed.len();
    let created = summary.committed.iter().filter(|file| file.created).count();
    let noun = if total == 1 { "file" } else { "files" };
    console.blank();
    console.success(&format!(
        "All {total} {noun} committed to {coords} ({created} created, {} updated)",
        total - created,
    ));
    console.info("Render will deploy the new commits automatically.");
    console.info(&format!("Check: {}", coords.commits_url()));
}

fn report_failure<O: Write, E: Write>(err: &anyhow::Error, console: &mut Console<O, E>) {
    console.error(&format!("{err:#}"));

    let publish_err = err.chain().find_map(|cause| cause.downcast_ref::<PublishError>());
    match publish_err {
        Some(PublishError::MissingCredential) => {
            console.hint("To create a token:");
            for step in setup_guidance() {
                console.hint(&step);
            }
        }
        Some(PublishError::RemoteWrite { .. }) => {
            console.hint("Files committed before this one remain on the branch.");
        }
        _ => {}
    }
}
