// Errors raised while publishing files to the remote repository.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    /// `GITHUB_TOKEN` is unset or empty. Checked before any network call.
    #[error("GITHUB_TOKEN environment variable is not set")]
    MissingCredential,

    /// The local file could not be read as UTF-8 text.
    #[error("failed to read `{}`", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The current blob SHA could not be obtained. Never fatal.
    #[error("could not fetch revision of `{path}`: {message}")]
    RevisionFetch { path: String, message: String },

    /// The create-or-update request failed or was rejected.
    #[error("failed to update `{path}`{}: {message}", status_suffix(*status))]
    RemoteWrite { path: String, status: Option<u16>, message: String },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

fn status_suffix(status: Option<u16>) -> String {
    status.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}
