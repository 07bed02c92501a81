// GitHub repository contents API: request and response bodies.
//
//   GET /repos/{owner}/{repo}/contents/{path}?ref={branch}  -> ContentsResponse
//   PUT /repos/{owner}/{repo}/contents/{path}               <- CommitRequest
//                                                           -> CommitResponse

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::{FileUpdateTask, RepoCoordinates};

/// Encode file text for the `content` field of a write request.
pub fn encode_content(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

#[derive(Debug, Error)]
pub enum ContentDecodeError {
    #[error("content is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("content is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Decode a `content` field back into text.
///
/// GitHub wraps base64 in read responses at 60 columns, so ASCII
/// whitespace is ignored.
pub fn decode_content(encoded: &str) -> Result<String, ContentDecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8(bytes)?)
}

/// What the read request tells us about the remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBlobReference {
    pub path: String,
    /// Blob SHA of the current remote content. `None` means create.
    pub revision_marker: Option<String>,
}

impl RemoteBlobReference {
    pub fn absent(path: impl Into<String>) -> Self {
        Self { path: path.into(), revision_marker: None }
    }

    pub fn from_response(path: impl Into<String>, response: ContentsResponse) -> Self {
        Self {
            path: path.into(),
            revision_marker: response.sha.filter(|sha| !sha.is_empty()),
        }
    }

    pub fn exists(&self) -> bool {
        self.revision_marker.is_some()
    }
}

/// Subset of the file object returned by the read request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentsResponse {
    #[serde(default)]
    pub sha: Option<String>,
}

/// Body of the create-or-update request.
///
/// `path` travels in the URL, not the body. `sha` is omitted entirely when
/// the file is being created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRequest {
    #[serde(skip)]
    pub path: String,
    pub message: String,
    pub content: String,
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
}

impl CommitRequest {
    pub fn new(
        task: &FileUpdateTask,
        text: &str,
        coords: &RepoCoordinates,
        blob: &RemoteBlobReference,
    ) -> Self {
        Self {
            path: task.remote_path.clone(),
            message: task.full_commit_message(),
            content: encode_content(text),
            branch: coords.branch.clone(),
            sha: blob.revision_marker.clone(),
        }
    }
}

/// Subset of the response to a successful write.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitResponse {
    #[serde(default)]
    pub content: Option<CommittedContent>,
    #[serde(default)]
    pub commit: Option<CommitInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommittedContent {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl CommitResponse {
    pub fn commit_sha(&self) -> Option<&str> {
        self.commit.as_ref().map(|commit| commit.sha.as_str())
    }

    /// First seven characters of the commit SHA, as `git log --oneline` shows it.
    pub fn short_commit_sha(&self) -> Option<&str> {
        self.commit_sha().map(|sha| sha.get(..7).unwrap_or(sha))
    }

    /// Web page of the new commit.
    pub fn commit_url(&self) -> Option<&str> {
        self.commit.as_ref().and_then(|commit| commit.html_url.as_deref())
    }

    pub fn blob_sha(&self) -> Option<&str> {
        self.content.as_ref().map(|content| content.sha.as_str())
    }
}
