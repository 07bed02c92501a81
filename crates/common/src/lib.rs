// direct-commit-common: domain types and GitHub contents wire format

pub mod contents;
pub mod error;
pub mod task;

pub use contents::{
    decode_content, encode_content, CommitRequest, CommitResponse, ContentsResponse,
    RemoteBlobReference,
};
pub use error::PublishError;
pub use task::{default_coordinates, default_tasks, FileUpdateTask, RepoCoordinates};
