// GitHub repository contents API client.
//
// `ContentsApi` is the seam between the publisher and the network. The
// production implementation speaks HTTPS through reqwest; tests inject a
// scripted fake.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use direct_commit_common::{
    CommitRequest, CommitResponse, ContentsResponse, PublishError, RemoteBlobReference,
    RepoCoordinates,
};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};
use url::Url;

use crate::credential::Credential;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const GITHUB_V3_JSON: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("direct-commit/", env!("CARGO_PKG_VERSION"));

pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PublishError>> + Send + 'a>>;

/// Read and write access to files on one branch of a repository.
pub trait ContentsApi: Send + Sync {
    /// Look up the current blob SHA of `path` on `coords.branch`.
    ///
    /// A file that does not exist yields a reference without a revision
    /// marker. Any other failure is a `PublishError::RevisionFetch`.
    fn fetch_blob<'a>(
        &'a self,
        coords: &'a RepoCoordinates,
        path: &'a str,
    ) -> ApiFuture<'a, RemoteBlobReference>;

    /// Create or update a file, producing one commit.
    fn put_contents<'a>(
        &'a self,
        coords: &'a RepoCoordinates,
        request: &'a CommitRequest,
    ) -> ApiFuture<'a, CommitResponse>;
}

impl<T: ContentsApi + ?Sized> ContentsApi for Arc<T> {
    fn fetch_blob<'a>(
        &'a self,
        coords: &'a RepoCoordinates,
        path: &'a str,
    ) -> ApiFuture<'a, RemoteBlobReference> {
        (**self).fetch_blob(coords, path)
    }

    fn put_contents<'a>(
        &'a self,
        coords: &'a RepoCoordinates,
        request: &'a CommitRequest,
    ) -> ApiFuture<'a, CommitResponse> {
        (**self).put_contents(coords, request)
    }
}

#[derive(Debug)]
pub struct GitHubContentsClient {
    http: Client,
    base_url: Url,
    credential: Credential,
}

impl GitHubContentsClient {
    pub fn new(credential: Credential) -> Result<Self, PublishError> {
        Self::with_base_url(credential, DEFAULT_API_URL)
    }

    /// Client for another API root, e.g. `https://ghe.example.com/api/v3`.
    pub fn with_base_url(credential: Credential, base_url: &str) -> Result<Self, PublishError> {
        Self::from_builder(credential, base_url, Client::builder())
    }

    fn from_builder(
        credential: Credential,
        base_url: &str,
        builder: reqwest::ClientBuilder,
    ) -> Result<Self, PublishError> {
        let base_url = Url::parse(base_url).map_err(|err| {
            PublishError::Client(format!("invalid API URL `{base_url}`: {err}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(PublishError::Client(format!("API URL `{base_url}` cannot carry a path")));
        }

        let http = builder
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| PublishError::Client(err.to_string()))?;

        Ok(Self { http, base_url, credential })
    }

    /// `{base}/repos/{owner}/{repo}/contents/{path}`, each segment escaped.
    pub fn contents_url(&self, coords: &RepoCoordinates, path: &str) -> Result<Url, PublishError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                PublishError::Client(format!("API URL `{}` cannot carry a path", self.base_url))
            })?;
            segments
                .pop_if_empty()
                .extend(["repos", coords.owner.as_str(), coords.repo.as_str(), "contents"])
                .extend(path.split('/').filter(|segment| !segment.is_empty()));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, self.credential.authorization_header())
            .header(ACCEPT, GITHUB_V3_JSON)
    }

    async fn fetch_blob_inner(
        &self,
        coords: &RepoCoordinates,
        path: &str,
    ) -> Result<RemoteBlobReference, PublishError> {
        let revision_error =
            |message: String| PublishError::RevisionFetch { path: path.to_string(), message };

        let mut url =
            self.contents_url(coords, path).map_err(|err| revision_error(err.to_string()))?;
        url.query_pairs_mut().append_pair("ref", &coords.branch);

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|err| revision_error(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(path, branch = %coords.branch, "remote file does not exist yet");
            return Ok(RemoteBlobReference::absent(path));
        }
        if !status.is_success() {
            let message = api_error_message(response).await;
            return Err(revision_error(format!("HTTP {}: {message}", status.as_u16())));
        }

        let body: ContentsResponse = response
            .json()
            .await
            .map_err(|err| revision_error(format!("unexpected response body: {err}")))?;
        let blob = RemoteBlobReference::from_response(path, body);
        debug!(path, sha = ?blob.revision_marker, "fetched remote revision");
        Ok(blob)
    }

    async fn put_contents_inner(
        &self,
        coords: &RepoCoordinates,
        request: &CommitRequest,
    ) -> Result<CommitResponse, PublishError> {
        let write_error = |status: Option<u16>, message: String| PublishError::RemoteWrite {
            path: request.path.clone(),
            status,
            message,
        };

        let url = self
            .contents_url(coords, &request.path)
            .map_err(|err| write_error(None, err.to_string()))?;

        let response = self
            .request(Method::PUT, url)
            .json(request)
            .send()
            .await
            .map_err(|err| write_error(None, err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = api_error_message(response).await;
            return Err(write_error(Some(status.as_u16()), message));
        }

        // The commit exists once GitHub answers 2xx; an unreadable body only
        // costs us the SHAs in the report.
        match response.json::<CommitResponse>().await {
            Ok(body) => Ok(body),
            Err(err) => {
                warn!(path = %request.path, error = %err, "could not parse commit response");
                Ok(CommitResponse::default())
            }
        }
    }
}

impl ContentsApi for GitHubContentsClient {
    fn fetch_blob<'a>(
        &'a self,
        coords: &'a RepoCoordinates,
        path: &'a str,
    ) -> ApiFuture<'a, RemoteBlobReference> {
        Box::pin(self.fetch_blob_inner(coords, path))
    }

    fn put_contents<'a>(
        &'a self,
        coords: &'a RepoCoordinates,
        request: &'a CommitRequest,
    ) -> ApiFuture<'a, CommitResponse> {
        Box::pin(self.put_contents_inner(coords, request))
    }
}

async fn api_error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    extract_api_message(status, &body)
}

/// GitHub error bodies look like `{"message": "...", "documentation_url": "..."}`.
fn extract_api_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message").and_then(|m| m.as_str()).map(str::to_string));
    if let Some(message) = from_json {
        return message;
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    status.canonical_reason().unwrap_or("no response body").to_string()
}


#[cfg(test)]
mod tests {
    use direct_commit_common::{FileUpdateTask, RemoteBlobReference};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::*;

    struct CapturedRequest {
        head: String,
        body: String,
    }

    fn credential() -> Credential {
        Credential::from_lookup(Some("ghp_test".into())).expect("token should be accepted")
    }

    fn coords() -> RepoCoordinates {
        RepoCoordinates::new("octo", "hello", "main")
    }

    /// Client for a loopback test server, bypassing any proxy from the environment.
    fn local_client(base_url: &str) -> GitHubContentsClient {
        GitHubContentsClient::from_builder(credential(), base_url, Client::builder().no_proxy())
            .expect("loopback client should build")
    }

    /// Accept one connection, capture the request, answer with `status` and `body`.
    async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("listener should bind");
        let addr = listener.local_addr().expect("listener should have an address");

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.expect("accept should succeed");
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.expect("response write should succeed");
            let _ = stream.shutdown().await;
            request
        });

        (format!("http://{addr}"), server)
    }

    async fn read_request(stream: &mut TcpStream) -> CapturedRequest {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.expect("request should be readable");
            assert!(n > 0, "client closed before finishing headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.expect("body should be readable");
            assert!(n > 0, "client closed before finishing body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let body =
            String::from_utf8_lossy(&buf[header_end..header_end + content_length]).into_owned();
        CapturedRequest { head, body }
    }

    fn sample_request(sha: Option<&str>) -> CommitRequest {
        let task = FileUpdateTask::new("lib/x.ts", "lib/x.ts", "edit x");
        let blob = RemoteBlobReference {
            path: "lib/x.ts".into(),
            revision_marker: sha.map(str::to_string),
        };
        CommitRequest::new(&task, "export const x = 1;\n", &coords(), &blob)
    }

    #[test]
    fn contents_url_escapes_each_segment() {
        let client = GitHubContentsClient::new(credential()).unwrap();
        let url = client.contents_url(&coords(), "docs/my notes/a#b.md").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/hello/contents/docs/my%20notes/a%23b.md"
        );
    }

    #[test]
    fn contents_url_keeps_enterprise_api_prefix() {
        let client =
            GitHubContentsClient::with_base_url(credential(), "https://ghe.example.com/api/v3/")
                .unwrap();
        let url = client.contents_url(&coords(), "lib/auth/jwt-manager.ts").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/octo/hello/contents/lib/auth/jwt-manager.ts"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        let err = GitHubContentsClient::with_base_url(credential(), "mailto:ops@example.com")
            .expect_err("mailto URL cannot be an API root");
        assert!(matches!(err, PublishError::Client(_)));

        let err = GitHubContentsClient::with_base_url(credential(), "not a url")
            .expect_err("garbage should not parse");
        assert!(matches!(err, PublishError::Client(_)));
    }

    #[test]
    fn extracts_github_error_message() {
        let body = r#"{"message":"Invalid request.\n\n\"sha\" wasn't supplied.","documentation_url":"https://docs.github.com"}"#;
        assert_eq!(
            extract_api_message(StatusCode::UNPROCESSABLE_ENTITY, body),
            "Invalid request.\n\n\"sha\" wasn't supplied."
        );
        assert_eq!(extract_api_message(StatusCode::BAD_GATEWAY, " upstream down "), "upstream down");
        assert_eq!(extract_api_message(StatusCode::CONFLICT, ""), "Conflict");
    }

    #[tokio::test]
    async fn fetch_blob_reads_sha_with_branch_ref() {
        let (base_url, server) = serve_once(
            200,
            r#"{"path":"lib/x.ts","sha":"3d21ec53a331a6f037a91c368710b99387d012c1"}"#,
        )
        .await;
        let client = local_client(&base_url);

        let blob = client.fetch_blob(&coords(), "lib/x.ts").await.expect("fetch should succeed");
        assert_eq!(
            blob.revision_marker.as_deref(),
            Some("3d21ec53a331a6f037a91c368710b99387d012c1")
        );

        let request = server.await.expect("server should finish");
        assert!(request.head.starts_with("GET /repos/octo/hello/contents/lib/x.ts?ref=main "));
        let head = request.head.to_ascii_lowercase();
        assert!(head.contains("authorization: token ghp_test"));
        assert!(head.contains("accept: application/vnd.github.v3+json"));
        assert!(head.contains("user-agent: direct-commit/"));
    }

    #[tokio::test]
    async fn fetch_blob_treats_not_found_as_new_file() {
        let (base_url, server) = serve_once(404, r#"{"message":"Not Found"}"#).await;
        let client = local_client(&base_url);

        let blob = client.fetch_blob(&coords(), "lib/new.ts").await.expect("404 is not an error");
        assert_eq!(blob, RemoteBlobReference::absent("lib/new.ts"));
        server.await.expect("server should finish");
    }

    #[tokio::test]
    async fn fetch_blob_reports_server_errors() {
        let (base_url, server) = serve_once(500, r#"{"message":"Server Error"}"#).await;
        let client = local_client(&base_url);

        let err = client.fetch_blob(&coords(), "lib/x.ts").await.expect_err("500 should fail");
        match err {
            PublishError::RevisionFetch { path, message } => {
                assert_eq!(path, "lib/x.ts");
                assert_eq!(message, "HTTP 500: Server Error");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.expect("server should finish");
    }

    #[tokio::test]
    async fn fetch_blob_reports_unparseable_body() {
        let (base_url, server) = serve_once(200, "[1, 2, 3]").await;
        let client = local_client(&base_url);

        let err = client.fetch_blob(&coords(), "lib").await.expect_err("directory listing");
        assert!(matches!(err, PublishError::RevisionFetch { .. }));
        server.await.expect("server should finish");
    }

    #[tokio::test]
    async fn transport_failures_map_to_publish_errors() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("listener should bind");
        let addr = listener.local_addr().expect("listener should have an address");
        drop(listener);

        let client = local_client(&format!("http://{addr}"));

        let err = client.fetch_blob(&coords(), "lib/x.ts").await.expect_err("nothing listens");
        assert!(matches!(err, PublishError::RevisionFetch { .. }));

        let request = sample_request(None);
        let err = client.put_contents(&coords(), &request).await.expect_err("nothing listens");
        assert!(matches!(err, PublishError::RemoteWrite { status: None, .. }));
    }

    #[tokio::test]
    async fn put_contents_sends_structured_body() {
        let (base_url, server) = serve_once(
            200,
            r#"{"content":{"path":"lib/x.ts","sha":"95b966ae1c166bd92f8ae7d1c313e738c731dfc3"},"commit":{"sha":"7638417db6d59f3c431d3e1f261cc637155684cd","html_url":"https://github.com/octo/hello/commit/7638417"}}"#,
        )
        .await;
        let client = local_client(&base_url);

        let request = sample_request(Some("3d21ec53"));
        let response = client.put_contents(&coords(), &request).await.expect("put should succeed");
        assert_eq!(response.short_commit_sha(), Some("7638417"));
        assert_eq!(response.commit_url(), Some("https://github.com/octo/hello/commit/7638417"));

        let captured = server.await.expect("server should finish");
        assert!(captured.head.starts_with("PUT /repos/octo/hello/contents/lib/x.ts "));
        let body: serde_json::Value =
            serde_json::from_str(&captured.body).expect("body should be json");
        assert_eq!(body["message"], "Fix: edit x");
        assert_eq!(body["branch"], "main");
        assert_eq!(body["sha"], "3d21ec53");
        assert_eq!(body["content"], "ZXhwb3J0IGNvbnN0IHggPSAxOwo=");
        assert!(body.get("path").is_none());
    }

    #[tokio::test]
    async fn put_contents_surfaces_rejection_status_and_message() {
        let (base_url, server) =
            serve_once(409, r#"{"message":"lib/x.ts does not match 3d21ec53"}"#).await;
        let client = local_client(&base_url);

        let request = sample_request(None);
        let err = client.put_contents(&coords(), &request).await.expect_err("409 should fail");
        match err {
            PublishError::RemoteWrite { path, status, message } => {
                assert_eq!(path, "lib/x.ts");
                assert_eq!(status, Some(409));
                assert_eq!(message, "lib/x.ts does not match 3d21ec53");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let captured = server.await.expect("server should finish");
        let body: serde_json::Value =
            serde_json::from_str(&captured.body).expect("body should be json");
        assert!(body.get("sha").is_none());
    }

    #[tokio::test]
    async fn put_contents_tolerates_unexpected_success_body() {
        let (base_url, server) = serve_once(201, "{}").await;
        let client = local_client(&base_url);

        let request = sample_request(None);
        let response = client.put_contents(&coords(), &request).await.expect("201 is success");
        assert_eq!(response.commit_sha(), None);
        server.await.expect("server should finish");
    }
}
