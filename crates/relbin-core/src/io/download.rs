//! Async download of a single release asset.
//!
//! Redirects are followed by hand rather than by the HTTP client so that the
//! hop count is bounded and every hop is logged. The body is streamed through
//! an [`AsyncWrite`] sink; when the sink is a file, the file is removed again
//! if the transfer fails or the future is dropped midway.

use std::path::Path;

use futures::StreamExt;
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode, Url};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::Reporter;
use crate::options::{DEFAULT_MAX_REDIRECTS, InstallOptions};

/// Failure to fetch a release asset.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// DNS, TLS, connection or timeout failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Writing the destination file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with a status that is neither 200 nor a redirect.
    #[error("Server returned status {status} for {url}")]
    Failed {
        /// HTTP status code
        status: u16,
        /// URL of the failing hop
        url: String,
    },

    /// The redirect chain is longer than allowed.
    #[error("Too many redirects (limit {limit}) while fetching {url}")]
    TooManyRedirects {
        /// Configured hop limit
        limit: usize,
        /// URL of the last redirect received
        url: String,
    },

    /// A redirect without a usable `Location` header.
    #[error("Redirect {status} from {url} has no usable Location header")]
    BadRedirect {
        /// HTTP status code
        status: u16,
        /// URL that sent the redirect
        url: String,
    },

    /// The URL to fetch could not be parsed.
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Parser message
        reason: String,
    },
}

impl DownloadError {
    /// HTTP status of a rejected response, if that is what failed.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Failed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Build the HTTP client used for release downloads.
///
/// Automatic redirects are disabled; [`fetch`] follows them itself.
///
/// # Errors
///
/// Fails if the TLS backend cannot be initialised.
pub fn build_client(options: &InstallOptions) -> Result<Client, DownloadError> {
    let mut builder = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(options.user_agent.as_str())
        .connect_timeout(options.connect_timeout);

    if let Some(timeout) = options.request_timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build()?)
}

/// Request for a download operation
#[derive(Debug)]
pub struct DownloadRequest<'a, R: Reporter + ?Sized> {
    /// Client built by [`build_client`]
    pub client: &'a Client,
    /// Initial URL
    pub url: &'a str,
    /// File to create
    pub dest: &'a Path,
    /// Progress sink
    pub reporter: &'a R,
    /// Redirect hops allowed before giving up
    pub max_redirects: usize,
}

impl<'a, R: Reporter + ?Sized> DownloadRequest<'a, R> {
    /// Request with the default redirect limit.
    pub fn new(client: &'a Client, url: &'a str, dest: &'a Path, reporter: &'a R) -> Self {
        Self {
            client,
            url,
            dest,
            reporter,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Override the redirect hop limit.
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Execute the download, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// See [`fetch`].
    pub async fn execute(self) -> Result<u64, DownloadError> {
        fetch(self).await
    }
}

/// Fetch `req.url` into `req.dest`.
///
/// 301, 302, 303, 307 and 308 are followed, resolving relative `Location`
/// values against the current URL. The destination file is only created once a
/// 200 arrives, and it is removed again on any later failure.
///
/// # Errors
///
/// [`DownloadError::Failed`] for any other status, [`DownloadError::Network`]
/// for transport failures (including a body cut short of its
/// `Content-Length`), plus the redirect variants.
pub async fn fetch<R: Reporter + ?Sized>(req: DownloadRequest<'_, R>) -> Result<u64, DownloadError> {
    let mut url = Url::parse(req.url).map_err(|e| DownloadError::InvalidUrl {
        url: req.url.to_string(),
        reason: e.to_string(),
    })?;
    let mut hops = 0;

    loop {
        debug!(%url, "GET");
        let response = req.client.get(url.clone()).send().await?;
        let status = response.status();

        if is_followed_redirect(status) {
            if hops >= req.max_redirects {
                return Err(DownloadError::TooManyRedirects {
                    limit: req.max_redirects,
                    url: url.to_string(),
                });
            }
            hops += 1;

            let next = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|location| url.join(location).ok())
                .ok_or_else(|| DownloadError::BadRedirect {
                    status: status.as_u16(),
                    url: url.to_string(),
                })?;

            debug!(from = %url, to = %next, status = status.as_u16(), "following redirect");
            url = next;
            continue;
        }

        if status != StatusCode::OK {
            return Err(DownloadError::Failed {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        return write_to_file(response, req.dest, req.reporter).await;
    }
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

async fn write_to_file<R: Reporter + ?Sized>(
    response: Response,
    dest: &Path,
    reporter: &R,
) -> Result<u64, DownloadError> {
    let file = File::create(dest).await?;
    let guard = PartialFile::new(dest);
    let mut sink = BufWriter::new(file);

    let written = stream_body(response, &mut sink, reporter).await?;
    sink.flush().await?;
    sink.into_inner().sync_all().await?;

    debug!(path = %dest.display(), bytes = written, "download complete");
    guard.keep();
    Ok(written)
}

/// Copy a response body into `sink`, reporting progress per chunk.
///
/// # Errors
///
/// Transport errors while reading and IO errors while writing.
pub async fn stream_body<W, R>(
    response: Response,
    sink: &mut W,
    reporter: &R,
) -> Result<u64, DownloadError>
where
    W: AsyncWrite + Unpin + ?Sized,
    R: Reporter + ?Sized,
{
    let total = response.content_length();
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    reporter.progress(0, total);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        sink.write_all(&chunk).await?;
        written += chunk.len() as u64;
        reporter.progress(written, total);
    }

    Ok(written)
}

/// Removes a half-written download unless [`keep`](Self::keep) is called.
///
/// Runs on early returns and when the owning future is dropped.
#[derive(Debug)]
struct PartialFile<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> PartialFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(path = %self.path.display(), "removing partial download");
            let _ = std::fs::remove_file(self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NullReporter;
    use mockito::Server;
    use tempfile::tempdir;

    fn client() -> Client {
        build_client(&InstallOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_writes_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/asset.tar.gz")
            .with_status(200)
            .with_body(b"release bytes")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("package.tar.gz");
        let url = format!("{}/asset.tar.gz", server.url());

        let bytes = DownloadRequest::new(&client(), &url, &dest, &NullReporter)
            .execute()
            .await
            .unwrap();

        assert_eq!(bytes, 13);
        assert_eq!(std::fs::read(&dest).unwrap(), b"release bytes");
    }

    #[tokio::test]
    async fn test_fetch_follows_302() {
        let mut server = Server::new_async().await;
        let target = format!("{}/cdn/asset", server.url());
        let redirect = server
            .mock("GET", "/download/v1.2.3/asset")
            .with_status(302)
            .with_header("location", &target)
            .create_async()
            .await;
        let asset = server
            .mock("GET", "/cdn/asset")
            .with_status(200)
            .with_body("payload")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");
        let url = format!("{}/download/v1.2.3/asset", server.url());

        DownloadRequest::new(&client(), &url, &dest, &NullReporter)
            .execute()
            .await
            .unwrap();

        redirect.assert_async().await;
        asset.assert_async().await;
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "payload");
    }

    #[tokio::test]
    async fn test_fetch_follows_relative_redirects() {
        let mut server = Server::new_async().await;
        let _a = server
            .mock("GET", "/a")
            .with_status(301)
            .with_header("location", "/b")
            .create_async()
            .await;
        let _b = server
            .mock("GET", "/b")
            .with_status(307)
            .with_header("location", "c")
            .create_async()
            .await;
        let _c = server
            .mock("GET", "/c")
            .with_status(200)
            .with_body("done")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");
        let url = format!("{}/a", server.url());

        DownloadRequest::new(&client(), &url, &dest, &NullReporter)
            .execute()
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "done");
    }

    #[tokio::test]
    async fn test_fetch_404_creates_no_file() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("not found")
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");
        let url = format!("{}/missing", server.url());

        let err = DownloadRequest::new(&client(), &url, &dest, &NullReporter)
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Failed { status: 404, .. }));
        assert_eq!(err.status(), Some(404));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_redirect_loop_is_capped() {
        let mut server = Server::new_async().await;
        let looping = server
            .mock("GET", "/loop")
            .with_status(302)
            .with_header("location", "/loop")
            .expect(4)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");
        let url = format!("{}/loop", server.url());

        let err = DownloadRequest::new(&client(), &url, &dest, &NullReporter)
            .with_max_redirects(3)
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::TooManyRedirects { limit: 3, .. }));
        looping.assert_async().await;
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_redirect_without_location() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/moved")
            .with_status(302)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let url = format!("{}/moved", server.url());

        let err = DownloadRequest::new(&client(), &url, &dir.path().join("out"), &NullReporter)
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::BadRedirect { status: 302, .. }));
    }

    #[tokio::test]
    async fn test_other_redirect_codes_are_failures() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/cached")
            .with_status(304)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let url = format!("{}/cached", server.url());

        let err = DownloadRequest::new(&client(), &url, &dir.path().join("out"), &NullReporter)
            .execute()
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(304));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop a listener to get a port nothing is listening on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let dir = tempdir().unwrap();
        let dest = dir.path().join("out");
        let url = format!("http://127.0.0.1:{port}/asset");

        let err = DownloadRequest::new(&client(), &url, &dest, &NullReporter)
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Network(_)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_short_body_removes_partial_file() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n0123456789")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let dir = tempdir().unwrap();
        let dest = dir.path().join("package.tar.gz");
        let url = format!("http://{addr}/asset");

        let result = DownloadRequest::new(&client(), &url, &dest, &NullReporter)
            .execute()
            .await;
        server.await.unwrap();

        assert!(matches!(result, Err(DownloadError::Network(_))), "{result:?}");
        assert!(!dest.exists(), "partial download left behind");
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let dir = tempdir().unwrap();
        let err = DownloadRequest::new(&client(), "not a url", &dir.path().join("out"), &NullReporter)
            .execute()
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_stream_body_into_memory_sink() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/blob")
            .with_status(200)
            .with_body(vec![7u8; 4096])
            .create_async()
            .await;

        let response = client()
            .get(format!("{}/blob", server.url()))
            .send()
            .await
            .unwrap();

        let mut sink: Vec<u8> = Vec::new();
        let written = stream_body(response, &mut sink, &NullReporter).await.unwrap();

        assert_eq!(written, 4096);
        assert_eq!(sink, vec![7u8; 4096]);
    }

    #[test]
    fn test_partial_file_removed_unless_kept() {
        let dir = tempdir().unwrap();
        let dropped = dir.path().join("dropped");
        let kept = dir.path().join("kept");
        std::fs::write(&dropped, b"half").unwrap();
        std::fs::write(&kept, b"whole").unwrap();

        drop(PartialFile::new(&dropped));
        PartialFile::new(&kept).keep();

        assert!(!dropped.exists());
        assert!(kept.exists());
    }
}
