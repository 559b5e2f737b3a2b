use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fridactl_common::cache::ArtifactCache;
use fridactl_common::config::Config;
use fridactl_common::error::{FridaError, Result};
use fridactl_common::model::{ArtifactFormat, ArtifactKey};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, instrument, warn};

use crate::progress::{DownloadProgress, DownloadSession};
use crate::validation::validate_url;

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "fridactl (Rust; frida-server manager)";

/// Write granularity; progress is accounted per slice of this size.
pub const CHUNK_SIZE: usize = 8 * 1024;

pub fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| FridaError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Proof that the holder is the only download in flight. Dropping it frees
/// the slot, whichever way the download ended.
#[derive(Debug)]
pub struct DownloadPermit {
    in_flight: Arc<AtomicBool>,
}

impl Drop for DownloadPermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

/// Fetches release assets into the cache. At most one download runs at a
/// time per `Downloader`; concurrent attempts are rejected, not queued.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    release_base_url: String,
    format: ArtifactFormat,
    allow_http: bool,
    in_flight: Arc<AtomicBool>,
}

impl Downloader {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_client(build_http_client()?, config))
    }

    pub fn with_client(client: Client, config: &Config) -> Self {
        let release_base_url = config.release_base_url.trim_end_matches('/').to_string();
        // Plain http is only used when it was configured explicitly.
        let allow_http = release_base_url.starts_with("http://");
        Self {
            client,
            release_base_url,
            format: config.format,
            allow_http,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn url_for(&self, key: &ArtifactKey) -> String {
        key.download_url(&self.release_base_url, self.format)
    }

    pub fn is_downloading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn try_acquire(&self) -> Result<DownloadPermit> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| FridaError::DownloadInProgress)?;
        Ok(DownloadPermit {
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Streams the asset for `key` into `dest`, returning the byte count.
    ///
    /// Takes the download slot for the duration of the transfer; see
    /// [`Downloader::download_with`] for a caller that already holds it.
    pub async fn download<F>(&self, key: &ArtifactKey, dest: &Path, on_progress: F) -> Result<u64>
    where
        F: FnMut(DownloadProgress),
    {
        let permit = self.try_acquire()?;
        self.download_with(&permit, key, dest, on_progress).await
    }

    /// Like [`Downloader::download`], under a permit taken earlier from this
    /// downloader.
    ///
    /// Bytes are streamed into a hidden sibling of `dest` that is renamed
    /// into place only once the body is complete, so `dest` either holds a
    /// whole asset or does not exist. A failed transfer is retried from
    /// scratch, never resumed.
    #[instrument(skip_all, fields(artifact = %key))]
    pub async fn download_with<F>(
        &self,
        permit: &DownloadPermit,
        key: &ArtifactKey,
        dest: &Path,
        mut on_progress: F,
    ) -> Result<u64>
    where
        F: FnMut(DownloadProgress),
    {
        if !Arc::ptr_eq(&permit.in_flight, &self.in_flight) {
            return Err(FridaError::Validation(
                "Download permit belongs to a different downloader".to_string(),
            ));
        }

        let url = self.url_for(key);
        validate_url(&url, self.allow_http)?;
        debug!("Downloading {} to {}", url, dest.display());

        let asset = key.asset_name(self.format);
        let network_err = |msg: String| FridaError::Network(asset.clone(), url.clone(), msg);

        let mut response = self.client.get(&url).send().await.map_err(|e| {
            debug!("HTTP request failed for {url}: {e}");
            network_err(format!("HTTP request failed: {e}"))
        })?;
        let status = response.status();
        debug!("Received HTTP status: {} for {}", status, url);

        if !status.is_success() {
            error!("HTTP error {} for URL {}", status, url);
            return Err(match status {
                StatusCode::NOT_FOUND => network_err("Release asset not found (404)".to_string()),
                StatusCode::FORBIDDEN => network_err("Access forbidden (403)".to_string()),
                _ => network_err(format!("HTTP error {status}")),
            });
        }

        let mut session = DownloadSession::new(response.content_length());
        on_progress(DownloadProgress::Started {
            total_bytes: session.total_bytes(),
        });

        let temp_path = ArtifactCache::partial_path(dest);
        debug!("Downloading to temporary path: {}", temp_path.display());
        let mut file = TokioFile::create(&temp_path).await.map_err(|e| {
            FridaError::IoError(format!(
                "Failed to create temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        let streamed: Result<()> = async {
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| network_err(format!("Failed to read response body: {e}")))?
            {
                for piece in chunk.chunks(CHUNK_SIZE) {
                    file.write_all(piece).await.map_err(|e| {
                        FridaError::IoError(format!(
                            "Failed to write download stream to {}: {}",
                            temp_path.display(),
                            e
                        ))
                    })?;
                    if let Some(progress) = session.record(piece.len()) {
                        on_progress(progress);
                    }
                }
            }
            file.flush().await?;
            Ok(())
        }
        .await;
        drop(file);

        if let Err(e) = streamed {
            discard_partial(&temp_path).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&temp_path, dest).await {
            discard_partial(&temp_path).await;
            return Err(FridaError::IoError(format!(
                "Failed to move temp file {} to {}: {}",
                temp_path.display(),
                dest.display(),
                e
            )));
        }

        let bytes = session.bytes_transferred();
        on_progress(DownloadProgress::Finished {
            bytes_transferred: bytes,
        });
        debug!("Finished writing {} bytes to {}", bytes, dest.display());
        Ok(bytes)
    }
}

async fn discard_partial(temp_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(temp_path).await {
        warn!(
            "Could not remove partial download {}: {}",
            temp_path.display(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use fridactl_common::model::{ArchTag, OsTag};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    /// Serves one raw HTTP/1.1 response and hands back the request line.
    async fn serve_once(head: String, body: Vec<u8>) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&body).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });
        (addr, handle)
    }

    fn downloader(addr: SocketAddr, home: &Path) -> Downloader {
        let mut config = Config::new(home);
        config.release_base_url = format!("http://{addr}/releases/");
        Downloader::new(&config).unwrap()
    }

    fn key() -> ArtifactKey {
        ArtifactKey::new("16.1.4", OsTag::Android, ArchTag::Arm64).unwrap()
    }

    #[tokio::test]
    async fn downloads_with_monotonic_percent_progress() {
        let body: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let (addr, server) = serve_once(head, body.clone()).await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("frida.xz");

        let mut events = Vec::new();
        let bytes = downloader(addr, tmp.path())
            .download(&key(), &dest, |p| events.push(p))
            .await
            .unwrap();

        assert_eq!(bytes, body.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
        assert_eq!(
            server.await.unwrap(),
            "GET /releases/16.1.4/frida-server-16.1.4-android-arm64.xz HTTP/1.1"
        );

        assert_eq!(
            events.first(),
            Some(&DownloadProgress::Started {
                total_bytes: Some(200_000)
            })
        );
        assert_eq!(
            events.last(),
            Some(&DownloadProgress::Finished {
                bytes_transferred: 200_000
            })
        );
        let percents: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                DownloadProgress::Percent(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert!(percents.windows(2).all(|w| w[0] < w[1]), "{percents:?}");
        assert_eq!(percents.last(), Some(&100));
    }

    #[tokio::test]
    async fn unknown_length_reports_indeterminate_progress() {
        let body = vec![7u8; 20_000];
        let (addr, _server) =
            serve_once("HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_string(), body).await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("frida.xz");

        let mut events = Vec::new();
        downloader(addr, tmp.path())
            .download(&key(), &dest, |p| events.push(p))
            .await
            .unwrap();

        assert_eq!(events[0], DownloadProgress::Started { total_bytes: None });
        assert!(events
            .iter()
            .any(|e| matches!(e, DownloadProgress::Indeterminate { .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, DownloadProgress::Percent(_))));
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 20_000);
    }

    #[tokio::test]
    async fn not_found_is_a_network_error_and_releases_the_slot() {
        let (addr, _server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                .to_string(),
            Vec::new(),
        )
        .await;
        let tmp = tempfile::tempdir().unwrap();
        let d = downloader(addr, tmp.path());

        let err = d
            .download(&key(), &tmp.path().join("x.xz"), |_| {})
            .await
            .unwrap_err();
        match err {
            FridaError::Network(_, url, msg) => {
                assert!(url.ends_with("frida-server-16.1.4-android-arm64.xz"));
                assert!(msg.contains("404"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!d.is_downloading());
        d.try_acquire().unwrap();
    }

    #[tokio::test]
    async fn concurrent_download_is_rejected_without_touching_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::new(tmp.path());
        config.release_base_url = "http://127.0.0.1:9".to_string();
        let d = Downloader::new(&config).unwrap();
        let dest = tmp.path().join("in-progress.xz");
        std::fs::write(&dest, b"partial bytes of the first download").unwrap();

        let permit = d.try_acquire().unwrap();
        assert!(d.is_downloading());
        let err = d.download(&key(), &dest, |_| {}).await.unwrap_err();
        assert!(matches!(err, FridaError::DownloadInProgress));
        assert_eq!(
            std::fs::read(&dest).unwrap(),
            b"partial bytes of the first download"
        );

        drop(permit);
        assert!(!d.is_downloading());
    }

    #[tokio::test]
    async fn truncated_body_leaves_nothing_at_destination() {
        let head = "HTTP/1.1 200 OK\r\nContent-Length: 50000\r\nConnection: close\r\n\r\n";
        let (addr, _server) = serve_once(head.to_string(), vec![1u8; 12_000]).await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("frida.xz");
        let d = downloader(addr, tmp.path());

        let err = d.download(&key(), &dest, |_| {}).await.unwrap_err();

        assert!(matches!(err, FridaError::Network(..)), "{err:?}");
        assert!(!dest.exists());
        assert!(!ArtifactCache::partial_path(&dest).exists());
        assert!(!d.is_downloading());
    }

    #[tokio::test]
    async fn download_under_a_held_permit() {
        let body = b"frida".to_vec();
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let (addr, _server) = serve_once(head, body).await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("frida.xz");
        let d = downloader(addr, tmp.path());

        let permit = d.try_acquire().unwrap();
        d.download_with(&permit, &key(), &dest, |_| {}).await.unwrap();
        assert!(d.is_downloading());
        drop(permit);

        assert_eq!(std::fs::read(&dest).unwrap(), b"frida");
        assert!(!d.is_downloading());
    }

    #[tokio::test]
    async fn foreign_permit_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::new(tmp.path());
        let d = Downloader::new(&config).unwrap();
        let other = Downloader::new(&config).unwrap();
        let permit = other.try_acquire().unwrap();

        let err = d
            .download_with(&permit, &key(), &tmp.path().join("x.xz"), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, FridaError::Validation(_)));
    }

    #[test]
    fn clones_share_the_single_flight_slot() {
        let tmp = tempfile::tempdir().unwrap();
        let d = Downloader::new(&Config::new(tmp.path())).unwrap();
        let other = d.clone();
        let _permit = d.try_acquire().unwrap();
        assert!(matches!(
            other.try_acquire(),
            Err(FridaError::DownloadInProgress)
        ));
    }

    #[test]
    fn default_url_points_at_github_releases() {
        let tmp = tempfile::tempdir().unwrap();
        let d = Downloader::new(&Config::new(tmp.path())).unwrap();
        assert_eq!(
            d.url_for(&key()),
            "https://github.com/frida/frida/releases/download/16.1.4/frida-server-16.1.4-android-arm64.xz"
        );
    }
}
