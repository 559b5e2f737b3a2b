// fridactl-net/src/lib.rs
pub mod http;
pub mod progress;
pub mod validation;

pub use http::{build_http_client, DownloadPermit, Downloader, CHUNK_SIZE};
pub use progress::{DownloadProgress, DownloadSession};
pub use validation::{validate_url, verify_content_type};
