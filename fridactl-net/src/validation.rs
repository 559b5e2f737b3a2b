// fridactl-net/src/validation.rs
use std::path::Path;

use fridactl_common::error::{FridaError, Result};
use url::Url;

/// Validates a download URL. Release downloads must use https; plain http is
/// only accepted when `allow_http` is set (local mirrors).
pub fn validate_url(url_str: &str, allow_http: bool) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| FridaError::Validation(format!("Failed to parse URL '{url_str}': {e}")))?;
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_http => {
            tracing::warn!("Downloading over plain http: {}", url_str);
            Ok(())
        }
        other => Err(FridaError::Validation(format!(
            "Invalid URL scheme for '{url_str}': Must be https, but got '{other}'"
        ))),
    }
}

/// Sniffs the magic bytes of a downloaded archive before it is decoded.
///
/// Release hosts and captive portals can answer with an HTML page; that
/// is reported here by name instead of as an opaque decoder error.
pub fn verify_content_type(path: &Path, expected_ext: &str) -> Result<()> {
    let detected = infer::get_from_path(path)
        .map_err(|e| FridaError::IoError(format!("Failed to read {}: {}", path.display(), e)))?
        .map(|kind| kind.extension());

    match detected {
        Some(ext) if ext.eq_ignore_ascii_case(expected_ext) => {
            tracing::debug!("{} looks like a .{} archive", path.display(), ext);
            Ok(())
        }
        Some(ext) => Err(FridaError::Validation(format!(
            "{} is not a .{} archive: the content looks like '{}' (an error page from the release host?)",
            path.display(),
            expected_ext,
            ext
        ))),
        None => Err(FridaError::Validation(format!(
            "{} is not a .{} archive: unrecognised content",
            path.display(),
            expected_ext
        ))),
    }
}
