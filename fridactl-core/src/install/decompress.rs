// Path: fridactl-core/src/install/decompress.rs
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use fridactl_common::cache::ArtifactCache;
use fridactl_common::error::{FridaError, Result};
use fridactl_net::verify_content_type;
use tracing::{debug, warn};
use xz2::read::XzDecoder;

const BUFFER_SIZE: usize = 8 * 1024;

/// Streams an `.xz` artifact into `out_path`, returning the decompressed size.
///
/// Memory use is bounded by the buffer regardless of artifact size. Output
/// goes to a hidden sibling first and is renamed over `out_path` only after
/// the whole stream decoded, so a failure never leaves a truncated binary
/// where the cache would accept it.
pub fn decompress_xz(compressed_path: &Path, out_path: &Path) -> Result<u64> {
    debug!(
        "Decompressing {} -> {}",
        compressed_path.display(),
        out_path.display()
    );
    verify_content_type(compressed_path, "xz")?;

    let temp_path = ArtifactCache::partial_path(out_path);
    let written = match decode_into(compressed_path, &temp_path) {
        Ok(written) => written,
        Err(e) => {
            discard_partial(&temp_path);
            return Err(e);
        }
    };
    fs::rename(&temp_path, out_path).map_err(|e| {
        discard_partial(&temp_path);
        FridaError::IoError(format!(
            "Failed to move temp file {} to {}: {}",
            temp_path.display(),
            out_path.display(),
            e
        ))
    })?;

    debug!("Decompressed {} bytes to {}", written, out_path.display());
    Ok(written)
}

fn decode_into(compressed_path: &Path, temp_path: &Path) -> Result<u64> {
    let input = File::open(compressed_path).map_err(|e| {
        FridaError::IoError(format!(
            "Failed to open archive {}: {}",
            compressed_path.display(),
            e
        ))
    })?;
    let mut decoder = XzDecoder::new(input);
    let output = File::create(temp_path).map_err(|e| {
        FridaError::IoError(format!("Failed to create {}: {}", temp_path.display(), e))
    })?;
    let mut writer = BufWriter::new(output);

    let mut buffer = [0u8; BUFFER_SIZE];
    let mut written: u64 = 0;
    loop {
        let n = decoder.read(&mut buffer).map_err(|e| {
            FridaError::IoError(format!(
                "Failed to decode {}: {}",
                compressed_path.display(),
                e
            ))
        })?;
        if n == 0 {
            break;
        }
        writer.write_all(&buffer[..n])?;
        written += n as u64;
    }
    writer.flush()?;
    Ok(written)
}

fn discard_partial(temp_path: &Path) {
    if temp_path.exists() {
        if let Err(e) = fs::remove_file(temp_path) {
            warn!(
                "Could not remove partial output {}: {}",
                temp_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use xz2::write::XzEncoder;

    use super::*;

    fn xz(data: &[u8]) -> Vec<u8> {
        let mut encoder = XzEncoder::new(Vec::new(), 6);
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn decompresses_larger_than_buffer() {
        let tmp = tempfile::tempdir().unwrap();
        let original: Vec<u8> = (0..100_000u32).flat_map(|i| i.to_le_bytes()).collect();
        let archive = tmp.path().join("server.xz");
        let out = tmp.path().join("server");
        fs::write(&archive, xz(&original)).unwrap();

        let written = decompress_xz(&archive, &out).unwrap();

        assert_eq!(written, original.len() as u64);
        assert_eq!(fs::read(&out).unwrap(), original);
    }

    #[test]
    fn truncated_archive_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut data = xz(&[42u8; 50_000]);
        data.truncate(data.len() / 2);
        let archive = tmp.path().join("server.xz");
        fs::write(&archive, data).unwrap();

        let out = tmp.path().join("server");

        let err = decompress_xz(&archive, &out).unwrap_err();
        assert!(matches!(err, FridaError::IoError(_)), "{err:?}");
        assert!(!out.exists());
        assert!(!ArtifactCache::partial_path(&out).exists());
    }

    #[test]
    fn failed_decode_keeps_the_previous_output() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("server");
        fs::write(&out, b"previous good binary").unwrap();
        let mut data = xz(&(0..400_000u32).flat_map(|i| i.to_le_bytes()).collect::<Vec<_>>());
        data.truncate(data.len() * 3 / 4);
        let archive = tmp.path().join("server.xz");
        fs::write(&archive, data).unwrap();

        assert!(decompress_xz(&archive, &out).is_err());
        assert_eq!(fs::read(&out).unwrap(), b"previous good binary");
    }

    #[test]
    fn non_xz_payload_is_rejected_before_decoding() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("server.xz");
        let out = tmp.path().join("server");
        fs::write(&archive, b"<html><body>rate limited</body></html>").unwrap();

        let err = decompress_xz(&archive, &out).unwrap_err();
        assert!(matches!(err, FridaError::Validation(_)), "{err:?}");
        assert!(!out.exists());
    }

    #[test]
    fn missing_archive_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = decompress_xz(&tmp.path().join("nope.xz"), &tmp.path().join("out"));
        assert!(err.is_err());
    }
}
