// fridactl-net/src/progress.rs
//! Byte-level progress bookkeeping for a single transfer.

/// Progress notifications handed to the downloader's observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadProgress {
    /// Response headers received; `total_bytes` is `None` when the server did
    /// not declare a usable content length.
    Started { total_bytes: Option<u64> },
    /// Whole-number percentage, reported once per distinct value.
    Percent(u8),
    /// Bytes so far when the total is unknown.
    Indeterminate { bytes_transferred: u64 },
    Finished { bytes_transferred: u64 },
}

/// State of one network transfer. Discarded when the transfer ends.
#[derive(Debug)]
pub struct DownloadSession {
    total_bytes: Option<u64>,
    bytes_transferred: u64,
    last_reported_percent: Option<u8>,
}

impl DownloadSession {
    /// A declared length of zero is treated the same as no declared length.
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            total_bytes: total_bytes.filter(|&n| n > 0),
            bytes_transferred: 0,
            last_reported_percent: None,
        }
    }

    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    /// Accounts for `len` more bytes and returns the notification to emit, if any.
    /// With a known total only a changed percentage is returned, so each value
    /// is seen once and the sequence never decreases.
    pub fn record(&mut self, len: usize) -> Option<DownloadProgress> {
        self.bytes_transferred += len as u64;
        match self.total_bytes {
            Some(total) => {
                let percent = (self.bytes_transferred.saturating_mul(100) / total).min(100) as u8;
                if self.last_reported_percent != Some(percent) {
                    self.last_reported_percent = Some(percent);
                    Some(DownloadProgress::Percent(percent))
                } else {
                    None
                }
            }
            None => Some(DownloadProgress::Indeterminate {
                bytes_transferred: self.bytes_transferred,
            }),
        }
    }
}
