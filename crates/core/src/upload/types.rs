//! Types for the upload module.

use serde::Serialize;

use super::error::UploadError;

/// How a file was transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMode {
    /// One PUT of the whole content.
    Simple,
    /// Upload session with byte-ranged chunks.
    Session,
}

impl UploadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Session => "session",
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub file_name: String,
    /// Destination path inside the drive, unescaped.
    pub remote_path: String,
    pub size: u64,
    pub mode: UploadMode,
    pub chunks: u32,
    pub item_id: Option<String>,
    pub web_url: Option<String>,
    pub duration_ms: u64,
}

/// An inclusive byte range of one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub start: u64,
    /// Last byte, inclusive.
    pub end: u64,
    pub total: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the `Content-Range` header.
    pub fn content_range_header(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Splits `total` bytes into sequential chunks of at most `chunk_size`.
pub fn plan_chunks(total: u64, chunk_size: u64) -> Vec<ChunkRange> {
    let chunk_size = if chunk_size == 0 { total.max(1) } else { chunk_size };
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total) - 1;
        ranges.push(ChunkRange { start, end, total });
        start = end + 1;
    }
    ranges
}

/// A server-negotiated upload session in progress.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub upload_url: String,
    pub total_size: u64,
    pub chunk_size: u64,
    bytes_uploaded: u64,
}

impl UploadSession {
    pub fn new(upload_url: String, total_size: u64, chunk_size: u64) -> Self {
        Self {
            upload_url,
            total_size,
            chunk_size: chunk_size.max(1),
            bytes_uploaded: 0,
        }
    }

    pub fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_uploaded >= self.total_size
    }

    /// Range of the next chunk to send, `None` once complete.
    pub fn next_range(&self) -> Option<ChunkRange> {
        if self.is_complete() {
            return None;
        }
        let end = (self.bytes_uploaded + self.chunk_size).min(self.total_size) - 1;
        Some(ChunkRange {
            start: self.bytes_uploaded,
            end,
            total: self.total_size,
        })
    }

    /// Records an accepted chunk. The counter only moves forward and never
    /// passes `total_size`.
    pub fn advance(&mut self, bytes: u64) -> Result<u64, UploadError> {
        let next = self.bytes_uploaded.saturating_add(bytes);
        if next > self.total_size {
            return Err(UploadError::InvalidResponse(format!(
                "session would exceed file size: {} + {} > {}",
                self.bytes_uploaded, bytes, self.total_size
            )));
        }
        self.bytes_uploaded = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_chunks_counts_and_last_range() {
        let sizes = [1u64, 9, 10, 11, 25, 99, 100, 101, 1_000_003];
        let chunk_sizes = [1u64, 3, 10, 64, 1024];

        for &total in &sizes {
            for &chunk in &chunk_sizes {
                let ranges = plan_chunks(total, chunk);
                assert_eq!(ranges.len() as u64, total.div_ceil(chunk));
                assert_eq!(ranges[0].start, 0);
                assert_eq!(ranges.last().unwrap().end, total - 1);
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].end + 1, pair[1].start);
                }
                assert!(ranges.iter().all(|r| r.len() <= chunk));
            }
        }
    }

    #[test]
    fn test_plan_chunks_empty_file() {
        assert!(plan_chunks(0, 10).is_empty());
    }

    #[test]
    fn test_content_range_header() {
        let ranges = plan_chunks(25, 10);
        let headers: Vec<String> = ranges.iter().map(|r| r.content_range_header()).collect();
        assert_eq!(
            headers,
            vec!["bytes 0-9/25", "bytes 10-19/25", "bytes 20-24/25"]
        );
    }

    #[test]
    fn test_session_progress_monotonic() {
        let mut session = UploadSession::new("https://upload".to_string(), 25, 10);
        let mut seen = Vec::new();
        while let Some(range) = session.next_range() {
            let before = session.bytes_uploaded();
            let after = session.advance(range.len()).unwrap();
            assert!(after > before);
            seen.push(range);
        }
        assert_eq!(seen, plan_chunks(25, 10));
        assert!(session.is_complete());
    }

    #[test]
    fn test_session_refuses_overflow() {
        let mut session = UploadSession::new("https://upload".to_string(), 10, 10);
        session.advance(8).unwrap();
        assert!(session.advance(5).is_err());
        assert_eq!(session.bytes_uploaded(), 8);
    }
}
