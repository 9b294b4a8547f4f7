//! Incremental reader: text appended to a file since a byte offset.

use crate::error::ReadError;
use encoding_rs::Encoding;
use std::io::SeekFrom;
use std::path::Path;
use tailpost_config::{resolve_encodings, ReaderSettings, ValidationError};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, trace};

/// Decoded text read from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadChunk {
    /// Decoded content, BOM removed.
    pub content: String,
    /// Encoding that decoded the content.
    pub encoding: &'static Encoding,
    /// Byte offset just past the consumed bytes.
    pub end_offset: u64,
}

impl ReadChunk {
    fn empty(encoding: &'static Encoding, offset: u64) -> Self {
        Self {
            content: String::new(),
            encoding,
            end_offset: offset,
        }
    }

    /// Whether nothing was read.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Reads the tail of a file, trying a prioritized list of encodings.
///
/// Detection is heuristic: the first candidate that decodes the bytes
/// without error wins.
#[derive(Debug, Clone)]
pub struct IncrementalReader {
    candidates: Vec<&'static Encoding>,
}

impl Default for IncrementalReader {
    fn default() -> Self {
        Self::new(vec![encoding_rs::UTF_8, encoding_rs::EUC_KR])
    }
}

impl IncrementalReader {
    /// Create a reader over the given candidate encodings.
    pub fn new(candidates: Vec<&'static Encoding>) -> Self {
        Self { candidates }
    }

    /// Create a reader from configured encoding labels.
    pub fn from_settings(settings: &ReaderSettings) -> Result<Self, ValidationError> {
        Ok(Self::new(resolve_encodings(&settings.encodings)?))
    }

    /// Candidate encodings in the order they are tried.
    pub fn candidates(&self) -> &[&'static Encoding] {
        &self.candidates
    }

    /// Read and decode everything from `offset` to end of file.
    ///
    /// `hint` is tried before the configured candidates. An offset at or past
    /// the end yields an empty chunk. At offset zero a byte-order mark selects
    /// its encoding and is stripped.
    pub async fn read_from(
        &self,
        path: &Path,
        offset: u64,
        hint: Option<&'static Encoding>,
    ) -> Result<ReadChunk, ReadError> {
        let io_err = |source| ReadError::Io {
            path: path.to_path_buf(),
            source,
        };
        let fallback = hint
            .or_else(|| self.candidates.first().copied())
            .unwrap_or(encoding_rs::UTF_8);

        let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
        let size = file.metadata().await.map_err(io_err)?.len();
        if offset >= size {
            trace!(path = %path.display(), offset, size, "no new bytes");
            return Ok(ReadChunk::empty(fallback, offset));
        }

        file.seek(SeekFrom::Start(offset)).await.map_err(io_err)?;
        let mut bytes = Vec::with_capacity((size - offset) as usize);
        file.read_to_end(&mut bytes).await.map_err(io_err)?;
        let end_offset = offset + bytes.len() as u64;

        if offset == 0 {
            if let Some((encoding, bom_len)) = Encoding::for_bom(&bytes) {
                if let Some(text) =
                    encoding.decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
                {
                    debug!(path = %path.display(), encoding = encoding.name(), "decoded via byte-order mark");
                    return Ok(ReadChunk {
                        content: text.into_owned(),
                        encoding,
                        end_offset,
                    });
                }
            }
        }

        for encoding in hint.into_iter().chain(self.candidates.iter().copied()) {
            match encoding.decode_without_bom_handling_and_without_replacement(&bytes) {
                Some(text) => {
                    trace!(path = %path.display(), encoding = encoding.name(), bytes = bytes.len(), "decoded");
                    return Ok(ReadChunk {
                        content: text.into_owned(),
                        encoding,
                        end_offset,
                    });
                }
                None => trace!(path = %path.display(), encoding = encoding.name(), "decode failed"),
            }
        }

        Err(ReadError::Undecodable {
            path: path.to_path_buf(),
            offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write(temp: &TempDir, bytes: &[u8]) -> std::path::PathBuf {
        let path = temp.path().join("log.txt");
        tokio::fs::write(&path, bytes).await.unwrap();
        path
    }

    #[tokio::test]
    async fn reads_from_offset_to_end() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, b"Hello\nWorld\n").await;

        let chunk = IncrementalReader::default()
            .read_from(&path, 6, None)
            .await
            .unwrap();
        assert_eq!(chunk.content, "World\n");
        assert_eq!(chunk.encoding, encoding_rs::UTF_8);
        assert_eq!(chunk.end_offset, 12);
    }

    #[tokio::test]
    async fn offset_past_end_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, b"abc").await;

        let chunk = IncrementalReader::default()
            .read_from(&path, 10, None)
            .await
            .unwrap();
        assert!(chunk.is_empty());
        assert_eq!(chunk.end_offset, 10);
    }

    #[tokio::test]
    async fn falls_back_to_euc_kr() {
        let temp = TempDir::new().unwrap();
        let (bytes, _, _) = encoding_rs::EUC_KR.encode("안녕하세요\n");
        let path = write(&temp, &bytes).await;

        let chunk = IncrementalReader::default()
            .read_from(&path, 0, None)
            .await
            .unwrap();
        assert_eq!(chunk.content, "안녕하세요\n");
        assert_eq!(chunk.encoding, encoding_rs::EUC_KR);
    }

    #[tokio::test]
    async fn strips_utf8_bom_at_start() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, b"\xEF\xBB\xBFHello\n").await;

        let chunk = IncrementalReader::default()
            .read_from(&path, 0, None)
            .await
            .unwrap();
        assert_eq!(chunk.content, "Hello\n");
        assert_eq!(chunk.end_offset, 9);
    }

    #[tokio::test]
    async fn hint_is_tried_first() {
        let temp = TempDir::new().unwrap();
        // Valid in both UTF-8 and EUC-KR; the hint decides.
        let path = write(&temp, b"plain ascii\n").await;

        let chunk = IncrementalReader::default()
            .read_from(&path, 0, Some(encoding_rs::EUC_KR))
            .await
            .unwrap();
        assert_eq!(chunk.encoding, encoding_rs::EUC_KR);
    }

    #[tokio::test]
    async fn undecodable_bytes_are_an_error() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, &[0xFF, 0xFF, 0xFF]).await;

        let reader = IncrementalReader::new(vec![encoding_rs::UTF_8]);
        let err = reader.read_from(&path, 0, None).await.unwrap_err();
        assert!(matches!(err, ReadError::Undecodable { offset: 0, .. }));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = IncrementalReader::default()
            .read_from(&temp.path().join("gone.txt"), 0, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn builds_from_settings() {
        let reader = IncrementalReader::from_settings(&ReaderSettings::default()).unwrap();
        assert_eq!(
            reader.candidates(),
            &[encoding_rs::UTF_8, encoding_rs::EUC_KR]
        );
    }
}
