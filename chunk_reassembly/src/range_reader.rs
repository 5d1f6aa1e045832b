use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::task::spawn_blocking;

use crate::chunk_plan::ChunkRange;
use crate::error::{ReassemblyError, Result};

/// A read-only, byte-addressable input of known length.
///
/// `read_range` may be called concurrently for disjoint ranges.
#[async_trait::async_trait]
pub trait RangeReader: Send + Sync {
    /// The total length of the input in bytes.
    fn total_size(&self) -> u64;

    /// Reads exactly the bytes in `range`.
    async fn read_range(&self, range: ChunkRange) -> Result<Bytes>;
}

fn check_bounds(range: ChunkRange, total_size: u64) -> Result<()> {
    if range.end > total_size {
        return Err(ReassemblyError::InvalidChunk {
            offset: range.start,
            size: range.len(),
            reason: format!("range {range:?} is outside the input of {total_size} bytes"),
        });
    }
    Ok(())
}

/// An in-memory input.
#[derive(Clone)]
pub struct BytesRangeReader {
    data: Bytes,
}

impl BytesRangeReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait::async_trait]
impl RangeReader for BytesRangeReader {
    fn total_size(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_range(&self, range: ChunkRange) -> Result<Bytes> {
        check_bounds(range, self.total_size())?;
        Ok(self.data.slice(range.start as usize..range.end as usize))
    }
}

/// A file on disk.  The size is taken when the reader is opened; each range is read with a
/// positioned read on the blocking thread pool.
pub struct FileRangeReader {
    path: PathBuf,
    total_size: u64,
}

impl FileRangeReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            )
            .into());
        }
        Ok(Self {
            path,
            total_size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl RangeReader for FileRangeReader {
    fn total_size(&self) -> u64 {
        self.total_size
    }

    async fn read_range(&self, range: ChunkRange) -> Result<Bytes> {
        check_bounds(range, self.total_size)?;
        let path = self.path.clone();

        spawn_blocking(move || -> Result<Bytes> {
            let mut file = File::open(&path)?;
            file.seek(SeekFrom::Start(range.start))?;
            let mut buf = vec![0u8; range.len() as usize];
            file.read_exact(&mut buf).map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    ReassemblyError::ChunkRead {
                        offset: range.start,
                        message: format!("short read of {range:?} from {}", path.display()),
                    }
                } else {
                    e.into()
                }
            })?;
            Ok(Bytes::from(buf))
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[tokio::test]
    async fn test_bytes_reader_slices() {
        let reader = BytesRangeReader::new(Bytes::from_static(b"Hello World"));
        assert_eq!(reader.total_size(), 11);
        assert_eq!(&reader.read_range(ChunkRange::new(6, 11)).await.unwrap()[..], b"World");
        assert!(matches!(
            reader.read_range(ChunkRange::new(6, 12)).await,
            Err(ReassemblyError::InvalidChunk { offset: 6, .. })
        ));
    }

    #[tokio::test]
    async fn test_file_reader_positioned_reads() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let reader = FileRangeReader::open(file.path()).unwrap();
        assert_eq!(reader.total_size(), 10);
        assert_eq!(&reader.read_range(ChunkRange::new(3, 7)).await.unwrap()[..], b"3456");
        assert_eq!(&reader.read_range(ChunkRange::new(8, 10)).await.unwrap()[..], b"89");
    }

    #[tokio::test]
    async fn test_file_reader_short_read_is_retryable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let reader = FileRangeReader::open(file.path()).unwrap();
        file.as_file().set_len(5).unwrap();

        let err = reader.read_range(ChunkRange::new(4, 8)).await.unwrap_err();
        assert!(matches!(err, ReassemblyError::ChunkRead { offset: 4, .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_file_reader_rejects_missing_and_directories() {
        let dir = tempfile::tempdir().unwrap();

        let missing = FileRangeReader::open(dir.path().join("missing.bin")).err().unwrap();
        assert!(!missing.is_retryable());

        let not_a_file = FileRangeReader::open(dir.path()).err().unwrap();
        assert!(matches!(not_a_file, ReassemblyError::IoError(_)));
    }
}
