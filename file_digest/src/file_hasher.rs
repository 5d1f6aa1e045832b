use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chunk_reassembly::{BytesRangeReader, FileRangeReader, RangeReader, ReassemblySession};
use ::hash_config::{ReassemblyConfig, hash_config};
use tracing::{info, instrument};

use crate::digest::{Digest, DigestAlgo};
use crate::digest_sink::DigestSink;
use crate::errors::{DigestError, Result};

/// Digests whole inputs by reading them in concurrent chunks and hashing the chunks in order.
#[derive(Debug, Clone)]
pub struct FileHasher {
    algo: DigestAlgo,
    config: ReassemblyConfig,
}

impl FileHasher {
    /// A hasher using the process-wide reassembly configuration.
    pub fn new(algo: DigestAlgo) -> Self {
        Self {
            algo,
            config: hash_config().reassembly.clone(),
        }
    }

    pub fn with_config(self, config: ReassemblyConfig) -> Self {
        Self { config, ..self }
    }

    pub fn algo(&self) -> DigestAlgo {
        self.algo
    }

    pub fn config(&self) -> &ReassemblyConfig {
        &self.config
    }

    #[instrument(skip(self), fields(algo = %self.algo))]
    pub async fn hash_file(&self, path: &Path) -> Result<Digest> {
        let reader = FileRangeReader::open(path)?;
        self.hash_reader(Arc::new(reader)).await
    }

    pub async fn hash_bytes(&self, data: impl Into<Bytes>) -> Result<Digest> {
        self.hash_reader(Arc::new(BytesRangeReader::new(data))).await
    }

    /// Returns whether the digest of the file at `path` matches `expected_hex`.
    pub async fn verify_file(&self, path: &Path, expected_hex: &str) -> Result<bool> {
        let expected = Digest::from_hex(self.algo, expected_hex)?;
        Ok(self.hash_file(path).await? == expected)
    }

    pub async fn hash_reader(&self, reader: Arc<dyn RangeReader>) -> Result<Digest> {
        let total_size = reader.total_size();
        let (sink, result_rx) = DigestSink::new(self.algo);

        let session = ReassemblySession::begin(reader, sink, &self.config)?;
        let session_id = session.id();
        let stats = session.wait().await?;

        let digest = result_rx
            .await
            .map_err(|_| DigestError::InternalError("reassembly finished without producing a digest".to_string()))??;

        info!(
            id = %session_id,
            algo = %self.algo,
            total_size,
            chunks = stats.chunks_forwarded,
            peak_pending_chunks = stats.peak_pending_chunks,
            "Input digested"
        );
        Ok(digest)
    }
}
