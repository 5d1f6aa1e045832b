use bytes::Bytes;
use chunk_reassembly::{ChunkSink, ReassemblyError};
use tokio::sync::oneshot;
use tracing::debug;

use crate::digest::{Digest, DigestAlgo, StreamingDigest};

pub type DigestResult = std::result::Result<Digest, ReassemblyError>;

/// A [`ChunkSink`] that feeds every forwarded chunk into a streaming digest.
///
/// The finished digest, or the error that ended the reassembly, is sent on the channel returned
/// by [`DigestSink::new`].  A cancelled reassembly drops the sender without sending.
pub struct DigestSink {
    digest: Option<StreamingDigest>,
    bytes_hashed: u64,
    result_tx: Option<oneshot::Sender<DigestResult>>,
}

impl DigestSink {
    pub fn new(algo: DigestAlgo) -> (Self, oneshot::Receiver<DigestResult>) {
        let (result_tx, result_rx) = oneshot::channel();
        let sink = Self {
            digest: Some(algo.streaming()),
            bytes_hashed: 0,
            result_tx: Some(result_tx),
        };
        (sink, result_rx)
    }

    fn send(&mut self, result: DigestResult) {
        if let Some(tx) = self.result_tx.take() {
            // The receiver may have given up on the result.
            let _ = tx.send(result);
        }
    }
}

impl ChunkSink for DigestSink {
    fn on_chunk(&mut self, data: Bytes, _offset: u64) {
        if let Some(digest) = self.digest.as_mut() {
            digest.update(&data);
            self.bytes_hashed += data.len() as u64;
        }
    }

    fn on_complete(&mut self) {
        if let Some(digest) = self.digest.take() {
            let digest = digest.finalize();
            debug!(algo = %digest.algo(), bytes_hashed = self.bytes_hashed, "Digest finalized");
            self.send(Ok(digest));
        }
    }

    fn on_error(&mut self, error: ReassemblyError) {
        self.digest = None;
        self.send(Err(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_of_forwarded_chunks() {
        let (mut sink, mut rx) = DigestSink::new(DigestAlgo::Sha256);
        sink.on_chunk(Bytes::from_static(b"Hello "), 0);
        sink.on_chunk(Bytes::from_static(b"World"), 6);
        sink.on_complete();

        let digest = rx.try_recv().unwrap().unwrap();
        assert_eq!(digest, Digest::compute(DigestAlgo::Sha256, b"Hello World"));
    }

    #[test]
    fn test_error_is_sent_and_chunks_after_it_ignored() {
        let (mut sink, mut rx) = DigestSink::new(DigestAlgo::Blake3);
        sink.on_chunk(Bytes::from_static(b"Hello "), 0);
        sink.on_error(ReassemblyError::ChunkRead {
            offset: 6,
            message: "gone".to_string(),
        });
        sink.on_chunk(Bytes::from_static(b"World"), 6);
        sink.on_complete();

        assert!(matches!(rx.try_recv().unwrap(), Err(ReassemblyError::ChunkRead { offset: 6, .. })));
        assert_eq!(sink.bytes_hashed, 6);
    }

    #[test]
    fn test_dropped_sink_closes_channel() {
        let (sink, mut rx) = DigestSink::new(DigestAlgo::Sha512);
        drop(sink);
        assert!(matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Closed)));
    }
}
