use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use utils::UniqueId;

use crate::chunk_plan::ChunkPlan;
use crate::error::{ReassemblyError, Result};
use crate::sink::ChunkSink;

/// What to do with a completion for a chunk that was already forwarded or buffered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Log the duplicate and drop it.
    #[default]
    Ignore,
    /// Return `ReassemblyError::DuplicateChunk` to the caller.  The reassembly itself is unaffected.
    Reject,
}

impl DuplicatePolicy {
    pub fn from_reject_flag(reject_duplicates: bool) -> Self {
        if reject_duplicates { Self::Reject } else { Self::Ignore }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReassemblyState {
    Active,
    Complete,
    Failed,
    Cancelled,
}

impl ReassemblyState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReassemblyState::Active)
    }
}

/// The outcome of handing one completed chunk to the reassembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkDisposition {
    /// The chunk was the next expected one and was forwarded, followed by `drained`
    /// chunks from the pending buffer.
    Forwarded { drained: usize },
    /// The chunk arrived ahead of the cursor and is held in the pending buffer.
    Buffered,
    /// The chunk was already forwarded or buffered; nothing changed.
    DuplicateIgnored,
    /// The reassembly already reached a terminal state; the chunk was dropped.
    Discarded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    pub chunks_forwarded: u64,
    pub bytes_forwarded: u64,
    /// Chunks that arrived ahead of the cursor and had to wait in the pending buffer.
    pub chunks_buffered: u64,
    pub peak_pending_chunks: usize,
    pub duplicates_ignored: u64,
}

struct ReassemblyInner<S> {
    next_offset: u64,
    pending: BTreeMap<u64, Bytes>,
    sink: S,
    state: ReassemblyState,
    failure: Option<ReassemblyError>,
    stats: ReassemblyStats,
}

/// Turns chunk completions arriving in any order into an in-order stream delivered to a [`ChunkSink`].
///
/// One instance owns the cursor and pending buffer for exactly one input.  All state lives behind a
/// single mutex and every callback into the sink runs while it is held, so completions may be fed
/// from any number of tasks or threads.
pub struct OrderedChunkReassembler<S: ChunkSink> {
    id: UniqueId,
    plan: ChunkPlan,
    duplicate_policy: DuplicatePolicy,
    cancel_token: CancellationToken,
    inner: Mutex<ReassemblyInner<S>>,
}

impl<S: ChunkSink> OrderedChunkReassembler<S> {
    /// Creates the reassembler.  For an empty input the sink's `on_complete` is invoked
    /// before this returns.
    pub fn new(plan: ChunkPlan, sink: S, duplicate_policy: DuplicatePolicy) -> Self {
        let reassembler = Self {
            id: UniqueId::new(),
            plan,
            duplicate_policy,
            cancel_token: CancellationToken::new(),
            inner: Mutex::new(ReassemblyInner {
                next_offset: 0,
                pending: BTreeMap::new(),
                sink,
                state: ReassemblyState::Active,
                failure: None,
                stats: ReassemblyStats::default(),
            }),
        };

        if plan.total_size() == 0 {
            let mut inner = reassembler.lock();
            reassembler.complete(&mut inner);
            drop(inner);
        }

        reassembler
    }

    pub fn id(&self) -> UniqueId {
        self.id
    }

    pub fn plan(&self) -> &ChunkPlan {
        &self.plan
    }

    /// The token cancelled when this reassembly is cancelled or reaches any terminal state.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn state(&self) -> ReassemblyState {
        self.lock().state
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn next_offset(&self) -> u64 {
        self.lock().next_offset
    }

    pub fn pending_chunks(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn stats(&self) -> ReassemblyStats {
        self.lock().stats
    }

    /// The error the reassembly failed with, once it is in the `Failed` state.
    pub fn failure(&self) -> Option<ReassemblyError> {
        self.lock().failure.clone()
    }

    /// Consumes the reassembler and returns its sink.
    pub fn into_sink(self) -> S {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner).sink
    }

    fn lock(&self) -> MutexGuard<'_, ReassemblyInner<S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands over the payload of the chunk `[offset, offset + size)`.
    ///
    /// The chunk is forwarded immediately if it is the next one expected, followed by every
    /// buffered chunk that has become contiguous; otherwise it is buffered.  Descriptors that do
    /// not match the chunk plan are rejected without touching any state.
    pub fn on_chunk_ready(&self, offset: u64, size: u64, payload: Bytes) -> Result<ChunkDisposition> {
        let mut inner = self.lock();

        if self.observe_cancellation(&mut inner) {
            debug!(id = %self.id, offset, "Discarding chunk completion for a finished reassembly");
            return Ok(ChunkDisposition::Discarded);
        }

        self.plan.check_chunk(offset, size)?;
        if payload.len() as u64 != size {
            return Err(ReassemblyError::InvalidChunk {
                offset,
                size,
                reason: format!("payload has {} bytes", payload.len()),
            });
        }

        if offset < inner.next_offset || inner.pending.contains_key(&offset) {
            return self.handle_duplicate(&mut inner, offset);
        }

        if offset != inner.next_offset {
            inner.pending.insert(offset, payload);
            inner.stats.chunks_buffered += 1;
            inner.stats.peak_pending_chunks = inner.stats.peak_pending_chunks.max(inner.pending.len());
            debug!(id = %self.id, offset, next_offset = inner.next_offset, "Buffered out-of-order chunk");
            return Ok(ChunkDisposition::Buffered);
        }

        self.forward(&mut inner, offset, payload);

        let mut drained = 0;
        while inner.state == ReassemblyState::Active {
            let next_offset = inner.next_offset;
            let Some(payload) = inner.pending.remove(&next_offset) else {
                break;
            };
            self.forward(&mut inner, next_offset, payload);
            drained += 1;
        }

        Ok(ChunkDisposition::Forwarded { drained })
    }

    /// Declares the reassembly failed because the chunk at `offset` could not be read.
    ///
    /// The sink receives a single `on_error` carrying `ReassemblyAborted`; the cursor and pending
    /// buffer are discarded.  Returns false if the reassembly had already finished.
    pub fn fail(&self, offset: u64, error: ReassemblyError) -> bool {
        let mut inner = self.lock();
        if self.observe_cancellation(&mut inner) {
            return false;
        }

        let aborted = ReassemblyError::ReassemblyAborted {
            offset,
            source: Box::new(error),
        };
        warn!(id = %self.id, offset, error = %aborted, "Reassembly failed");

        inner.state = ReassemblyState::Failed;
        inner.pending.clear();
        inner.failure = Some(aborted.clone());
        self.cancel_token.cancel();
        inner.sink.on_error(aborted);
        true
    }

    /// Cancels the reassembly.  No further sink callbacks fire, including the terminal ones.
    /// Returns false if the reassembly had already finished.
    pub fn cancel(&self) -> bool {
        let mut inner = self.lock();
        if inner.state.is_terminal() {
            return false;
        }
        self.cancel_token.cancel();
        self.observe_cancellation(&mut inner);
        true
    }

    /// Moves an active reassembly to `Cancelled` if its token was cancelled from outside.
    /// Returns true if the reassembly is terminal.
    fn observe_cancellation(&self, inner: &mut ReassemblyInner<S>) -> bool {
        if inner.state == ReassemblyState::Active && self.cancel_token.is_cancelled() {
            info!(id = %self.id, next_offset = inner.next_offset, "Reassembly cancelled");
            inner.state = ReassemblyState::Cancelled;
            inner.pending.clear();
        }
        inner.state.is_terminal()
    }

    fn handle_duplicate(&self, inner: &mut ReassemblyInner<S>, offset: u64) -> Result<ChunkDisposition> {
        match self.duplicate_policy {
            DuplicatePolicy::Ignore => {
                warn!(id = %self.id, offset, "Ignoring duplicate chunk completion");
                inner.stats.duplicates_ignored += 1;
                Ok(ChunkDisposition::DuplicateIgnored)
            },
            DuplicatePolicy::Reject => Err(ReassemblyError::DuplicateChunk { offset }),
        }
    }

    fn forward(&self, inner: &mut ReassemblyInner<S>, offset: u64, payload: Bytes) {
        debug_assert_eq!(offset, inner.next_offset);
        let len = payload.len() as u64;

        inner.sink.on_chunk(payload, offset);
        inner.next_offset = offset + len;
        inner.stats.chunks_forwarded += 1;
        inner.stats.bytes_forwarded += len;

        if inner.next_offset >= self.plan.total_size() {
            self.complete(inner);
        }
    }

    fn complete(&self, inner: &mut ReassemblyInner<S>) {
        debug_assert!(inner.pending.is_empty());
        inner.state = ReassemblyState::Complete;
        self.cancel_token.cancel();

        let stats = inner.stats;
        info!(
            id = %self.id,
            total_size = self.plan.total_size(),
            chunks_forwarded = stats.chunks_forwarded,
            chunks_buffered = stats.chunks_buffered,
            peak_pending_chunks = stats.peak_pending_chunks,
            duplicates_ignored = stats.duplicates_ignored,
            "Reassembly complete"
        );

        inner.sink.on_complete();
    }
}
