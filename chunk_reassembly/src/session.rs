use std::collections::HashMap;
use std::sync::Arc;

use hash_config::ReassemblyConfig;
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, warn};
use utils::UniqueId;

use crate::chunk_plan::{ChunkPlan, ChunkRange};
use crate::error::{ReassemblyError, Result};
use crate::range_reader::RangeReader;
use crate::reassembler::{ChunkDisposition, DuplicatePolicy, OrderedChunkReassembler, ReassemblyState, ReassemblyStats};
use crate::retry::ChunkReadRetry;
use crate::sink::ChunkSink;

/// A running reassembly of one input: reads every chunk of `reader` with bounded concurrency
/// and retries, and delivers them in order to the sink.
///
/// Chunks that are in flight or waiting in the pending buffer together never exceed
/// `max_buffered_bytes / chunk_size` (at least one), so a slow leading chunk stalls further
/// reads instead of letting the whole input pile up in memory.
pub struct ReassemblySession<S: ChunkSink + 'static> {
    reassembler: Arc<OrderedChunkReassembler<S>>,
    driver: JoinHandle<()>,
}

impl<S: ChunkSink + 'static> ReassemblySession<S> {
    /// Validates the configuration and starts reading.  Returns as soon as the driver task is spawned.
    ///
    /// Configuration errors are returned before any read is issued and before the sink is touched.
    pub fn begin(reader: Arc<dyn RangeReader>, sink: S, config: &ReassemblyConfig) -> Result<Self> {
        if config.max_concurrent_reads == 0 {
            return Err(ReassemblyError::InvalidConfiguration(
                "max_concurrent_reads must be greater than 0".to_string(),
            ));
        }
        let plan = ChunkPlan::new(reader.total_size(), config.chunk_size.as_u64())?;
        let runtime = Handle::try_current()
            .map_err(|e| ReassemblyError::internal(format!("no async runtime available to drive the reassembly: {e}")))?;

        let window_chunks = (config.max_buffered_bytes.as_u64() / plan.chunk_size())
            .clamp(1, Semaphore::MAX_PERMITS as u64) as usize;

        let duplicate_policy = DuplicatePolicy::from_reject_flag(config.reject_duplicate_chunks);
        let reassembler = Arc::new(OrderedChunkReassembler::new(plan, sink, duplicate_policy));

        let span = info_span!(
            "reassembly_session",
            id = %reassembler.id(),
            total_size = plan.total_size(),
            chunk_size = plan.chunk_size(),
            num_chunks = plan.num_chunks(),
            window_chunks
        );
        let driver = runtime.spawn(
            drive(
                reader,
                reassembler.clone(),
                ChunkReadRetry::new(config),
                config.max_concurrent_reads,
                window_chunks,
            )
            .instrument(span),
        );

        Ok(Self { reassembler, driver })
    }

    pub fn id(&self) -> UniqueId {
        self.reassembler.id()
    }

    pub fn state(&self) -> ReassemblyState {
        self.reassembler.state()
    }

    pub fn stats(&self) -> ReassemblyStats {
        self.reassembler.stats()
    }

    /// Cancels the session.  Outstanding reads are abandoned and the sink receives no further
    /// callbacks.  Returns false if the session had already finished.
    pub fn cancel(&self) -> bool {
        self.reassembler.cancel()
    }

    /// Waits until the driver has exited and every read task has stopped.
    pub async fn wait(self) -> Result<ReassemblyStats> {
        if let Err(e) = self.driver.await {
            let offset = self.reassembler.next_offset();
            self.reassembler.fail(offset, e.into());
        }

        match self.reassembler.state() {
            ReassemblyState::Complete => Ok(self.reassembler.stats()),
            ReassemblyState::Failed => Err(self
                .reassembler
                .failure()
                .unwrap_or_else(|| ReassemblyError::internal("reassembly failed without recording an error"))),
            ReassemblyState::Cancelled => Err(ReassemblyError::Cancelled),
            ReassemblyState::Active => {
                Err(ReassemblyError::internal("reassembly driver exited before the reassembly finished"))
            },
        }
    }
}

async fn drive<S: ChunkSink + 'static>(
    reader: Arc<dyn RangeReader>,
    reassembler: Arc<OrderedChunkReassembler<S>>,
    retry: ChunkReadRetry,
    max_concurrent_reads: usize,
    window_chunks: usize,
) {
    let token = reassembler.cancellation_token();
    let read_slots = Arc::new(Semaphore::new(max_concurrent_reads));
    // One permit per chunk between issuing its read and forwarding it to the sink.
    let window = Arc::new(Semaphore::new(window_chunks));
    let plan = *reassembler.plan();

    let mut reads = JoinSet::new();
    let mut task_offsets = HashMap::new();

    for range in &plan {
        let Some(window_permit) = acquire(&window, &token).await else {
            break;
        };
        let Some(read_permit) = acquire(&read_slots, &token).await else {
            break;
        };

        let reader = reader.clone();
        let reassembler = reassembler.clone();
        let retry = retry.clone();
        let token = token.clone();
        let window = window.clone();

        let handle = reads.spawn(async move {
            let read = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                read = retry.run(range, || reader.read_range(range)) => read,
            };
            drop(read_permit);
            deliver(&reassembler, &window, window_permit, range, read);
        });
        task_offsets.insert(handle.id(), range.start);
    }

    if token.is_cancelled() {
        debug!("Reassembly finished before all reads were issued; waiting for in-flight reads to stop");
    }

    while let Some(joined) = reads.join_next_with_id().await {
        if let Err(e) = joined {
            if e.is_cancelled() {
                continue;
            }
            let offset = task_offsets.get(&e.id()).copied().unwrap_or_else(|| reassembler.next_offset());
            warn!(offset, "Chunk read task failed: {e}");
            reassembler.fail(offset, e.into());
        }
    }
}

async fn acquire(semaphore: &Arc<Semaphore>, token: &CancellationToken) -> Option<OwnedSemaphorePermit> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        permit = semaphore.clone().acquire_owned() => permit.ok(),
    }
}

/// Hands a finished read to the reassembler and returns window permits for every chunk that
/// left the window as a result.  A buffered chunk keeps its slot until a later call drains it.
fn deliver<S: ChunkSink>(
    reassembler: &OrderedChunkReassembler<S>,
    window: &Semaphore,
    window_permit: OwnedSemaphorePermit,
    range: ChunkRange,
    read: Result<bytes::Bytes>,
) {
    // Forgotten before delivery so that whichever call forwards this chunk can return its slot.
    window_permit.forget();

    let outcome = read.and_then(|data| reassembler.on_chunk_ready(range.start, range.len(), data));
    let released = match outcome {
        Ok(ChunkDisposition::Forwarded { drained }) => 1 + drained,
        Ok(ChunkDisposition::Buffered) => 0,
        Ok(ChunkDisposition::DuplicateIgnored | ChunkDisposition::Discarded) => 1,
        Err(e) => {
            reassembler.fail(range.start, e);
            1
        },
    };
    if released > 0 {
        window.add_permits(released);
    }
}
