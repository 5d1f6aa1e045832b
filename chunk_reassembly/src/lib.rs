mod chunk_plan;
mod error;
mod range_reader;
mod reassembler;
mod retry;
mod session;
mod sink;

pub use chunk_plan::{ChunkPlan, ChunkRange};
pub use error::{ReassemblyError, Result};
pub use range_reader::{BytesRangeReader, FileRangeReader, RangeReader};
pub use reassembler::{ChunkDisposition, DuplicatePolicy, OrderedChunkReassembler, ReassemblyState, ReassemblyStats};
pub use retry::{ChunkReadRetry, RetryableReadError};
pub use session::ReassemblySession;
pub use sink::{CallbackSink, ChunkSink, CollectingSink};
