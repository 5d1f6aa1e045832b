use std::fmt;

use crate::error::{ReassemblyError, Result};

/// A half-open byte range `[start, end)` of the input.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Debug for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The partition of `[0, total_size)` into consecutive chunks of `chunk_size` bytes,
/// the last one possibly shorter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total_size: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    pub fn new(total_size: u64, chunk_size: u64) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ReassemblyError::InvalidConfiguration("chunk_size must be greater than 0".to_string()));
        }
        Ok(Self { total_size, chunk_size })
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn num_chunks(&self) -> u64 {
        self.total_size.div_ceil(self.chunk_size)
    }

    /// The range of the chunk starting at `offset`, if `offset` is a chunk boundary inside the input.
    pub fn chunk_at(&self, offset: u64) -> Option<ChunkRange> {
        if offset >= self.total_size || offset % self.chunk_size != 0 {
            return None;
        }
        let end = offset.saturating_add(self.chunk_size).min(self.total_size);
        Some(ChunkRange::new(offset, end))
    }

    /// Checks that `(offset, size)` describes exactly one chunk of this plan.
    pub fn check_chunk(&self, offset: u64, size: u64) -> Result<ChunkRange> {
        let invalid = |reason: String| ReassemblyError::InvalidChunk { offset, size, reason };

        if size == 0 {
            return Err(invalid("chunk size must be positive".to_string()));
        }
        if offset.checked_add(size).is_none_or(|end| end > self.total_size) {
            return Err(invalid(format!("chunk extends past the end of the input ({} bytes)", self.total_size)));
        }
        let Some(range) = self.chunk_at(offset) else {
            return Err(invalid(format!("offset is not a multiple of the chunk size {}", self.chunk_size)));
        };
        if range.len() != size {
            return Err(invalid(format!("expected a chunk of {} bytes", range.len())));
        }
        Ok(range)
    }

    pub fn iter(&self) -> ChunkPlanIter {
        ChunkPlanIter {
            plan: *self,
            next_start: 0,
        }
    }
}

impl IntoIterator for &ChunkPlan {
    type Item = ChunkRange;
    type IntoIter = ChunkPlanIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct ChunkPlanIter {
    plan: ChunkPlan,
    next_start: u64,
}

impl Iterator for ChunkPlanIter {
    type Item = ChunkRange;

    fn next(&mut self) -> Option<ChunkRange> {
        let range = self.plan.chunk_at(self.next_start)?;
        self.next_start = range.end;
        Some(range)
    }
}
