use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Bytes, BytesMut};

use crate::error::ReassemblyError;

/// The consumer of a reassembly.
///
/// `on_chunk` is called once per chunk in ascending offset order.  Exactly one of
/// `on_complete` or `on_error` is called afterwards, unless the reassembly is cancelled,
/// in which case neither is.
///
/// Every callback runs while the reassembler's lock is held.  A sink must not call back into
/// the reassembler or session that owns it (`on_chunk_ready`, `fail`, `cancel`, `state`, ...)
/// from inside a callback: the lock is not re-entrant and the call deadlocks.  Hand such work
/// off to another task instead, for example through a channel.
pub trait ChunkSink: Send {
    fn on_chunk(&mut self, data: Bytes, offset: u64);

    fn on_complete(&mut self);

    fn on_error(&mut self, error: ReassemblyError);
}

impl<S: ChunkSink + ?Sized> ChunkSink for Box<S> {
    fn on_chunk(&mut self, data: Bytes, offset: u64) {
        (**self).on_chunk(data, offset)
    }

    fn on_complete(&mut self) {
        (**self).on_complete()
    }

    fn on_error(&mut self, error: ReassemblyError) {
        (**self).on_error(error)
    }
}

type ChunkFn = Box<dyn FnMut(Bytes, u64) + Send>;
type CompleteFn = Box<dyn FnOnce() + Send>;
type ErrorFn = Box<dyn FnOnce(ReassemblyError) + Send>;

/// A sink built from closures.
pub struct CallbackSink {
    on_chunk: ChunkFn,
    on_complete: Option<CompleteFn>,
    on_error: Option<ErrorFn>,
}

impl CallbackSink {
    pub fn new(
        on_chunk: impl FnMut(Bytes, u64) + Send + 'static,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            on_chunk: Box::new(on_chunk),
            on_complete: Some(Box::new(on_complete)),
            on_error: None,
        }
    }

    pub fn with_error_handler(self, on_error: impl FnOnce(ReassemblyError) + Send + 'static) -> Self {
        Self {
            on_error: Some(Box::new(on_error)),
            ..self
        }
    }
}

impl ChunkSink for CallbackSink {
    fn on_chunk(&mut self, data: Bytes, offset: u64) {
        (self.on_chunk)(data, offset)
    }

    fn on_complete(&mut self) {
        if let Some(f) = self.on_complete.take() {
            f()
        }
    }

    fn on_error(&mut self, error: ReassemblyError) {
        if let Some(f) = self.on_error.take() {
            f(error)
        }
    }
}

#[derive(Default)]
struct Collected {
    chunks: Vec<(u64, Bytes)>,
    completions: usize,
    errors: Vec<ReassemblyError>,
}

/// A sink that records everything it receives.  Clones share the same record.
#[derive(Clone, Default)]
pub struct CollectingSink {
    collected: Arc<Mutex<Collected>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_collected<T>(&self, f: impl FnOnce(&Collected) -> T) -> T {
        f(&self.collected.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// The offsets of all forwarded chunks, in the order they were forwarded.
    pub fn offsets(&self) -> Vec<u64> {
        self.with_collected(|c| c.chunks.iter().map(|(offset, _)| *offset).collect())
    }

    /// The concatenation of all forwarded payloads.
    pub fn data(&self) -> Bytes {
        self.with_collected(|c| {
            let mut buf = BytesMut::with_capacity(c.chunks.iter().map(|(_, d)| d.len()).sum());
            for (_, d) in &c.chunks {
                buf.extend_from_slice(d);
            }
            buf.freeze()
        })
    }

    pub fn completions(&self) -> usize {
        self.with_collected(|c| c.completions)
    }

    pub fn errors(&self) -> Vec<ReassemblyError> {
        self.with_collected(|c| c.errors.clone())
    }

    /// The number of terminal callbacks received so far.
    pub fn terminal_calls(&self) -> usize {
        self.with_collected(|c| c.completions + c.errors.len())
    }
}

impl ChunkSink for CollectingSink {
    fn on_chunk(&mut self, data: Bytes, offset: u64) {
        self.collected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .chunks
            .push((offset, data));
    }

    fn on_complete(&mut self) {
        self.collected.lock().unwrap_or_else(PoisonError::into_inner).completions += 1;
    }

    fn on_error(&mut self, error: ReassemblyError) {
        self.collected.lock().unwrap_or_else(PoisonError::into_inner).errors.push(error);
    }
}
