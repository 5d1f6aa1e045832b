use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use hash_config::ReassemblyConfig;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info};

use crate::chunk_plan::ChunkRange;
use crate::error::{ReassemblyError, Result};

#[derive(Debug)]
pub enum RetryableReadError {
    FatalError(ReassemblyError),
    RetryableError(ReassemblyError),
}

impl RetryableReadError {
    fn classify(err: ReassemblyError) -> Self {
        if err.is_retryable() {
            RetryableReadError::RetryableError(err)
        } else {
            RetryableReadError::FatalError(err)
        }
    }

    fn into_inner(self) -> ReassemblyError {
        match self {
            RetryableReadError::FatalError(e) | RetryableReadError::RetryableError(e) => e,
        }
    }
}

/// Retries the read of a single chunk with exponential backoff, bounding every attempt by a deadline.
///
/// With `max_retries = n` a chunk is attempted at most `n + 1` times.
#[derive(Debug, Clone)]
pub struct ChunkReadRetry {
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
    read_timeout: Option<Duration>,
}

impl ChunkReadRetry {
    pub fn new(config: &ReassemblyConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
            max_delay: config.retry_max_delay,
            read_timeout: (!config.read_timeout.is_zero()).then_some(config.read_timeout),
        }
    }

    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the per-attempt deadline; `None` lets attempts run indefinitely.
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    fn strategy(&self) -> impl Iterator<Item = Duration> + use<> {
        // ExponentialBackoff yields base^n * factor, so base 2 with factor = delay / 2
        // gives delay, 2 * delay, 4 * delay, ...
        let factor = (self.base_delay.as_millis().min(u64::MAX as u128) as u64 / 2).max(1);
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_delay)
            .map(jitter)
            .take(self.max_retries)
    }

    /// Runs `read` for `range` until it returns exactly `range.len()` bytes, a fatal error
    /// occurs, or the retry budget is exhausted.  The last error is returned on failure.
    pub async fn run<ReadFn, ReadFut>(&self, range: ChunkRange, read: ReadFn) -> Result<Bytes>
    where
        ReadFn: Fn() -> ReadFut,
        ReadFut: Future<Output = Result<Bytes>>,
    {
        let try_count = AtomicUsize::new(0);
        let read = &read;
        let try_count = &try_count;

        let result = RetryIf::spawn(
            self.strategy(),
            move || async move {
                let try_idx = try_count.fetch_add(1, Ordering::Relaxed);
                let attempt = self.attempt(range, read()).await;

                if let Err(e) = &attempt {
                    match e {
                        RetryableReadError::RetryableError(err) if try_idx < self.max_retries => info!(
                            offset = range.start,
                            "Chunk read failed (attempt {}/{}), retrying: {err}",
                            try_idx + 1,
                            self.max_retries + 1
                        ),
                        RetryableReadError::RetryableError(_) => {},
                        RetryableReadError::FatalError(err) => {
                            error!(offset = range.start, "Chunk read failed with a fatal error: {err}")
                        },
                    }
                } else if try_idx > 0 {
                    debug!(offset = range.start, "Chunk read succeeded after {try_idx} retries");
                }

                attempt
            },
            |err: &RetryableReadError| matches!(err, RetryableReadError::RetryableError(_)),
        )
        .await;

        match result {
            Ok(data) => Ok(data),
            Err(RetryableReadError::FatalError(e)) => Err(e),
            Err(RetryableReadError::RetryableError(e)) => {
                error!(
                    offset = range.start,
                    attempts = try_count.load(Ordering::Relaxed),
                    "No more retries for chunk read; aborting: {e}"
                );
                Err(e)
            },
        }
    }

    async fn attempt(
        &self,
        range: ChunkRange,
        read: impl Future<Output = Result<Bytes>>,
    ) -> std::result::Result<Bytes, RetryableReadError> {
        let outcome = match self.read_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, read).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(RetryableReadError::RetryableError(ReassemblyError::ChunkReadTimeout {
                        offset: range.start,
                        timeout,
                    }));
                },
            },
            None => read.await,
        };

        let data = outcome.map_err(RetryableReadError::classify)?;
        if data.len() as u64 != range.len() {
            return Err(RetryableReadError::RetryableError(ReassemblyError::ChunkRead {
                offset: range.start,
                message: format!("expected {} bytes, got {}", range.len(), data.len()),
            }));
        }
        Ok(data)
    }
}

impl From<RetryableReadError> for ReassemblyError {
    fn from(err: RetryableReadError) -> Self {
        err.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::AtomicU32;

    use super::*;

    fn fast_retry(max_retries: usize) -> ChunkReadRetry {
        ChunkReadRetry::new(&ReassemblyConfig::default())
            .with_max_retries(max_retries)
            .with_base_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
    }

    type ReadFuture = std::pin::Pin<Box<dyn Future<Output = Result<Bytes>> + Send>>;

    fn flaky_read(counter: Arc<AtomicU32>, failures: u32, kind: std::io::ErrorKind) -> impl Fn() -> ReadFuture {
        move || {
            let counter = counter.clone();
            Box::pin(async move {
                if counter.fetch_add(1, Ordering::SeqCst) < failures {
                    Err(std::io::Error::new(kind, "flaky").into())
                } else {
                    Ok(Bytes::from_static(b"abcd"))
                }
            })
        }
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let counter = Arc::new(AtomicU32::new(0));
        let data = fast_retry(3)
            .run(ChunkRange::new(0, 4), flaky_read(counter.clone(), 0, std::io::ErrorKind::Interrupted))
            .await
            .unwrap();
        assert_eq!(&data[..], b"abcd");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let counter = Arc::new(AtomicU32::new(0));
        let data = fast_retry(3)
            .run(ChunkRange::new(0, 4), flaky_read(counter.clone(), 2, std::io::ErrorKind::Interrupted))
            .await
            .unwrap();
        assert_eq!(&data[..], b"abcd");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_limit_exceeded() {
        let counter = Arc::new(AtomicU32::new(0));
        let result = fast_retry(3)
            .run(ChunkRange::new(0, 4), flaky_read(counter.clone(), 100, std::io::ErrorKind::Interrupted))
            .await;
        assert!(matches!(result, Err(ReassemblyError::IoError(_))));
        // 1 initial + 3 retries
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_fatal_error_not_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let result = fast_retry(3)
            .run(ChunkRange::new(0, 4), flaky_read(counter.clone(), 100, std::io::ErrorKind::NotFound))
            .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_short_read_retried() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_ = counter.clone();
        let result = fast_retry(2)
            .run(ChunkRange::new(0, 8), move || {
                counter_.fetch_add(1, Ordering::SeqCst);
                async { Ok(Bytes::from_static(b"abcd")) }
            })
            .await;
        assert!(matches!(result, Err(ReassemblyError::ChunkRead { offset: 0, .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_ = counter.clone();
        let data = fast_retry(3)
            .with_read_timeout(Some(Duration::from_millis(20)))
            .run(ChunkRange::new(4, 8), move || {
                let first = counter_.fetch_add(1, Ordering::SeqCst) == 0;
                async move {
                    if first {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    Ok(Bytes::from_static(b"efgh"))
                }
            })
            .await
            .unwrap();
        assert_eq!(&data[..], b"efgh");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeouts_exhaust_budget() {
        let result = fast_retry(1)
            .with_read_timeout(Some(Duration::from_millis(10)))
            .run(ChunkRange::new(4, 8), || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Bytes::from_static(b"efgh"))
            })
            .await;
        assert!(matches!(result, Err(ReassemblyError::ChunkReadTimeout { offset: 4, .. })));
    }

    #[test]
    fn test_strategy_length_matches_retry_budget() {
        assert_eq!(fast_retry(0).strategy().count(), 0);
        assert_eq!(fast_retry(5).strategy().count(), 5);
        assert!(fast_retry(5).strategy().all(|d| d <= Duration::from_millis(5)));
    }
}
