use std::time::Duration;

use utils::ByteSize;

crate::config_group!({

    /// The number of bytes read per chunk.  Every chunk except possibly the last one has exactly this size.
    ///
    /// The default value is 1mib.
    ///
    /// Use the environment variable `CHUNKHASH_REASSEMBLY_CHUNK_SIZE` to set this value.
    ref chunk_size: ByteSize = ByteSize::mib(1);

    /// The number of times a failed chunk read is retried before the whole reassembly is aborted.
    /// A value of 3 allows up to 4 attempts per chunk.
    ///
    /// The default value is 3.
    ///
    /// Use the environment variable `CHUNKHASH_REASSEMBLY_MAX_RETRIES` to set this value.
    ref max_retries: usize = 3;

    /// The deadline for a single attempt at reading one chunk.  An attempt exceeding it counts
    /// as a failed read.  A zero duration disables the deadline.
    ///
    /// The default value is 30s.
    ///
    /// Use the environment variable `CHUNKHASH_REASSEMBLY_READ_TIMEOUT` to set this value.
    ref read_timeout: Duration = Duration::from_secs(30);

    /// The delay before the first retry of a failed chunk read.  Later retries back off exponentially
    /// with jitter.
    ///
    /// The default value is 100ms.
    ///
    /// Use the environment variable `CHUNKHASH_REASSEMBLY_RETRY_BASE_DELAY` to set this value.
    ref retry_base_delay: Duration = Duration::from_millis(100);

    /// The upper bound on the delay between two retries of the same chunk.
    ///
    /// The default value is 10s.
    ///
    /// Use the environment variable `CHUNKHASH_REASSEMBLY_RETRY_MAX_DELAY` to set this value.
    ref retry_max_delay: Duration = Duration::from_secs(10);

    /// The maximum number of chunk reads in flight at once for a single reassembly.
    ///
    /// The default value is 8.
    ///
    /// Use the environment variable `CHUNKHASH_REASSEMBLY_MAX_CONCURRENT_READS` to set this value.
    ref max_concurrent_reads: usize = 8;

    /// The upper bound on chunk data read ahead of the consumer, counting both chunks being read
    /// and chunks held back because an earlier chunk has not arrived yet.  Rounded down to a whole
    /// number of chunks, and never less than one chunk.
    ///
    /// The default value is 64mib.
    ///
    /// Use the environment variable `CHUNKHASH_REASSEMBLY_MAX_BUFFERED_BYTES` to set this value.
    ref max_buffered_bytes: ByteSize = ByteSize::mib(64);

    /// Whether a second completion for an already forwarded or buffered chunk is an error.
    /// When false, duplicates are logged and ignored.
    ///
    /// The default value is false.
    ///
    /// Use the environment variable `CHUNKHASH_REASSEMBLY_REJECT_DUPLICATE_CHUNKS` to set this value.
    ref reject_duplicate_chunks: bool = false;
});
