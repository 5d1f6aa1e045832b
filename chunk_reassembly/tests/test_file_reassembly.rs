use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chunk_reassembly::{
    ChunkPlan, ChunkSink, CollectingSink, DuplicatePolicy, FileRangeReader, OrderedChunkReassembler, RangeReader,
    ReassemblyError, ReassemblySession,
};
use hash_config::ReassemblyConfig;
use rand::prelude::*;
use tempfile::NamedTempFile;
use utils::ByteSize;

fn write_random_file(len: usize, seed: u64) -> (NamedTempFile, Vec<u8>) {
    let mut data = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut data);

    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();
    file.flush().unwrap();
    (file, data)
}

fn config(chunk_size: u64, concurrency: usize) -> ReassemblyConfig {
    let mut config = ReassemblyConfig::default();
    config.chunk_size = ByteSize::new(chunk_size);
    config.max_concurrent_reads = concurrency;
    config.retry_base_delay = Duration::from_millis(1);
    config.retry_max_delay = Duration::from_millis(5);
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_file_reassembles_for_many_chunk_sizes() {
    let (large, large_data) = write_random_file(100_003, 7);
    let (small, small_data) = write_random_file(1000, 11);

    // One-byte chunks make for a lot of tiny reads, so they only run against the small file.
    let cases = [
        (&small, &small_data, vec![1, 3, 1000, 4096]),
        (&large, &large_data, vec![7, 4096, 65_536, 100_003, 1 << 20]),
    ];

    for (file, expected, chunk_sizes) in cases {
        let reader: Arc<dyn RangeReader> = Arc::new(FileRangeReader::open(file.path()).unwrap());

        for chunk_size in chunk_sizes {
            let sink = CollectingSink::new();
            let session = ReassemblySession::begin(reader.clone(), sink.clone(), &config(chunk_size, 8)).unwrap();
            let stats = session.wait().await.unwrap();

            assert_eq!(&sink.data()[..], &expected[..], "chunk size {chunk_size}");
            assert_eq!(stats.bytes_forwarded, expected.len() as u64);
            assert_eq!(sink.completions(), 1);

            let offsets = sink.offsets();
            assert!(offsets.windows(2).all(|w| w[1] - w[0] == chunk_size), "chunk size {chunk_size}");
        }
    }
}

#[tokio::test]
async fn test_file_truncated_after_open_aborts() {
    let (file, _) = write_random_file(64 * 1024, 3);
    let reader = Arc::new(FileRangeReader::open(file.path()).unwrap());
    file.as_file().set_len(10_000).unwrap();

    let sink = CollectingSink::new();
    let mut config = config(4096, 1);
    config.max_retries = 1;

    let session = ReassemblySession::begin(reader, sink.clone(), &config).unwrap();
    let err = session.wait().await.unwrap_err();

    let ReassemblyError::ReassemblyAborted { offset, .. } = err else {
        panic!("expected an aborted reassembly, got {err:?}");
    };
    assert_eq!(offset, 8192);
    assert_eq!(sink.errors().len(), 1);
    assert_eq!(sink.completions(), 0);
    assert!(sink.offsets().iter().all(|&o| o < 8192));
}

#[test]
fn test_shuffled_completions_from_threads() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut data = vec![0u8; 50_000];
    rng.fill_bytes(&mut data);
    let data = Bytes::from(data);

    let plan = ChunkPlan::new(data.len() as u64, 777).unwrap();
    let sink = CollectingSink::new();
    let reassembler = Arc::new(OrderedChunkReassembler::new(plan, sink.clone(), DuplicatePolicy::Ignore));

    let mut ranges: Vec<_> = plan.iter().collect();
    ranges.shuffle(&mut rng);

    let handles: Vec<_> = ranges
        .chunks(ranges.len().div_ceil(4))
        .map(|batch| {
            let batch = batch.to_vec();
            let reassembler = reassembler.clone();
            let data = data.clone();
            std::thread::spawn(move || {
                for range in batch {
                    let payload = data.slice(range.start as usize..range.end as usize);
                    reassembler.on_chunk_ready(range.start, range.len(), payload).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sink.data(), data);
    assert_eq!(sink.completions(), 1);
    assert_eq!(reassembler.pending_chunks(), 0);
}

struct CountingSink {
    bytes: u64,
    completed: bool,
}

impl ChunkSink for CountingSink {
    fn on_chunk(&mut self, data: Bytes, _offset: u64) {
        self.bytes += data.len() as u64;
    }

    fn on_complete(&mut self) {
        self.completed = true;
    }

    fn on_error(&mut self, _error: ReassemblyError) {}
}

#[test]
fn test_custom_sink_recovered_after_reassembly() {
    let plan = ChunkPlan::new(10, 4).unwrap();
    let reassembler = OrderedChunkReassembler::new(
        plan,
        CountingSink {
            bytes: 0,
            completed: false,
        },
        DuplicatePolicy::Reject,
    );

    reassembler.on_chunk_ready(8, 2, Bytes::from_static(b"89")).unwrap();
    reassembler.on_chunk_ready(0, 4, Bytes::from_static(b"0123")).unwrap();
    reassembler.on_chunk_ready(4, 4, Bytes::from_static(b"4567")).unwrap();

    let sink = reassembler.into_sink();
    assert_eq!(sink.bytes, 10);
    assert!(sink.completed);
}
