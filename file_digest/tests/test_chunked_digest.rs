use std::io::Write;
use std::time::Duration;

use file_digest::{Digest, DigestAlgo, FileHasher};
use hash_config::ReassemblyConfig;
use rand::prelude::*;
use tempfile::NamedTempFile;
use utils::ByteSize;

fn random_file(len: usize) -> (NamedTempFile, Vec<u8>) {
    let mut data = vec![0u8; len];
    StdRng::seed_from_u64(len as u64).fill_bytes(&mut data);

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
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_chunked_file_digest_equals_whole_file_digest() {
    let (file, data) = random_file(300_001);

    for algo in DigestAlgo::ALL {
        let expected = Digest::compute(algo, &data);
        for (chunk_size, concurrency) in [(4096, 8), (65_536, 3), (100_000, 1), (300_001, 8), (1 << 20, 2)] {
            let hasher = FileHasher::new(algo).with_config(config(chunk_size, concurrency));
            let digest = hasher.hash_file(file.path()).await.unwrap();
            assert_eq!(digest, expected, "{algo} with chunk size {chunk_size}");
        }
    }
}

#[tokio::test]
async fn test_verify_file() {
    let (file, data) = random_file(10_000);
    let hasher = FileHasher::new(DigestAlgo::Sha384).with_config(config(1000, 4));

    let good = Digest::compute(DigestAlgo::Sha384, &data).to_hex();
    assert!(hasher.verify_file(file.path(), &good).await.unwrap());
    assert!(hasher.verify_file(file.path(), &good.to_uppercase()).await.unwrap());

    let bad = Digest::compute(DigestAlgo::Sha384, b"something else").to_hex();
    assert!(!hasher.verify_file(file.path(), &bad).await.unwrap());

    // A SHA-256 sized digest cannot be a SHA-384 digest.
    let wrong_size = Digest::compute(DigestAlgo::Sha256, &data).to_hex();
    assert!(hasher.verify_file(file.path(), &wrong_size).await.is_err());
}

#[tokio::test]
async fn test_empty_file_digest() {
    let file = NamedTempFile::new().unwrap();
    for algo in DigestAlgo::ALL {
        let hasher = FileHasher::new(algo).with_config(config(4096, 4));
        assert_eq!(hasher.hash_file(file.path()).await.unwrap(), Digest::compute(algo, b""));
    }
}
