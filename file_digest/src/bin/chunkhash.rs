use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use file_digest::logging::init_logging;
use file_digest::{Digest, DigestAlgo, FileHasher};
use ::hash_config::hash_config;
use utils::{ByteSize, parse_duration};

/// Hash files by reading them in concurrent chunks and digesting the chunks in order.
#[derive(Parser, Debug)]
#[clap(name = "chunkhash", version)]
struct ChunkHashCommand {
    /// Digest algorithm: crc32, adler32, md5, md2, sha1, sha256, sha384, sha512 or blake3.
    #[clap(short, long, default_value = "sha256")]
    algo: DigestAlgo,

    /// Size of each chunk read, e.g. "64kib" or "4mib".
    #[clap(long)]
    chunk_size: Option<ByteSize>,

    /// Number of times a failed chunk read is retried.
    #[clap(long)]
    max_retries: Option<usize>,

    /// Deadline for a single chunk read attempt, e.g. "500ms" or "30s". "0" disables it.
    #[clap(long, value_parser = parse_read_timeout)]
    read_timeout: Option<Duration>,

    /// Maximum number of chunk reads in flight per file.
    #[clap(long)]
    concurrency: Option<usize>,

    /// Expected hex digest.  Exits with an error if any file does not match.
    #[clap(long)]
    verify: Option<String>,

    /// Files to hash.
    #[clap(required = true)]
    files: Vec<PathBuf>,
}

fn parse_read_timeout(value: &str) -> std::result::Result<Duration, String> {
    parse_duration(value).ok_or_else(|| format!("invalid duration {value:?}"))
}

impl ChunkHashCommand {
    fn hasher(&self) -> FileHasher {
        let mut config = hash_config().reassembly.clone();
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(read_timeout) = self.read_timeout {
            config.read_timeout = read_timeout;
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrent_reads = concurrency;
        }
        FileHasher::new(self.algo).with_config(config)
    }

    async fn run(self) -> Result<()> {
        if let Some(hex) = &self.verify {
            Digest::from_hex(self.algo, hex).context("invalid --verify digest")?;
        }

        let hasher = self.hasher();
        let mut mismatches = 0;

        for path in &self.files {
            let digest = hasher
                .hash_file(path)
                .await
                .with_context(|| format!("failed to hash {}", path.display()))?;
            println!("{digest}  {}", path.display());

            if let Some(expected) = &self.verify {
                if !digest.matches_hex(expected) {
                    eprintln!("{}: {} digest does not match", path.display(), self.algo);
                    mismatches += 1;
                }
            }
        }

        if mismatches > 0 {
            bail!("{mismatches} of {} files failed verification", self.files.len());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ChunkHashCommand::parse();
    init_logging(&hash_config().log);
    cli.run().await
}
