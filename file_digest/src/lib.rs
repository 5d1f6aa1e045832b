mod digest;
mod digest_sink;
mod errors;
mod file_hasher;
pub mod logging;

pub use digest::{Digest, DigestAlgo, StreamingDigest};
pub use digest_sink::DigestSink;
pub use errors::{DigestError, Result};
pub use file_hasher::FileHasher;
