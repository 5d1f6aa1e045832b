use std::fmt;
use std::str::FromStr;

use sha2::Digest as _;

use crate::errors::{DigestError, Result};

/// The supported digest algorithms.
///
/// `Crc32` and `Adler32` are checksums rather than cryptographic hashes; their 32-bit value is
/// emitted big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgo {
    Crc32,
    Adler32,
    Md5,
    Md2,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Blake3,
}

impl DigestAlgo {
    pub const ALL: [DigestAlgo; 9] = [
        DigestAlgo::Crc32,
        DigestAlgo::Adler32,
        DigestAlgo::Md5,
        DigestAlgo::Md2,
        DigestAlgo::Sha1,
        DigestAlgo::Sha256,
        DigestAlgo::Sha384,
        DigestAlgo::Sha512,
        DigestAlgo::Blake3,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgo::Crc32 => "CRC32",
            DigestAlgo::Adler32 => "ADLER32",
            DigestAlgo::Md5 => "MD5",
            DigestAlgo::Md2 => "MD2",
            DigestAlgo::Sha1 => "SHA-1",
            DigestAlgo::Sha256 => "SHA-256",
            DigestAlgo::Sha384 => "SHA-384",
            DigestAlgo::Sha512 => "SHA-512",
            DigestAlgo::Blake3 => "BLAKE3",
        }
    }

    /// The length of a digest in bytes.
    pub fn byte_size(&self) -> usize {
        match self {
            DigestAlgo::Crc32 | DigestAlgo::Adler32 => 4,
            DigestAlgo::Md5 | DigestAlgo::Md2 => 16,
            DigestAlgo::Sha1 => 20,
            DigestAlgo::Sha256 | DigestAlgo::Blake3 => 32,
            DigestAlgo::Sha384 => 48,
            DigestAlgo::Sha512 => 64,
        }
    }

    /// The length of a hex encoded digest.
    pub fn hex_size(&self) -> usize {
        self.byte_size() * 2
    }

    pub fn streaming(&self) -> StreamingDigest {
        StreamingDigest::new(*self)
    }
}

impl fmt::Display for DigestAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts names case-insensitively, with or without separators: "SHA-256", "sha256" and
/// "sha_256" all name the same algorithm, as do "SHA-1" and "sha1".
impl FromStr for DigestAlgo {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .map(|c| c.to_ascii_uppercase())
            .collect();

        match normalized.as_str() {
            "CRC32" => Ok(DigestAlgo::Crc32),
            "ADLER32" => Ok(DigestAlgo::Adler32),
            "MD5" => Ok(DigestAlgo::Md5),
            "MD2" => Ok(DigestAlgo::Md2),
            "SHA1" => Ok(DigestAlgo::Sha1),
            "SHA256" => Ok(DigestAlgo::Sha256),
            "SHA384" => Ok(DigestAlgo::Sha384),
            "SHA512" => Ok(DigestAlgo::Sha512),
            "BLAKE3" => Ok(DigestAlgo::Blake3),
            _ => Err(DigestError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// An in-progress digest computation.
pub enum StreamingDigest {
    Crc32(crc32fast::Hasher),
    Adler32(adler2::Adler32),
    Md5(md5::Md5),
    Md2(md2::Md2),
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Sha384(sha2::Sha384),
    Sha512(sha2::Sha512),
    Blake3(Box<blake3::Hasher>),
}

impl StreamingDigest {
    pub fn new(algo: DigestAlgo) -> Self {
        match algo {
            DigestAlgo::Crc32 => StreamingDigest::Crc32(crc32fast::Hasher::new()),
            DigestAlgo::Adler32 => StreamingDigest::Adler32(adler2::Adler32::new()),
            DigestAlgo::Md5 => StreamingDigest::Md5(md5::Md5::new()),
            DigestAlgo::Md2 => StreamingDigest::Md2(md2::Md2::new()),
            DigestAlgo::Sha1 => StreamingDigest::Sha1(sha1::Sha1::new()),
            DigestAlgo::Sha256 => StreamingDigest::Sha256(sha2::Sha256::new()),
            DigestAlgo::Sha384 => StreamingDigest::Sha384(sha2::Sha384::new()),
            DigestAlgo::Sha512 => StreamingDigest::Sha512(sha2::Sha512::new()),
            DigestAlgo::Blake3 => StreamingDigest::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    pub fn algo(&self) -> DigestAlgo {
        match self {
            StreamingDigest::Crc32(_) => DigestAlgo::Crc32,
            StreamingDigest::Adler32(_) => DigestAlgo::Adler32,
            StreamingDigest::Md5(_) => DigestAlgo::Md5,
            StreamingDigest::Md2(_) => DigestAlgo::Md2,
            StreamingDigest::Sha1(_) => DigestAlgo::Sha1,
            StreamingDigest::Sha256(_) => DigestAlgo::Sha256,
            StreamingDigest::Sha384(_) => DigestAlgo::Sha384,
            StreamingDigest::Sha512(_) => DigestAlgo::Sha512,
            StreamingDigest::Blake3(_) => DigestAlgo::Blake3,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            StreamingDigest::Crc32(h) => h.update(data),
            StreamingDigest::Adler32(h) => h.write_slice(data),
            StreamingDigest::Md5(h) => h.update(data),
            StreamingDigest::Md2(h) => h.update(data),
            StreamingDigest::Sha1(h) => h.update(data),
            StreamingDigest::Sha256(h) => h.update(data),
            StreamingDigest::Sha384(h) => h.update(data),
            StreamingDigest::Sha512(h) => h.update(data),
            StreamingDigest::Blake3(h) => {
                h.update(data);
            },
        }
    }

    pub fn finalize(self) -> Digest {
        let algo = self.algo();
        let bytes = match self {
            StreamingDigest::Crc32(h) => h.finalize().to_be_bytes().to_vec(),
            StreamingDigest::Adler32(h) => h.checksum().to_be_bytes().to_vec(),
            StreamingDigest::Md5(h) => h.finalize().to_vec(),
            StreamingDigest::Md2(h) => h.finalize().to_vec(),
            StreamingDigest::Sha1(h) => h.finalize().to_vec(),
            StreamingDigest::Sha256(h) => h.finalize().to_vec(),
            StreamingDigest::Sha384(h) => h.finalize().to_vec(),
            StreamingDigest::Sha512(h) => h.finalize().to_vec(),
            StreamingDigest::Blake3(h) => h.finalize().as_bytes().to_vec(),
        };
        Digest { algo, bytes }
    }
}

/// A finished digest.  Two digests are equal when both the algorithm and the bytes match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algo: DigestAlgo,
    bytes: Vec<u8>,
}

impl Digest {
    /// Digests `data` in one pass.
    pub fn compute(algo: DigestAlgo, data: &[u8]) -> Self {
        let mut digest = algo.streaming();
        digest.update(data);
        digest.finalize()
    }

    pub fn from_bytes(algo: DigestAlgo, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != algo.byte_size() {
            return Err(DigestError::InvalidLength {
                algo,
                expected: algo.byte_size(),
                actual: bytes.len(),
            });
        }
        Ok(Self { algo, bytes })
    }

    /// Parses a hex digest, in either case.
    pub fn from_hex(algo: DigestAlgo, hex: &str) -> Result<Self> {
        Self::from_bytes(algo, hex::decode(hex.trim())?)
    }

    pub fn algo(&self) -> DigestAlgo {
        self.algo
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Whether `hex` encodes this digest.  Malformed input never matches.
    pub fn matches_hex(&self, hex: &str) -> bool {
        Self::from_hex(self.algo, hex).is_ok_and(|other| other == *self)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
