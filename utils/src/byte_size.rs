use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const KIB: u64 = 1 << 10;
const MIB: u64 = 1 << 20;
const GIB: u64 = 1 << 30;
const TIB: u64 = 1 << 40;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ByteSizeParseError {
    #[error("Empty byte size string")]
    Empty,

    #[error("Invalid number in byte size '{0}'")]
    InvalidNumber(String),

    #[error("Unknown byte size unit '{0}'")]
    UnknownUnit(String),

    #[error("Byte size '{0}' overflows u64")]
    Overflow(String),
}

/// A size in bytes, parsed from strings such as `"512"`, `"64kb"` or `"1mib"`.
///
/// All unit suffixes are binary: `kb` and `kib` both mean 1024 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ByteSize(u64);

impl ByteSize {
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn kib(n: u64) -> Self {
        Self(n * KIB)
    }

    pub const fn mib(n: u64) -> Self {
        Self(n * MIB)
    }

    pub const fn gib(n: u64) -> Self {
        Self(n * GIB)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        Self(bytes)
    }
}

impl FromStr for ByteSize {
    type Err = ByteSizeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(ByteSizeParseError::Empty);
        }

        let split = normalized.find(|c: char| !c.is_ascii_digit()).unwrap_or(normalized.len());
        let (digits, unit) = normalized.split_at(split);

        let value: u64 = digits
            .parse()
            .map_err(|_| ByteSizeParseError::InvalidNumber(s.to_string()))?;

        let multiplier = match unit.trim() {
            "" | "b" => 1,
            "k" | "kb" | "kib" => KIB,
            "m" | "mb" | "mib" => MIB,
            "g" | "gb" | "gib" => GIB,
            "t" | "tb" | "tib" => TIB,
            other => return Err(ByteSizeParseError::UnknownUnit(other.to_string())),
        };

        value
            .checked_mul(multiplier)
            .map(ByteSize)
            .ok_or_else(|| ByteSizeParseError::Overflow(s.to_string()))
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.0;
        if n == 0 {
            return write!(f, "0b");
        }
        for (unit, name) in [(TIB, "tib"), (GIB, "gib"), (MIB, "mib"), (KIB, "kib")] {
            if n % unit == 0 {
                return write!(f, "{}{name}", n / unit);
            }
        }
        write!(f, "{n}b")
    }
}
