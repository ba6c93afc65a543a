//! Fixed-size digests and the commitment hasher.
//!
//! The ledger verifies commitments with Keccak-256 over the UTF-8 bytes of
//! the option text. Both sides must agree on primitive and encoding, so the
//! hasher here takes no salt and no domain tag.

use sha3::{Digest as _, Keccak256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// A 32-byte Keccak-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest([u8; DIGEST_LEN]);

/// Error parsing a digest from hex.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("expected {DIGEST_LEN} bytes, got {0}")]
    InvalidLength(usize),
}

impl Digest {
    /// The all-zero digest.
    pub const ZERO: Self = Self([0u8; DIGEST_LEN]);

    /// Hash arbitrary bytes with Keccak-256.
    pub fn of(data: &[u8]) -> Self {
        let out = Keccak256::digest(data);
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&out);
        Self(bytes)
    }

    /// Wrap raw digest bytes without hashing.
    pub const fn from_raw(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, HexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| HexError::InvalidHex(e.to_string()))?;
        if bytes.len() != DIGEST_LEN {
            return Err(HexError::InvalidLength(bytes.len()));
        }
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    /// Lowercase hex with a `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First four bytes are enough to tell digests apart in logs.
        write!(f, "Digest(0x{}..)", hex::encode(&self.0[..4]))
    }
}

impl FromStr for Digest {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// Compute the commitment for a chosen option.
///
/// Deterministic and total: identical option text always yields the same
/// digest, independent of round, participant or call time.
pub fn commitment_digest(option_text: &str) -> Digest {
    Digest::of(option_text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commitment_is_deterministic() {
        assert_eq!(commitment_digest("Paris"), commitment_digest("Paris"));
    }

    #[test]
    fn test_distinct_options_have_distinct_digests() {
        let options = ["London", "Paris", "Berlin", "Madrid"];
        for (i, a) in options.iter().enumerate() {
            for b in &options[i + 1..] {
                assert_ne!(commitment_digest(a), commitment_digest(b));
            }
        }
    }

    #[test]
    fn test_matches_keccak256_of_utf8() {
        // keccak256("") is a well-known constant.
        assert_eq!(
            commitment_digest("").to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_case_and_whitespace_matter() {
        assert_ne!(commitment_digest("Paris"), commitment_digest("paris"));
        assert_ne!(commitment_digest("Paris"), commitment_digest("Paris "));
    }

    #[test]
    fn test_hex_parse() {
        let d = commitment_digest("Berlin");
        assert_eq!(Digest::from_hex(&d.to_hex()).unwrap(), d);
        assert_eq!(d.to_hex().trim_start_matches("0x").parse::<Digest>().unwrap(), d);
        assert_eq!(Digest::from_hex("0x1234"), Err(HexError::InvalidLength(2)));
        assert!(matches!(
            Digest::from_hex("zz"),
            Err(HexError::InvalidHex(_))
        ));
    }
}
