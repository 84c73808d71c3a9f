//! Cryptographic hashing utilities
//!
//! Every digest in the protocol is SHA-512/256. Hashed objects are
//! domain-separated by a short ASCII prefix so that a transaction can
//! never be confused with a group, a program or a multisig preimage.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest as _, Sha512_256};

use super::keys::FixedBytesVisitor;

/// Prefix for transaction ids and transaction signatures
pub const TX_PREFIX: &[u8] = b"TX";

/// Prefix for group ids
pub const TX_GROUP_PREFIX: &[u8] = b"TG";

/// Prefix for multisig account addresses
pub const MULTISIG_ADDR_PREFIX: &[u8] = b"MultisigAddr";

/// Prefix for program addresses and delegated program signatures
pub const PROGRAM_PREFIX: &[u8] = b"Program";

/// Prefix for arbitrary bytes signed by an account key
pub const BYTES_PREFIX: &[u8] = b"MX";

/// Length of every digest produced here
pub const DIGEST_LEN: usize = 32;

/// Computes SHA-512/256 of the input data
pub fn sha512_256(data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha512_256::new();
    hasher.update(data);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Computes SHA-512/256 over `prefix || data`
pub fn hash_with_prefix(prefix: &[u8], data: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha512_256::new();
    hasher.update(prefix);
    hasher.update(data);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Computes SHA-512/256 and returns it as a hex string
pub fn sha512_256_hex(data: &[u8]) -> String {
    hex::encode(sha512_256(data))
}

/// Returns `prefix || data` as one owned buffer
pub fn with_prefix(prefix: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + data.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(data);
    out
}

/// A 32-byte SHA-512/256 digest (transaction ids, group ids, leases, genesis hashes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Digest(pub [u8; DIGEST_LEN]);

impl Digest {
    /// The all-zero digest, used as "not set"
    pub const ZERO: Digest = Digest([0u8; DIGEST_LEN]);

    /// Create from a slice, returning `None` on a length mismatch
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Digest)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Check whether this digest is all zeroes
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; DIGEST_LEN]
    }

    /// Standard base64 text form
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Digest(bytes)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", hex::encode(self.0))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base64())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            let bytes = STANDARD.decode(text.as_bytes()).map_err(de::Error::custom)?;
            Digest::from_slice(&bytes)
                .ok_or_else(|| de::Error::invalid_length(bytes.len(), &"32 bytes"))
        } else {
            deserializer
                .deserialize_bytes(FixedBytesVisitor::<DIGEST_LEN>)
                .map(Digest)
        }
    }
}
