//! Cryptographic utilities
//!
//! This module provides:
//! - SHA-512/256 hashing with domain-separation prefixes
//! - Ed25519 key management and `"MX"`-prefixed byte signing
//! - 32-byte account addresses with checksummed base32 text form

pub mod hash;
pub mod keys;

pub use hash::{
    hash_with_prefix, sha512_256, sha512_256_hex, with_prefix, Digest, BYTES_PREFIX, DIGEST_LEN,
    MULTISIG_ADDR_PREFIX, PROGRAM_PREFIX, TX_GROUP_PREFIX, TX_PREFIX,
};
pub use keys::{
    is_valid_address, verify_bytes, verify_signature, Address, KeyError, KeyPair, Signature,
    ADDRESS_LEN, PRIVATE_KEY_LEN, SIGNATURE_LEN,
};
