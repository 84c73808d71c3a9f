//! Ed25519 key management and account addresses
//!
//! Provides key pair generation, signing, and verification using
//! ed25519, plus the 32-byte account address and its checksummed
//! base32 text form.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use data_encoding::BASE32_NOPAD;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use super::hash::{sha512_256, with_prefix, BYTES_PREFIX};

/// Length of a public key and of an address
pub const ADDRESS_LEN: usize = 32;

/// Length of an ed25519 signature
pub const SIGNATURE_LEN: usize = 64;

/// Length of a private key (seed followed by public key)
pub const PRIVATE_KEY_LEN: usize = 64;

/// Length of an ed25519 seed
pub const SEED_LEN: usize = 32;

const CHECKSUM_LEN: usize = 4;

/// Length of the base32 text form of an address
pub const ADDRESS_STR_LEN: usize = 58;

/// Errors that can occur during key operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Incorrect private key length: expected {expected}, got {got}")]
    InvalidPrivateKeyLength { expected: usize, got: usize },
    #[error("Invalid private key: public half does not match seed")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Incorrect signature length: expected {expected}, got {got}")]
    InvalidSignatureLength { expected: usize, got: usize },
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Address checksum mismatch: {0}")]
    AddressChecksum(String),
    #[error("Signature verification failed")]
    VerificationFailed,
}

// =============================================================================
// Address
// =============================================================================

/// A 32-byte account address
///
/// For single-key accounts the address is the ed25519 public key itself.
/// Multisig and program accounts use a domain-separated hash instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address, used as "not set"
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Create an address from raw bytes
    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Create an address from a slice, checking the length
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            KeyError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                ADDRESS_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Get an owned copy of the raw bytes
    pub fn to_bytes(&self) -> [u8; ADDRESS_LEN] {
        self.0
    }

    /// Check whether this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Base32 text form with the 4-byte checksum appended
    pub fn encode(&self) -> String {
        let checksum = sha512_256(&self.0);
        let mut buf = Vec::with_capacity(ADDRESS_LEN + CHECKSUM_LEN);
        buf.extend_from_slice(&self.0);
        buf.extend_from_slice(&checksum[ADDRESS_LEN - CHECKSUM_LEN..]);
        BASE32_NOPAD.encode(&buf)
    }

    /// Parse the checksummed base32 text form
    pub fn decode(text: &str) -> Result<Self, KeyError> {
        if text.len() != ADDRESS_STR_LEN {
            return Err(KeyError::InvalidAddress(format!(
                "expected {} characters, got {}",
                ADDRESS_STR_LEN,
                text.len()
            )));
        }
        let raw = BASE32_NOPAD
            .decode(text.as_bytes())
            .map_err(|e| KeyError::InvalidAddress(e.to_string()))?;
        if raw.len() != ADDRESS_LEN + CHECKSUM_LEN {
            return Err(KeyError::InvalidAddress(format!(
                "decoded to {} bytes",
                raw.len()
            )));
        }
        let (addr, checksum) = raw.split_at(ADDRESS_LEN);
        let expected = sha512_256(addr);
        if checksum != &expected[ADDRESS_LEN - CHECKSUM_LEN..] {
            return Err(KeyError::AddressChecksum(text.to_string()));
        }
        Self::from_slice(addr)
    }
}

/// Check whether a string is a well-formed, checksummed address
pub fn is_valid_address(text: &str) -> bool {
    Address::decode(text).is_ok()
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

impl FromStr for Address {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

// JSON carries the raw key as base64; base32 is only the display form.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&STANDARD.encode(self.0))
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            let bytes = STANDARD.decode(text.as_bytes()).map_err(de::Error::custom)?;
            Address::from_slice(&bytes).map_err(de::Error::custom)
        } else {
            deserializer
                .deserialize_bytes(FixedBytesVisitor::<ADDRESS_LEN>)
                .map(Address)
        }
    }
}

// =============================================================================
// Signature
// =============================================================================

/// A 64-byte ed25519 signature
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    /// The all-zero signature, used as "not set"
    pub const ZERO: Signature = Signature([0u8; SIGNATURE_LEN]);

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let arr: [u8; SIGNATURE_LEN] =
            bytes
                .try_into()
                .map_err(|_| KeyError::InvalidSignatureLength {
                    expected: SIGNATURE_LEN,
                    got: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Check whether this is the zero signature
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; SIGNATURE_LEN]
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&STANDARD.encode(self.0))
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            let bytes = STANDARD.decode(text.as_bytes()).map_err(de::Error::custom)?;
            Signature::from_slice(&bytes).map_err(de::Error::custom)
        } else {
            deserializer
                .deserialize_bytes(FixedBytesVisitor::<SIGNATURE_LEN>)
                .map(Signature)
        }
    }
}

/// Visitor for fixed-size byte strings in binary formats
pub(crate) struct FixedBytesVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for FixedBytesVisitor<N> {
    type Value = [u8; N];

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a byte string of length {}", N)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        v.try_into()
            .map_err(|_| E::invalid_length(v.len(), &self))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut out = [0u8; N];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        if seq.next_element::<u8>()?.is_some() {
            return Err(de::Error::invalid_length(N + 1, &self));
        }
        Ok(out)
    }
}

// =============================================================================
// Key Pair
// =============================================================================

/// An ed25519 key pair
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create a key pair from a 32-byte seed
    pub fn from_seed(seed: [u8; SEED_LEN]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Create a key pair from a 64-byte private key (seed || public key)
    pub fn from_private_key(private_key: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; PRIVATE_KEY_LEN] =
            private_key
                .try_into()
                .map_err(|_| KeyError::InvalidPrivateKeyLength {
                    expected: PRIVATE_KEY_LEN,
                    got: private_key.len(),
                })?;
        let signing_key =
            SigningKey::from_keypair_bytes(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Get the 64-byte private key (seed || public key)
    /// WARNING: Keep this secret!
    pub fn private_key(&self) -> [u8; PRIVATE_KEY_LEN] {
        self.signing_key.to_keypair_bytes()
    }

    /// Get the 32-byte public key
    pub fn public_key(&self) -> [u8; ADDRESS_LEN] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// The address controlled by this key
    pub fn address(&self) -> Address {
        Address(self.public_key())
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Sign arbitrary data under the `"MX"` prefix
    ///
    /// The prefix keeps such a signature from ever authorizing a
    /// transaction or a program.
    pub fn sign_bytes(&self, data: &[u8]) -> Signature {
        self.sign(&with_prefix(BYTES_PREFIX, data))
    }

    /// Verify a signature against this key pair's public key
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), KeyError> {
        verify_signature(&self.public_key(), message, signature)
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.signing_key.to_bytes() == other.signing_key.to_bytes()
    }
}

impl Eq for KeyPair {}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Verify a signature against a raw public key
pub fn verify_signature(
    public_key: &[u8; ADDRESS_LEN],
    message: &[u8],
    signature: &Signature,
) -> Result<(), KeyError> {
    let verifying_key =
        VerifyingKey::from_bytes(public_key).map_err(|_| KeyError::InvalidPublicKey)?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key
        .verify(message, &sig)
        .map_err(|_| KeyError::VerificationFailed)
}

/// Verify a signature made by [`KeyPair::sign_bytes`]
pub fn verify_bytes(
    address: &Address,
    data: &[u8],
    signature: &Signature,
) -> Result<(), KeyError> {
    verify_signature(address.as_bytes(), &with_prefix(BYTES_PREFIX, data), signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_generation() {
        let kp = KeyPair::generate();
        assert!(!kp.address().is_zero());
        assert_eq!(kp.address().to_string().len(), ADDRESS_STR_LEN);
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let signature = kp.sign(b"hello");
        assert!(kp.verify(b"hello", &signature).is_ok());
        assert_eq!(
            kp.verify(b"goodbye", &signature),
            Err(KeyError::VerificationFailed)
        );
    }

    #[test]
    fn test_private_key_roundtrip() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::from_private_key(&kp1.private_key()).unwrap();
        assert_eq!(kp1, kp2);
        assert_eq!(kp1.address(), kp2.address());
    }

    #[test]
    fn test_private_key_length_checked() {
        let err = KeyPair::from_private_key(&[0u8; 32]).unwrap_err();
        assert_eq!(
            err,
            KeyError::InvalidPrivateKeyLength {
                expected: 64,
                got: 32
            }
        );
    }

    #[test]
    fn test_address_roundtrip() {
        for _ in 0..50 {
            let addr = KeyPair::generate().address();
            let parsed: Address = addr.to_string().parse().unwrap();
            assert_eq!(addr, parsed);
            assert!(is_valid_address(&addr.to_string()));
        }
    }

    #[test]
    fn test_address_known_value() {
        let addr = Address::decode("WWYNX3TKQYVEREVSW6QQP3SXSFOCE3SKUSEIVJ7YAGUPEACNI5UGI4DZCE")
            .unwrap();
        assert_eq!(
            addr.as_bytes()[..8],
            [181, 176, 219, 238, 106, 134, 42, 72]
        );
    }

    #[test]
    fn test_address_checksum_rejected() {
        assert!(!is_valid_address(
            "SONNPE7I3TYWE7VQQA7VCGZK54WXEICYROMWQYXCOB5A5RHM46LVNGZLRU"
        ));
        assert!(!is_valid_address("tooshort"));
    }

    #[test]
    fn test_signature_length_checked() {
        let err = Signature::from_slice(&[1u8; 10]).unwrap_err();
        assert_eq!(
            err,
            KeyError::InvalidSignatureLength {
                expected: 64,
                got: 10
            }
        );
    }

    #[test]
    fn test_json_forms_are_base64() {
        let addr = Address::decode("DN7MBMCL5JQ3PFUQS7TMX5AH4EEKOBJVDUF4TCV6WERATKFLQF4MQUPZTA")
            .unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"G37AsEvqYbeWkJfmy/QH4QinBTUdC8mKvrEiCairgXg=\"");
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), addr);
        assert!(serde_json::from_str::<Address>("\"AAAA\"").is_err());

        let sig = Signature::from_bytes([7u8; SIGNATURE_LEN]);
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, format!("\"{}\"", STANDARD.encode([7u8; SIGNATURE_LEN])));
        assert_eq!(serde_json::from_str::<Signature>(&json).unwrap(), sig);
    }

    #[test]
    fn test_sign_bytes_known_answer() {
        let key = KeyPair::from_seed([0x11; SEED_LEN]);
        let signature = key.sign_bytes(b"hello algorand");
        assert_eq!(
            STANDARD.encode(signature.as_bytes()),
            "b2Fy3b9r6ZbptzuW/P2gakAOMzD0B+P47PNMet0j3GR3cenRVrL1pE6djLJYdbqB+lS0v7Xcw5O3HnysbFnNBQ=="
        );
        assert!(verify_bytes(&key.address(), b"hello algorand", &signature).is_ok());
        assert_eq!(
            verify_bytes(&key.address(), b"hello", &signature),
            Err(KeyError::VerificationFailed)
        );
        // not valid as a signature over the raw data
        assert!(key.verify(b"hello algorand", &signature).is_err());
    }
}
