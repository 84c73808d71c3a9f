//! Multisig account descriptor
//!
//! A threshold account is an ordered list of ed25519 public keys plus the
//! number of signatures required. The order is part of the identity: the
//! same keys in another order form a different account.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::transaction::MultisigSig;
use crate::core::TransactionError;
use crate::crypto::{hash_with_prefix, Address, KeyError, MULTISIG_ADDR_PREFIX};

/// The only multisig version in use
pub const MULTISIG_VERSION: u8 = 1;

/// Errors related to multisig operations
#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("Unknown multisig version: {0}")]
    UnknownVersion(u8),
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Too many keys in multisig account: {0}")]
    TooManyKeys(usize),
    #[error("signer address does not match any of the addresses in the multisig account: {0}")]
    KeyNotInAccount(Address),
    #[error("multisig parameters do not match")]
    ParametersMismatch,
    #[error("multisig authorizing addresses do not match")]
    AuthAddrMismatch,
    #[error("multisig transactions do not match")]
    TransactionMismatch,
    #[error("mismatched duplicate signatures")]
    MismatchedDuplicateSignatures,
    #[error("need at least one signed transaction to merge")]
    NothingToMerge,
    #[error("transaction is not signed by a multisig account")]
    NotMultisig,
    #[error("Multisig verification failed: {0}")]
    VerificationFailed(String),
    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// An M-of-N threshold account
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MultisigAccount {
    version: u8,
    threshold: u8,
    public_keys: Vec<Address>,
}

impl MultisigAccount {
    /// Create a new multisig account
    ///
    /// # Errors
    /// Returns error if the version is not 1, the threshold is outside
    /// `1..=keys.len()` or there are more than 255 keys
    pub fn new(version: u8, threshold: u8, public_keys: Vec<Address>) -> Result<Self, MultisigError> {
        if version != MULTISIG_VERSION {
            return Err(MultisigError::UnknownVersion(version));
        }
        if public_keys.len() > u8::MAX as usize {
            return Err(MultisigError::TooManyKeys(public_keys.len()));
        }
        if public_keys.is_empty() {
            return Err(MultisigError::InvalidThreshold(
                "multisig account has no keys".to_string(),
            ));
        }
        if threshold == 0 {
            return Err(MultisigError::InvalidThreshold(
                "threshold must be at least 1".to_string(),
            ));
        }
        if threshold as usize > public_keys.len() {
            return Err(MultisigError::InvalidThreshold(format!(
                "threshold {} exceeds key count {}",
                threshold,
                public_keys.len()
            )));
        }

        Ok(Self {
            version,
            threshold,
            public_keys,
        })
    }

    /// Create from address strings, in order
    pub fn from_addresses(
        version: u8,
        threshold: u8,
        addresses: &[&str],
    ) -> Result<Self, MultisigError> {
        let keys = addresses
            .iter()
            .map(|text| Address::decode(text))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(version, threshold, keys)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn public_keys(&self) -> &[Address] {
        &self.public_keys
    }

    /// The account address: `H("MultisigAddr" || version || threshold || pk_1 .. pk_n)`
    pub fn address(&self) -> Address {
        let mut preimage = Vec::with_capacity(2 + 32 * self.public_keys.len());
        preimage.push(self.version);
        preimage.push(self.threshold);
        for key in &self.public_keys {
            preimage.extend_from_slice(key.as_bytes());
        }
        Address::from_bytes(hash_with_prefix(MULTISIG_ADDR_PREFIX, &preimage))
    }

    /// Addresses of the member keys, in descriptor order
    pub fn contributing_addresses(&self) -> Vec<String> {
        self.public_keys.iter().map(Address::encode).collect()
    }

    /// Slot positions held by a key (more than one if the key repeats)
    pub fn slots_of(&self, key: &Address) -> Vec<usize> {
        self.public_keys
            .iter()
            .enumerate()
            .filter(|(_, pk)| *pk == key)
            .map(|(i, _)| i)
            .collect()
    }

    /// An envelope with one empty slot per member key
    pub fn blank_signature(&self) -> MultisigSig {
        MultisigSig::blank(self)
    }

    /// Check if a key is a member of this account
    pub fn contains(&self, key: &Address) -> bool {
        self.public_keys.contains(key)
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.public_keys.len())
    }
}

impl fmt::Display for MultisigAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address(), self.description())
    }
}
