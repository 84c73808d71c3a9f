//! Single-key signer

use std::fmt;

use super::{select, SignerError};
use crate::core::{SignedTxn, Transaction};
use crate::crypto::{Address, KeyPair};

/// Signs with one ed25519 key
///
/// When the key's address is not the sender (a rekeyed account) the signed
/// transaction names the key's address as `sgnr`.
#[derive(Clone)]
pub struct BasicSigner {
    key: KeyPair,
}

impl BasicSigner {
    pub fn new(key: KeyPair) -> Self {
        Self { key }
    }

    /// Create from a 64-byte private key (seed followed by public key)
    pub fn from_private_key(private_key: &[u8]) -> Result<Self, SignerError> {
        Ok(Self::new(KeyPair::from_private_key(private_key)?))
    }

    pub fn address(&self) -> Address {
        self.key.address()
    }

    pub fn sign_transactions(
        &self,
        txns: &[Transaction],
        indexes: &[usize],
    ) -> Result<Vec<Vec<u8>>, SignerError> {
        log::debug!("{} signing {} transaction(s)", self.address(), indexes.len());
        select(txns, indexes)?
            .into_iter()
            .map(|txn| -> Result<Vec<u8>, SignerError> {
                Ok(SignedTxn::sign(&self.key, txn)?.encode()?)
            })
            .collect()
    }
}

impl PartialEq for BasicSigner {
    fn eq(&self, other: &Self) -> bool {
        self.key.private_key() == other.key.private_key()
    }
}

impl fmt::Debug for BasicSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicSigner")
            .field("address", &self.address())
            .finish()
    }
}
