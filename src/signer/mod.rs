//! Transaction signers
//!
//! A signer holds the authority to sign some transactions of a group. The
//! built-in authorities are variants of [`Signer`]; anything else (remote
//! keys, hardware wallets, test doubles) plugs in through the
//! [`TransactionSigner`] trait as [`Signer::External`].

pub mod basic;
pub mod logicsig;
pub mod multisig;

pub use basic::BasicSigner;
pub use logicsig::LogicSigSigner;
pub use multisig::MultisigSigner;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::core::{Transaction, TransactionError};
use crate::crypto::{Address, KeyError, KeyPair};
use crate::logicsig::{LogicSigAccount, LogicSigError};
use crate::multisig::{MultisigAccount, MultisigError};

/// Signing errors
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("Index {index} out of range for a group of {len} transactions")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Signer returned {got} signed transactions, expected {expected}")]
    WrongPayloadCount { expected: usize, got: usize },
    #[error("duplicate private key for public key {0}")]
    DuplicateKey(Address),
    #[error("Key {0} is not part of the multisig account")]
    KeyNotInMultisig(Address),
    #[error("not enough private keys to meet multisig threshold. Have {have}, need {need}")]
    InsufficientKeys { have: usize, need: u8 },
    #[error("External signer failed: {0}")]
    External(String),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Multisig error: {0}")]
    Multisig(#[from] MultisigError),
    #[error("LogicSig error: {0}")]
    LogicSig(#[from] LogicSigError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
}

/// Something that can sign a subset of a transaction group
///
/// `sign_transactions` returns one encoded signed transaction per requested
/// index, in the order requested.
pub trait TransactionSigner: Send + Sync + fmt::Debug {
    fn sign_transactions(
        &self,
        txns: &[Transaction],
        indexes: &[usize],
    ) -> Result<Vec<Vec<u8>>, SignerError>;

    /// Whether two signers hold the same authority; the default is identity
    fn equals(&self, other: &dyn TransactionSigner) -> bool {
        std::ptr::eq(
            self as *const Self as *const u8,
            other as *const dyn TransactionSigner as *const u8,
        )
    }
}

/// A signing authority
#[derive(Clone, Debug)]
pub enum Signer {
    /// A single ed25519 key
    Basic(BasicSigner),
    /// Enough member keys of a multisig account to meet its threshold
    Multisig(MultisigSigner),
    /// A logic signature, escrow or delegated
    LogicSig(LogicSigSigner),
    /// A caller supplied implementation
    External(Arc<dyn TransactionSigner>),
}

impl Signer {
    pub fn basic(key: KeyPair) -> Self {
        Signer::Basic(BasicSigner::new(key))
    }

    pub fn multisig(account: MultisigAccount, keys: Vec<KeyPair>) -> Result<Self, SignerError> {
        Ok(Signer::Multisig(MultisigSigner::new(account, keys)?))
    }

    pub fn logicsig(account: LogicSigAccount) -> Self {
        Signer::LogicSig(LogicSigSigner::new(account))
    }

    pub fn external(signer: Arc<dyn TransactionSigner>) -> Self {
        Signer::External(signer)
    }

    /// Sign `txns[i]` for each `i` in `indexes`
    pub fn sign_transactions(
        &self,
        txns: &[Transaction],
        indexes: &[usize],
    ) -> Result<Vec<Vec<u8>>, SignerError> {
        let signed = match self {
            Signer::Basic(signer) => signer.sign_transactions(txns, indexes)?,
            Signer::Multisig(signer) => signer.sign_transactions(txns, indexes)?,
            Signer::LogicSig(signer) => signer.sign_transactions(txns, indexes)?,
            Signer::External(signer) => signer.sign_transactions(txns, indexes)?,
        };
        if signed.len() != indexes.len() {
            return Err(SignerError::WrongPayloadCount {
                expected: indexes.len(),
                got: signed.len(),
            });
        }
        Ok(signed)
    }
}

impl PartialEq for Signer {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Signer::Basic(a), Signer::Basic(b)) => a == b,
            (Signer::Multisig(a), Signer::Multisig(b)) => a == b,
            (Signer::LogicSig(a), Signer::LogicSig(b)) => a == b,
            (Signer::External(a), Signer::External(b)) => {
                Arc::ptr_eq(a, b) || a.equals(b.as_ref())
            }
            _ => false,
        }
    }
}

/// A transaction paired with the signer that will authorize it
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionWithSigner {
    txn: Transaction,
    signer: Signer,
}

impl TransactionWithSigner {
    pub fn new(txn: Transaction, signer: Signer) -> Self {
        Self { txn, signer }
    }

    pub fn txn(&self) -> &Transaction {
        &self.txn
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn into_parts(self) -> (Transaction, Signer) {
        (self.txn, self.signer)
    }
}

/// Look up the requested transactions
pub(crate) fn select<'a>(
    txns: &'a [Transaction],
    indexes: &[usize],
) -> Result<Vec<&'a Transaction>, SignerError> {
    indexes
        .iter()
        .map(|&index| {
            txns.get(index).ok_or(SignerError::IndexOutOfRange {
                index,
                len: txns.len(),
            })
        })
        .collect()
}
