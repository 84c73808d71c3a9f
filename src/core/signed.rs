//! Signed transaction envelope
//!
//! A transaction travels with exactly one authorization: a plain signature,
//! a multisig signature or a logic signature. `sgnr` names the authorizer
//! when it differs from the sender (rekeyed accounts).

use serde::{Deserialize, Serialize};

use super::encoding;
use super::transaction::{Transaction, TransactionError};
use crate::crypto::{Address, Digest, KeyPair, Signature};
use crate::logicsig::LogicSig;
use crate::multisig::MultisigSig;

/// A transaction together with its authorization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignedTxn {
    #[serde(rename = "lsig", default, skip_serializing_if = "Option::is_none")]
    pub lsig: Option<LogicSig>,
    #[serde(rename = "msig", default, skip_serializing_if = "Option::is_none")]
    pub msig: Option<MultisigSig>,
    #[serde(rename = "sgnr", default, skip_serializing_if = "Option::is_none")]
    pub auth_addr: Option<Address>,
    #[serde(rename = "sig", default, skip_serializing_if = "Option::is_none")]
    pub sig: Option<Signature>,
    #[serde(rename = "txn")]
    pub txn: Transaction,
}

impl SignedTxn {
    /// Wrap a transaction with no authorization yet
    pub fn new(txn: Transaction) -> Self {
        Self {
            txn,
            ..Default::default()
        }
    }

    /// Sign a transaction with a single key
    ///
    /// `sgnr` is set when the key's address is not the sender.
    pub fn sign(key: &KeyPair, txn: &Transaction) -> Result<Self, TransactionError> {
        let signature = key.sign(&txn.bytes_to_sign()?);
        Ok(Self::with_signature(signature, txn.clone(), key.address()))
    }

    /// Attach an externally produced signature made by `signer`
    pub fn with_signature(signature: Signature, txn: Transaction, signer: Address) -> Self {
        let auth_addr = (signer != txn.sender).then_some(signer);
        Self {
            sig: Some(signature),
            auth_addr,
            txn,
            ..Default::default()
        }
    }

    /// Whether any authorization is present
    pub fn is_signed(&self) -> bool {
        self.sig.is_some() || self.msig.is_some() || self.lsig.is_some()
    }

    /// The address whose authority signs this transaction
    pub fn authorizer(&self) -> Address {
        self.auth_addr.unwrap_or(self.txn.sender)
    }

    /// Id of the inner transaction
    pub fn id(&self) -> Result<Digest, TransactionError> {
        self.txn.id()
    }

    /// Canonical msgpack bytes
    pub fn encode(&self) -> Result<Vec<u8>, TransactionError> {
        Ok(encoding::encode(self)?)
    }

    /// Decode from canonical msgpack bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, TransactionError> {
        Ok(encoding::decode(bytes)?)
    }
}

/// Attach a signature made elsewhere to an encoded transaction
///
/// `signer` is the base32 address whose key made the signature; it is
/// recorded as `sgnr` when it is not the sender. Returns the encoded
/// signed transaction. The signature itself is not checked.
pub fn attach_signature_with_signer(
    signature: &[u8],
    encoded_txn: &[u8],
    signer: &str,
) -> Result<Vec<u8>, TransactionError> {
    let signature = Signature::from_slice(signature)?;
    let txn = Transaction::decode(encoded_txn)?;
    let signer: Address = signer.parse()?;
    SignedTxn::with_signature(signature, txn, signer).encode()
}
