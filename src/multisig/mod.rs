//! Multi-signature accounts and signature aggregation
//!
//! Provides M-of-N threshold accounts where M signatures from N ordered
//! member keys authorize a transaction.
//!
//! # Example
//!
//! ```ignore
//! use algo_atomic::multisig::{MultisigAccount, sign_multisig_transaction, merge_all};
//!
//! // Create a 2-of-3 multisig account
//! let account = MultisigAccount::new(1, 2, vec![pk1, pk2, pk3])?;
//!
//! // Each member signs independently
//! let a = sign_multisig_transaction(&key1, &account, &txn)?;
//! let b = sign_multisig_transaction(&key3, &account, &txn)?;
//!
//! // Merge the partial envelopes
//! let signed = merge_all(&[a, b])?;
//! ```

pub mod account;
pub mod transaction;

pub use account::{MultisigAccount, MultisigError, MULTISIG_VERSION};
pub use transaction::{
    attach_multisig_signature, extract_multisig_account, merge_all, merge_multisig_encoded,
    merge_multisig_transactions, sign_multisig_transaction, MultisigSig, MultisigSubsig,
};
