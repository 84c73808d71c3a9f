//! Algo-Atomic: atomic transaction groups and multi-party signing
//!
//! This crate provides:
//! - Canonical msgpack transactions with ids and group ids
//! - Ed25519 keys and checksummed base32 addresses
//! - Multisig accounts with signature aggregation
//! - Logic signature accounts (escrow and delegated)
//! - ARC-4 ABI types, values and method descriptors
//! - Pluggable transaction signers
//! - An atomic transaction composer that builds, groups and signs
//!
//! # Example
//!
//! ```rust
//! use algo_atomic::composer::AtomicTransactionComposer;
//! use algo_atomic::core::{SuggestedParams, TransactionBuilder};
//! use algo_atomic::crypto::{Digest, KeyPair};
//! use algo_atomic::signer::{Signer, TransactionWithSigner};
//!
//! let alice = KeyPair::generate();
//! let bob = KeyPair::generate();
//! let params = SuggestedParams {
//!     fee: 1000,
//!     genesis_id: "testnet-v1.0".to_string(),
//!     genesis_hash: Digest([1u8; 32]),
//!     first_valid: 1,
//!     last_valid: 1000,
//!     flat_fee: true,
//! };
//!
//! let mut atc = AtomicTransactionComposer::new();
//! for (from, to) in [(&alice, &bob), (&bob, &alice)] {
//!     let txn = TransactionBuilder::payment(from.address(), to.address(), 1_000)
//!         .build(&params)
//!         .unwrap();
//!     atc.add_transaction(TransactionWithSigner::new(txn, Signer::basic(from.clone())))
//!         .unwrap();
//! }
//!
//! let signed = atc.gather_signatures().unwrap();
//! assert_eq!(signed.len(), 2);
//! ```

pub mod abi;
pub mod cli;
pub mod composer;
pub mod config;
pub mod core;
pub mod crypto;
pub mod logicsig;
pub mod multisig;
pub mod signer;

// Re-export commonly used types
pub use abi::{Method, Type, Value};
pub use composer::{AtomicTransactionComposer, ComposerStatus, MethodCallParams};
pub use core::{SignedTxn, SuggestedParams, Transaction, TransactionBuilder};
pub use crypto::{Address, KeyPair};
pub use logicsig::LogicSigAccount;
pub use multisig::MultisigAccount;
pub use signer::{Signer, TransactionSigner, TransactionWithSigner};
