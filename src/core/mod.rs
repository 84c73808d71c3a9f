//! Core transaction components
//!
//! This module contains the fundamental building blocks:
//! - Canonical msgpack encoding
//! - Transactions and their constructors (payment, keyreg, assets, apps)
//! - Signed transaction envelopes
//! - Group ids (compute, assign, verify, segment)

pub mod encoding;
pub mod group;
pub mod signed;
pub mod transaction;

pub use encoding::{decode, encode, EncodingError};
pub use group::{
    assign_group_id, assign_group_id_encoded, compute_group_id, decode_transactions,
    find_and_verify_groups, find_and_verify_groups_encoded, verify_group_id,
    verify_group_id_encoded, GroupError,
};
pub use signed::{attach_signature_with_signer, SignedTxn};
pub use transaction::{
    resolve_box_references, transaction_json_to_msgpack, transaction_msgpack_to_json,
    AppBoxReference, AppCall, AssetParams, BoxReference, OnCompletion,
    ParticipationKeys, StateSchema, SuggestedParams, Transaction, TransactionBuilder,
    TransactionError, TxType, MAX_TX_GROUP_SIZE, MIN_TXN_FEE,
};
