//! Atomic group ids
//!
//! A group id binds an ordered list of transactions together: either all of
//! them commit or none do. It is the `"TG"`-prefixed hash of the list of
//! member transaction ids, each computed with the group field cleared.
//!
//! Operations:
//! - compute / assign a group id over up to [`MAX_TX_GROUP_SIZE`] transactions
//! - verify that a list carries the correct group id
//! - split a flat list into its contiguous groups and verify each one

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::encoding;
use super::transaction::{Transaction, TransactionError, MAX_TX_GROUP_SIZE};
use crate::crypto::{hash_with_prefix, Digest, TX_GROUP_PREFIX};

/// Errors from group id handling
#[derive(Error, Debug)]
pub enum GroupError {
    #[error("Input transaction group has 0 elements")]
    Empty,
    #[error("Group of {0} transactions exceeds the maximum of 16")]
    TooLarge(usize),
    #[error("The transactions in range [{start}:{end}] form an invalid group")]
    InvalidGroup { start: usize, end: usize },
    #[error("Could not decode transaction at index {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: TransactionError,
    },
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

/// Preimage of a group id: `{txlist: [txid, ...]}`
#[derive(Serialize, Deserialize)]
struct TxGroup {
    #[serde(rename = "txlist")]
    tx_list: Vec<Digest>,
}

/// Compute the group id of an ordered list of transactions
///
/// Any group field already present is ignored.
pub fn compute_group_id(txns: &[Transaction]) -> Result<Digest, GroupError> {
    if txns.is_empty() {
        return Err(GroupError::Empty);
    }
    if txns.len() > MAX_TX_GROUP_SIZE {
        return Err(GroupError::TooLarge(txns.len()));
    }

    let tx_list = txns
        .iter()
        .map(|txn| {
            let mut cleared = txn.clone();
            cleared.group = Digest::ZERO;
            cleared.id()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let preimage = encoding::encode(&TxGroup { tx_list }).map_err(TransactionError::from)?;
    Ok(Digest(hash_with_prefix(TX_GROUP_PREFIX, &preimage)))
}

/// Compute the group id and write it into every transaction
///
/// A single transaction also receives the id.
pub fn assign_group_id(txns: &mut [Transaction]) -> Result<Digest, GroupError> {
    let gid = compute_group_id(txns)?;
    for txn in txns.iter_mut() {
        txn.group = gid;
    }
    log::debug!("Assigned group id {} to {} transactions", gid, txns.len());
    Ok(gid)
}

/// Check that a list of transactions carries its correct group id
///
/// A single transaction with no group id is a valid group of one.
pub fn verify_group_id(txns: &[Transaction]) -> Result<bool, GroupError> {
    let first = txns.first().ok_or(GroupError::Empty)?;

    if txns.len() == 1 && first.group.is_zero() {
        return Ok(true);
    }
    if txns.iter().any(|txn| txn.group != first.group) {
        return Ok(false);
    }
    if txns.len() > MAX_TX_GROUP_SIZE {
        return Ok(false);
    }

    Ok(compute_group_id(txns)? == first.group)
}

/// Split transactions into contiguous groups and verify each one
///
/// A new group starts whenever the group field changes, and every
/// transaction without a group field stands alone. Returns, for each
/// input transaction, the index of the group it belongs to.
pub fn find_and_verify_groups(txns: &[Transaction]) -> Result<Vec<usize>, GroupError> {
    if txns.is_empty() {
        return Err(GroupError::Empty);
    }

    let mut assignment = Vec::with_capacity(txns.len());
    let mut starts = Vec::new();
    let mut prev = Digest::ZERO;

    for (i, txn) in txns.iter().enumerate() {
        if txn.group != prev || txn.group.is_zero() {
            starts.push(i);
        }
        assignment.push(starts.len() - 1);
        prev = txn.group;
    }

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(txns.len());
        if !verify_group_id(&txns[start..end])? {
            log::warn!("Invalid group in range [{}:{}]", start, end);
            return Err(GroupError::InvalidGroup { start, end });
        }
    }

    Ok(assignment)
}

// =============================================================================
// Encoded Forms
// =============================================================================

/// Decode a list of encoded transactions, naming the first bad index
pub fn decode_transactions(encoded: &[Vec<u8>]) -> Result<Vec<Transaction>, GroupError> {
    encoded
        .iter()
        .enumerate()
        .map(|(index, bytes)| {
            Transaction::decode(bytes).map_err(|source| GroupError::Decode { index, source })
        })
        .collect()
}

/// [`assign_group_id`] over encoded transactions, returning re-encoded ones
pub fn assign_group_id_encoded(encoded: &[Vec<u8>]) -> Result<Vec<Vec<u8>>, GroupError> {
    let mut txns = decode_transactions(encoded)?;
    assign_group_id(&mut txns)?;
    txns.iter()
        .map(|txn| txn.encode().map_err(GroupError::from))
        .collect()
}

/// [`verify_group_id`] over encoded transactions
pub fn verify_group_id_encoded(encoded: &[Vec<u8>]) -> Result<bool, GroupError> {
    verify_group_id(&decode_transactions(encoded)?)
}

/// [`find_and_verify_groups`] over encoded transactions
pub fn find_and_verify_groups_encoded(encoded: &[Vec<u8>]) -> Result<Vec<usize>, GroupError> {
    find_and_verify_groups(&decode_transactions(encoded)?)
}
