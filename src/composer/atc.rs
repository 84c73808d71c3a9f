//! Atomic transaction composer

use super::{ComposerError, MethodCallParams};
use crate::abi::Method;
use crate::core::{compute_group_id, Transaction, MAX_TX_GROUP_SIZE};
use crate::crypto::Digest;
use crate::signer::{Signer, TransactionWithSigner};

/// Lifecycle of a composer; it only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ComposerStatus {
    /// Transactions may still be added
    #[default]
    Building,
    /// The group id is assigned and the group is frozen
    Built,
    /// Every transaction has a signature
    Signed,
}

/// One transaction of the group with its signer
#[derive(Debug, Clone)]
struct Entry {
    txn: Transaction,
    signer: Signer,
    /// Method descriptor when this entry is an ABI method call
    method: Option<Method>,
}

/// Builds a group of up to 16 transactions and collects their signatures
///
/// Entries are kept in insertion order. [`build_group`](Self::build_group)
/// stamps the group id, after which nothing can be added;
/// [`gather_signatures`](Self::gather_signatures) asks each distinct signer
/// once for all of its transactions.
#[derive(Debug, Default)]
pub struct AtomicTransactionComposer {
    status: ComposerStatus,
    entries: Vec<Entry>,
    signed: Vec<Vec<u8>>,
}

impl AtomicTransactionComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ComposerStatus {
        self.status
    }

    /// Number of transactions in the group
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// The transactions with their signers, in group order
    pub fn transactions(&self) -> Vec<TransactionWithSigner> {
        self.entries
            .iter()
            .map(|entry| TransactionWithSigner::new(entry.txn.clone(), entry.signer.clone()))
            .collect()
    }

    /// Method descriptor of the method call at `index`, if it is one
    pub fn method_at(&self, index: usize) -> Option<&Method> {
        self.entries.get(index)?.method.as_ref()
    }

    fn ensure_building(&self) -> Result<(), ComposerError> {
        if self.status != ComposerStatus::Building {
            return Err(ComposerError::NotBuilding);
        }
        Ok(())
    }

    /// Append a transaction
    ///
    /// # Errors
    /// The composer is past `Building`, the group is full, or the
    /// transaction already belongs to a group.
    pub fn add_transaction(&mut self, entry: TransactionWithSigner) -> Result<(), ComposerError> {
        self.ensure_building()?;
        if self.count() == MAX_TX_GROUP_SIZE {
            return Err(ComposerError::GroupFull);
        }
        if entry.txn().has_group() {
            return Err(ComposerError::NonZeroGroup);
        }

        let (txn, signer) = entry.into_parts();
        self.entries.push(Entry {
            txn,
            signer,
            method: None,
        });
        Ok(())
    }

    /// Append an ABI method call and its transaction arguments
    ///
    /// Nothing is added unless the whole call is valid.
    pub fn add_method_call(&mut self, params: &MethodCallParams) -> Result<(), ComposerError> {
        self.ensure_building()?;
        if self.count() + params.method().tx_count() > MAX_TX_GROUP_SIZE {
            return Err(ComposerError::GroupFull);
        }

        let mut expanded = params.to_entries()?;
        let call = expanded.pop().ok_or(ComposerError::Empty)?;
        for entry in expanded {
            let (txn, signer) = entry.into_parts();
            self.entries.push(Entry {
                txn,
                signer,
                method: None,
            });
        }
        let (txn, signer) = call.into_parts();
        self.entries.push(Entry {
            txn,
            signer,
            method: Some(params.method().clone()),
        });
        Ok(())
    }

    /// Assign the group id and freeze the group
    ///
    /// A lone transaction keeps an empty group field. Later calls return
    /// the same transactions without recomputing.
    pub fn build_group(&mut self) -> Result<Vec<TransactionWithSigner>, ComposerError> {
        if self.status > ComposerStatus::Building {
            return Ok(self.transactions());
        }
        if self.entries.is_empty() {
            return Err(ComposerError::Empty);
        }

        if self.entries.len() > 1 {
            let txns: Vec<Transaction> = self.entries.iter().map(|e| e.txn.clone()).collect();
            let group = compute_group_id(&txns)?;
            for entry in &mut self.entries {
                entry.txn.group = group;
            }
            log::debug!("Assigned group {} to {} transactions", group, self.entries.len());
        }

        self.status = ComposerStatus::Built;
        Ok(self.transactions())
    }

    /// Sign every transaction, building the group first if needed
    ///
    /// Entries with equal signers share one signer call, which receives
    /// their indexes in ascending order. The signed transactions are cached;
    /// later calls return them without signing again.
    ///
    /// # Errors
    /// Any signer failure. The composer stays `Built` and nothing is cached.
    pub fn gather_signatures(&mut self) -> Result<Vec<Vec<u8>>, ComposerError> {
        if self.status == ComposerStatus::Signed {
            return Ok(self.signed.clone());
        }
        self.build_group()?;

        let txns: Vec<Transaction> = self.entries.iter().map(|e| e.txn.clone()).collect();
        let mut buckets: Vec<(&Signer, Vec<usize>)> = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            match buckets.iter_mut().find(|bucket| bucket.0 == &entry.signer) {
                Some(bucket) => bucket.1.push(index),
                None => buckets.push((&entry.signer, vec![index])),
            }
        }

        let mut signed: Vec<Option<Vec<u8>>> = vec![None; txns.len()];
        for (signer, indexes) in &buckets {
            log::debug!("Requesting signatures for {:?}", indexes);
            let payloads = signer.sign_transactions(&txns, indexes)?;
            for (&index, payload) in indexes.iter().zip(payloads) {
                signed[index] = Some(payload);
            }
        }
        let signed = signed
            .into_iter()
            .enumerate()
            .map(|(index, payload)| {
                payload
                    .filter(|bytes| !bytes.is_empty())
                    .ok_or(ComposerError::MissingSignature(index))
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Signed group of {} transactions with {} signer(s)",
            signed.len(),
            buckets.len()
        );
        self.signed = signed.clone();
        self.status = ComposerStatus::Signed;
        Ok(signed)
    }

    /// A fresh `Building` composer holding the same entries
    ///
    /// Group ids are cleared so the copy can be extended and rebuilt.
    pub fn clone_building(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .cloned()
            .map(|mut entry| {
                entry.txn.group = Digest::default();
                entry
            })
            .collect();
        Self {
            status: ComposerStatus::Building,
            entries,
            signed: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{verify_group_id, SignedTxn};
    use crate::crypto::KeyPair;
    use crate::signer::tests::{params, payment, CountingSigner};
    use crate::signer::TransactionSigner;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn paid_by(key: &KeyPair, amount: u64) -> TransactionWithSigner {
        TransactionWithSigner::new(payment(key.address(), amount), Signer::basic(key.clone()))
    }

    #[test]
    fn test_single_transaction_keeps_empty_group() {
        let key = KeyPair::generate();
        let mut atc = AtomicTransactionComposer::new();
        atc.add_transaction(paid_by(&key, 1)).unwrap();

        let built = atc.build_group().unwrap();
        assert_eq!(built.len(), 1);
        assert!(!built[0].txn().has_group());
        assert_eq!(atc.status(), ComposerStatus::Built);
    }

    #[test]
    fn test_build_assigns_group() {
        let key = KeyPair::generate();
        let mut atc = AtomicTransactionComposer::new();
        atc.add_transaction(paid_by(&key, 1)).unwrap();
        atc.add_transaction(paid_by(&key, 2)).unwrap();

        let txns: Vec<Transaction> = atc
            .build_group()
            .unwrap()
            .into_iter()
            .map(|entry| entry.into_parts().0)
            .collect();
        assert!(txns[0].has_group());
        assert_eq!(txns[0].group, txns[1].group);
        assert!(verify_group_id(&txns).unwrap());

        // idempotent
        let again = atc.build_group().unwrap();
        assert_eq!(again[0].txn(), &txns[0]);
    }

    #[test]
    fn test_empty_build_fails() {
        let mut atc = AtomicTransactionComposer::new();
        assert!(matches!(atc.build_group(), Err(ComposerError::Empty)));
        assert_eq!(atc.status(), ComposerStatus::Building);
    }

    #[test]
    fn test_add_rules() {
        let key = KeyPair::generate();
        let mut atc = AtomicTransactionComposer::new();

        let mut grouped = payment(key.address(), 1);
        grouped.group = Digest([9u8; 32]);
        assert!(matches!(
            atc.add_transaction(TransactionWithSigner::new(grouped, Signer::basic(key.clone()))),
            Err(ComposerError::NonZeroGroup)
        ));

        for amount in 0..16 {
            atc.add_transaction(paid_by(&key, amount)).unwrap();
        }
        assert!(matches!(
            atc.add_transaction(paid_by(&key, 16)),
            Err(ComposerError::GroupFull)
        ));
        assert_eq!(atc.count(), 16);

        atc.build_group().unwrap();
        assert!(matches!(
            atc.add_transaction(paid_by(&key, 1)),
            Err(ComposerError::NotBuilding)
        ));
    }

    #[test]
    fn test_method_call_entries() {
        let key = KeyPair::generate();
        let method = Method::from_signature("deposit(pay,uint64)void").unwrap();
        let mut call = MethodCallParams::new(
            12,
            method.clone(),
            key.address(),
            params(),
            Signer::basic(key.clone()),
        );
        call.add_method_argument_transaction(paid_by(&key, 50)).unwrap();
        call.add_method_argument_value(50u64).unwrap();

        let mut atc = AtomicTransactionComposer::new();
        atc.add_transaction(paid_by(&key, 1)).unwrap();
        atc.add_method_call(&call).unwrap();
        assert_eq!(atc.count(), 3);
        assert_eq!(atc.method_at(2), Some(&method));
        assert_eq!(atc.method_at(1), None);

        let incomplete = MethodCallParams::new(
            12,
            method,
            key.address(),
            params(),
            Signer::basic(key.clone()),
        );
        assert!(matches!(
            atc.add_method_call(&incomplete),
            Err(ComposerError::ArgCount { expected: 2, got: 0 })
        ));
        assert_eq!(atc.count(), 3);
    }

    #[test]
    fn test_method_call_group_limit() {
        let key = KeyPair::generate();
        let mut call = MethodCallParams::new(
            12,
            Method::from_signature("deposit(pay)void").unwrap(),
            key.address(),
            params(),
            Signer::basic(key.clone()),
        );
        call.add_method_argument_transaction(paid_by(&key, 5)).unwrap();

        let mut atc = AtomicTransactionComposer::new();
        for amount in 0..15 {
            atc.add_transaction(paid_by(&key, amount)).unwrap();
        }
        assert!(matches!(
            atc.add_method_call(&call),
            Err(ComposerError::GroupFull)
        ));
        assert_eq!(atc.count(), 15);
    }

    #[test]
    fn test_gather_buckets_signers() {
        let alice = KeyPair::generate();
        let counting = Arc::new(CountingSigner::default());
        let external: Arc<dyn TransactionSigner> = counting.clone();

        let mut atc = AtomicTransactionComposer::new();
        atc.add_transaction(paid_by(&alice, 1)).unwrap();
        atc.add_transaction(TransactionWithSigner::new(
            payment(alice.address(), 2),
            Signer::external(external.clone()),
        ))
        .unwrap();
        atc.add_transaction(paid_by(&alice, 3)).unwrap();
        atc.add_transaction(TransactionWithSigner::new(
            payment(alice.address(), 4),
            Signer::external(external),
        ))
        .unwrap();

        let signed = atc.gather_signatures().unwrap();
        assert_eq!(signed.len(), 4);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert_eq!(signed[1], b"signed".to_vec());
        assert_eq!(signed[3], b"signed".to_vec());

        let first = SignedTxn::decode(&signed[0]).unwrap();
        assert!(first.txn.has_group());
        assert_eq!(first.txn.amount, 1);
        assert_eq!(atc.status(), ComposerStatus::Signed);

        // cached
        assert_eq!(atc.gather_signatures().unwrap(), signed);
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_gather_failure_keeps_no_cache() {
        let alice = KeyPair::generate();
        let failing = Arc::new(CountingSigner {
            fail: true,
            ..Default::default()
        });

        let mut atc = AtomicTransactionComposer::new();
        atc.add_transaction(paid_by(&alice, 1)).unwrap();
        atc.add_transaction(TransactionWithSigner::new(
            payment(alice.address(), 2),
            Signer::external(failing.clone()),
        ))
        .unwrap();

        assert!(matches!(
            atc.gather_signatures(),
            Err(ComposerError::Signer(_))
        ));
        assert_eq!(atc.status(), ComposerStatus::Built);
        assert!(matches!(
            atc.gather_signatures(),
            Err(ComposerError::Signer(_))
        ));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clone_building() {
        let key = KeyPair::generate();
        let mut atc = AtomicTransactionComposer::new();
        atc.add_transaction(paid_by(&key, 1)).unwrap();
        atc.add_transaction(paid_by(&key, 2)).unwrap();
        atc.build_group().unwrap();

        let mut copy = atc.clone_building();
        assert_eq!(copy.status(), ComposerStatus::Building);
        assert_eq!(copy.count(), 2);
        assert!(copy.transactions().iter().all(|e| !e.txn().has_group()));

        copy.add_transaction(paid_by(&key, 3)).unwrap();
        assert_eq!(copy.count(), 3);
        assert_eq!(atc.count(), 2);
        assert_eq!(atc.status(), ComposerStatus::Built);
    }
}
