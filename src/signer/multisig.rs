//! Multisig signer

use std::collections::HashSet;
use std::fmt;

use super::{select, SignerError};
use crate::core::Transaction;
use crate::crypto::KeyPair;
use crate::multisig::{merge_all, sign_multisig_transaction, MultisigAccount};

/// Signs with several member keys of one multisig account
///
/// Each transaction gets a single envelope holding every contributed
/// signature.
#[derive(Clone)]
pub struct MultisigSigner {
    account: MultisigAccount,
    keys: Vec<KeyPair>,
}

impl MultisigSigner {
    /// Bind member keys to an account
    ///
    /// # Errors
    /// A key outside the account, two keys for the same slot, or fewer
    /// distinct keys than the threshold.
    pub fn new(account: MultisigAccount, keys: Vec<KeyPair>) -> Result<Self, SignerError> {
        let mut seen = HashSet::new();
        for key in &keys {
            let address = key.address();
            let slot = account
                .slots_of(&address)
                .first()
                .copied()
                .ok_or(SignerError::KeyNotInMultisig(address))?;
            if !seen.insert(slot) {
                return Err(SignerError::DuplicateKey(address));
            }
        }
        if seen.len() < account.threshold() as usize {
            return Err(SignerError::InsufficientKeys {
                have: seen.len(),
                need: account.threshold(),
            });
        }

        Ok(Self { account, keys })
    }

    pub fn account(&self) -> &MultisigAccount {
        &self.account
    }

    pub fn sign_transactions(
        &self,
        txns: &[Transaction],
        indexes: &[usize],
    ) -> Result<Vec<Vec<u8>>, SignerError> {
        log::debug!(
            "{} signing {} transaction(s) with {} key(s)",
            self.account,
            indexes.len(),
            self.keys.len()
        );
        select(txns, indexes)?
            .into_iter()
            .map(|txn| -> Result<Vec<u8>, SignerError> {
                let parts = self
                    .keys
                    .iter()
                    .map(|key| sign_multisig_transaction(key, &self.account, txn))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(merge_all(&parts)?.encode()?)
            })
            .collect()
    }
}

impl PartialEq for MultisigSigner {
    fn eq(&self, other: &Self) -> bool {
        self.account == other.account
            && self.keys.len() == other.keys.len()
            && self
                .keys
                .iter()
                .zip(&other.keys)
                .all(|(a, b)| a.private_key() == b.private_key())
    }
}

impl fmt::Debug for MultisigSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultisigSigner")
            .field("account", &self.account)
            .field(
                "keys",
                &self.keys.iter().map(KeyPair::address).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SignedTxn;
    use crate::signer::tests::payment;

    fn two_of_three() -> (MultisigAccount, Vec<KeyPair>) {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let account =
            MultisigAccount::new(1, 2, keys.iter().map(KeyPair::address).collect()).unwrap();
        (account, keys)
    }

    #[test]
    fn test_construction_rules() {
        let (account, keys) = two_of_three();

        assert!(matches!(
            MultisigSigner::new(account.clone(), vec![keys[0].clone()]),
            Err(SignerError::InsufficientKeys { have: 1, need: 2 })
        ));
        assert!(matches!(
            MultisigSigner::new(account.clone(), vec![keys[0].clone(), keys[0].clone()]),
            Err(SignerError::DuplicateKey(_))
        ));
        assert!(matches!(
            MultisigSigner::new(account.clone(), vec![keys[0].clone(), KeyPair::generate()]),
            Err(SignerError::KeyNotInMultisig(_))
        ));
        assert!(MultisigSigner::new(account, vec![keys[0].clone(), keys[2].clone()]).is_ok());
    }

    #[test]
    fn test_sign_fills_contributed_slots() {
        let (account, keys) = two_of_three();
        let signer = MultisigSigner::new(account.clone(), vec![keys[0].clone(), keys[2].clone()])
            .unwrap();
        let txns = vec![payment(account.address(), 10)];

        let signed = signer.sign_transactions(&txns, &[0]).unwrap();
        let stx = SignedTxn::decode(&signed[0]).unwrap();
        let msig = stx.msig.unwrap();
        assert!(stx.auth_addr.is_none());
        assert!(msig.subsigs[0].sig.is_some());
        assert!(msig.subsigs[1].sig.is_none());
        assert!(msig.subsigs[2].sig.is_some());
        msig.verify(&txns[0].bytes_to_sign().unwrap()).unwrap();
    }

    #[test]
    fn test_rekeyed_to_multisig() {
        let (account, keys) = two_of_three();
        let signer = MultisigSigner::new(account.clone(), keys[..2].to_vec()).unwrap();
        let sender = KeyPair::generate().address();
        let txns = vec![payment(sender, 1)];

        let stx = SignedTxn::decode(&signer.sign_transactions(&txns, &[0]).unwrap()[0]).unwrap();
        assert_eq!(stx.auth_addr, Some(account.address()));
    }
}
