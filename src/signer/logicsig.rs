//! Logic signature signer

use super::{select, SignerError};
use crate::core::Transaction;
use crate::logicsig::LogicSigAccount;

/// Attaches a logic signature; holds no secret key
#[derive(Clone, Debug, PartialEq)]
pub struct LogicSigSigner {
    account: LogicSigAccount,
}

impl LogicSigSigner {
    pub fn new(account: LogicSigAccount) -> Self {
        Self { account }
    }

    pub fn account(&self) -> &LogicSigAccount {
        &self.account
    }

    pub fn sign_transactions(
        &self,
        txns: &[Transaction],
        indexes: &[usize],
    ) -> Result<Vec<Vec<u8>>, SignerError> {
        select(txns, indexes)?
            .into_iter()
            .map(|txn| -> Result<Vec<u8>, SignerError> {
                Ok(self.account.sign_transaction(txn)?.encode()?)
            })
            .collect()
    }
}
