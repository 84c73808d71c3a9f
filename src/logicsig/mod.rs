//! Logic signatures
//!
//! Programs that authorize transactions, either for their own escrow
//! address or on behalf of an account that delegated to them.

pub mod account;
pub mod program;

pub use account::{extract_logicsig_account, LogicSig, LogicSigAccount};
pub use program::{program_address, program_for_signing, sanity_check_program};

use thiserror::Error;

use crate::core::TransactionError;
use crate::crypto::{Address, KeyError};
use crate::multisig::MultisigError;

/// Errors related to logic signatures
#[derive(Error, Debug)]
pub enum LogicSigError {
    #[error("empty program")]
    EmptyProgram,
    #[error("requesting program verification with an address instead of bytecode")]
    ProgramIsAddress,
    #[error("program should not be base64 encoded")]
    ProgramIsBase64,
    #[error("program bytes are all ASCII printable characters, not looking like TEAL byte code")]
    PrintableProgram,
    #[error("empty multisig in logicsig")]
    MissingMultisig,
    #[error("signer {0} is not a member of the logicsig multisig")]
    KeyNotInMultisig(Address),
    #[error("invalid signature provided")]
    InvalidSignature,
    #[error("logicsig carries both a signature and a multisig")]
    TooManySignatures,
    #[error("delegated logicsig has no signing key")]
    NoSigningKey,
    #[error("Multisig error: {0}")]
    Multisig(#[from] MultisigError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
