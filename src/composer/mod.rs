//! Atomic transaction composition
//!
//! [`AtomicTransactionComposer`] collects transactions and ABI method calls,
//! stamps them with one group id and gathers their signatures with as few
//! signer invocations as possible. [`MethodCallParams`] turns a method
//! descriptor plus argument values into the application call (and the
//! transaction arguments that precede it).

pub mod atc;
pub mod method_call;

pub use atc::{AtomicTransactionComposer, ComposerStatus};
pub use method_call::{MethodArgValue, MethodCallParams};

use thiserror::Error;

use crate::abi::AbiError;
use crate::core::{GroupError, TransactionError};
use crate::signer::SignerError;

/// Composer errors
#[derive(Error, Debug)]
pub enum ComposerError {
    #[error("status must be BUILDING in order to add transactions")]
    NotBuilding,
    #[error("reached max group size: 16")]
    GroupFull,
    #[error("cannot add a transaction with nonzero group ID")]
    NonZeroGroup,
    #[error("no transactions to build")]
    Empty,
    #[error("the incorrect number of arguments were provided: {got} != {expected}")]
    ArgCount { expected: usize, got: usize },
    #[error("too many arguments for method: '{0}'")]
    TooManyArguments(String),
    #[error("argument {index} expects {expected}, got {got}")]
    ArgKind {
        index: usize,
        expected: String,
        got: &'static str,
    },
    #[error("argument {index} expects a {expected} transaction, got {got}")]
    TransactionArgType {
        index: usize,
        expected: String,
        got: String,
    },
    #[error("{0}")]
    ProgramRules(&'static str),
    #[error("missing signature for transaction {0}")]
    MissingSignature(usize),
    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Group error: {0}")]
    Group(#[from] GroupError),
    #[error("Signer error: {0}")]
    Signer(#[from] SignerError),
}
