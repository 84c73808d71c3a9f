//! ARC-4 ABI codec and method descriptors
//!
//! - [`Type`] parses type names and converts [`Value`]s to and from the
//!   binary encoding and the JSON text form.
//! - [`Method`] describes a contract method, its signature and selector.

pub mod codec;
pub mod json;
pub mod method;
pub mod types;
pub mod value;

pub use method::{ArgKind, Method, MethodArg, MethodReturn, ReferenceType, SELECTOR_LEN, VOID_RETURN_TYPE};
pub use types::Type;
pub use value::Value;

use thiserror::Error;

use crate::crypto::KeyError;

/// ABI type, value and method errors
#[derive(Error, Debug)]
pub enum AbiError {
    #[error("Invalid ABI type: {0}")]
    InvalidType(String),
    #[error("Type {0} has no static length")]
    DynamicLength(String),
    #[error("Cannot use a {got} value as {expected}")]
    TypeMismatch { expected: String, got: &'static str },
    #[error("Value {value} does not fit in {ty}")]
    ValueOutOfRange { ty: String, value: String },
    #[error("{ty} expects {expected} elements, got {got}")]
    LengthMismatch {
        ty: String,
        expected: usize,
        got: usize,
    },
    #[error("Length {0} exceeds the 2-byte limit")]
    TooLong(usize),
    #[error("ABI decode error: {0}")]
    Decode(String),
    #[error("Invalid JSON value for {ty}: {reason}")]
    InvalidJson { ty: String, reason: String },
    #[error("Invalid method: {0}")]
    InvalidMethod(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Address error: {0}")]
    Address(#[from] KeyError),
}
