//! Structured ABI values

use primitive_types::U512;

use crate::crypto::Address;

/// A value of some ABI [`Type`](super::Type)
///
/// `uint<N>` and `ufixed<N>x<M>` both carry the raw unsigned integer; for
/// ufixed it is the value scaled by `10^M`. Byte arrays decode to `Bytes`,
/// tuples to `Tuple` and other arrays to `Array`. Encoding is lenient:
/// `Bytes` and `Array` of `Byte` are interchangeable, as are `Array` and
/// `Tuple`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint(U512),
    Byte(u8),
    Bool(bool),
    Address(Address),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    /// Short name of the variant, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Uint(_) => "uint",
            Value::Byte(_) => "byte",
            Value::Bool(_) => "bool",
            Value::Address(_) => "address",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
        }
    }

    /// The integer if it fits in a `u64`
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(n) if n.bits() <= 64 => Some(n.low_u64()),
            Value::Byte(b) => Some(*b as u64),
            _ => None,
        }
    }

    /// The address, from either an `Address` or 32 raw bytes
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(addr) => Some(*addr),
            Value::Bytes(bytes) => Address::from_slice(bytes).ok(),
            _ => None,
        }
    }

    /// Raw bytes of a byte array, from `Bytes` or an `Array` of `Byte`
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Value::Bytes(bytes) => Some(bytes.clone()),
            Value::Array(items) | Value::Tuple(items) => items
                .iter()
                .map(|item| match item {
                    Value::Byte(b) => Some(*b),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    /// Elements of an array or tuple
    pub fn as_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) | Value::Tuple(items) => Some(items.clone()),
            Value::Bytes(bytes) => Some(bytes.iter().map(|b| Value::Byte(*b)).collect()),
            _ => None,
        }
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Uint(U512::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Address> for Value {
    fn from(value: Address) -> Self {
        Value::Address(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}
