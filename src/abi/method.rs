//! Contract method descriptors
//!
//! A method is identified on chain by a 4-byte selector taken from the hash
//! of its signature, e.g. `add(uint64,uint64)uint128`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::{split_top_level, Type};
use super::AbiError;
use crate::core::TxType;
use crate::crypto::sha512_256;

/// Return type name of methods that return nothing
pub const VOID_RETURN_TYPE: &str = "void";

/// Number of selector bytes at the start of a method call's app args
pub const SELECTOR_LEN: usize = 4;

// =============================================================================
// Argument kinds
// =============================================================================

/// Argument types that refer to an entry of a foreign array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    Account,
    Asset,
    Application,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Account => "account",
            ReferenceType::Asset => "asset",
            ReferenceType::Application => "application",
        }
    }

    /// Type the caller supplies the value as
    pub fn proxy_type(&self) -> Type {
        match self {
            ReferenceType::Account => Type::Address,
            ReferenceType::Asset | ReferenceType::Application => Type::uint64(),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "account" => Some(ReferenceType::Account),
            "asset" => Some(ReferenceType::Asset),
            "application" => Some(ReferenceType::Application),
            _ => None,
        }
    }
}

/// What kind of value fills an argument slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    /// An ABI value, encoded into the app args
    Value(Type),
    /// An index into a foreign array, encoded as `uint8`
    Reference(ReferenceType),
    /// A preceding transaction in the group; `None` accepts any type (`txn`)
    Transaction(Option<TxType>),
}

impl ArgKind {
    pub fn is_transaction(&self) -> bool {
        matches!(self, ArgKind::Transaction(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, ArgKind::Reference(_))
    }
}

impl FromStr for ArgKind {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "txn" {
            return Ok(ArgKind::Transaction(None));
        }
        if let Ok(tx_type) = s.parse::<TxType>() {
            return Ok(ArgKind::Transaction(Some(tx_type)));
        }
        if let Some(reference) = ReferenceType::from_name(s) {
            return Ok(ArgKind::Reference(reference));
        }
        Ok(ArgKind::Value(s.parse()?))
    }
}

// =============================================================================
// Method
// =============================================================================

/// One declared argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodArg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl MethodArg {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            name: None,
            type_name: type_name.into(),
            desc: None,
        }
    }

    pub fn kind(&self) -> Result<ArgKind, AbiError> {
        self.type_name.parse()
    }
}

/// Declared return value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodReturn {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl MethodReturn {
    pub fn is_void(&self) -> bool {
        self.type_name == VOID_RETURN_TYPE
    }

    /// The return type, or `None` for `void`
    pub fn value_type(&self) -> Result<Option<Type>, AbiError> {
        if self.is_void() {
            Ok(None)
        } else {
            Ok(Some(self.type_name.parse()?))
        }
    }
}

impl Default for MethodReturn {
    fn default() -> Self {
        Self {
            type_name: VOID_RETURN_TYPE.to_string(),
            desc: None,
        }
    }
}

/// A contract method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default)]
    pub args: Vec<MethodArg>,
    #[serde(default)]
    pub returns: MethodReturn,
}

impl Method {
    /// Parse `name(arg1,...,argN)ret`
    pub fn from_signature(signature: &str) -> Result<Self, AbiError> {
        let invalid = |reason: &str| AbiError::InvalidMethod(format!("{}: {}", reason, signature));

        let open = signature
            .find('(')
            .ok_or_else(|| invalid("missing open parenthesis"))?;
        let name = &signature[..open];
        if name.is_empty() {
            return Err(invalid("method must have a name"));
        }

        let close = matching_paren(signature, open).ok_or_else(|| invalid("unbalanced parentheses"))?;
        let args = split_top_level(&signature[open + 1..close])
            .ok_or_else(|| invalid("malformed argument list"))?;
        let returns = &signature[close + 1..];
        if returns.is_empty() {
            return Err(invalid("missing return type"));
        }

        let method = Self {
            name: name.to_string(),
            desc: None,
            args: args.into_iter().map(MethodArg::new).collect(),
            returns: MethodReturn {
                type_name: returns.to_string(),
                desc: None,
            },
        };
        method.validate()?;
        Ok(method)
    }

    /// Check every argument and return type name
    pub fn validate(&self) -> Result<(), AbiError> {
        for arg in &self.args {
            arg.kind()?;
        }
        self.returns.value_type()?;
        Ok(())
    }

    /// Canonical signature: `name(types)returns`
    pub fn signature(&self) -> String {
        let args: Vec<&str> = self.args.iter().map(|a| a.type_name.as_str()).collect();
        format!("{}({}){}", self.name, args.join(","), self.returns.type_name)
    }

    /// First 4 bytes of SHA-512/256 of the signature
    pub fn selector(&self) -> [u8; SELECTOR_LEN] {
        let hash = sha512_256(self.signature().as_bytes());
        let mut selector = [0u8; SELECTOR_LEN];
        selector.copy_from_slice(&hash[..SELECTOR_LEN]);
        selector
    }

    /// Kinds of all arguments, in declared order
    pub fn arg_kinds(&self) -> Result<Vec<ArgKind>, AbiError> {
        self.args.iter().map(MethodArg::kind).collect()
    }

    /// Transactions this call adds to a group: one per transaction argument plus the call
    pub fn tx_count(&self) -> usize {
        1 + self
            .args
            .iter()
            .filter(|a| a.kind().map(|k| k.is_transaction()).unwrap_or(false))
            .count()
    }

    /// Parse the JSON description format
    pub fn from_json(text: &str) -> Result<Self, AbiError> {
        let method: Method = serde_json::from_str(text)?;
        method.validate()?;
        Ok(method)
    }

    pub fn to_json(&self) -> Result<String, AbiError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}
