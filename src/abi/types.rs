//! ABI type grammar
//!
//! Parses and prints ARC-4 type names such as `uint64`, `ufixed128x10`,
//! `byte[32]`, `(uint8,string)[]`.

use std::fmt;
use std::str::FromStr;

use super::AbiError;

/// Largest bit width of `uint<N>` and `ufixed<N>x<M>`
pub const MAX_BIT_SIZE: u16 = 512;

/// Largest precision of `ufixed<N>x<M>`
pub const MAX_PRECISION: u8 = 160;

/// Length of an `address` value
pub const ADDRESS_BYTE_LEN: usize = 32;

/// An ABI value type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// `uint<N>`, 8 <= N <= 512, N % 8 == 0
    Uint(u16),
    /// `ufixed<N>x<M>`, N as for uint, 1 <= M <= 160
    Ufixed { bits: u16, precision: u8 },
    Byte,
    Bool,
    Address,
    String,
    /// `T[N]`
    StaticArray(Box<Type>, usize),
    /// `T[]`
    DynamicArray(Box<Type>),
    /// `(T1,...,Tn)`
    Tuple(Vec<Type>),
}

impl Type {
    /// `uint64`, the wire type of asset and application references
    pub fn uint64() -> Self {
        Type::Uint(64)
    }

    /// Whether the encoding length depends on the value
    pub fn is_dynamic(&self) -> bool {
        match self {
            Type::DynamicArray(_) | Type::String => true,
            Type::StaticArray(elem, _) => elem.is_dynamic(),
            Type::Tuple(children) => children.iter().any(Type::is_dynamic),
            _ => false,
        }
    }

    /// Whether values of this type are byte strings (`byte[N]`, `byte[]`)
    pub fn is_byte_array(&self) -> bool {
        matches!(self, Type::StaticArray(elem, _) | Type::DynamicArray(elem) if **elem == Type::Byte)
    }

    /// Encoded length of a static type
    pub fn byte_len(&self) -> Result<usize, AbiError> {
        match self {
            Type::Uint(bits) | Type::Ufixed { bits, .. } => Ok(*bits as usize / 8),
            Type::Byte | Type::Bool => Ok(1),
            Type::Address => Ok(ADDRESS_BYTE_LEN),
            Type::StaticArray(elem, len) => {
                if **elem == Type::Bool {
                    Ok(len.div_ceil(8))
                } else {
                    Ok(elem.byte_len()? * len)
                }
            }
            Type::Tuple(children) => {
                let mut total = 0;
                let mut i = 0;
                while i < children.len() {
                    if children[i] == Type::Bool {
                        let run = bool_run(children, i);
                        total += run.div_ceil(8);
                        i += run;
                    } else {
                        total += children[i].byte_len()?;
                        i += 1;
                    }
                }
                Ok(total)
            }
            Type::DynamicArray(_) | Type::String => Err(AbiError::DynamicLength(self.to_string())),
        }
    }
}

/// Number of consecutive `bool` entries starting at `start`
pub(crate) fn bool_run(types: &[Type], start: usize) -> usize {
    types[start..]
        .iter()
        .take_while(|t| **t == Type::Bool)
        .count()
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Uint(bits) => write!(f, "uint{}", bits),
            Type::Ufixed { bits, precision } => write!(f, "ufixed{}x{}", bits, precision),
            Type::Byte => f.write_str("byte"),
            Type::Bool => f.write_str("bool"),
            Type::Address => f.write_str("address"),
            Type::String => f.write_str("string"),
            Type::StaticArray(elem, len) => write!(f, "{}[{}]", elem, len),
            Type::DynamicArray(elem) => write!(f, "{}[]", elem),
            Type::Tuple(children) => {
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str(")")
            }
        }
    }
}

impl FromStr for Type {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AbiError::InvalidType(s.to_string());

        if let Some(elem) = s.strip_suffix("[]") {
            return Ok(Type::DynamicArray(Box::new(elem.parse()?)));
        }
        if let Some(body) = s.strip_suffix(']') {
            let open = body.rfind('[').ok_or_else(invalid)?;
            let len = parse_decimal(&body[open + 1..]).ok_or_else(invalid)?;
            return Ok(Type::StaticArray(Box::new(body[..open].parse()?), len));
        }
        if let Some(inner) = s.strip_prefix('(') {
            let inner = inner.strip_suffix(')').ok_or_else(invalid)?;
            let children = split_top_level(inner)
                .ok_or_else(invalid)?
                .into_iter()
                .map(str::parse)
                .collect::<Result<Vec<Type>, _>>()?;
            return Ok(Type::Tuple(children));
        }
        if let Some(bits) = s.strip_prefix("uint") {
            let bits = parse_bit_size(bits).ok_or_else(invalid)?;
            return Ok(Type::Uint(bits));
        }
        if let Some(rest) = s.strip_prefix("ufixed") {
            let (bits, precision) = rest.split_once('x').ok_or_else(invalid)?;
            let bits = parse_bit_size(bits).ok_or_else(invalid)?;
            let precision = parse_decimal(precision)
                .filter(|p| (1..=MAX_PRECISION as usize).contains(p))
                .ok_or_else(invalid)?;
            return Ok(Type::Ufixed {
                bits,
                precision: precision as u8,
            });
        }

        match s {
            "byte" => Ok(Type::Byte),
            "bool" => Ok(Type::Bool),
            "address" => Ok(Type::Address),
            "string" => Ok(Type::String),
            _ => Err(invalid()),
        }
    }
}

/// Unsigned decimal without sign or leading zeros
fn parse_decimal(text: &str) -> Option<usize> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if text.len() > 1 && text.starts_with('0') {
        return None;
    }
    text.parse().ok()
}

fn parse_bit_size(text: &str) -> Option<u16> {
    parse_decimal(text)
        .filter(|bits| *bits >= 8 && *bits <= MAX_BIT_SIZE as usize && bits % 8 == 0)
        .map(|bits| bits as u16)
}

/// Split on commas outside parentheses; `None` on unbalanced input or empty parts
pub(crate) fn split_top_level(text: &str) -> Option<Vec<&str>> {
    if text.is_empty() {
        return Some(Vec::new());
    }

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return None;
    }
    parts.push(&text[start..]);

    if parts.iter().any(|p| p.is_empty()) {
        None
    } else {
        Some(parts)
    }
}
