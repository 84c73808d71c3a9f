//! Binary ARC-4 encoding
//!
//! Integers are big-endian and fixed width. Dynamic values carry a 2-byte
//! length prefix. Tuples (and arrays, which encode as homogeneous tuples)
//! lay out static heads first, with 2-byte offsets into the tail section
//! for dynamic members; consecutive bools share bytes, most significant
//! bit first.

use primitive_types::U512;

use super::types::{bool_run, Type};
use super::value::Value;
use super::AbiError;
use crate::crypto::Address;

const LENGTH_PREFIX: usize = 2;
const BOOL_TRUE: u8 = 0x80;

impl Type {
    /// Encode a value of this type
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, AbiError> {
        match self {
            Type::Uint(bits) | Type::Ufixed { bits, .. } => {
                let n = match value {
                    Value::Uint(n) => *n,
                    Value::Byte(b) => U512::from(*b),
                    other => return Err(self.mismatch(other)),
                };
                if n.bits() > *bits as usize {
                    return Err(AbiError::ValueOutOfRange {
                        ty: self.to_string(),
                        value: n.to_string(),
                    });
                }
                let mut buf = [0u8; 64];
                n.to_big_endian(&mut buf);
                Ok(buf[64 - *bits as usize / 8..].to_vec())
            }
            Type::Byte => match value {
                Value::Byte(b) => Ok(vec![*b]),
                Value::Uint(n) if n.bits() <= 8 => Ok(vec![n.low_u64() as u8]),
                Value::Uint(n) => Err(AbiError::ValueOutOfRange {
                    ty: self.to_string(),
                    value: n.to_string(),
                }),
                other => Err(self.mismatch(other)),
            },
            Type::Bool => match value {
                Value::Bool(true) => Ok(vec![BOOL_TRUE]),
                Value::Bool(false) => Ok(vec![0]),
                other => Err(self.mismatch(other)),
            },
            Type::Address => value
                .as_address()
                .map(|addr| addr.to_bytes().to_vec())
                .ok_or_else(|| self.mismatch(value)),
            Type::String => match value {
                Value::String(text) => with_length_prefix(text.as_bytes().to_vec(), text.len()),
                other => Err(self.mismatch(other)),
            },
            Type::StaticArray(elem, len) => {
                let items = value.as_items().ok_or_else(|| self.mismatch(value))?;
                if items.len() != *len {
                    return Err(AbiError::LengthMismatch {
                        ty: self.to_string(),
                        expected: *len,
                        got: items.len(),
                    });
                }
                encode_tuple(&vec![(**elem).clone(); *len], &items)
            }
            Type::DynamicArray(elem) => {
                let items = value.as_items().ok_or_else(|| self.mismatch(value))?;
                let body = encode_tuple(&vec![(**elem).clone(); items.len()], &items)?;
                with_length_prefix(body, items.len())
            }
            Type::Tuple(children) => {
                let items = value.as_items().ok_or_else(|| self.mismatch(value))?;
                if items.len() != children.len() {
                    return Err(AbiError::LengthMismatch {
                        ty: self.to_string(),
                        expected: children.len(),
                        got: items.len(),
                    });
                }
                encode_tuple(children, &items)
            }
        }
    }

    /// Decode a value of this type; the input must be consumed exactly
    pub fn decode(&self, bytes: &[u8]) -> Result<Value, AbiError> {
        match self {
            Type::Uint(_) | Type::Ufixed { .. } => {
                self.expect_len(bytes)?;
                Ok(Value::Uint(U512::from_big_endian(bytes)))
            }
            Type::Byte => {
                self.expect_len(bytes)?;
                Ok(Value::Byte(bytes[0]))
            }
            Type::Bool => {
                self.expect_len(bytes)?;
                match bytes[0] {
                    BOOL_TRUE => Ok(Value::Bool(true)),
                    0 => Ok(Value::Bool(false)),
                    other => Err(AbiError::Decode(format!(
                        "single bool encoding must be 0x80 or 0x00, got {:#04x}",
                        other
                    ))),
                }
            }
            Type::Address => {
                self.expect_len(bytes)?;
                Ok(Value::Address(Address::from_slice(bytes)?))
            }
            Type::String => {
                let body = split_length_prefix(bytes)?;
                String::from_utf8(body.to_vec())
                    .map(Value::String)
                    .map_err(|e| AbiError::Decode(format!("string is not UTF-8: {}", e)))
            }
            Type::StaticArray(elem, len) => {
                let items = decode_tuple(&vec![(**elem).clone(); *len], bytes)?;
                Ok(array_value(elem, items))
            }
            Type::DynamicArray(elem) => {
                let count = read_length(bytes)?;
                let items = decode_tuple(&vec![(**elem).clone(); count], &bytes[LENGTH_PREFIX..])?;
                Ok(array_value(elem, items))
            }
            Type::Tuple(children) => Ok(Value::Tuple(decode_tuple(children, bytes)?)),
        }
    }

    fn mismatch(&self, value: &Value) -> AbiError {
        AbiError::TypeMismatch {
            expected: self.to_string(),
            got: value.kind(),
        }
    }

    fn expect_len(&self, bytes: &[u8]) -> Result<(), AbiError> {
        let expected = self.byte_len()?;
        if bytes.len() == expected {
            Ok(())
        } else {
            Err(AbiError::LengthMismatch {
                ty: self.to_string(),
                expected,
                got: bytes.len(),
            })
        }
    }
}

fn array_value(elem: &Type, items: Vec<Value>) -> Value {
    if *elem == Type::Byte {
        let bytes = items
            .iter()
            .filter_map(|item| match item {
                Value::Byte(b) => Some(*b),
                _ => None,
            })
            .collect();
        Value::Bytes(bytes)
    } else {
        Value::Array(items)
    }
}

fn with_length_prefix(body: Vec<u8>, count: usize) -> Result<Vec<u8>, AbiError> {
    let prefix = u16::try_from(count).map_err(|_| AbiError::TooLong(count))?;
    let mut out = Vec::with_capacity(LENGTH_PREFIX + body.len());
    out.extend_from_slice(&prefix.to_be_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

fn read_length(bytes: &[u8]) -> Result<usize, AbiError> {
    match bytes {
        [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo]) as usize),
        _ => Err(AbiError::Decode("missing 2-byte length prefix".to_string())),
    }
}

/// Body after a byte-length prefix; must be exact
fn split_length_prefix(bytes: &[u8]) -> Result<&[u8], AbiError> {
    let count = read_length(bytes)?;
    let body = &bytes[LENGTH_PREFIX..];
    if body.len() != count {
        return Err(AbiError::Decode(format!(
            "length prefix says {} bytes, found {}",
            count,
            body.len()
        )));
    }
    Ok(body)
}

fn encode_tuple(types: &[Type], values: &[Value]) -> Result<Vec<u8>, AbiError> {
    let mut heads: Vec<Vec<u8>> = Vec::with_capacity(types.len());
    let mut tails: Vec<Option<Vec<u8>>> = Vec::with_capacity(types.len());

    let mut i = 0;
    while i < types.len() {
        if types[i] == Type::Bool {
            let run = bool_run(types, i).min(8);
            let mut packed = 0u8;
            for (j, value) in values[i..i + run].iter().enumerate() {
                match value {
                    Value::Bool(true) => packed |= BOOL_TRUE >> j,
                    Value::Bool(false) => {}
                    other => return Err(Type::Bool.mismatch(other)),
                }
            }
            heads.push(vec![packed]);
            tails.push(None);
            i += run;
        } else if types[i].is_dynamic() {
            heads.push(vec![0; LENGTH_PREFIX]);
            tails.push(Some(types[i].encode(&values[i])?));
            i += 1;
        } else {
            heads.push(types[i].encode(&values[i])?);
            tails.push(None);
            i += 1;
        }
    }

    let mut offset: usize = heads.iter().map(Vec::len).sum();
    for (head, tail) in heads.iter_mut().zip(&tails) {
        if let Some(tail) = tail {
            let at = u16::try_from(offset).map_err(|_| AbiError::TooLong(offset))?;
            head.copy_from_slice(&at.to_be_bytes());
            offset += tail.len();
        }
    }

    let mut out = heads.concat();
    for tail in tails.into_iter().flatten() {
        out.extend_from_slice(&tail);
    }
    Ok(out)
}

fn decode_tuple(types: &[Type], bytes: &[u8]) -> Result<Vec<Value>, AbiError> {
    let truncated = || AbiError::Decode("input is shorter than the tuple head".to_string());

    let mut values: Vec<Option<Value>> = Vec::with_capacity(types.len());
    let mut dynamic: Vec<(usize, usize)> = Vec::new();
    let mut pos = 0;

    let mut i = 0;
    while i < types.len() {
        if types[i] == Type::Bool {
            let run = bool_run(types, i).min(8);
            let packed = *bytes.get(pos).ok_or_else(truncated)?;
            for j in 0..run {
                values.push(Some(Value::Bool(packed & (BOOL_TRUE >> j) != 0)));
            }
            pos += 1;
            i += run;
        } else if types[i].is_dynamic() {
            let head = bytes.get(pos..pos + LENGTH_PREFIX).ok_or_else(truncated)?;
            dynamic.push((i, read_length(head)?));
            values.push(None);
            pos += LENGTH_PREFIX;
            i += 1;
        } else {
            let len = types[i].byte_len()?;
            let slice = bytes.get(pos..pos + len).ok_or_else(truncated)?;
            values.push(Some(types[i].decode(slice)?));
            pos += len;
            i += 1;
        }
    }

    if dynamic.is_empty() && pos != bytes.len() {
        return Err(AbiError::Decode(format!(
            "{} unused bytes after tuple",
            bytes.len() - pos
        )));
    }
    if let Some((_, first)) = dynamic.first() {
        if *first != pos {
            return Err(AbiError::Decode(format!(
                "first dynamic offset {} does not follow the head ending at {}",
                first, pos
            )));
        }
    }

    for (k, (index, start)) in dynamic.iter().enumerate() {
        let end = dynamic.get(k + 1).map_or(bytes.len(), |(_, next)| *next);
        if end < *start || end > bytes.len() {
            return Err(AbiError::Decode(format!(
                "dynamic offsets out of order: {}..{}",
                start, end
            )));
        }
        values[*index] = Some(types[*index].decode(&bytes[*start..end])?);
    }

    values
        .into_iter()
        .map(|v| v.ok_or_else(|| AbiError::Decode("unfilled tuple slot".to_string())))
        .collect()
}
