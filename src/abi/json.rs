//! JSON text form of ABI values
//!
//! Integers are JSON numbers of any size, ufixed values are decimals with
//! exactly `M` fractional digits, addresses are base32 strings and byte
//! arrays are base64 strings. Other arrays and tuples are JSON arrays.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use primitive_types::U512;
use serde_json::{Number, Value as Json};

use super::types::Type;
use super::value::Value;
use super::AbiError;
use crate::crypto::Address;

impl Type {
    /// Parse a JSON value of this type
    pub fn parse_json(&self, text: &str) -> Result<Value, AbiError> {
        let json: Json = serde_json::from_str(text)?;
        self.value_from_json(&json)
    }

    /// JSON text of a value of this type
    pub fn to_json(&self, value: &Value) -> Result<String, AbiError> {
        Ok(serde_json::to_string(&self.to_json_value(value)?)?)
    }

    /// Encode a value given as JSON text
    pub fn encode_json(&self, text: &str) -> Result<Vec<u8>, AbiError> {
        self.encode(&self.parse_json(text)?)
    }

    /// Decode bytes to JSON text
    pub fn decode_json(&self, bytes: &[u8]) -> Result<String, AbiError> {
        self.to_json(&self.decode(bytes)?)
    }

    fn value_from_json(&self, json: &Json) -> Result<Value, AbiError> {
        let invalid = |reason: &str| AbiError::InvalidJson {
            ty: self.to_string(),
            reason: reason.to_string(),
        };

        match self {
            Type::Uint(_) => {
                let Json::Number(n) = json else {
                    return Err(invalid("expected a number"));
                };
                let n = U512::from_dec_str(&n.to_string())
                    .map_err(|_| invalid("expected a non-negative integer"))?;
                self.check_range(Value::Uint(n))
            }
            Type::Ufixed { precision, .. } => {
                let Json::Number(n) = json else {
                    return Err(invalid("expected a number"));
                };
                let raw = parse_fixed(&n.to_string(), *precision)
                    .ok_or_else(|| invalid("expected a non-negative decimal within precision"))?;
                self.check_range(Value::Uint(raw))
            }
            Type::Byte => json
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .map(Value::Byte)
                .ok_or_else(|| invalid("expected an integer 0-255")),
            Type::Bool => json
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| invalid("expected true or false")),
            Type::Address => {
                let text = json.as_str().ok_or_else(|| invalid("expected an address string"))?;
                Ok(Value::Address(Address::decode(text)?))
            }
            Type::String => json
                .as_str()
                .map(Value::from)
                .ok_or_else(|| invalid("expected a string")),
            Type::StaticArray(elem, _) | Type::DynamicArray(elem) => {
                let value = match json {
                    Json::String(text) if **elem == Type::Byte => Value::Bytes(
                        STANDARD
                            .decode(text)
                            .map_err(|_| invalid("expected base64 text"))?,
                    ),
                    Json::Array(items) => Value::Array(
                        items
                            .iter()
                            .map(|item| elem.value_from_json(item))
                            .collect::<Result<_, _>>()?,
                    ),
                    _ => return Err(invalid("expected an array")),
                };
                if let Type::StaticArray(_, len) = self {
                    let got = value.as_items().map_or(0, |items| items.len());
                    if got != *len {
                        return Err(AbiError::LengthMismatch {
                            ty: self.to_string(),
                            expected: *len,
                            got,
                        });
                    }
                }
                Ok(value)
            }
            Type::Tuple(children) => {
                let items = json.as_array().ok_or_else(|| invalid("expected an array"))?;
                if items.len() != children.len() {
                    return Err(AbiError::LengthMismatch {
                        ty: self.to_string(),
                        expected: children.len(),
                        got: items.len(),
                    });
                }
                children
                    .iter()
                    .zip(items)
                    .map(|(child, item)| child.value_from_json(item))
                    .collect::<Result<_, _>>()
                    .map(Value::Tuple)
            }
        }
    }

    fn to_json_value(&self, value: &Value) -> Result<Json, AbiError> {
        let mismatch = || AbiError::TypeMismatch {
            expected: self.to_string(),
            got: value.kind(),
        };

        match self {
            Type::Uint(_) => {
                let Value::Uint(n) = value else {
                    return Err(mismatch());
                };
                json_number(&n.to_string())
            }
            Type::Ufixed { precision, .. } => {
                let Value::Uint(n) = value else {
                    return Err(mismatch());
                };
                json_number(&format_fixed(*n, *precision))
            }
            Type::Byte => match value {
                Value::Byte(b) => Ok(Json::from(*b)),
                _ => Err(mismatch()),
            },
            Type::Bool => match value {
                Value::Bool(b) => Ok(Json::Bool(*b)),
                _ => Err(mismatch()),
            },
            Type::Address => value
                .as_address()
                .map(|addr| Json::String(addr.encode()))
                .ok_or_else(mismatch),
            Type::String => match value {
                Value::String(text) => Ok(Json::String(text.clone())),
                _ => Err(mismatch()),
            },
            Type::StaticArray(elem, _) | Type::DynamicArray(elem) => {
                if **elem == Type::Byte {
                    let bytes = value.as_bytes().ok_or_else(mismatch)?;
                    return Ok(Json::String(STANDARD.encode(bytes)));
                }
                let items = value.as_items().ok_or_else(mismatch)?;
                items
                    .iter()
                    .map(|item| elem.to_json_value(item))
                    .collect::<Result<_, _>>()
                    .map(Json::Array)
            }
            Type::Tuple(children) => {
                let items = value.as_items().ok_or_else(mismatch)?;
                if items.len() != children.len() {
                    return Err(mismatch());
                }
                children
                    .iter()
                    .zip(&items)
                    .map(|(child, item)| child.to_json_value(item))
                    .collect::<Result<_, _>>()
                    .map(Json::Array)
            }
        }
    }

    fn check_range(&self, value: Value) -> Result<Value, AbiError> {
        if let (Type::Uint(bits) | Type::Ufixed { bits, .. }, Value::Uint(n)) = (self, &value) {
            if n.bits() > *bits as usize {
                return Err(AbiError::ValueOutOfRange {
                    ty: self.to_string(),
                    value: n.to_string(),
                });
            }
        }
        Ok(value)
    }
}

fn json_number(text: &str) -> Result<Json, AbiError> {
    let number: Number = text.parse()?;
    Ok(Json::Number(number))
}

/// Scale a decimal like `12.5` by `10^precision`; `None` on extra digits
fn parse_fixed(text: &str, precision: u8) -> Option<U512> {
    let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !digits(whole) || !digits(frac) || frac.len() > precision as usize {
        return None;
    }

    let padded = format!("{}{}{}", whole, frac, "0".repeat(precision as usize - frac.len()));
    U512::from_dec_str(&padded).ok()
}

/// Inverse of [`parse_fixed`], always printing `precision` fractional digits
fn format_fixed(raw: U512, precision: u8) -> String {
    let digits = raw.to_string();
    let precision = precision as usize;
    let digits = if digits.len() <= precision {
        format!("{}{}", "0".repeat(precision + 1 - digits.len()), digits)
    } else {
        digits
    };
    let split = digits.len() - precision;
    format!("{}.{}", &digits[..split], &digits[split..])
}
