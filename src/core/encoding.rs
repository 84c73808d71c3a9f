//! Canonical MessagePack encoding
//!
//! Records are written as maps with their keys in bytewise-sorted order and
//! zero or empty values left out, so that equal records always produce equal
//! bytes. Structs get this by declaring their fields in key order and marking
//! every optional field with `skip_serializing_if`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors from the canonical codec
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("Decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a value as canonical msgpack
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, EncodingError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Decode a value from msgpack bytes
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EncodingError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Skip predicate for zero integers
pub(crate) fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Skip predicate for `false`
pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

/// Serde adapter for byte strings (`Vec<u8>`)
///
/// Binary formats get a msgpack `bin`; JSON gets standard base64, the form
/// other tooling writes for these fields.
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::de::{self, Deserialize, Deserializer};
    use serde::Serializer;
    use serde_bytes::ByteBuf;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&STANDARD.encode(bytes))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            STANDARD.decode(text.as_bytes()).map_err(de::Error::custom)
        } else {
            Ok(ByteBuf::deserialize(deserializer)?.into_vec())
        }
    }
}

/// Serde adapter for lists of byte strings (`Vec<Vec<u8>>`)
///
/// Each element goes out as a msgpack `bin`, or as a base64 string in JSON;
/// `serde_bytes` alone only handles a single buffer.
pub(crate) mod bytes_list {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::de::{self, Deserialize, Deserializer};
    use serde::{Serialize, Serializer};
    use serde_bytes::{ByteBuf, Bytes};

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            let texts: Vec<String> = items.iter().map(|item| STANDARD.encode(item)).collect();
            texts.serialize(serializer)
        } else {
            let wrapped: Vec<&Bytes> = items.iter().map(|item| Bytes::new(item)).collect();
            wrapped.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error> {
        if deserializer.is_human_readable() {
            let texts: Vec<String> = Vec::deserialize(deserializer)?;
            texts
                .iter()
                .map(|text| STANDARD.decode(text.as_bytes()).map_err(de::Error::custom))
                .collect()
        } else {
            let bufs: Vec<ByteBuf> = Vec::deserialize(deserializer)?;
            Ok(bufs.into_iter().map(ByteBuf::into_vec).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
    struct Sample {
        #[serde(rename = "a", default, skip_serializing_if = "is_zero")]
        amount: u64,
        #[serde(rename = "b", default, with = "bytes_list", skip_serializing_if = "Vec::is_empty")]
        blobs: Vec<Vec<u8>>,
        #[serde(rename = "n", default, with = "base64_bytes", skip_serializing_if = "Vec::is_empty")]
        note: Vec<u8>,
        #[serde(rename = "z", default, skip_serializing_if = "is_false")]
        flag: bool,
    }

    #[test]
    fn test_empty_values_omitted() {
        let bytes = encode(&Sample::default()).unwrap();
        // fixmap with zero entries
        assert_eq!(bytes, vec![0x80]);
    }

    #[test]
    fn test_keys_written_in_order() {
        let sample = Sample {
            amount: 5,
            blobs: vec![vec![1, 2]],
            note: vec![9],
            flag: true,
        };
        let bytes = encode(&sample).unwrap();
        assert_eq!(
            bytes,
            vec![
                0x84, 0xa1, b'a', 0x05, 0xa1, b'b', 0x91, 0xc4, 0x02, 1, 2, 0xa1, b'n', 0xc4, 0x01,
                9, 0xa1, b'z', 0xc3
            ]
        );
        let back: Sample = decode(&bytes).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_byte_fields_are_base64_in_json() {
        let sample = Sample {
            blobs: vec![vec![0x01], vec![0x02, 0x03]],
            note: vec![0x01, 0x20, 0x01, 0x01, 0x22],
            ..Default::default()
        };
        let json = serde_json::to_string(&sample).unwrap();
        assert_eq!(json, r#"{"b":["AQ==","AgM="],"n":"ASABASI="}"#);
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);

        assert!(serde_json::from_str::<Sample>(r#"{"n":"not base64!"}"#).is_err());
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode::<Sample>(&[0xc1]).is_err());
    }
}
