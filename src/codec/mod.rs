//! MessagePack decoding and key normalization for backend payloads

use heck::ToLowerCamelCase;
use rmpv::Value;
use thiserror::Error;

/// Media type requested from the backend
pub const MSGPACK_MIME: &str = "application/x-msgpack";

/// Keys whose subtree is passed through without renaming
const PASSTHROUGH_KEYS: &[&str] = &["context"];

/// Errors from decoding a response body
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("malformed MessagePack: {0}")]
    Malformed(#[from] rmpv::decode::Error),

    #[error("{extra} trailing byte(s) after MessagePack value of {total} byte(s)")]
    TrailingBytes { extra: usize, total: usize },
}

/// Decode exactly one MessagePack value from `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Value, DecodeError> {
    let mut rest = bytes;
    let value = rmpv::decode::read_value(&mut rest)?;

    if !rest.is_empty() {
        return Err(DecodeError::TrailingBytes {
            extra: rest.len(),
            total: bytes.len(),
        });
    }

    Ok(value)
}

/// Rewrite every map key from snake_case to camelCase.
///
/// Recurses through maps and arrays. The value under any `context` key is
/// left exactly as decoded, at whatever depth it appears. Non-string keys
/// are kept as they are.
pub fn camelize_keys(value: Value) -> Value {
    match value {
        Value::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(key, value)| {
                    if key
                        .as_str()
                        .is_some_and(|name| PASSTHROUGH_KEYS.contains(&name))
                    {
                        return (key, value);
                    }
                    let key = match key.as_str().map(|name| name.to_lower_camel_case()) {
                        Some(name) => Value::from(name),
                        None => key,
                    };
                    (key, camelize_keys(value))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(camelize_keys).collect()),
        other => other,
    }
}
