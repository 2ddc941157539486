//! Return-value serialization across the process boundary.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Extension point for the `retval` file format.
///
/// The child encodes with the same codec instance the parent later decodes with
/// (the child is a fork, so it holds an identical copy).
pub trait ResultCodec {
    /// Codec name for logging and diagnostics.
    fn name(&self) -> &str;

    fn encode<T: Serialize>(&self, value: &T) -> anyhow::Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> anyhow::Result<T>;
}

/// Default codec: `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ResultCodec for JsonCodec {
    fn name(&self) -> &str {
        "json"
    }

    fn encode<T: Serialize>(&self, value: &T) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> anyhow::Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_json_codec_unit_and_maps() {
        let codec = JsonCodec;
        let unit = codec.encode(&()).unwrap();
        codec.decode::<()>(&unit).unwrap();

        let mut m = BTreeMap::new();
        m.insert("a".to_string(), vec![1u8, 2]);
        let bytes = codec.encode(&m).unwrap();
        assert_eq!(codec.decode::<BTreeMap<String, Vec<u8>>>(&bytes).unwrap(), m);
    }

    #[test]
    fn test_json_codec_rejects_empty_input() {
        assert!(JsonCodec.decode::<i32>(b"").is_err());
    }

    #[test]
    fn test_json_codec_surfaces_unserializable_values() {
        // Non-string map keys cannot be represented in JSON.
        let mut m = BTreeMap::new();
        m.insert((1, 2), "v");
        assert!(JsonCodec.encode(&m).is_err());
    }
}
