//! Versioned binary codec for the CFG blob.
//!
//! The blob is a CBOR map `{version, cfg}`. Structs encode as string-keyed
//! maps, so a reader built against an older schema skips fields it does not
//! know about; decoding only fails when a required field is missing or the
//! version predates the first released layout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ControlFlowGraph;

/// Current blob layout version. Bumped when a field changes meaning;
/// additive fields keep the version.
pub const FORMAT_VERSION: u32 = 1;

/// Encoding errors.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("CBOR encoding failed: {0}")]
    Cbor(#[from] serde_cbor::Error),
}

/// Decoding errors.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("CBOR decoding failed: {0}")]
    Cbor(#[from] serde_cbor::Error),
    #[error("unsupported blob version {0}")]
    UnsupportedVersion(u32),
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    cfg: ControlFlowGraph,
}

/// Encode a graph into the self-contained blob embedded in the module.
pub fn encode(cfg: &ControlFlowGraph) -> Result<Vec<u8>, EncodeError> {
    let envelope = Envelope {
        version: FORMAT_VERSION,
        cfg: cfg.clone(),
    };
    Ok(serde_cbor::to_vec(&envelope)?)
}

/// Decode a blob back into the graph structure that was encoded.
///
/// Versions newer than [`FORMAT_VERSION`] decode as long as the fields this
/// reader requires are present; version 0 never shipped and is rejected.
pub fn decode(bytes: &[u8]) -> Result<ControlFlowGraph, DecodeError> {
    let envelope: Envelope = serde_cbor::from_slice(bytes)?;
    if envelope.version == 0 {
        return Err(DecodeError::UnsupportedVersion(envelope.version));
    }
    Ok(envelope.cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BasicBlock, Function, NO_MARK};
    use serde_cbor::Value;
    use std::collections::BTreeMap;

    fn sample() -> ControlFlowGraph {
        ControlFlowGraph {
            functions: vec![Function {
                id: 0,
                name: "main".to_string(),
                blocks: vec![
                    BasicBlock {
                        id: 0,
                        mark: 0,
                        successors: vec![1],
                    },
                    BasicBlock::new(1, NO_MARK),
                ],
            }],
        }
    }

    #[test]
    fn test_round_trip() {
        let cfg = sample();
        let bytes = encode(&cfg).unwrap();
        assert_eq!(decode(&bytes).unwrap(), cfg);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let cfg = sample();
        assert_eq!(encode(&cfg).unwrap(), encode(&cfg).unwrap());
    }

    #[test]
    fn test_rejects_version_zero() {
        let mut map = BTreeMap::new();
        map.insert(
            Value::Text("version".to_string()),
            Value::Integer(0),
        );
        map.insert(
            Value::Text("cfg".to_string()),
            serde_cbor::value::to_value(sample()).unwrap(),
        );
        let bytes = serde_cbor::to_vec(&Value::Map(map)).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnsupportedVersion(0))
        ));
    }

    #[test]
    fn test_skips_unknown_fields() {
        // A future writer may add fields; this reader must ignore them.
        let mut map = BTreeMap::new();
        map.insert(
            Value::Text("version".to_string()),
            Value::Integer(i128::from(FORMAT_VERSION) + 1),
        );
        map.insert(
            Value::Text("cfg".to_string()),
            serde_cbor::value::to_value(sample()).unwrap(),
        );
        map.insert(
            Value::Text("flags".to_string()),
            Value::Integer(7),
        );
        let bytes = serde_cbor::to_vec(&Value::Map(map)).unwrap();
        assert_eq!(decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_rejects_truncated_blob() {
        let bytes = encode(&sample()).unwrap();
        assert!(matches!(
            decode(&bytes[..bytes.len() / 2]),
            Err(DecodeError::Cbor(_))
        ));
    }
}
