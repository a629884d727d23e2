//! Feature data model and schema validation
//!
//! Payloads arrive as untyped MessagePack values. They are camelized by
//! [`crate::codec`], deserialized into the types below, and then checked
//! against the invariants serde cannot express (non-empty activation
//! sequences aligned with their context, non-empty sample groups).

pub mod analysis;

pub use analysis::analysis_label;

use rmpv::Value;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;
use thiserror::Error;

/// Errors raised when a decoded payload does not match the schema
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("payload does not match schema: {0}")]
    Shape(#[from] rmpv::ext::Error),

    #[error("{path}: activation sequence is empty")]
    EmptyActivations { path: String },

    #[error("{path}: activation at position {position} is not a number")]
    NotANumber { path: String, position: usize },

    #[error("{path}: {activations} activations for {tokens} context tokens")]
    LengthMismatch {
        path: String,
        tokens: usize,
        activations: usize,
    },

    #[error("sample group `{analysis_name}` has no samples")]
    EmptyGroup { analysis_name: String },
}

/// Types that carry invariants beyond their serde shape
pub trait Validate {
    fn validate(&self) -> Result<(), SchemaError>;
}

/// Convert a camelized payload into a typed, invariant-checked value.
pub fn from_value<T>(value: Value) -> Result<T, SchemaError>
where
    T: DeserializeOwned + Validate,
{
    let typed: T = rmpv::ext::from_value(value)?;
    typed.validate()?;
    Ok(typed)
}

/// A single token of a sample's context, kept as raw bytes
///
/// Tokenizers may split multi-byte characters across tokens, so the bytes
/// are not guaranteed to be valid UTF-8 on their own.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Token(serde_bytes::ByteBuf);

impl Token {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(serde_bytes::ByteBuf::from(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Token text with invalid UTF-8 replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text())
    }
}

/// One input's token-level activation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    /// Tokens of the input, in order
    pub context: Vec<Token>,

    /// Activation of the feature at each token position
    pub feature_acts: Vec<f64>,
}

impl Sample {
    /// Largest activation in the sample, `-inf` if the sample is empty
    pub fn max_activation(&self) -> f64 {
        self.feature_acts
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn check(&self, path: &str) -> Result<(), SchemaError> {
        if self.feature_acts.is_empty() {
            return Err(SchemaError::EmptyActivations {
                path: path.to_string(),
            });
        }
        if let Some(position) = self.feature_acts.iter().position(|a| a.is_nan()) {
            return Err(SchemaError::NotANumber {
                path: path.to_string(),
                position,
            });
        }
        if self.feature_acts.len() != self.context.len() {
            return Err(SchemaError::LengthMismatch {
                path: path.to_string(),
                tokens: self.context.len(),
                activations: self.feature_acts.len(),
            });
        }
        Ok(())
    }
}

impl Validate for Sample {
    fn validate(&self) -> Result<(), SchemaError> {
        self.check("featureActs")
    }
}

/// Samples produced by one analysis method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleGroup {
    /// "top_activations", "subsample-<fraction>", or anything else
    pub analysis_name: String,

    pub samples: Vec<Sample>,
}

impl SampleGroup {
    /// The sample every group is guaranteed to have after validation
    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }
}

/// A dictionary feature with its precomputed activation samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub dictionary_name: String,
    pub feature_index: u64,

    /// How many times the feature fired over the analysed corpus
    ///
    /// Kept as a float since backends may encode the count either way.
    pub act_times: f64,

    /// Largest activation seen for the feature, used to scale token colors
    pub max_feature_act: f64,

    /// Ordered as the backend produced them; tab order follows this
    pub sample_groups: Vec<SampleGroup>,
}

impl Validate for Feature {
    fn validate(&self) -> Result<(), SchemaError> {
        for (g, group) in self.sample_groups.iter().enumerate() {
            if group.samples.is_empty() {
                return Err(SchemaError::EmptyGroup {
                    analysis_name: group.analysis_name.clone(),
                });
            }
            for (s, sample) in group.samples.iter().enumerate() {
                sample.check(&format!("sampleGroups[{g}].samples[{s}].featureActs"))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_value(acts: Vec<Value>) -> Value {
        Value::Map(vec![
            (
                Value::from("context"),
                Value::Array(vec![Value::Binary(b"Hello".to_vec()), Value::from(" world")]),
            ),
            (Value::from("featureActs"), Value::Array(acts)),
        ])
    }

    #[test]
    fn test_sample_from_value() {
        let sample: Sample =
            from_value(sample_value(vec![Value::from(0.5), Value::from(2)])).unwrap();

        assert_eq!(sample.context.len(), 2);
        assert_eq!(sample.context[0].text(), "Hello");
        assert_eq!(sample.context[1].as_bytes(), b" world");
        assert_eq!(sample.feature_acts, vec![0.5, 2.0]);
        assert_eq!(sample.max_activation(), 2.0);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let value = Value::Map(vec![(
            Value::from("featureActs"),
            Value::Array(vec![Value::from(1.0)]),
        )]);

        let err = from_value::<Sample>(value).unwrap_err();
        assert!(matches!(err, SchemaError::Shape(_)));
        assert!(err.to_string().contains("context"));
    }

    #[test]
    fn test_snake_case_keys_are_rejected() {
        let value = Value::Map(vec![
            (Value::from("context"), Value::Array(vec![])),
            (Value::from("feature_acts"), Value::Array(vec![Value::from(1.0)])),
        ]);

        assert!(matches!(
            from_value::<Sample>(value),
            Err(SchemaError::Shape(_))
        ));
    }

    #[test]
    fn test_empty_activations_rejected() {
        let err = from_value::<Sample>(sample_value(vec![])).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyActivations { .. }));
    }

    #[test]
    fn test_nan_activation_rejected() {
        let err =
            from_value::<Sample>(sample_value(vec![Value::from(1.0), Value::from(f64::NAN)]))
                .unwrap_err();
        assert!(matches!(err, SchemaError::NotANumber { position: 1, .. }));
    }

    #[test]
    fn test_activations_must_align_with_context() {
        let err = from_value::<Sample>(sample_value(vec![Value::from(1.0)])).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::LengthMismatch {
                tokens: 2,
                activations: 1,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "featureActs: 1 activations for 2 context tokens"
        );

        let err = from_value::<Sample>(sample_value(vec![
            Value::from(1.0),
            Value::from(2.0),
            Value::from(3.0),
        ]))
        .unwrap_err();
        assert!(matches!(err, SchemaError::LengthMismatch { activations: 3, .. }));
    }

    #[test]
    fn test_non_numeric_activation_rejected() {
        let err = from_value::<Sample>(sample_value(vec![Value::from("high")])).unwrap_err();
        assert!(matches!(err, SchemaError::Shape(_)));
    }

    #[test]
    fn test_feature_with_empty_group_rejected() {
        let value = Value::Map(vec![
            (Value::from("dictionaryName"), Value::from("L9M")),
            (Value::from("featureIndex"), Value::from(42)),
            (Value::from("actTimes"), Value::from(1000)),
            (Value::from("maxFeatureAct"), Value::from(3.5)),
            (
                Value::from("sampleGroups"),
                Value::Array(vec![Value::Map(vec![
                    (Value::from("analysisName"), Value::from("top_activations")),
                    (Value::from("samples"), Value::Array(vec![])),
                ])]),
            ),
        ]);

        let err = from_value::<Feature>(value).unwrap_err();
        assert_eq!(
            err.to_string(),
            "sample group `top_activations` has no samples"
        );
    }

    #[test]
    fn test_act_times_accepts_float_encoding() {
        let value = Value::Map(vec![
            (Value::from("dictionaryName"), Value::from("L9M")),
            (Value::from("featureIndex"), Value::from(42)),
            (Value::from("actTimes"), Value::from(1000.0)),
            (Value::from("maxFeatureAct"), Value::from(3.5)),
            (
                Value::from("sampleGroups"),
                Value::Array(vec![Value::Map(vec![
                    (Value::from("analysisName"), Value::from("top_activations")),
                    (
                        Value::from("samples"),
                        Value::Array(vec![sample_value(vec![
                            Value::from(0.5),
                            Value::from(3.5),
                        ])]),
                    ),
                ])]),
            ),
        ]);

        let feature = from_value::<Feature>(value).unwrap();
        assert_eq!(feature.act_times, 1000.0);
        assert_eq!(feature.act_times.to_string(), "1000");
    }

    #[test]
    fn test_nested_length_mismatch_names_its_path() {
        let value = Value::Map(vec![
            (Value::from("dictionaryName"), Value::from("L9M")),
            (Value::from("featureIndex"), Value::from(42)),
            (Value::from("actTimes"), Value::from(7)),
            (Value::from("maxFeatureAct"), Value::from(3.5)),
            (
                Value::from("sampleGroups"),
                Value::Array(vec![Value::Map(vec![
                    (Value::from("analysisName"), Value::from("top_activations")),
                    (
                        Value::from("samples"),
                        Value::Array(vec![sample_value(vec![Value::from(0.5)])]),
                    ),
                ])]),
            ),
        ]);

        let err = from_value::<Feature>(value).unwrap_err();
        assert_eq!(
            err.to_string(),
            "sampleGroups[0].samples[0].featureActs: 1 activations for 2 context tokens"
        );
    }

    #[test]
    fn test_token_serializes_as_text() {
        let json = serde_json::to_string(&Token::new(b"ab".to_vec())).unwrap();
        assert_eq!(json, "\"ab\"");
    }
}
