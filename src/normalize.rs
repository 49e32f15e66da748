//! Decoding of the response shapes the inference endpoint is known to return.
//!
//! Text-classification endpoints answer with one of:
//!
//! - `[[{"label": .., "score": ..}, ..]]` (one inner list per input)
//! - `[{"label": .., "score": ..}, ..]`
//! - `{"labels": [..], "scores": [..]}` (parallel arrays)
//!
//! Shapes are tried in that order; anything else is a malformed response.

use serde::Deserialize;

use crate::error::{ClassifyError, snippet};
use crate::types::{ClassificationResult, ScoredLabel};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawResponse {
    Nested(Vec<Vec<RawScored>>),
    Flat(Vec<RawScored>),
    Parallel(RawParallel),
}

type JsonObject = serde_json::Map<String, serde_json::Value>;

// Both wire structs go through a JSON object first: serde would otherwise also
// accept them in sequence form, e.g. `["LABEL_0", 0.9]`.

/// A `{"label", "score"}` object.
#[derive(Debug, Deserialize)]
#[serde(try_from = "JsonObject")]
struct RawScored(ScoredLabel);

impl TryFrom<JsonObject> for RawScored {
    type Error = serde_json::Error;

    fn try_from(fields: JsonObject) -> Result<Self, Self::Error> {
        serde_json::from_value(serde_json::Value::Object(fields)).map(Self)
    }
}

#[derive(Debug, Deserialize)]
#[serde(try_from = "JsonObject")]
struct RawParallel {
    labels: Vec<String>,
    scores: Vec<f64>,
}

#[derive(Deserialize)]
struct ParallelFields {
    labels: Vec<String>,
    scores: Vec<f64>,
}

impl TryFrom<JsonObject> for RawParallel {
    type Error = serde_json::Error;

    fn try_from(fields: JsonObject) -> Result<Self, Self::Error> {
        let ParallelFields { labels, scores } =
            serde_json::from_value(serde_json::Value::Object(fields))?;
        Ok(Self { labels, scores })
    }
}

fn unwrap_scored(raw: Vec<RawScored>) -> Vec<ScoredLabel> {
    raw.into_iter().map(|RawScored(scored)| scored).collect()
}

/// Parse a response body into a flat [`ClassificationResult`].
pub fn normalize_body(body: &str) -> Result<ClassificationResult, ClassifyError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| ClassifyError::MalformedResponse {
            snippet: format!("non-JSON body: {}", snippet(body)),
        })?;
    normalize(value)
}

/// Normalize an already-parsed JSON document.
pub fn normalize(value: serde_json::Value) -> Result<ClassificationResult, ClassifyError> {
    let malformed = |reason: &str, value: &serde_json::Value| ClassifyError::MalformedResponse {
        snippet: format!("{reason}: {}", snippet(&value.to_string())),
    };

    let raw: RawResponse = serde_json::from_value(value.clone())
        .map_err(|_| malformed("unrecognised response shape", &value))?;

    let labels = match raw {
        RawResponse::Nested(mut batches) => {
            if batches.is_empty() {
                return Err(malformed("empty response", &value));
            }
            unwrap_scored(batches.swap_remove(0))
        }
        RawResponse::Flat(labels) => unwrap_scored(labels),
        RawResponse::Parallel(RawParallel { labels, scores }) => {
            if labels.len() != scores.len() {
                return Err(malformed(
                    &format!(
                        "{} labels but {} scores",
                        labels.len(),
                        scores.len()
                    ),
                    &value,
                ));
            }
            labels
                .into_iter()
                .zip(scores)
                .map(|(label, score)| ScoredLabel { label, score })
                .collect()
        }
    };

    if labels.is_empty() {
        return Err(malformed("no scores in response", &value));
    }
    if let Some(bad) = labels
        .iter()
        .find(|scored| !scored.score.is_finite() || !(0.0..=1.0).contains(&scored.score))
    {
        return Err(malformed(
            &format!("score {} for {} outside [0, 1]", bad.score, bad.label),
            &value,
        ));
    }

    Ok(ClassificationResult::new(labels))
}
