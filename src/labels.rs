//! Mapping from raw model class identifiers to display names.
//!
//! Which identifier means "concerning" differs between models, so the mapping
//! and the concern class are configuration rather than constants.

use std::collections::BTreeMap;

use crate::error::ClassifyError;
use crate::types::ClassificationResult;

pub const DEFAULT_LABELS: &str = "LABEL_0=Non-issue,LABEL_1=Potential sign";
pub const DEFAULT_CONCERN_LABEL: &str = "Potential sign";

#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    /// raw identifier → display name, in configuration order
    entries: Vec<(String, String)>,
    concern: String,
    reassuring: String,
}

impl LabelMap {
    pub fn new(
        entries: Vec<(String, String)>,
        concern: impl Into<String>,
    ) -> Result<Self, ClassifyError> {
        let concern = concern.into();
        if !entries.iter().any(|(_, display)| *display == concern) {
            return Err(ClassifyError::Config(format!(
                "concern label {concern:?} is not one of the configured display names"
            )));
        }
        let reassuring = entries
            .iter()
            .map(|(_, display)| display)
            .find(|display| **display != concern)
            .cloned()
            .ok_or_else(|| {
                ClassifyError::Config("label mapping needs a class besides the concern".into())
            })?;
        Ok(Self {
            entries,
            concern,
            reassuring,
        })
    }

    /// Parse `"LABEL_0=Non-issue,LABEL_1=Potential sign"`.
    pub fn parse(spec: &str, concern: &str) -> Result<Self, ClassifyError> {
        let entries = spec
            .split(',')
            .filter(|pair| !pair.trim().is_empty())
            .map(|pair| {
                let (raw, display) = pair.split_once('=').ok_or_else(|| {
                    ClassifyError::Config(format!("label mapping {pair:?} is not RAW=Display"))
                })?;
                let (raw, display) = (raw.trim(), display.trim());
                if raw.is_empty() || display.is_empty() {
                    return Err(ClassifyError::Config(format!(
                        "label mapping {pair:?} has an empty side"
                    )));
                }
                Ok((raw.to_string(), display.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(entries, concern)
    }

    pub fn concern(&self) -> &str {
        &self.concern
    }

    /// First configured display name that is not the concern class.
    pub fn reassuring(&self) -> &str {
        &self.reassuring
    }

    /// Display name for `raw`; unknown identifiers pass through unchanged.
    pub fn display<'a>(&'a self, raw: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|(known, _)| known == raw)
            .map_or(raw, |(_, display)| display.as_str())
    }

    /// Display name → score. Every configured display name is present,
    /// defaulting to 0.0 when the model did not report it.
    pub fn prettify(&self, result: &ClassificationResult) -> BTreeMap<String, f64> {
        let mut out: BTreeMap<String, f64> = result
            .iter()
            .map(|scored| (self.display(&scored.label).to_string(), scored.score))
            .collect();
        for (_, display) in &self.entries {
            out.entry(display.clone()).or_insert(0.0);
        }
        out
    }
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            entries: vec![
                ("LABEL_0".to_string(), "Non-issue".to_string()),
                ("LABEL_1".to_string(), DEFAULT_CONCERN_LABEL.to_string()),
            ],
            concern: DEFAULT_CONCERN_LABEL.to_string(),
            reassuring: "Non-issue".to_string(),
        }
    }
}
