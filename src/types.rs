use serde::{Deserialize, Serialize};

/// JSON body sent to the hosted inference endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct InferencePayload<'a> {
    pub inputs: &'a str,
    pub parameters: InferenceParameters,
    pub options: InferenceOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct InferenceParameters {
    pub return_all_scores: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InferenceOptions {
    /// Ask the endpoint to block until its model is loaded instead of
    /// answering 503 straight away.
    pub wait_for_model: bool,
    pub use_cache: bool,
}

impl<'a> InferencePayload<'a> {
    pub fn new(inputs: &'a str, use_cache: bool) -> Self {
        Self {
            inputs,
            parameters: InferenceParameters {
                return_all_scores: true,
            },
            options: InferenceOptions {
                wait_for_model: true,
                use_cache,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLabel {
    pub label: String,
    pub score: f64,
}

impl ScoredLabel {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// One scored label per model class, in the order the endpoint reported them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClassificationResult {
    labels: Vec<ScoredLabel>,
}

impl ClassificationResult {
    pub fn new(labels: Vec<ScoredLabel>) -> Self {
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredLabel> {
        self.labels.iter()
    }

    /// Score for `label`, if the model reported it.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .find(|scored| scored.label == label)
            .map(|scored| scored.score)
    }

    /// Highest-scoring label. Ties go to the earliest entry.
    pub fn top(&self) -> Option<&ScoredLabel> {
        self.labels.iter().fold(None, |best, candidate| match best {
            Some(current) if current.score >= candidate.score => Some(current),
            _ => Some(candidate),
        })
    }
}

/// Availability of the configured model as reported by its metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    Ready,
    Loading,
    NotFound,
    Unreachable(String),
    Error { status: u16 },
}

impl ModelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Loading => "loading",
            Self::NotFound => "not found",
            Self::Unreachable(_) => "unreachable",
            Self::Error { .. } => "error",
        }
    }
}
