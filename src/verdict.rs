//! Turning scores into the verdict a front end shows.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::client::validate_input;
use crate::engine::Engine;
use crate::error::ClassifyError;
use crate::labels::LabelMap;
use crate::types::ClassificationResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub label: String,
    pub concern_probability: f64,
    pub threshold: f64,
    pub concerning: bool,
}

impl Verdict {
    /// The concern class wins when its probability reaches `threshold`.
    pub fn decide(scores: &BTreeMap<String, f64>, labels: &LabelMap, threshold: f64) -> Self {
        let concern_probability = scores.get(labels.concern()).copied().unwrap_or(0.0);
        let concerning = concern_probability >= threshold;
        let label = if concerning {
            labels.concern()
        } else {
            labels.reassuring()
        };
        Self {
            label: label.to_string(),
            concern_probability,
            threshold,
            concerning,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: p1={:.2} (threshold={:.2})",
            self.label, self.concern_probability, self.threshold
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub text: String,
    pub raw: ClassificationResult,
    pub scores: BTreeMap<String, f64>,
    pub verdict: Verdict,
}

/// Validates input, classifies it and decides a verdict.
#[derive(Clone)]
pub struct Analyzer {
    engine: Arc<dyn Engine>,
    labels: LabelMap,
    threshold: f64,
    min_chars: usize,
}

impl Analyzer {
    pub fn new(
        engine: Arc<dyn Engine>,
        labels: LabelMap,
        threshold: f64,
        min_chars: usize,
    ) -> Result<Self, ClassifyError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ClassifyError::Config(format!(
                "threshold {threshold} must lie in [0, 1]"
            )));
        }
        Ok(Self {
            engine,
            labels,
            threshold,
            min_chars,
        })
    }

    #[tracing::instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub async fn analyze(&self, text: &str) -> Result<Analysis, ClassifyError> {
        let text = validate_input(text, self.min_chars)?;
        let raw = self.engine.classify(text).await?;
        let scores = self.labels.prettify(&raw);
        let verdict = Verdict::decide(&scores, &self.labels, self.threshold);
        tracing::info!(
            verdict = %verdict.label,
            p1 = verdict.concern_probability,
            "Analysis complete"
        );
        Ok(Analysis {
            text: text.to_string(),
            raw,
            scores,
            verdict,
        })
    }

    /// Analyze every text concurrently. Each entry succeeds or fails on its own.
    pub async fn analyze_batch(&self, texts: &[&str]) -> Vec<Result<Analysis, ClassifyError>> {
        let futures = texts.iter().map(|text| self.analyze(text));
        futures::future::join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InferenceClient;
    use crate::config::{ClientConfig, RetryPolicy};
    use crate::testing::{ScriptedTransport, reply};
    use crate::types::ScoredLabel;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Engine returning canned scores keyed by input text.
    struct CannedEngine {
        answers: Vec<(&'static str, Result<ClassificationResult, ClassifyError>)>,
    }

    #[async_trait]
    impl Engine for CannedEngine {
        async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
            self.answers
                .iter()
                .find(|(known, _)| *known == text)
                .map(|(_, answer)| answer.clone())
                .unwrap_or_else(|| panic!("unexpected text {text:?}"))
        }
    }

    fn two_class(non_issue: f64, sign: f64) -> ClassificationResult {
        ClassificationResult::new(vec![
            ScoredLabel::new("LABEL_0", non_issue),
            ScoredLabel::new("LABEL_1", sign),
        ])
    }

    fn scores(sign: f64) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("Non-issue".to_string(), 1.0 - sign),
            ("Potential sign".to_string(), sign),
        ])
    }

    #[test]
    fn threshold_is_inclusive() {
        let labels = LabelMap::default();
        let verdict = Verdict::decide(&scores(0.65), &labels, 0.65);
        assert!(verdict.concerning);
        assert_eq!(verdict.label, "Potential sign");

        let verdict = Verdict::decide(&scores(0.6499), &labels, 0.65);
        assert!(!verdict.concerning);
        assert_eq!(verdict.label, "Non-issue");
    }

    #[test]
    fn verdict_display() {
        let verdict = Verdict::decide(&scores(0.7), &LabelMap::default(), 0.65);
        assert_eq!(verdict.to_string(), "Potential sign: p1=0.70 (threshold=0.65)");
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_scenarios() {
        let calm = "I had a relaxing day at the park with my family.";
        let low = "Lately I feel empty and it's hard to get out of bed.";
        let transport = Arc::new(ScriptedTransport::new([
            reply(
                200,
                r#"[[{"label":"LABEL_0","score":0.91},{"label":"LABEL_1","score":0.09}]]"#,
            ),
            reply(503, r#"{"error":"Model is currently loading"}"#),
            reply(200, r#"{"labels":["LABEL_0","LABEL_1"],"scores":[0.30,0.70]}"#),
        ]));
        let config = ClientConfig {
            retry: RetryPolicy {
                max_attempts: 3,
                per_attempt_timeout: Duration::from_secs(60),
                base_delay: Duration::from_secs(4),
            },
            ..ClientConfig::default()
        };
        let client = InferenceClient::with_transport(&config, transport.clone());
        let analyzer = Analyzer::new(Arc::new(client), LabelMap::default(), 0.65, 3).unwrap();

        let first = analyzer.analyze(calm).await.unwrap();
        assert_eq!(first.verdict.label, "Non-issue");
        assert_eq!(first.scores["Non-issue"], 0.91);

        let second = analyzer.analyze(low).await.unwrap();
        assert_eq!(second.verdict.label, "Potential sign");
        assert_eq!(second.verdict.concern_probability, 0.70);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn short_text_is_rejected_before_engine() {
        let engine = CannedEngine { answers: vec![] };
        let analyzer = Analyzer::new(Arc::new(engine), LabelMap::default(), 0.65, 3).unwrap();
        let err = analyzer.analyze(" a ").await.unwrap_err();
        assert_eq!(err, ClassifyError::InvalidInput { chars: 1, min: 3 });
    }

    #[tokio::test]
    async fn batch_failures_are_isolated() {
        let engine = CannedEngine {
            answers: vec![
                ("fine text", Ok(two_class(0.8, 0.2))),
                (
                    "broken text",
                    Err(ClassifyError::ModelNotFound {
                        model_id: "missing/model".into(),
                    }),
                ),
            ],
        };
        let analyzer = Analyzer::new(Arc::new(engine), LabelMap::default(), 0.65, 3).unwrap();

        let results = analyzer
            .analyze_batch(&["fine text", "broken text", "no"])
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().verdict.label, "Non-issue");
        assert!(matches!(results[1], Err(ClassifyError::ModelNotFound { .. })));
        assert!(matches!(results[2], Err(ClassifyError::InvalidInput { .. })));
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let engine = CannedEngine { answers: vec![] };
        assert!(Analyzer::new(Arc::new(engine), LabelMap::default(), 1.2, 3).is_err());
    }
}
