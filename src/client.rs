use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClassifyError, RetryReason, snippet};
use crate::normalize::normalize_body;
use crate::transport::{ReqwestTransport, Transport, TransportFailure, TransportResult};
use crate::types::{ClassificationResult, InferencePayload, ModelStatus};

/// Progress of a single `classify` call, for observers that want to show it.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Attempt {
        attempt: u32,
        max_attempts: u32,
    },
    Retrying {
        attempt: u32,
        reason: RetryReason,
        delay: Duration,
    },
    Succeeded {
        attempt: u32,
    },
    GaveUp {
        attempts: u32,
        reason: RetryReason,
    },
}

/// Trim `text` and reject it when shorter than `min_chars` characters.
pub fn validate_input(text: &str, min_chars: usize) -> Result<&str, ClassifyError> {
    let trimmed = text.trim();
    let chars = trimmed.chars().count();
    if chars < min_chars {
        return Err(ClassifyError::InvalidInput {
            chars,
            min: min_chars,
        });
    }
    Ok(trimmed)
}

enum Assessment {
    Done(Result<ClassificationResult, ClassifyError>),
    Retry(RetryReason),
}

/// Client for a hosted text-classification endpoint that may need to
/// cold-start before it can answer.
pub struct InferenceClient {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    url: String,
    progress: Option<flume::Sender<ProgressEvent>>,
}

impl InferenceClient {
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(config.connect_timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            url: config.model_url(),
            config: config.clone(),
            progress: None,
        }
    }

    /// Send [`ProgressEvent`]s to `sender`. Events are dropped when the
    /// receiver is gone or a bounded channel is full.
    pub fn with_progress(mut self, sender: flume::Sender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.progress {
            let _ = sender.try_send(event);
        }
    }

    fn bearer(&self) -> Option<&str> {
        self.config.token.as_deref()
    }

    #[tracing::instrument(
        skip(self, text),
        fields(
            request_id = %uuid::Uuid::new_v4().simple(),
            model = %self.config.model_id,
        )
    )]
    pub async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
        counter!("inference_requests_total").increment(1);
        let result = self.classify_with_retry(text).await;
        if let Err(err) = &result {
            counter!("inference_failures_total", "kind" => err.kind()).increment(1);
            warn!(error = %err, "Classification failed");
        }
        result
    }

    async fn classify_with_retry(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
        let text = validate_input(text, self.config.min_chars)?;
        let policy = &self.config.retry;
        let max_attempts = policy.max_attempts.max(1);

        let payload = serde_json::to_value(InferencePayload::new(text, self.config.use_cache))
            .map_err(|err| ClassifyError::Config(format!("cannot encode request: {err}")))?;

        let mut last_reason = RetryReason::Loading;
        for attempt in 1..=max_attempts {
            self.emit(ProgressEvent::Attempt {
                attempt,
                max_attempts,
            });
            debug!(attempt, max_attempts, "Sending inference request");

            let outcome = timeout(
                policy.per_attempt_timeout,
                self.transport
                    .post_json(&self.url, self.bearer(), payload.clone()),
            )
            .await
            .unwrap_or(Err(TransportFailure::Timeout));

            match self.assess(outcome) {
                Assessment::Done(result) => {
                    if result.is_ok() {
                        info!(attempt, "Classification completed");
                        self.emit(ProgressEvent::Succeeded { attempt });
                    }
                    return result;
                }
                Assessment::Retry(reason) => {
                    counter!("inference_retries_total", "reason" => reason.as_str()).increment(1);
                    if attempt < max_attempts {
                        let delay = policy.delay_after(attempt);
                        warn!(
                            attempt,
                            reason = %reason,
                            delay_ms = delay.as_millis() as u64,
                            "Transient failure, retrying"
                        );
                        self.emit(ProgressEvent::Retrying {
                            attempt,
                            reason: reason.clone(),
                            delay,
                        });
                        sleep(delay).await;
                    }
                    last_reason = reason;
                }
            }
        }

        self.emit(ProgressEvent::GaveUp {
            attempts: max_attempts,
            reason: last_reason.clone(),
        });
        Err(ClassifyError::TransientUnavailable {
            attempts: max_attempts,
            last_reason,
        })
    }

    fn assess(&self, outcome: TransportResult) -> Assessment {
        match outcome {
            Ok(response) => match response.status {
                200..=299 => Assessment::Done(normalize_body(&response.body)),
                503 => Assessment::Retry(RetryReason::Loading),
                404 => Assessment::Done(Err(ClassifyError::ModelNotFound {
                    model_id: self.config.model_id.clone(),
                })),
                status => Assessment::Done(Err(ClassifyError::TransportError {
                    status,
                    snippet: snippet(&response.body),
                })),
            },
            Err(TransportFailure::Timeout) => Assessment::Retry(RetryReason::Timeout),
            Err(TransportFailure::Network(detail)) => {
                Assessment::Retry(RetryReason::Network(detail))
            }
        }
    }

    /// Query the model's metadata endpoint once.
    #[tracing::instrument(skip(self), fields(model = %self.config.model_id))]
    pub async fn ping(&self) -> ModelStatus {
        let outcome = timeout(
            self.config.ping_timeout,
            self.transport.get(&self.url, self.bearer()),
        )
        .await
        .unwrap_or(Err(TransportFailure::Timeout));

        let status = match outcome {
            Ok(response) => match response.status {
                200..=299 => {
                    // A loaded model's metadata has no "state"; a loading one says so.
                    let loading = serde_json::from_str::<serde_json::Value>(&response.body)
                        .ok()
                        .and_then(|info| {
                            info.get("state")
                                .and_then(|state| state.as_str())
                                .map(|state| state.eq_ignore_ascii_case("loading"))
                        })
                        .unwrap_or(false);
                    if loading {
                        ModelStatus::Loading
                    } else {
                        ModelStatus::Ready
                    }
                }
                503 => ModelStatus::Loading,
                404 => ModelStatus::NotFound,
                status => ModelStatus::Error { status },
            },
            Err(TransportFailure::Timeout) => ModelStatus::Unreachable("timed out".to_string()),
            Err(TransportFailure::Network(detail)) => ModelStatus::Unreachable(detail),
        };
        debug!(status = status.as_str(), "Ping finished");
        status
    }

    /// Poll [`Self::ping`] until the model reports ready or `max_wait` elapses.
    /// Neither a slow ping nor the poll sleep runs past `max_wait`.
    #[tracing::instrument(skip(self), fields(model = %self.config.model_id))]
    pub async fn wait_until_ready(&self, max_wait: Duration, poll_interval: Duration) -> bool {
        // No representable deadline means no deadline.
        let deadline = Instant::now().checked_add(max_wait);
        let remaining =
            || deadline.map_or(Duration::MAX, |at| at.saturating_duration_since(Instant::now()));

        while !remaining().is_zero() {
            match timeout(remaining(), self.ping()).await {
                Ok(ModelStatus::Ready) => {
                    info!("Model is ready");
                    return true;
                }
                Ok(status) => debug!(status = status.as_str(), "Model not ready yet"),
                Err(_) => break,
            }
            sleep(poll_interval.min(remaining())).await;
        }
        warn!(waited_secs = max_wait.as_secs(), "Model did not become ready in time");
        false
    }
}
