use clap::{Parser, Subcommand};
use std::time::Duration;

use crate::error::ClassifyError;
use crate::labels::{DEFAULT_CONCERN_LABEL, DEFAULT_LABELS, LabelMap};

pub const DEFAULT_MODEL_ID: &str = "hugps/mh-bert-pt";
pub const DEFAULT_API_BASE: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_MIN_CHARS: usize = 3;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Model ID on the hosted inference API
    #[arg(long, env = "MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    pub model_id: String,

    /// Access token for private or rate-limit-exempt access
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Base URL the model ID is appended to
    #[arg(long, env = "API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Attempts per classification before giving up
    #[arg(long, env = "MAX_ATTEMPTS", default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    /// Per-attempt timeout in seconds; cold starts can take minutes
    #[arg(long, env = "ATTEMPT_TIMEOUT_SECS", default_value = "180")]
    pub attempt_timeout_secs: u64,

    /// Linear backoff step in seconds between attempts
    #[arg(long, env = "BACKOFF_BASE_SECS", default_value = "4")]
    pub backoff_base_secs: u64,

    /// TCP connect timeout in seconds
    #[arg(long, env = "CONNECT_TIMEOUT_SECS", default_value = "20")]
    pub connect_timeout_secs: u64,

    /// Let the endpoint answer from its response cache
    #[arg(long, env = "USE_CACHE", default_value = "true", action = clap::ArgAction::Set)]
    pub use_cache: bool,

    /// Label mapping in format "LABEL_0=Non-issue,LABEL_1=Potential sign"
    #[arg(long, env = "LABELS", default_value = DEFAULT_LABELS)]
    pub labels: String,

    /// Display name of the class compared against the threshold
    #[arg(long, env = "CONCERN_LABEL", default_value = DEFAULT_CONCERN_LABEL)]
    pub concern_label: String,

    /// Alert threshold for the concern class probability
    #[arg(long, env = "THRESHOLD", default_value = "0.65")]
    pub threshold: f64,

    /// Shortest accepted input, in characters after trimming
    #[arg(long, env = "MIN_CHARS", default_value = "3")]
    pub min_chars: usize,

    /// Poll the model for up to this many seconds before classifying (0 skips)
    #[arg(long, env = "WARMUP_SECS", default_value = "0")]
    pub warmup_secs: u64,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Classify one piece of text
    Analyze {
        text: String,
        /// Also print the raw label scores
        #[arg(long)]
        raw: bool,
    },
    /// Classify the built-in example sentences
    Examples,
    /// Report whether the configured model is reachable and loaded
    Ping,
}

/// Attempt bound and linear backoff for one classification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Wait before the attempt following `attempt` (1-based). Saturates
    /// instead of overflowing for absurd base delays.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            per_attempt_timeout: Duration::from_secs(180),
            base_delay: Duration::from_secs(4),
        }
    }
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            per_attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
            base_delay: Duration::from_secs(config.backoff_base_secs),
        }
    }
}

/// Everything [`crate::InferenceClient`] needs, built once at start-up.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub model_id: String,
    pub api_base: String,
    pub token: Option<String>,
    pub retry: RetryPolicy,
    pub connect_timeout: Duration,
    pub ping_timeout: Duration,
    pub use_cache: bool,
    pub min_chars: usize,
}

impl ClientConfig {
    pub fn model_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            self.model_id.trim_start_matches('/')
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(20),
            ping_timeout: Duration::from_secs(20),
            use_cache: true,
            min_chars: DEFAULT_MIN_CHARS,
        }
    }
}

impl From<&Config> for ClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            model_id: config.model_id.clone(),
            api_base: config.api_base.clone(),
            // An empty secret is the same as no secret.
            token: config.hf_token.clone().filter(|token| !token.trim().is_empty()),
            retry: RetryPolicy::from(config),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            use_cache: config.use_cache,
            min_chars: config.min_chars,
            ..Self::default()
        }
    }
}

impl Config {
    pub fn label_map(&self) -> Result<LabelMap, ClassifyError> {
        LabelMap::parse(&self.labels, &self.concern_label)
    }

    pub fn validated_threshold(&self) -> Result<f64, ClassifyError> {
        if (0.0..=1.0).contains(&self.threshold) {
            Ok(self.threshold)
        } else {
            Err(ClassifyError::Config(format!(
                "threshold {} must lie in [0, 1]",
                self.threshold
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["earlysign"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_follow_hosted_api() {
        let config = parse(&["ping"]);
        let client = ClientConfig::from(&config);
        assert_eq!(
            client.model_url(),
            "https://api-inference.huggingface.co/models/hugps/mh-bert-pt"
        );
        assert_eq!(client.retry.max_attempts, 5);
        assert_eq!(client.retry.per_attempt_timeout, Duration::from_secs(180));
        assert!(client.use_cache);
        assert_eq!(client.min_chars, 3);
        assert_eq!(config.validated_threshold().unwrap(), 0.65);
        assert_eq!(config.label_map().unwrap(), LabelMap::default());
    }

    #[test]
    fn empty_token_means_no_auth() {
        let config = parse(&["--hf-token", "  ", "ping"]);
        assert!(ClientConfig::from(&config).token.is_none());

        let config = parse(&["--hf-token", "hf_abc", "ping"]);
        assert_eq!(ClientConfig::from(&config).token.as_deref(), Some("hf_abc"));
    }

    #[test]
    fn backoff_is_linear() {
        let policy = RetryPolicy {
            base_delay: Duration::from_secs(4),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(4));
        assert_eq!(policy.delay_after(2), Duration::from_secs(8));
        assert_eq!(policy.delay_after(3), Duration::from_secs(12));
    }

    #[test]
    fn huge_backoff_saturates() {
        let config = parse(&["--backoff-base-secs", "18446744073709551615", "ping"]);
        let policy = RetryPolicy::from(&config);
        assert_eq!(policy.delay_after(2), Duration::MAX);
    }

    #[test]
    fn rejects_zero_attempts_and_bad_threshold() {
        assert!(Config::try_parse_from(["earlysign", "--max-attempts", "0", "ping"]).is_err());
        let config = parse(&["--threshold", "1.5", "ping"]);
        assert!(config.validated_threshold().is_err());
    }

    #[test]
    fn model_url_joins_cleanly() {
        let client = ClientConfig {
            api_base: "http://localhost:8080/models/".into(),
            model_id: "org/model".into(),
            ..ClientConfig::default()
        };
        assert_eq!(client.model_url(), "http://localhost:8080/models/org/model");
    }
}
