//! Client for hosted text-classification endpoints that may be cold.
//!
//! [`InferenceClient::classify`] retries cold starts, timeouts and network
//! failures with linear backoff and normalizes every response shape the
//! endpoint produces into one [`ClassificationResult`]. [`Analyzer`] layers
//! label prettification and a threshold verdict on top for front ends.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod labels;
pub mod normalize;
pub mod transport;
pub mod types;
pub mod verdict;

#[cfg(test)]
mod testing;

pub use client::{InferenceClient, ProgressEvent, validate_input};
pub use config::{ClientConfig, Config, RetryPolicy};
pub use engine::Engine;
pub use error::{ClassifyError, RetryReason};
pub use labels::LabelMap;
pub use types::{ClassificationResult, ModelStatus, ScoredLabel};
pub use verdict::{Analysis, Analyzer, Verdict};
