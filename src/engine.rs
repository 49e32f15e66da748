use async_trait::async_trait;

use crate::client::InferenceClient;
use crate::error::ClassifyError;
use crate::types::ClassificationResult;

/// Anything that can turn text into per-class scores.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError>;
}

#[async_trait]
impl Engine for InferenceClient {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
        InferenceClient::classify(self, text).await
    }
}
