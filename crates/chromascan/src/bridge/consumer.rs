use async_trait::async_trait;

use crate::bridge::BridgeOutcome;
use crate::error::Result;
use crate::types::AnalysisRequest;

/// Downstream analysis stage that receives accepted results.
#[async_trait]
pub trait AnalysisConsumer: Send + Sync {
    async fn submit(&self, request: &AnalysisRequest) -> Result<()>;
}

/// Submit the outcome's request, if any. Returns whether something was submitted.
pub async fn forward(outcome: &BridgeOutcome, consumer: &dyn AnalysisConsumer) -> Result<bool> {
    match &outcome.request {
        Some(request) => {
            consumer.submit(request).await?;
            tracing::debug!(request_id = %request.request_id, "Analysis request submitted");
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidationOutcome;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<uuid::Uuid>>,
    }

    #[async_trait]
    impl AnalysisConsumer for Recorder {
        async fn submit(&self, request: &AnalysisRequest) -> Result<()> {
            self.seen.lock().unwrap().push(request.request_id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_forward_skips_rejected_outcome() {
        let recorder = Recorder::default();
        let outcome = BridgeOutcome {
            validation: ValidationOutcome {
                is_valid: false,
                issues: vec!["No peak data extracted".to_string()],
                recommendations: Vec::new(),
            },
            request: None,
        };

        assert!(!forward(&outcome, &recorder).await.unwrap());
        assert!(recorder.seen.lock().unwrap().is_empty());
    }
}
