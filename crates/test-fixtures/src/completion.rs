//! Scripted completion services.

use std::sync::atomic::{AtomicUsize, Ordering};

use sift_core::errors::{SiftResult, UpstreamError};
use sift_core::traits::ICompletionService;

/// Returns the same canned structured response for every prompt.
#[derive(Debug)]
pub struct ScriptedCompletion {
    response: serde_json::Value,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new(response: serde_json::Value) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ICompletionService for ScriptedCompletion {
    fn extract_structured(
        &self,
        _prompt: &str,
        _schema: &serde_json::Value,
    ) -> SiftResult<serde_json::Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }

    fn name(&self) -> &str {
        "scripted-test"
    }
}

/// Always fails, for extraction-degradation tests.
#[derive(Debug, Default)]
pub struct FailingCompletion;

impl ICompletionService for FailingCompletion {
    fn extract_structured(
        &self,
        _prompt: &str,
        _schema: &serde_json::Value,
    ) -> SiftResult<serde_json::Value> {
        Err(UpstreamError::CompletionFailed {
            reason: "completion service offline".to_string(),
        }
        .into())
    }

    fn name(&self) -> &str {
        "failing-test"
    }
}
