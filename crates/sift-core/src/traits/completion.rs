use crate::errors::SiftResult;

/// LLM completion service used for structured extraction and query rewriting.
pub trait ICompletionService: Send + Sync {
    /// Run `prompt` and return a JSON value conforming to `schema`.
    fn extract_structured(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
    ) -> SiftResult<serde_json::Value>;

    fn name(&self) -> &str;
}
