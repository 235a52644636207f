//! Structured query analysis: one extraction call that rewrites the query and
//! names focus types, target types, and literal entity mentions.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sift_core::constants::{MAX_FOCUS_TYPES, MAX_TARGET_TYPES, MIN_FOCUS_TYPES, MIN_TARGET_TYPES};
use sift_core::errors::{SiftResult, UpstreamError};
use sift_core::models::EntityCatalog;
use sift_core::traits::ICompletionService;

/// Parsed and sanitized extraction output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    #[serde(default)]
    pub rewritten_query: Option<String>,
    #[serde(default)]
    pub focus_types: Vec<String>,
    #[serde(default)]
    pub target_types: Vec<String>,
    #[serde(default)]
    pub entity_mentions: Vec<String>,
}

impl QueryAnalysis {
    /// Trim, deduplicate, cap, and drop types the catalog does not know.
    /// A rewrite identical to the original query is discarded.
    pub fn sanitize(mut self, query: &str, catalog: &EntityCatalog) -> Self {
        self.rewritten_query = self
            .rewritten_query
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty() && !r.eq_ignore_ascii_case(query.trim()));
        self.focus_types = clean_types(self.focus_types, catalog, MAX_FOCUS_TYPES);
        self.target_types = clean_types(self.target_types, catalog, MAX_TARGET_TYPES);
        self.entity_mentions = dedupe(self.entity_mentions);
        self
    }
}

fn dedupe(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        let v = v.trim().to_string();
        if !v.is_empty() && !out.iter().any(|o| o.eq_ignore_ascii_case(&v)) {
            out.push(v);
        }
    }
    out
}

fn clean_types(types: Vec<String>, catalog: &EntityCatalog, cap: usize) -> Vec<String> {
    let mut out = dedupe(types);
    if !catalog.is_empty() {
        out.retain(|t| catalog.contains(t));
    }
    out.truncate(cap);
    out
}

/// JSON schema handed to the completion service.
pub fn analysis_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "rewritten_query": { "type": "string" },
            "focus_types": {
                "type": "array",
                "items": { "type": "string" },
                "minItems": MIN_FOCUS_TYPES,
                "maxItems": MAX_FOCUS_TYPES
            },
            "target_types": {
                "type": "array",
                "items": { "type": "string" },
                "minItems": MIN_TARGET_TYPES,
                "maxItems": MAX_TARGET_TYPES
            },
            "entity_mentions": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["focus_types", "target_types", "entity_mentions"]
    })
}

/// Prompt grounding the extraction in the entity catalog and the closest events.
pub fn build_prompt(
    query: &str,
    catalog: &EntityCatalog,
    fewshot_titles: &[String],
    background_names: &[String],
) -> String {
    let mut prompt = format!(
        "Analyze the search query.\nQuery: {query}\nEntity types: {}\n",
        catalog.names().join(", ")
    );
    if !fewshot_titles.is_empty() {
        prompt.push_str(&format!("Related events: {}\n", fewshot_titles.join("; ")));
    }
    if !background_names.is_empty() {
        prompt.push_str(&format!("Related entities: {}\n", background_names.join(", ")));
    }
    prompt.push_str(&format!(
        "Return a rewritten query, {MIN_FOCUS_TYPES}-{MAX_FOCUS_TYPES} focus entity types, \
         {MIN_TARGET_TYPES}-{MAX_TARGET_TYPES} target entity types, and every entity named literally in the query."
    ));
    prompt
}

/// Run the extraction call and parse its output.
pub fn analyze_query(
    completion: &dyn ICompletionService,
    query: &str,
    catalog: &EntityCatalog,
    fewshot_titles: &[String],
    background_names: &[String],
) -> SiftResult<QueryAnalysis> {
    let prompt = build_prompt(query, catalog, fewshot_titles, background_names);
    let raw = completion.extract_structured(&prompt, &analysis_schema())?;
    if !raw.is_object() {
        return Err(UpstreamError::MalformedResponse {
            reason: format!("expected a JSON object, got {raw}"),
        }
        .into());
    }
    let parsed: QueryAnalysis =
        serde_json::from_value(raw).map_err(|e| UpstreamError::MalformedResponse {
            reason: e.to_string(),
        })?;
    Ok(parsed.sanitize(query, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::models::EntityTypeSpec;
    use sift_core::SiftError;
    use test_fixtures::{FailingCompletion, ScriptedCompletion};

    fn catalog() -> EntityCatalog {
        EntityCatalog::new(&[
            EntityTypeSpec::new("person", 1.2),
            EntityTypeSpec::new("place", 0.8),
            EntityTypeSpec::new("structure", 1.0),
        ])
    }

    #[test]
    fn parses_and_sanitizes_extraction() {
        let completion = ScriptedCompletion::new(json!({
            "rewritten_query": "  who designed the golden gate bridge ",
            "focus_types": ["person", "Person", "vehicle", "structure"],
            "target_types": ["person"],
            "entity_mentions": ["Golden Gate Bridge", " ", "golden gate bridge"]
        }));
        let a = analyze_query(&completion, "who designed it", &catalog(), &[], &[]).unwrap();
        assert_eq!(a.rewritten_query.as_deref(), Some("who designed the golden gate bridge"));
        assert_eq!(a.focus_types, vec!["person", "structure"]);
        assert_eq!(a.target_types, vec!["person"]);
        assert_eq!(a.entity_mentions, vec!["Golden Gate Bridge"]);
        assert_eq!(completion.calls(), 1);
    }

    #[test]
    fn identical_rewrite_is_dropped() {
        let a = QueryAnalysis {
            rewritten_query: Some("Same Query".into()),
            ..Default::default()
        }
        .sanitize("same query", &catalog());
        assert!(a.rewritten_query.is_none());
    }

    #[test]
    fn non_object_response_is_malformed() {
        let completion = ScriptedCompletion::new(json!("not an object"));
        let err = analyze_query(&completion, "q", &catalog(), &[], &[]).unwrap_err();
        assert!(matches!(err, SiftError::Upstream(UpstreamError::MalformedResponse { .. })));
    }

    #[test]
    fn service_failure_propagates_as_recoverable() {
        let err = analyze_query(&FailingCompletion, "q", &catalog(), &[], &[]).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn prompt_mentions_catalog_and_grounding() {
        let prompt = build_prompt("q", &catalog(), &["Bridge opens".into()], &["San Francisco".into()]);
        assert!(prompt.contains("person, place, structure"));
        assert!(prompt.contains("Bridge opens"));
        assert!(prompt.contains("San Francisco"));
    }
}
