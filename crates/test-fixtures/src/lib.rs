//! Test fixtures for the sift workspace.
//!
//! Provides typed loading of the JSON corpus files under `data/`, an
//! in-memory store implementing every storage trait, deterministic embedding
//! services, and scripted completion services.

pub mod completion;
pub mod corpus;
pub mod embedders;
pub mod store;

use std::path::PathBuf;

use serde::de::DeserializeOwned;

pub use completion::{FailingCompletion, ScriptedCompletion};
pub use corpus::{Corpus, EntityRecord};
pub use embedders::{CountingEmbedder, FailingEmbedder, HashedBagOfWords, StaticEmbedder};
pub use store::InMemoryStore;

/// Root directory of the fixture data.
pub fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

/// Check that a fixture file exists.
pub fn fixture_exists(relative_path: &str) -> bool {
    fixtures_root().join(relative_path).exists()
}

/// List all JSON files in a fixture subdirectory, sorted by path.
pub fn list_fixtures(subdir: &str) -> Vec<PathBuf> {
    let dir = fixtures_root().join(subdir);
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("Failed to read directory {}: {}", dir.display(), e))
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                Some(path)
            } else {
                None
            }
        })
        .collect();
    files.sort();
    files
}

/// Load a corpus fixture from `data/corpus/<name>.json`.
pub fn load_corpus(name: &str) -> Corpus {
    load_fixture(&format!("corpus/{name}.json"))
}
