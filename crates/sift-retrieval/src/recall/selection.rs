//! Core-entity boost and final key selection.

use sift_core::models::sort_keys;

use super::candidates::KeyCandidate;

/// Multiply the weight of every key whose name appears literally
/// (case-insensitive substring) in the raw query. Returns the boosted count.
pub(crate) fn apply_core_boost(candidates: &mut [KeyCandidate], query: &str, boost: f64) -> usize {
    let haystack = query.to_lowercase();
    let mut boosted = 0;
    for c in candidates.iter_mut() {
        let name = c.key.name.trim().to_lowercase();
        if !name.is_empty() && haystack.contains(&name) {
            c.key.weight *= boost;
            boosted += 1;
        }
    }
    boosted
}

/// Sort by weight, drop keys under `threshold`, then cap at `max_keys`.
pub(crate) fn select(
    mut candidates: Vec<KeyCandidate>,
    threshold: f64,
    max_keys: usize,
) -> Vec<KeyCandidate> {
    let mut keys: Vec<_> = candidates.iter().map(|c| c.key.clone()).collect();
    sort_keys(&mut keys);
    let order: Vec<String> = keys
        .into_iter()
        .filter(|k| k.weight >= threshold)
        .take(max_keys)
        .map(|k| k.entity_id)
        .collect();
    let mut selected = Vec::with_capacity(order.len());
    for id in order {
        if let Some(pos) = candidates.iter().position(|c| c.key.entity_id == id) {
            selected.push(candidates.swap_remove(pos));
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::models::{Key, KeySource};

    fn candidate(id: &str, name: &str, weight: f64) -> KeyCandidate {
        KeyCandidate {
            key: Key {
                entity_id: id.into(),
                name: name.into(),
                entity_type: "thing".into(),
                weight,
                similarity: weight,
                type_weight: 1.0,
                hop: 0,
                steps: vec![],
                source: KeySource::VectorSearch,
            },
            clues: vec![],
        }
    }

    #[test]
    fn boost_is_literal_substring_match() {
        let mut c = vec![candidate("a", "Gate", 0.5), candidate("b", "Tower", 0.5)];
        assert_eq!(apply_core_boost(&mut c, "golden gate bridge", 2.0), 1);
        assert_eq!(c[0].key.weight, 1.0);
        assert_eq!(c[1].key.weight, 0.5);
    }

    #[test]
    fn select_sorts_thresholds_and_caps() {
        let c = vec![
            candidate("a", "A", 0.2),
            candidate("b", "B", 0.9),
            candidate("c", "C", 0.01),
            candidate("d", "D", 0.5),
        ];
        let ids: Vec<_> = select(c, 0.05, 2).into_iter().map(|c| c.key.entity_id).collect();
        assert_eq!(ids, vec!["b", "d"]);
    }
}
