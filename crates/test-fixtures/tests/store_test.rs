//! Behaviour of the in-memory adapters over the bridges corpus.

use sift_core::models::SearchScope;
use sift_core::traits::{
    IEmbeddingService, IFullTextIndex, IRelationalStore, IVectorIndex, TextTarget,
    VectorCollection, VectorFilter,
};
use test_fixtures::{fixture_exists, list_fixtures, load_corpus, HashedBagOfWords, InMemoryStore};

fn store() -> (InMemoryStore, HashedBagOfWords) {
    let embedder = HashedBagOfWords::new(128);
    let corpus = load_corpus("bridges");
    let store = InMemoryStore::from_corpus(&corpus, &embedder).unwrap();
    (store, embedder)
}

#[test]
fn corpus_fixture_loads() {
    assert!(fixture_exists("corpus/bridges.json"));
    assert_eq!(list_fixtures("corpus").len(), 1);
    let (store, _) = store();
    assert_eq!(store.entity_count(), 10);
    assert_eq!(store.event_count(), 5);
    assert_eq!(store.section_count(), 3);
}

#[test]
fn vector_search_ranks_identical_text_first() {
    let (store, embedder) = store();
    let q = embedder.embed("Golden Gate Bridge opens").unwrap();
    let hits = store
        .search_similar(VectorCollection::EventTitle, &q, 3, &SearchScope::all(), &VectorFilter::none())
        .unwrap();
    assert_eq!(hits[0].id, "evt-opening");
    assert!((hits[0].similarity - 1.0).abs() < 1e-6);
    assert!(hits.len() <= 3);
}

#[test]
fn vector_search_honours_scope_and_type_filter() {
    let (store, embedder) = store();
    let q = embedder.embed("Leon Moisseiff").unwrap();
    let scope = SearchScope::sources(["src-tn"]);
    let hits = store
        .search_similar(VectorCollection::Entity, &q, 10, &scope, &VectorFilter::entity_type("person"))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "ent-moisseiff-tn");
}

#[test]
fn name_lookup_prefers_exact_then_prefix() {
    let (store, _) = store();
    let matches = store
        .exact_or_prefix_match(&["golden gate".to_string(), "CHARLES ellis".to_string()], &SearchScope::all())
        .unwrap();
    let exact: Vec<_> = matches.iter().filter(|m| m.exact).collect();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].entity_id, "ent-ellis");
    let prefix: Vec<_> = matches.iter().filter(|m| !m.exact).map(|m| m.entity_id.as_str()).collect();
    assert_eq!(prefix, vec!["ent-district", "ent-golden-gate"]);
}

#[test]
fn full_text_search_scores_term_overlap() {
    let (store, _) = store();
    let hits = store
        .search("collapsed wind", TextTarget::Event, &SearchScope::all(), 10)
        .unwrap();
    assert_eq!(hits[0].id, "evt-collapse");
    let failing = store.clone().with_failing_text_search();
    assert!(failing
        .search("wind", TextTarget::Section, &SearchScope::all(), 10)
        .is_err());
}

#[test]
fn relational_lookups_follow_associations() {
    let (store, _) = store();
    let links = store.associations_for_entities(&["ent-ellis".to_string()]).unwrap();
    let events: Vec<_> = links.iter().map(|l| l.event_id.as_str()).collect();
    assert_eq!(events, vec!["evt-calculations", "evt-design"]);

    let back = store.associations_for_events(&["evt-opening".to_string()]).unwrap();
    assert_eq!(back.len(), 3);

    let named = store
        .entities_by_normalized_names(&["leon moisseiff".to_string()], &SearchScope::sources(["src-gg"]))
        .unwrap();
    assert_eq!(named.len(), 1);
    assert_eq!(named[0].id, "ent-moisseiff");

    let missing = store.events_by_ids(&["nope".to_string(), "evt-design".to_string()]).unwrap();
    assert_eq!(missing.len(), 1);
}
