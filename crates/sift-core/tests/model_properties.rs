//! Property tests for similarity and name normalization.

use proptest::prelude::*;

use sift_core::models::normalize_name;
use sift_core::similarity::cosine_similarity;

proptest! {
    #[test]
    fn cosine_is_bounded_and_symmetric(
        pairs in prop::collection::vec((-10.0f32..10.0, -10.0f32..10.0), 1..32)
    ) {
        let a: Vec<f32> = pairs.iter().map(|p| p.0).collect();
        let b: Vec<f32> = pairs.iter().map(|p| p.1).collect();
        let ab = cosine_similarity(&a, &b);
        let ba = cosine_similarity(&b, &a);
        prop_assert!((-1.0..=1.0).contains(&ab));
        prop_assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn normalize_is_idempotent(name in "[A-Za-z ]{0,40}") {
        let once = normalize_name(&name);
        prop_assert_eq!(normalize_name(&once), once.clone());
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
    }
}
