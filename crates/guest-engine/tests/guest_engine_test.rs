//! Integration tests for the guest engine.
//!
//! These tests build the engine from a `DataIndex`, the way the service
//! does, and check the behaviour a caller relies on.

use data_loader::{Book, DataIndex, Rating, UserId};
use guest_engine::{
    EngineConfig, GuestEngine, GuestRatings, KernelKind, RecommendationSource,
};
use std::sync::Arc;
use std::thread;

fn book(isbn: &str, title: &str) -> Book {
    Book {
        isbn: isbn.to_string(),
        title: title.to_string(),
        author: "Author".to_string(),
        year: 1999,
        publisher: "Publisher".to_string(),
        image_url_small: String::new(),
        image_url_medium: String::new(),
        image_url_large: String::new(),
    }
}

fn rating(user_id: UserId, isbn: &str, score: u8) -> Rating {
    Rating {
        user_id,
        isbn: isbn.to_string(),
        score,
    }
}

fn guest(pairs: &[(&str, u8)]) -> GuestRatings {
    pairs
        .iter()
        .map(|&(isbn, score)| (isbn.to_string(), score))
        .collect()
}

/// Three readers with small, overlapping shelves
fn create_scenario_index() -> DataIndex {
    let mut index = DataIndex::new();

    for (isbn, title) in [("A", "Alpha"), ("B", "Bravo"), ("C", "Charlie")] {
        index.insert_book(book(isbn, title));
    }

    index.insert_rating(rating(1, "A", 9));
    index.insert_rating(rating(1, "B", 8));
    index.insert_rating(rating(2, "A", 8));
    index.insert_rating(rating(2, "C", 7));
    index.insert_rating(rating(3, "B", 2));
    index.insert_rating(rating(3, "C", 2));

    index
}

/// Larger library: 40 readers across 30 books in overlapping clusters
fn create_library_index() -> DataIndex {
    let mut index = DataIndex::new();

    for i in 0..30 {
        let isbn = format!("{:010}", i);
        index.insert_book(book(&isbn, &format!("Book {}", i)));
    }

    for user in 0..40u32 {
        let cluster = (user % 3) as usize;
        for offset in 0..8 {
            let item = (cluster * 10 + offset + user as usize % 4) % 30;
            let score = 1 + ((user as usize + item) % 10) as u8;
            index.insert_rating(rating(user, &format!("{:010}", item), score));
        }
    }

    index
}

#[test]
fn test_scenario_neighbor_order() {
    let engine = GuestEngine::from_index(Arc::new(create_scenario_index()), EngineConfig::default()).unwrap();

    // u2 = 8/sqrt(113) edges out u1 = 9/sqrt(145); u3 shares nothing with the guest
    let neighbors = engine.similar_users(&guest(&[("A", 10)]), 5);
    let ids: Vec<UserId> = neighbors.iter().map(|n| n.user_id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert!((neighbors[0].similarity - 8.0 / 113f32.sqrt()).abs() < 1e-5);
    assert!((neighbors[1].similarity - 9.0 / 145f32.sqrt()).abs() < 1e-5);
}

#[test]
fn test_scenario_recommendations() {
    let engine = GuestEngine::from_index(Arc::new(create_scenario_index()), EngineConfig::default()).unwrap();

    let recs = engine.recommend(&guest(&[("A", 10)]), 10);
    let titles: Vec<&str> = recs.iter().map(|r| r.book.title.as_str()).collect();

    assert_eq!(titles, vec!["Bravo", "Charlie"]);
    assert!(recs.iter().all(|r| r.source == RecommendationSource::Neighbors));
}

#[test]
fn test_unknown_items_have_no_neighbors() {
    let engine = GuestEngine::from_index(Arc::new(create_library_index()), EngineConfig::default()).unwrap();

    let ratings = guest(&[("not-a-book", 10), ("also-missing", 4)]);
    assert!(engine.find_similar_users(&ratings, 20).is_empty());
}

#[test]
fn test_cold_start_returns_most_rated() {
    let engine = GuestEngine::from_index(Arc::new(create_library_index()), EngineConfig::default()).unwrap();

    let recs = engine.recommend(&guest(&[("not-a-book", 10)]), 5);
    assert_eq!(recs.len(), 5);
    assert!(recs.iter().all(|r| r.source == RecommendationSource::Popularity));

    // Non-increasing global rating counts
    for pair in recs.windows(2) {
        assert!(pair[0].stats.count >= pair[1].stats.count);
    }
    let top = engine.store().most_rated()[0].isbn.clone();
    assert_eq!(recs[0].isbn(), top);
}

#[test]
fn test_recommendations_bounded_and_sorted() {
    let engine = GuestEngine::from_index(Arc::new(create_library_index()), EngineConfig::default()).unwrap();
    let ratings = guest(&[("0000000001", 9), ("0000000003", 7), ("0000000012", 3)]);

    for n in [1, 3, 10, 100] {
        let recs = engine.recommend(&ratings, n);
        assert!(recs.len() <= n);
        for pair in recs.windows(2) {
            assert!(pair[0].score >= pair[1].score, "scores must be non-increasing");
        }
    }
}

#[test]
fn test_guest_items_never_recommended() {
    let engine = GuestEngine::from_index(Arc::new(create_library_index()), EngineConfig::default()).unwrap();
    let ratings = guest(&[("0000000001", 9), ("0000000002", 8), ("0000000011", 2)]);

    let recs = engine.recommend(&ratings, 30);
    assert!(!recs.is_empty());
    for rec in &recs {
        assert!(!ratings.contains_key(rec.isbn()), "{} was already rated", rec.isbn());
    }

    // Same holds on the fallback branch
    let cold = guest(&[("0000000001", 0), ("nope", 5)]);
    for rec in engine.recommend(&cold, 30) {
        assert!(!cold.contains_key(rec.isbn()));
    }
}

#[test]
fn test_empty_dataset() {
    let engine = GuestEngine::from_index(Arc::new(DataIndex::new()), EngineConfig::default()).unwrap();

    assert_eq!(engine.matrix().shape(), (0, 0));
    assert!(engine.recommend(&guest(&[("A", 10)]), 10).is_empty());
    assert!(engine.find_similar_users(&guest(&[("A", 10)]), 10).is_empty());
}

#[test]
fn test_recommend_is_idempotent() {
    let engine = GuestEngine::from_index(Arc::new(create_library_index()), EngineConfig::default()).unwrap();
    let ratings = guest(&[("0000000004", 10), ("0000000015", 6), ("0000000022", 9)]);

    let first = engine.recommend(&ratings, 10);
    let second = engine.recommend(&ratings, 10);
    assert_eq!(first, second);
}

#[test]
fn test_kernels_agree() {
    let index = Arc::new(create_library_index());
    let sparse = GuestEngine::from_index(Arc::clone(&index), EngineConfig::default()).unwrap();
    let row_scan = GuestEngine::from_index(
        index,
        EngineConfig::default().with_kernel(KernelKind::RowScan),
    )
    .unwrap();

    let ratings = guest(&[("0000000005", 8), ("0000000017", 4), ("0000000029", 10)]);

    let a: Vec<String> = sparse
        .recommend(&ratings, 10)
        .into_iter()
        .map(|r| r.book.isbn)
        .collect();
    let b: Vec<String> = row_scan
        .recommend(&ratings, 10)
        .into_iter()
        .map(|r| r.book.isbn)
        .collect();
    assert_eq!(a, b);
}

#[test]
fn test_shared_engine_across_threads() {
    let engine = Arc::new(
        GuestEngine::from_index(Arc::new(create_library_index()), EngineConfig::default()).unwrap(),
    );
    let ratings = guest(&[("0000000007", 9), ("0000000008", 9), ("0000000021", 5)]);
    let expected = engine.recommend(&ratings, 10);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let ratings = ratings.clone();
            thread::spawn(move || engine.recommend(&ratings, 10))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_engine_config_from_json() {
    let config: EngineConfig =
        serde_json::from_str(r#"{ "neighbor_pool": 5, "kernel": "row_scan" }"#).unwrap();

    assert_eq!(config.neighbor_pool, 5);
    assert_eq!(config.kernel, KernelKind::RowScan);
    assert_eq!(config.count_weight, EngineConfig::default().count_weight);

    let engine = GuestEngine::from_index(Arc::new(create_library_index()), config).unwrap();
    let neighbors = engine.find_similar_users(&guest(&[("0000000002", 7)]), 5);
    assert!(neighbors.len() <= 5);
}
