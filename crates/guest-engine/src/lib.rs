//! Collaborative filtering for guests who are not in the dataset.
//!
//! This crate provides:
//! - RatingStore, the immutable rating table indexed by user and item
//! - InteractionMatrix, the sparse user×item matrix built from it
//! - SimilarityKernel and SimilaritySearch for cosine neighbor lookup
//! - NeighborAggregator for scoring what the neighbors rated
//! - GuestEngine tying it all together
//!
//! ## Architecture
//! A request goes through three stages:
//! 1. The guest's ratings are projected onto the matrix columns
//! 2. The k most similar known users are selected
//! 3. Their ratings are aggregated into ranked, unseen books
//!
//! When no known user overlaps with the guest, the globally most-rated
//! books are returned instead.
//!
//! ## Example Usage
//! ```ignore
//! use guest_engine::{EngineConfig, GuestEngine, GuestRatings};
//!
//! let engine = GuestEngine::from_index(Arc::new(index), EngineConfig::default())?;
//!
//! let mut guest = GuestRatings::new();
//! guest.insert("0439136350".to_string(), 10);
//! guest.insert("0316666343".to_string(), 7);
//!
//! for rec in engine.recommend(&guest, 10) {
//!     println!("{} ({:.3})", rec.book.title, rec.score);
//! }
//! ```

pub mod error;
pub mod config;
pub mod types;
pub mod store;
pub mod matrix;
pub mod similarity;
pub mod aggregator;
pub mod engine;

// Re-export main types
pub use aggregator::NeighborAggregator;
pub use config::{DEFAULT_RECOMMENDATIONS, EngineConfig, KernelKind};
pub use engine::GuestEngine;
pub use error::{EngineError, Result};
pub use matrix::InteractionMatrix;
pub use similarity::{RowScanCosine, SimilarityKernel, SimilaritySearch, SparseCosine};
pub use store::{ItemPopularity, RatingStore};
pub use types::{
    CandidateStats, GuestRatings, Neighbor, Recommendation, RecommendationSource, ScoredCandidate,
};
