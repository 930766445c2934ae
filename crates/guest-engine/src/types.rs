//! Request and result types shared by the engine components.

use data_loader::{Book, Isbn, UserId};
use serde::Serialize;
use std::collections::HashMap;

/// Ratings supplied by a guest for one request: ISBN -> score
pub type GuestRatings = HashMap<Isbn, u8>;

/// A known user selected as similar to the guest
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub user_id: UserId,
    /// Row of the user in the interaction matrix
    pub row: usize,
    pub similarity: f32,
}

/// Which branch of the engine produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Aggregated from similar users
    Neighbors,
    /// Globally most-rated books, used when no similar users exist
    Popularity,
}

/// Supporting statistics behind a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateStats {
    /// Number of endorsing ratings (neighbors, or everyone for the fallback)
    pub count: u32,
    /// Mean of those ratings
    pub mean_rating: f32,
}

/// A scored candidate before the catalog join
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub isbn: Isbn,
    pub score: f32,
    pub stats: CandidateStats,
}

/// Final recommendation returned to the request layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub book: Book,
    pub score: f32,
    pub stats: CandidateStats,
    pub source: RecommendationSource,
}

impl Recommendation {
    pub fn isbn(&self) -> &str {
        &self.book.isbn
    }

    /// The rating shown next to the book: the mean among endorsing users
    pub fn display_rating(&self) -> f32 {
        self.stats.mean_rating
    }
}
