//! # Guest Recommendation Engine
//!
//! Ties the components together behind one scoring entry point:
//! 1. Rating Store and Interaction Matrix are built once in [`GuestEngine::from_index`]
//! 2. Each request runs Similarity Search against the matrix
//! 3. The Neighbor Aggregator ranks what the neighbors rated
//! 4. Candidates are joined with the catalog and truncated to `n`
//!
//! The engine is immutable after construction. Wrap it in an `Arc` and call
//! it from as many threads as needed. It shares the `DataIndex` it was built
//! from instead of copying the catalog or the rating table.

use crate::aggregator::NeighborAggregator;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::matrix::InteractionMatrix;
use crate::similarity::{SimilaritySearch, kernel_for};
use crate::store::RatingStore;
use crate::types::{GuestRatings, Neighbor, Recommendation, RecommendationSource, ScoredCandidate};
use data_loader::{Book, DataIndex, Rating, UserId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

pub struct GuestEngine {
    config: EngineConfig,
    store: RatingStore,
    matrix: InteractionMatrix,
    search: SimilaritySearch,
    aggregator: NeighborAggregator,
}

impl GuestEngine {
    /// Build the engine from an owned rating table and book catalog
    ///
    /// Fails only when `config` is invalid.
    pub fn build(
        ratings: impl IntoIterator<Item = Rating>,
        books: impl IntoIterator<Item = Book>,
        config: EngineConfig,
    ) -> Result<Self> {
        let index = DataIndex::from_parts(
            books.into_iter().collect(),
            Vec::new(),
            ratings.into_iter().collect(),
        );
        Self::from_index(Arc::new(index), config)
    }

    /// Build the engine over a shared `DataIndex`
    ///
    /// Ratings and books are read in place; only the indexes and the matrix
    /// are allocated. Fails only when `config` is invalid.
    pub fn from_index(index: Arc<DataIndex>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let start = Instant::now();

        let store = RatingStore::from_index(index);
        let matrix = InteractionMatrix::build(&store);

        let search = SimilaritySearch::new(kernel_for(config.kernel), config.min_similarity);
        let aggregator = NeighborAggregator::new(&config);

        let (users, items) = matrix.shape();
        info!(
            "Guest engine ready: {} users x {} items, {} ratings, {} catalog books, kernel {} ({:.2?})",
            users,
            items,
            matrix.nnz(),
            store.table().books().len(),
            search.kernel_name(),
            start.elapsed()
        );

        Ok(Self {
            config,
            store,
            matrix,
            search,
            aggregator,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    /// The index the engine reads books and ratings from
    pub fn data_index(&self) -> &Arc<DataIndex> {
        self.store.table()
    }

    pub fn get_book(&self, isbn: &str) -> Option<&Book> {
        self.data_index().get_book(isbn)
    }

    /// Known users most similar to the guest, with their similarity
    pub fn similar_users(&self, guest_ratings: &GuestRatings, k: usize) -> Vec<Neighbor> {
        self.search.find_neighbors(guest_ratings, &self.matrix, k)
    }

    /// IDs of the at most `k` users most similar to the guest, best first
    pub fn find_similar_users(&self, guest_ratings: &GuestRatings, k: usize) -> Vec<UserId> {
        self.similar_users(guest_ratings, k)
            .into_iter()
            .map(|neighbor| neighbor.user_id)
            .collect()
    }

    /// Recommend at most `n` books the guest hasn't rated, best first
    ///
    /// Falls back to the globally most-rated books when no similar user
    /// exists. Never fails; `n == 0` gives an empty list.
    #[instrument(skip(self, guest_ratings), fields(guest_items = guest_ratings.len()))]
    pub fn recommend(&self, guest_ratings: &GuestRatings, n: usize) -> Vec<Recommendation> {
        if n == 0 {
            return Vec::new();
        }
        let start = Instant::now();

        let neighbors = self.similar_users(guest_ratings, self.config.neighbor_pool);
        let recommendations = if neighbors.is_empty() {
            debug!("No similar users found, returning popular books");
            self.attach_books(
                self.aggregator.popular_fallback(&self.store, guest_ratings),
                RecommendationSource::Popularity,
                n,
            )
        } else {
            let candidates = self.aggregator.aggregate(&self.store, &neighbors, guest_ratings);
            self.attach_books(candidates, RecommendationSource::Neighbors, n)
        };

        debug!(
            "Recommended {} books from {} neighbors in {:.2?}",
            recommendations.len(),
            neighbors.len(),
            start.elapsed()
        );
        recommendations
    }

    /// Join candidates with the catalog, skipping books it doesn't describe
    fn attach_books(
        &self,
        candidates: impl IntoIterator<Item = ScoredCandidate>,
        source: RecommendationSource,
        n: usize,
    ) -> Vec<Recommendation> {
        candidates
            .into_iter()
            .filter_map(|candidate| {
                let book = self.get_book(&candidate.isbn)?;
                Some(Recommendation {
                    book: book.clone(),
                    score: candidate.score,
                    stats: candidate.stats,
                    source,
                })
            })
            .take(n)
            .collect()
    }
}
