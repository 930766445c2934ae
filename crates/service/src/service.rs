//! # Recommendation Service
//!
//! Coordinates a guest request end to end:
//! 1. Validate the request against the service contract
//! 2. Run the engine on the blocking pool (CPU-bound)
//! 3. Abandon the request if it outlives the configured timeout
//! 4. Convert the results into response records
//!
//! The catalog queries (popular, top rated, search, summary) run inline
//! since they are cheap lookups on the shared `DataIndex`.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use serde::Serialize;
use tracing::{info, instrument, warn};

use data_loader::{DataIndex, DatasetSummary, PopularityCriteria};
use guest_engine::GuestEngine;

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::request::{BookResponse, GuestRequest};

/// Readiness and size of the loaded data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub status: &'static str,
    pub books: usize,
    pub users: usize,
    pub ratings: usize,
    pub matrix_users: usize,
    pub matrix_items: usize,
    pub kernel: String,
}

#[derive(Clone)]
pub struct RecommendationService {
    data_index: Arc<DataIndex>,
    engine: Arc<GuestEngine>,
    config: ServiceConfig,
}

impl RecommendationService {
    /// Build the service over an already loaded index
    pub fn new(data_index: Arc<DataIndex>, config: ServiceConfig) -> Result<Self> {
        let engine = GuestEngine::from_index(Arc::clone(&data_index), config.engine.clone())?;
        Ok(Self {
            data_index,
            engine: Arc::new(engine),
            config,
        })
    }

    /// Load and clean the dataset from `data_dir`, then build the service
    pub async fn load(data_dir: &Path, config: ServiceConfig) -> anyhow::Result<Self> {
        let start = Instant::now();
        let dir = data_dir.to_path_buf();
        let cleaning = config.cleaning;

        let data_index = tokio::task::spawn_blocking(move || {
            DataIndex::load_from_files(&dir, &cleaning)
        })
        .await
        .context("Data loading task panicked")?
        .with_context(|| format!("Failed to load dataset from {}", data_dir.display()))?;

        let service = tokio::task::spawn_blocking(move || Self::new(Arc::new(data_index), config))
            .await
            .context("Engine build task panicked")?
            .context("Failed to build guest engine")?;

        info!("Service ready in {:.2?}", start.elapsed());
        Ok(service)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn data_index(&self) -> &Arc<DataIndex> {
        &self.data_index
    }

    pub fn engine(&self) -> &Arc<GuestEngine> {
        &self.engine
    }

    /// Main entry point: recommendations for a guest's ad-hoc ratings
    #[instrument(skip(self, request), fields(ratings = request.ratings.len(), limit = request.limit))]
    pub async fn recommend_for_guest(&self, request: GuestRequest) -> Result<Vec<BookResponse>> {
        let start_time = Instant::now();
        request.validate(&self.config)?;

        let engine = Arc::clone(&self.engine);
        let task = tokio::task::spawn_blocking(move || {
            engine.recommend(&request.ratings, request.limit)
        });

        let recommendations = match self.config.request_timeout() {
            Some(budget) => match tokio::time::timeout(budget, task).await {
                Ok(joined) => joined?,
                Err(_) => {
                    warn!("Guest request abandoned after {:?}", budget);
                    return Err(ServiceError::Timeout(budget));
                }
            },
            None => task.await?,
        };

        info!(
            "Returned {} recommendations in {:.2?}",
            recommendations.len(),
            start_time.elapsed()
        );
        Ok(recommendations.iter().map(BookResponse::from).collect())
    }

    /// Most popular books overall
    pub fn popular_books(&self, limit: usize, criteria: PopularityCriteria) -> Vec<BookResponse> {
        self.data_index
            .popular_books(limit, criteria)
            .into_iter()
            .map(BookResponse::from)
            .collect()
    }

    /// Most popular books of one publication year
    pub fn popular_by_year(
        &self,
        year: u16,
        limit: usize,
        criteria: PopularityCriteria,
    ) -> Vec<BookResponse> {
        self.data_index
            .popular_by_year(year, limit, criteria)
            .into_iter()
            .map(BookResponse::from)
            .collect()
    }

    /// Most popular books of publishers matching `publisher`
    pub fn popular_by_publisher(
        &self,
        publisher: &str,
        limit: usize,
        criteria: PopularityCriteria,
    ) -> Vec<BookResponse> {
        self.data_index
            .popular_by_publisher(publisher, limit, criteria)
            .into_iter()
            .map(BookResponse::from)
            .collect()
    }

    /// Best average rating among books with at least `min_ratings` ratings
    pub fn top_rated(&self, min_ratings: u32, limit: usize) -> Vec<BookResponse> {
        self.data_index
            .top_rated_books(min_ratings, limit)
            .into_iter()
            .map(BookResponse::from)
            .collect()
    }

    /// Catalog search over title, author and publisher
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<BookResponse>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "Search query must not be empty".to_string(),
            ));
        }

        Ok(self
            .data_index
            .search_books(query, limit)
            .into_iter()
            .map(|book| {
                let rating = self
                    .data_index
                    .get_book_stats(&book.isbn)
                    .map(|stats| stats.avg_rating);
                BookResponse::from_book(book, rating)
            })
            .collect())
    }

    pub fn summary(&self) -> DatasetSummary {
        self.data_index.summary()
    }

    pub fn status(&self) -> ServiceStatus {
        let (books, users, ratings) = self.data_index.counts();
        let (matrix_users, matrix_items) = self.engine.matrix().shape();
        ServiceStatus {
            status: "ready",
            books,
            users,
            ratings,
            matrix_users,
            matrix_items,
            kernel: format!("{:?}", self.engine.config().kernel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Book, Rating, UserId};
    use guest_engine::GuestRatings;
    use std::time::Duration;

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    fn book(isbn: &str, title: &str, year: u16) -> Book {
        Book {
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: "Author".to_string(),
            year,
            publisher: "Penguin".to_string(),
            image_url_small: String::new(),
            image_url_medium: String::new(),
            image_url_large: format!("http://images.example/{}.L.jpg", isbn),
        }
    }

    fn rating(user_id: UserId, isbn: &str, score: u8) -> Rating {
        Rating {
            user_id,
            isbn: isbn.to_string(),
            score,
        }
    }

    /// Two readers who agree on the classics, one who reads mysteries
    fn build_test_data_index() -> Arc<DataIndex> {
        let mut data_index = DataIndex::new();

        data_index.insert_book(book("1", "Emma", 1815));
        data_index.insert_book(book("2", "Persuasion", 1817));
        data_index.insert_book(book("3", "Middlemarch", 1871));
        data_index.insert_book(book("4", "Dracula", 1897));
        data_index.insert_book(book("5", "The Moonstone", 0));
        data_index.insert_book(book("6", "Rebecca", 1938));

        for (user, isbn, score) in [
            (1, "1", 9),
            (1, "2", 8),
            (1, "3", 9),
            (1, "4", 7),
            (2, "1", 8),
            (2, "2", 9),
            (2, "3", 8),
            (2, "6", 6),
            (3, "5", 9),
            (3, "6", 8),
        ] {
            data_index.insert_rating(rating(user, isbn, score));
        }
        data_index.compute_book_stats();

        Arc::new(data_index)
    }

    fn build_test_service(config: ServiceConfig) -> RecommendationService {
        RecommendationService::new(build_test_data_index(), config)
            .expect("Failed to create service")
    }

    fn guest(pairs: &[(&str, u8)]) -> GuestRatings {
        pairs
            .iter()
            .map(|&(isbn, score)| (isbn.to_string(), score))
            .collect()
    }

    // ============================================================================
    // Guest Recommendations
    // ============================================================================

    #[tokio::test]
    async fn test_recommend_for_guest() {
        let service = build_test_service(ServiceConfig::default());

        let request = GuestRequest::new(guest(&[("1", 10), ("2", 9), ("3", 9)]), 10);
        let books = service.recommend_for_guest(request).await.unwrap();

        let isbns: Vec<&str> = books.iter().map(|b| b.isbn.as_str()).collect();
        // Dracula and Rebecca each have one neighbor endorsement; Dracula rates higher
        assert_eq!(isbns, vec!["4", "6"]);
        assert_eq!(books[0].rating, Some(7.0));
        assert_eq!(books[0].image_url, "http://images.example/4.L.jpg");
    }

    #[tokio::test]
    async fn test_rejects_invalid_request() {
        let service = build_test_service(ServiceConfig::default());

        let too_few = GuestRequest::new(guest(&[("1", 10)]), 10);
        assert!(matches!(
            service.recommend_for_guest(too_few).await,
            Err(ServiceError::InvalidRequest(_))
        ));

        let bad_limit = GuestRequest::new(guest(&[("1", 10), ("2", 9), ("3", 9)]), 0);
        assert!(matches!(
            service.recommend_for_guest(bad_limit).await,
            Err(ServiceError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_guest_gets_popular_books() {
        let service = build_test_service(ServiceConfig::default());

        let request = GuestRequest::new(guest(&[("x", 5), ("y", 6), ("z", 7)]), 3);
        let books = service.recommend_for_guest(request).await.unwrap();

        // Books 1, 2, 3, 6 have two ratings each, lowest ISBNs first
        let isbns: Vec<&str> = books.iter().map(|b| b.isbn.as_str()).collect();
        assert_eq!(isbns, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_generous_timeout_succeeds() {
        let config = ServiceConfig::default().with_timeout(Duration::from_secs(30));
        let service = build_test_service(config);

        let request = GuestRequest::new(guest(&[("1", 10), ("2", 9), ("3", 9)]), 5);
        assert!(service.recommend_for_guest(request).await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_guests() {
        let service = build_test_service(ServiceConfig::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    let request = GuestRequest::new(guest(&[("1", 10), ("2", 9), ("3", 9)]), 5);
                    service.recommend_for_guest(request).await
                })
            })
            .collect();

        for handle in handles {
            let books = handle.await.unwrap().unwrap();
            assert_eq!(books.len(), 2);
        }
    }

    // ============================================================================
    // Catalog Queries
    // ============================================================================

    #[test]
    fn test_popular_and_top_rated() {
        let service = build_test_service(ServiceConfig::default());

        let popular = service.popular_books(2, PopularityCriteria::RatingCount);
        assert_eq!(popular.len(), 2);
        assert!(popular.iter().all(|b| b.rating.is_some()));

        let top = service.top_rated(2, 1);
        // Emma, Persuasion and Middlemarch tie at 8.5, lowest ISBN first
        assert_eq!(top[0].isbn, "1");
        assert_eq!(top[0].rating, Some(8.5));
    }

    #[test]
    fn test_popular_by_year_and_publisher() {
        let service = build_test_service(ServiceConfig::default());

        let by_year = service.popular_by_year(1897, 5, PopularityCriteria::PopularityScore);
        assert_eq!(by_year.len(), 1);
        assert_eq!(by_year[0].title, "Dracula");

        let by_publisher = service.popular_by_publisher("penguin", 10, PopularityCriteria::RatingMean);
        assert_eq!(by_publisher.len(), 6);
    }

    #[test]
    fn test_search() {
        let service = build_test_service(ServiceConfig::default());

        let results = service.search("moon", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "The Moonstone");
        assert_eq!(results[0].year, None);
        assert_eq!(results[0].rating, Some(9.0));

        assert!(service.search("   ", 10).is_err());
    }

    #[test]
    fn test_status() {
        let service = build_test_service(ServiceConfig::default());
        let status = service.status();

        assert_eq!(status.status, "ready");
        assert_eq!(status.books, 6);
        assert_eq!(status.ratings, 10);
        assert_eq!((status.matrix_users, status.matrix_items), (3, 6));
        assert_eq!(service.summary().total_ratings, 10);
    }
}
