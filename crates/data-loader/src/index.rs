//! DataIndex building and indexing logic.
//!
//! This module builds the DataIndex from the parsed files:
//! - Parse the three CSV files in parallel
//! - Apply the cleaning rules
//! - Create primary indices (books, users, ratings)
//! - Compute aggregate statistics (book stats)

use crate::clean::{self, CleaningOptions};
use crate::error::Result;
use crate::parser;
use crate::types::*;
use rayon::prelude::*;
use std::path::Path;
use tracing::info;

impl DataIndex {
    /// Load and clean the Book-Crossing dataset from a directory
    ///
    /// Expects `Books.csv`, `Ratings.csv` and `Users.csv` in `data_dir`.
    ///
    /// Steps:
    /// 1. Parse all three files (books, ratings, users) in parallel
    /// 2. Clean each table
    /// 3. Build primary indices
    /// 4. Compute book statistics
    pub fn load_from_files(data_dir: &Path, options: &CleaningOptions) -> Result<Self> {
        info!("Loading Book-Crossing dataset from {:?}", data_dir);

        let books_path = data_dir.join("Books.csv");
        let ratings_path = data_dir.join("Ratings.csv");
        let users_path = data_dir.join("Users.csv");

        // Rayon's `join` runs two closures in parallel; nesting gives three-way parallelism
        let ((books, users), ratings) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_books(&books_path),
                    || parser::parse_users(&users_path),
                )
            },
            || parser::parse_ratings(&ratings_path),
        );

        let (books, _) = books?;
        let (users, _) = users?;
        let (ratings, _) = ratings?;

        info!(
            "Parsed {} books, {} ratings, {} users",
            books.len(),
            ratings.len(),
            users.len()
        );

        let books = clean::clean_books(books);
        let ratings = clean::clean_ratings(ratings, options);
        let users = clean::clean_users(users);

        info!(
            "Cleaned to {} books, {} ratings, {} users",
            books.len(),
            ratings.len(),
            users.len()
        );

        Ok(Self::from_parts(books, users, ratings))
    }

    /// Build an index from already-cleaned tables
    pub fn from_parts(books: Vec<Book>, users: Vec<User>, ratings: Vec<Rating>) -> Self {
        let mut index = DataIndex::new();

        for book in books {
            index.insert_book(book);
        }
        for user in users {
            index.insert_user(user);
        }
        // This also populates user_ratings and book_ratings
        for rating in ratings {
            index.insert_rating(rating);
        }

        index.compute_book_stats();
        index
    }

    /// Compute aggregate statistics for every rated book in parallel
    ///
    /// For each book: average rating, rating count and popularity score.
    pub fn compute_book_stats(&mut self) {
        let ratings = &self.ratings;
        self.book_stats = self
            .book_ratings
            .par_iter()
            .map(|(isbn, positions)| {
                let rating_count = positions.len() as u32;
                let avg_rating = if rating_count > 0 {
                    let total: f32 = positions.iter().map(|&p| ratings[p].score as f32).sum();
                    total / rating_count as f32
                } else {
                    0.0
                };

                (
                    isbn.clone(),
                    BookStats {
                        avg_rating,
                        rating_count,
                        popularity_score: compute_popularity_score(avg_rating, rating_count),
                    },
                )
            })
            .collect();
    }
}

/// Popularity score: `avg_rating * ln(rating_count + 1)`
///
/// Rewards both high ratings and many ratings.
pub(crate) fn compute_popularity_score(avg_rating: f32, rating_count: u32) -> f32 {
    avg_rating * (rating_count as f32 + 1.0).ln()
}
