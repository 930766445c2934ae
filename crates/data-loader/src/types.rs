//! Core domain types for the Book-Crossing dataset.
//!
//! This module defines the fundamental data structures used throughout the system:
//! - Type aliases for domain clarity (UserId, Isbn)
//! - Plain records for books, users and ratings
//! - The in-memory `DataIndex` with its lookup tables

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Type Aliases
// =============================================================================
// These make the domain clearer and prevent mixing up user IDs with ISBNs

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a book. ISBNs are opaque strings: they carry
/// leading zeros and the occasional trailing `X`.
pub type Isbn = String;

/// Highest explicit rating on the Book-Crossing scale (ratings run 1-10,
/// 0 marks an implicit interaction and is removed during cleaning)
pub const MAX_RATING: u8 = 10;

// =============================================================================
// Catalog Types
// =============================================================================

/// A book in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub isbn: Isbn,
    pub title: String,
    pub author: String,
    /// Year of publication, `0` when unknown
    pub year: u16,
    pub publisher: String,
    pub image_url_small: String,
    pub image_url_medium: String,
    pub image_url_large: String,
}

impl Book {
    /// Year of publication, or `None` when the dataset didn't know it
    pub fn known_year(&self) -> Option<u16> {
        (self.year > 0).then_some(self.year)
    }
}

/// A registered Book-Crossing member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub location: String,
    pub age: Option<u8>,
    /// Country extracted from `location`
    pub country: String,
}

// =============================================================================
// Rating Type
// =============================================================================

/// A single explicit rating from a user for a book
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub isbn: Isbn,
    /// Rating value from 1 to 10
    pub score: u8,
}

// =============================================================================
// Statistics Types
// =============================================================================

/// Precomputed statistics for a book
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookStats {
    pub avg_rating: f32,
    pub rating_count: u32,
    /// `avg_rating * ln(rating_count + 1)`
    pub popularity_score: f32,
}

/// How the popularity queries order books
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopularityCriteria {
    #[default]
    PopularityScore,
    RatingCount,
    RatingMean,
}

// =============================================================================
// DataIndex - The Core In-Memory Database
// =============================================================================

/// Main data structure that holds the cleaned dataset and its indices.
///
/// Built once at startup and read-only afterwards, so it is shared across
/// threads behind an `Arc` without locking.
#[derive(Debug, Default)]
pub struct DataIndex {
    // Primary data stores
    pub(crate) books: HashMap<Isbn, Book>,
    pub(crate) users: HashMap<UserId, User>,
    /// Cleaned ratings in file order
    pub(crate) ratings: Vec<Rating>,

    // Rating indices for fast lookups (positions into `ratings`)
    pub(crate) user_ratings: HashMap<UserId, Vec<usize>>,
    pub(crate) book_ratings: HashMap<Isbn, Vec<usize>>,

    // Precomputed statistics
    pub(crate) book_stats: HashMap<Isbn, BookStats>,
}

impl DataIndex {
    /// Creates a new, empty DataIndex
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a book by ISBN
    pub fn get_book(&self, isbn: &str) -> Option<&Book> {
        self.books.get(isbn)
    }

    /// Get a user by ID
    pub fn get_user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    /// All cleaned ratings, in load order
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// The whole catalog keyed by ISBN
    pub fn books(&self) -> &HashMap<Isbn, Book> {
        &self.books
    }

    /// Get all ratings made by a user
    ///
    /// Returns an empty Vec if the user has no ratings
    pub fn get_user_ratings(&self, user_id: UserId) -> Vec<&Rating> {
        self.user_ratings
            .get(&user_id)
            .map(|positions| positions.iter().map(|&p| &self.ratings[p]).collect())
            .unwrap_or_default()
    }

    /// Get all ratings for a book
    pub fn get_book_ratings(&self, isbn: &str) -> Vec<&Rating> {
        self.book_ratings
            .get(isbn)
            .map(|positions| positions.iter().map(|&p| &self.ratings[p]).collect())
            .unwrap_or_default()
    }

    /// Get precomputed statistics for a book
    pub fn get_book_stats(&self, isbn: &str) -> Option<&BookStats> {
        self.book_stats.get(isbn)
    }

    // Mutators, used while loading

    /// Insert a book into the catalog
    pub fn insert_book(&mut self, book: Book) {
        self.books.insert(book.isbn.clone(), book);
    }

    /// Insert a user
    pub fn insert_user(&mut self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Insert a rating and update indices
    pub fn insert_rating(&mut self, rating: Rating) {
        let position = self.ratings.len();
        self.user_ratings
            .entry(rating.user_id)
            .or_default()
            .push(position);
        self.book_ratings
            .entry(rating.isbn.clone())
            .or_default()
            .push(position);
        self.ratings.push(rating);
    }

    /// Get counts for debugging/validation: (books, users, ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.books.len(), self.users.len(), self.ratings.len())
    }
}
