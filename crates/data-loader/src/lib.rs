//! # Data Loader Crate
//!
//! This crate handles loading, cleaning and indexing the Book-Crossing dataset.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Book, User, Rating, DataIndex)
//! - **parser**: Tokenize the CSV exports into raw rows
//! - **clean**: Deduplication, blank filling and activity filtering
//! - **index**: Build the indices and per-book statistics
//! - **queries**: Popularity rankings, search and dataset summary
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{CleaningOptions, DataIndex, PopularityCriteria};
//! use std::path::Path;
//!
//! let index = DataIndex::load_from_files(Path::new("data"), &CleaningOptions::default())?;
//!
//! for ranked in index.popular_books(10, PopularityCriteria::RatingCount) {
//!     println!("{} ({} ratings)", ranked.book.title, ranked.stats.rating_count);
//! }
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod clean;
pub mod index;
pub mod queries;

// Re-export commonly used types for convenience
pub use clean::CleaningOptions;
pub use error::{DataLoadError, Result};
pub use queries::{DatasetSummary, RankedBook};
pub use types::{
    // Type aliases
    Isbn,
    UserId,
    MAX_RATING,
    // Core types
    Book,
    BookStats,
    DataIndex,
    PopularityCriteria,
    Rating,
    User,
};
