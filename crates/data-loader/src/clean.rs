//! Cleaning rules applied between parsing and indexing.
//!
//! - Books: deduplicate by ISBN and by (title, author), fill blanks, parse years
//! - Ratings: drop non-numeric and implicit (0) ratings, then keep only
//!   books and users with enough explicit ratings
//! - Users: sanity-check ages and extract a country from the location

use crate::parser::{RawBook, RawRating, RawUser};
use crate::types::{Book, Isbn, MAX_RATING, Rating, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Thresholds for the rating activity filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningOptions {
    /// A book needs at least this many explicit ratings to be kept
    pub min_book_ratings: usize,
    /// A user needs at least this many explicit ratings to be kept
    pub min_user_ratings: usize,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            min_book_ratings: 10,
            min_user_ratings: 10,
        }
    }
}

impl CleaningOptions {
    /// Keep every explicit rating regardless of activity
    pub fn keep_all() -> Self {
        Self {
            min_book_ratings: 0,
            min_user_ratings: 0,
        }
    }
}

/// Deduplicate and fill the book catalog.
///
/// The first occurrence wins for both the ISBN and the (title, author) key.
pub fn clean_books(raw: Vec<RawBook>) -> Vec<Book> {
    let mut seen_isbns: HashSet<Isbn> = HashSet::new();
    let mut seen_works: HashSet<(String, String)> = HashSet::new();
    let mut books = Vec::with_capacity(raw.len());

    for book in raw {
        if !seen_isbns.insert(book.isbn.clone()) {
            continue;
        }
        let title = book.title.unwrap_or_else(|| "Unknown Title".to_string());
        let author = book.author.unwrap_or_else(|| "Unknown Author".to_string());
        if !seen_works.insert((title.clone(), author.clone())) {
            continue;
        }
        books.push(Book {
            isbn: book.isbn,
            title,
            author,
            year: book.year.as_deref().map(parse_year).unwrap_or(0),
            publisher: book
                .publisher
                .unwrap_or_else(|| "Unknown Publisher".to_string()),
            image_url_small: book.image_url_small.unwrap_or_default(),
            image_url_medium: book.image_url_medium.unwrap_or_default(),
            image_url_large: book.image_url_large.unwrap_or_default(),
        });
    }

    books
}

/// Parse a publication year, coercing anything unusable to 0
fn parse_year(value: &str) -> u16 {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|year| year.is_finite() && *year >= 0.0 && *year <= u16::MAX as f32)
        .map(|year| year as u16)
        .unwrap_or(0)
}

/// Keep explicit ratings from sufficiently active books and users.
///
/// Only whole scores on the 1..=10 scale count as explicit. Non-numeric and
/// implicit (0) ratings are dropped, and so are fractional or out-of-scale
/// scores, which the store could not hold as a `u8` rating anyway.
///
/// Counts are taken over the explicit ratings before either filter is
/// applied, so the two thresholds are independent of each other.
pub fn clean_ratings(raw: Vec<RawRating>, options: &CleaningOptions) -> Vec<Rating> {
    let mut off_scale = 0usize;
    let explicit: Vec<Rating> = raw
        .into_iter()
        .filter_map(|r| {
            let score = r.rating?;
            if score == 0.0 {
                return None;
            }
            if score.fract() != 0.0 || !(1.0..=MAX_RATING as f32).contains(&score) {
                off_scale += 1;
                return None;
            }
            Some(Rating {
                user_id: r.user_id,
                isbn: r.isbn,
                score: score as u8,
            })
        })
        .collect();

    if off_scale > 0 {
        warn!("Dropped {} ratings outside the 1-{} scale", off_scale, MAX_RATING);
    }

    let mut book_counts: HashMap<&str, usize> = HashMap::new();
    let mut user_counts: HashMap<UserId, usize> = HashMap::new();
    for rating in &explicit {
        *book_counts.entry(rating.isbn.as_str()).or_insert(0) += 1;
        *user_counts.entry(rating.user_id).or_insert(0) += 1;
    }

    let keep: Vec<bool> = explicit
        .iter()
        .map(|r| {
            book_counts[r.isbn.as_str()] >= options.min_book_ratings
                && user_counts[&r.user_id] >= options.min_user_ratings
        })
        .collect();

    explicit
        .into_iter()
        .zip(keep)
        .filter_map(|(rating, keep)| keep.then_some(rating))
        .collect()
}

/// Drop users with implausible ages and derive their country
pub fn clean_users(raw: Vec<RawUser>) -> Vec<User> {
    raw.into_iter()
        .filter_map(|user| {
            let age = user
                .age
                .as_deref()
                .and_then(|a| a.trim().parse::<f32>().ok())
                .filter(|a| a.is_finite());
            let age = match age {
                None => None,
                Some(a) if (5.0..=100.0).contains(&a) => Some(a as u8),
                Some(_) => return None,
            };
            let location = user.location.unwrap_or_default();
            Some(User {
                id: user.id,
                country: extract_country(&location),
                location,
                age,
            })
        })
        .collect()
}

/// Country from a "city, state, country" location string
///
/// Uses the third part when present, else the second, else the first.
pub fn extract_country(location: &str) -> String {
    if location.trim().is_empty() {
        return "Unknown".to_string();
    }
    let parts: Vec<&str> = location.split(',').collect();
    let country = match parts.len() {
        n if n >= 3 => parts[2],
        2 => parts[1],
        _ => parts[0],
    };
    country.trim().to_string()
}
