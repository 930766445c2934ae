//! Read-only catalog queries: popularity rankings, search and dataset summary.

use crate::types::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// A catalog book paired with its rating statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedBook<'a> {
    pub book: &'a Book,
    pub stats: BookStats,
}

/// Dataset overview, the numbers behind the exploration page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_books: usize,
    pub total_users: usize,
    pub total_ratings: usize,
    pub avg_rating: f32,
    /// Number of ratings per score
    pub rating_distribution: BTreeMap<u8, usize>,
    pub min_year: Option<u16>,
    pub max_year: Option<u16>,
    pub most_common_year: Option<u16>,
    pub top_authors: Vec<(String, usize)>,
    pub top_publishers: Vec<(String, usize)>,
}

impl PopularityCriteria {
    fn key(self, stats: &BookStats) -> f32 {
        match self {
            PopularityCriteria::PopularityScore => stats.popularity_score,
            PopularityCriteria::RatingCount => stats.rating_count as f32,
            PopularityCriteria::RatingMean => stats.avg_rating,
        }
    }
}

impl DataIndex {
    /// Rated books from the catalog matching `predicate`, best first by `criteria`
    fn ranked_books<F>(&self, n: usize, criteria: PopularityCriteria, predicate: F) -> Vec<RankedBook<'_>>
    where
        F: Fn(&Book, &BookStats) -> bool,
    {
        let mut ranked: Vec<RankedBook<'_>> = self
            .book_stats
            .iter()
            .filter_map(|(isbn, stats)| {
                let book = self.books.get(isbn)?;
                predicate(book, stats).then_some(RankedBook { book, stats: *stats })
            })
            .collect();

        ranked.sort_by(|a, b| {
            criteria
                .key(&b.stats)
                .partial_cmp(&criteria.key(&a.stats))
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.book.isbn.cmp(&b.book.isbn))
        });
        ranked.truncate(n);
        ranked
    }

    /// Most popular books overall
    pub fn popular_books(&self, n: usize, criteria: PopularityCriteria) -> Vec<RankedBook<'_>> {
        self.ranked_books(n, criteria, |_, _| true)
    }

    /// Most popular books published in `year`
    pub fn popular_by_year(
        &self,
        year: u16,
        n: usize,
        criteria: PopularityCriteria,
    ) -> Vec<RankedBook<'_>> {
        self.ranked_books(n, criteria, |book, _| book.year == year)
    }

    /// Most popular books from publishers whose name contains `publisher`
    /// (case-insensitive)
    pub fn popular_by_publisher(
        &self,
        publisher: &str,
        n: usize,
        criteria: PopularityCriteria,
    ) -> Vec<RankedBook<'_>> {
        let needle = publisher.to_lowercase();
        self.ranked_books(n, criteria, |book, _| {
            book.publisher.to_lowercase().contains(&needle)
        })
    }

    /// Highest average rating among books with at least `min_ratings` ratings
    pub fn top_rated_books(&self, min_ratings: u32, n: usize) -> Vec<RankedBook<'_>> {
        self.ranked_books(n, PopularityCriteria::RatingMean, |_, stats| {
            stats.rating_count >= min_ratings
        })
    }

    /// Case-insensitive substring search over title, author and publisher
    ///
    /// Results are ordered by title, then ISBN.
    pub fn search_books(&self, query: &str, n: usize) -> Vec<&Book> {
        let needle = query.to_lowercase();
        let mut matches: Vec<&Book> = self
            .books
            .values()
            .filter(|book| {
                book.title.to_lowercase().contains(&needle)
                    || book.author.to_lowercase().contains(&needle)
                    || book.publisher.to_lowercase().contains(&needle)
            })
            .collect();
        matches.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.isbn.cmp(&b.isbn)));
        matches.truncate(n);
        matches
    }

    /// Summarize the cleaned dataset
    pub fn summary(&self) -> DatasetSummary {
        let mut rating_distribution = BTreeMap::new();
        let mut total: u64 = 0;
        for rating in &self.ratings {
            *rating_distribution.entry(rating.score).or_insert(0) += 1;
            total += rating.score as u64;
        }
        let avg_rating = if self.ratings.is_empty() {
            0.0
        } else {
            total as f32 / self.ratings.len() as f32
        };

        let years: Vec<u16> = self.books.values().filter_map(Book::known_year).collect();
        let mut year_counts: HashMap<u16, usize> = HashMap::new();
        for &year in &years {
            *year_counts.entry(year).or_insert(0) += 1;
        }
        let most_common_year = year_counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(year, _)| year);

        DatasetSummary {
            total_books: self.books.len(),
            total_users: self.users.len(),
            total_ratings: self.ratings.len(),
            avg_rating,
            rating_distribution,
            min_year: years.iter().copied().min(),
            max_year: years.iter().copied().max(),
            most_common_year,
            top_authors: top_counts(self.books.values().map(|b| b.author.as_str()), 10),
            top_publishers: top_counts(self.books.values().map(|b| b.publisher.as_str()), 10),
        }
    }
}

/// The `n` most frequent values, ties broken alphabetically
fn top_counts<'a>(values: impl Iterator<Item = &'a str>, n: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut counts: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(n);
    counts
}
