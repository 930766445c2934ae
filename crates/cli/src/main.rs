use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use data_loader::{Isbn, PopularityCriteria};
use guest_engine::GuestRatings;
use rand::Rng;
use rand::seq::IndexedRandom;
use service::{BookResponse, GuestRequest, RecommendationService, ServiceConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::info;

/// BookBud - Book Recommendation Engine
#[derive(Parser)]
#[command(name = "bookbud")]
#[command(about = "Book recommendations for guests using collaborative filtering", long_about = None)]
struct Cli {
    /// Directory holding Books.csv, Ratings.csv and Users.csv
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// JSON file with service and engine settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend books from a guest's own ratings
    Guest {
        /// A rating as ISBN=SCORE, repeat for every book
        #[arg(long = "rate", value_parser = parse_rating, required = true)]
        ratings: Vec<(Isbn, u8)>,

        /// Number of recommendations to return
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Print the recommendations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the most popular books
    Popular {
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Ranking criteria
        #[arg(long, value_enum, default_value = "popularity-score")]
        criteria: Criteria,

        /// Only books published in this year
        #[arg(long)]
        year: Option<u16>,

        /// Only books from publishers matching this name
        #[arg(long, conflicts_with = "year")]
        publisher: Option<String>,
    },

    /// Show the best rated books
    TopRated {
        /// Ignore books with fewer ratings than this
        #[arg(long, default_value = "10")]
        min_ratings: u32,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Search books by title, author or publisher
    Search {
        /// Case-insensitive substring to look for
        #[arg(long)]
        query: String,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show dataset statistics
    Stats,

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,

        /// Ratings in each synthetic guest session
        #[arg(long, default_value = "5")]
        ratings_per_guest: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Criteria {
    PopularityScore,
    RatingCount,
    RatingMean,
}

impl From<Criteria> for PopularityCriteria {
    fn from(criteria: Criteria) -> Self {
        match criteria {
            Criteria::PopularityScore => PopularityCriteria::PopularityScore,
            Criteria::RatingCount => PopularityCriteria::RatingCount,
            Criteria::RatingMean => PopularityCriteria::RatingMean,
        }
    }
}

/// Parse `ISBN=SCORE`
fn parse_rating(raw: &str) -> std::result::Result<(Isbn, u8), String> {
    let (isbn, score) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ISBN=SCORE, got '{}'", raw))?;
    let isbn = isbn.trim();
    if isbn.is_empty() {
        return Err(format!("missing ISBN in '{}'", raw));
    }
    let score: u8 = score
        .trim()
        .parse()
        .map_err(|_| format!("score in '{}' is not a whole number", raw))?;
    Ok((isbn.to_string(), score))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    };

    // Load data and build the engine (this may take a moment)
    println!("Loading Book-Crossing dataset from {}...", cli.data_dir.display());
    let start = Instant::now();
    let service = RecommendationService::load(&cli.data_dir, config)
        .await
        .context("Failed to load Book-Crossing dataset")?;
    println!("{} Loaded dataset in {:?}", "✓".green(), start.elapsed());

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Guest {
            ratings,
            limit,
            json,
        } => handle_guest(&service, ratings, limit, json).await?,
        Commands::Popular {
            limit,
            criteria,
            year,
            publisher,
        } => handle_popular(&service, limit, criteria.into(), year, publisher),
        Commands::TopRated { min_ratings, limit } => handle_top_rated(&service, min_ratings, limit),
        Commands::Search { query, limit } => handle_search(&service, &query, limit)?,
        Commands::Stats => handle_stats(&service),
        Commands::Benchmark {
            requests,
            concurrent,
            ratings_per_guest,
        } => handle_benchmark(service, requests, concurrent, ratings_per_guest).await?,
    }

    Ok(())
}

/// Handle the 'guest' command
async fn handle_guest(
    service: &RecommendationService,
    ratings: Vec<(Isbn, u8)>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let mut guest = GuestRatings::new();
    for (isbn, score) in ratings {
        if guest.insert(isbn.clone(), score).is_some() {
            bail!("Book {} was rated more than once", isbn);
        }
    }

    for (isbn, score) in &guest {
        match service.engine().get_book(isbn) {
            Some(book) => info!("Guest rated '{}' {}/10", book.title, score),
            None => info!("Guest rated unknown ISBN {} {}/10", isbn, score),
        }
    }

    let books = service
        .recommend_for_guest(GuestRequest::new(guest, limit))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
    } else {
        print_books("Recommended for you:", &books);
    }
    Ok(())
}

/// Handle the 'popular' command
fn handle_popular(
    service: &RecommendationService,
    limit: usize,
    criteria: PopularityCriteria,
    year: Option<u16>,
    publisher: Option<String>,
) {
    let (title, books) = match (year, publisher) {
        (Some(year), _) => (
            format!("Popular books from {}:", year),
            service.popular_by_year(year, limit, criteria),
        ),
        (None, Some(publisher)) => (
            format!("Popular books from publishers matching '{}':", publisher),
            service.popular_by_publisher(&publisher, limit, criteria),
        ),
        (None, None) => (
            "Popular books:".to_string(),
            service.popular_books(limit, criteria),
        ),
    };
    print_books(&title, &books);
}

/// Handle the 'top-rated' command
fn handle_top_rated(service: &RecommendationService, min_ratings: u32, limit: usize) {
    let books = service.top_rated(min_ratings, limit);
    print_books(
        &format!("Top rated books (at least {} ratings):", min_ratings),
        &books,
    );
}

/// Handle the 'search' command
fn handle_search(service: &RecommendationService, query: &str, limit: usize) -> Result<()> {
    let books = service.search(query, limit)?;
    if books.is_empty() {
        println!("No books match '{}'", query);
        return Ok(());
    }
    print_books(&format!("Search results for '{}':", query), &books);
    Ok(())
}

/// Handle the 'stats' command
fn handle_stats(service: &RecommendationService) {
    let summary = service.summary();
    let status = service.status();

    println!("{}", "Dataset statistics:".bold().blue());
    println!("{}Books: {}", "• ".green(), summary.total_books);
    println!("{}Users: {}", "• ".green(), summary.total_users);
    println!("{}Ratings: {}", "• ".green(), summary.total_ratings);
    println!("{}Average rating: {:.2}", "• ".green(), summary.avg_rating);
    println!(
        "{}Interaction matrix: {} users x {} books ({} kernel)",
        "• ".cyan(),
        status.matrix_users,
        status.matrix_items,
        status.kernel
    );

    let years = |year: Option<u16>| year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string());
    println!(
        "{}Publication years: {} to {}, most common {}",
        "• ".cyan(),
        years(summary.min_year),
        years(summary.max_year),
        years(summary.most_common_year)
    );

    println!("Rating distribution:");
    for (score, count) in &summary.rating_distribution {
        println!("  {:>2}: {}", score, count);
    }
    println!("Top authors:");
    for (author, count) in &summary.top_authors {
        println!("  - {} ({} books)", author, count);
    }
    println!("Top publishers:");
    for (publisher, count) in &summary.top_publishers {
        println!("  - {} ({} books)", publisher, count);
    }
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    service: RecommendationService,
    requests: usize,
    concurrent: usize,
    ratings_per_guest: usize,
) -> Result<()> {
    if requests == 0 || concurrent == 0 {
        bail!("Benchmark needs at least one request and one concurrent slot");
    }
    if ratings_per_guest < service.config().min_guest_ratings {
        bail!(
            "Guests must rate at least {} books",
            service.config().min_guest_ratings
        );
    }

    // Guests rate books drawn from the 500 most-rated so most sessions
    // overlap with real users
    let pool: Vec<Isbn> = service
        .engine()
        .store()
        .most_rated()
        .iter()
        .take(500)
        .map(|p| p.isbn.clone())
        .collect();
    if pool.len() < ratings_per_guest {
        bail!("Only {} rated books available for synthetic guests", pool.len());
    }

    let mut rng = rand::rng();
    let guests: Vec<GuestRatings> = (0..requests)
        .map(|_| {
            let picked: Vec<Isbn> = pool
                .choose_multiple(&mut rng, ratings_per_guest)
                .cloned()
                .collect();
            picked
                .into_iter()
                .map(|isbn| (isbn, rng.random_range(1..=10u8)))
                .collect()
        })
        .collect();

    let limit = service.config().default_limit;
    let permits = Arc::new(Semaphore::new(concurrent));
    let started = Instant::now();

    // Use tokio::spawn to make concurrent requests
    let mut handles = Vec::with_capacity(requests);
    for guest in guests {
        let service = service.clone();
        let permits = Arc::clone(&permits);
        handles.push(tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let start = Instant::now();
            service
                .recommend_for_guest(GuestRequest::new(guest, limit))
                .await?;
            Ok::<_, anyhow::Error>(start.elapsed())
        }));
    }

    // Wait for all tasks to complete and collect timings
    let mut timings: Vec<Duration> = Vec::with_capacity(requests);
    for handle in handles {
        timings.push(handle.await??);
    }
    let wall_time = started.elapsed();

    timings.sort();
    let total: Duration = timings.iter().sum();
    let avg_latency = total / timings.len() as u32;
    let percentile = |p: f64| {
        let rank = ((timings.len() as f64 * p).ceil() as usize).clamp(1, timings.len());
        timings[rank - 1]
    };
    let throughput = requests as f64 / wall_time.as_secs_f64();

    println!("{}", "Benchmark results:".bold().blue());
    println!("Requests: {} ({} concurrent)", requests, concurrent);
    println!("Total time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!("Throughput: {:.2} requests/second", throughput);

    Ok(())
}

/// Helper function to format and print a list of books
fn print_books(title: &str, books: &[BookResponse]) {
    println!("{}", title.bold().blue());
    if books.is_empty() {
        println!("  (nothing to show)");
        return;
    }
    for (rank, book) in books.iter().enumerate() {
        let year = book
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "????".to_string());
        let rating = book
            .rating
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}. {} ({}) by {} - Rating: {}",
            (rank + 1).to_string().green(),
            book.title,
            year,
            book.author,
            rating
        );
        println!("   ISBN {} | {}", book.isbn, book.publisher);
    }
}
