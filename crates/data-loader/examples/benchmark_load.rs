use data_loader::{CleaningOptions, DataIndex};
use std::path::Path;
use std::time::Instant;

fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let data_dir = Path::new("data");

    println!("Loading Book-Crossing dataset...\n");

    let start = Instant::now();
    let index = DataIndex::load_from_files(data_dir, &CleaningOptions::default())
        .expect("Failed to load dataset");
    let elapsed = start.elapsed();

    let (books, users, ratings) = index.counts();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Books: {}", books);
    println!("Users: {}", users);
    println!("Ratings: {}", ratings);
    println!("\nPerformance: {:.0} ratings/second",
             ratings as f64 / elapsed.as_secs_f64());
}
