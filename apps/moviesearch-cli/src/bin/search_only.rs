use std::env;
use std::path::PathBuf;

use moviesearch_core::catalog::VecCatalog;
use moviesearch_core::config::{IndexSettings, QuerySettings};
use moviesearch_core::traits::MovieSearch;
use moviesearch_text::{IndexSession, MovieSearchEngine};

// Searches an existing index with stock settings; never rebuilds it.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <query> [index_dir]", args[0]);
        eprintln!("Example: {} 'star wars' ./dev_data/index", args[0]);
        std::process::exit(1);
    }
    let query_text = &args[1];
    let index_dir = args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./dev_data/index"));
    println!("moviesearch-search-only\n=======================");
    println!("Query: {}", query_text);
    println!("Index directory: {}", index_dir.display());

    let session = IndexSession::open(&index_dir, IndexSettings::default())?;
    let engine = MovieSearchEngine::new(session, VecCatalog::default(), QuerySettings::default());
    let results = engine.search(query_text)?;
    println!("\nFound {} results for: \"{}\"", results.total_hits, query_text);
    for (i, hit) in results.hits.iter().enumerate() {
        println!("\n  {}. score={:.4}  id={}  rating={}  title={}", i + 1, hit.score, hit.id, hit.rating, hit.title);
        println!("     {}", hit.snippet);
    }
    Ok(())
}
