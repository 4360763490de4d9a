use std::env;
use std::path::{Path, PathBuf};

use moviesearch_core::catalog::VecCatalog;
use moviesearch_core::config::{IndexSettings, QuerySettings};
use moviesearch_core::traits::MovieSearch;
use moviesearch_text::{IndexSession, MovieSearchEngine};

// Query an existing movie index and print results.
// Usage:
//   cargo run -p moviesearch-text --example search -- "your query" \
//     [--index ../dev_data/indexes/movies] [--limit 10]

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: cargo run -p moviesearch-text --example search -- <query> [--index DIR] [--limit N]");
        std::process::exit(1);
    }
    let mut query = String::new();
    let mut index_dir: Option<PathBuf> = None;
    let mut limit: usize = 10;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--index" => {
                if i + 1 >= args.len() { eprintln!("--index requires a path"); std::process::exit(2); }
                index_dir = Some(PathBuf::from(&args[i + 1]));
                i += 2; continue;
            }
            "--limit" => {
                if i + 1 >= args.len() { eprintln!("--limit requires a number"); std::process::exit(2); }
                limit = args[i + 1].parse().unwrap_or(limit);
                i += 2; continue;
            }
            s if s.starts_with("--") => {
                eprintln!("Unknown flag: {}", s); std::process::exit(2);
            }
            s => {
                if query.is_empty() { query = s.to_string(); }
                i += 1; continue;
            }
        }
    }

    if query.is_empty() {
        eprintln!("Missing <query> argument");
        std::process::exit(1);
    }

    // flag > MOVIE_INDEX_DIR > workspace-relative fallback
    let index_dir = if let Some(dir) = index_dir {
        dir
    } else if let Ok(env_path) = env::var("MOVIE_INDEX_DIR") {
        PathBuf::from(env_path)
    } else {
        let base = Path::new(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap_or(Path::new("."));
        base.join("dev_data/indexes/movies")
    };

    println!("Movie search\n============");
    println!("Index: {}", index_dir.display());
    println!("Query: {} (limit {})\n", query, limit);

    let settings = IndexSettings { page_size: limit, ..IndexSettings::default() };
    let session = IndexSession::open(&index_dir, settings)?;
    let engine = MovieSearchEngine::new(session, VecCatalog::default(), QuerySettings::default());
    let results = engine.search(&query)?;
    println!("{} total hits", results.total_hits);
    for (i, h) in results.hits.iter().enumerate() {
        println!("{:>2}. score={:.3} id={} rating={} title={}\n    snippet: {}",
            i + 1, h.score, h.id, h.rating, h.title, h.snippet);
    }
    Ok(())
}
