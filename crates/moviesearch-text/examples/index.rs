use std::env;
use std::path::{Path, PathBuf};

use moviesearch_core::catalog::JsonFileCatalog;
use moviesearch_core::config::IndexSettings;
use moviesearch_core::traits::CatalogSource;
use moviesearch_text::IndexSession;

// Rebuild a movie index from a JSON catalog without going through the CLI app.
// Usage:
//   cargo run -p moviesearch-text --example index -- [--catalog ../dev_data/movies.json] [--index ../dev_data/indexes/movies]
// Notes:
//   - Existing documents with the same ids are replaced; others are kept.
//   - Defaults resolve relative to the workspace root so you can run from anywhere.

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut catalog_path: Option<PathBuf> = None;
    let mut index_dir: Option<PathBuf> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" => {
                if i + 1 >= args.len() { eprintln!("--catalog requires a path"); std::process::exit(2); }
                catalog_path = Some(PathBuf::from(&args[i + 1]));
                i += 2; continue;
            }
            "--index" => {
                if i + 1 >= args.len() { eprintln!("--index requires a path"); std::process::exit(2); }
                index_dir = Some(PathBuf::from(&args[i + 1]));
                i += 2; continue;
            }
            s if s.starts_with('-') => {
                eprintln!("Unknown flag: {}", s); std::process::exit(2);
            }
            _ => { i += 1; }
        }
    }

    let ws_root = Path::new(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap_or(Path::new("."));

    // flag > env var > workspace defaults
    let catalog_path = catalog_path
        .or_else(|| env::var("MOVIE_CATALOG").ok().map(PathBuf::from))
        .unwrap_or_else(|| ws_root.join("dev_data/movies.json"));
    let index_dir = index_dir
        .or_else(|| env::var("MOVIE_INDEX_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| ws_root.join("dev_data/indexes/movies"));

    println!("Movie re-index\n==============");
    println!("Catalog  : {}", catalog_path.display());
    println!("Index dir: {}", index_dir.display());

    let movies = JsonFileCatalog::new(catalog_path).movies()?;
    let session = IndexSession::open(&index_dir, IndexSettings::default())?;
    let count = session.build(Some(&movies))?;
    println!("Done. Indexed {} movies.", count);
    Ok(())
}
