use std::{env, fs, path::PathBuf};

use moviesearch_core::catalog::JsonFileCatalog;
use moviesearch_core::config::{resolve_with_base, Config};
use moviesearch_core::traits::CatalogSource;
use moviesearch_text::IndexSession;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let cwd = env::current_dir()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut fresh = false; let mut catalog_path = None; let mut index_dir = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--fresh" | "-f" => fresh = true,
            "--index" => {
                if i + 1 < args.len() { index_dir = Some(PathBuf::from(&args[i + 1])); i += 1; }
                else { eprintln!("Error: --index requires a path"); std::process::exit(1); }
            }
            _ if !args[i].starts_with('-') => catalog_path = Some(PathBuf::from(&args[i])),
            other => { eprintln!("Unknown flag: {}", other); std::process::exit(1); }
        }
        i += 1;
    }
    let catalog_path = catalog_path.unwrap_or_else(|| resolve_with_base(&cwd, &settings.data.catalog_path));
    let index_dir = index_dir.unwrap_or_else(|| resolve_with_base(&cwd, &settings.data.index_dir));

    println!("Movie Indexer\n=============");
    println!("Catalog: {}", catalog_path.display());
    println!("Index directory: {}", index_dir.display());
    if fresh && index_dir.exists() {
        println!("Removing existing index (--fresh)");
        fs::remove_dir_all(&index_dir)?;
    }

    let movies = JsonFileCatalog::new(&catalog_path).movies()?;
    let session = IndexSession::open(&index_dir, settings.index.clone())?;
    let count = session.build(Some(&movies))?;
    println!("\nIndexed {} movies ({} live documents)", count, session.doc_count()?);
    println!("To search, use: cargo run --bin moviesearch-search-only '<query>'");
    Ok(())
}
