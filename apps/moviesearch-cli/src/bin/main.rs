use std::env;
use std::path::PathBuf;

use moviesearch_core::catalog::JsonFileCatalog;
use moviesearch_core::config::{resolve_with_base, Config, Settings};
use moviesearch_core::traits::MovieSearch;
use moviesearch_core::types::{Movie, MovieId};
use moviesearch_text::{IndexSession, MovieSearchEngine};
use tracing_subscriber::EnvFilter;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <build|search|update|delete|clear> [args...]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn open_engine(settings: &Settings, catalog: Option<PathBuf>) -> anyhow::Result<MovieSearchEngine<JsonFileCatalog>> {
    let cwd = env::current_dir()?;
    let index_dir = resolve_with_base(&cwd, &settings.data.index_dir);
    let catalog_path = catalog.unwrap_or_else(|| resolve_with_base(&cwd, &settings.data.catalog_path));
    let session = IndexSession::open(&index_dir, settings.index.clone())?;
    Ok(MovieSearchEngine::new(session, JsonFileCatalog::new(catalog_path), settings.query.clone()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "build" => {
            let engine = open_engine(&settings, args.first().map(PathBuf::from))?;
            println!("Building from {}", engine.catalog().path().display());
            engine.build_index()?;
            println!("Index holds {} movies", engine.session().doc_count()?);
        }
        "search" => {
            let query = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: moviesearch search \"<query>\""); std::process::exit(1)
            });
            let engine = open_engine(&settings, None)?;
            let results = engine.search(&query)?;
            println!("{} total hits for \"{}\"", results.total_hits, query);
            for (i, hit) in results.hits.iter().enumerate() {
                println!("{:>2}. [{:.3}] {} ({}) id={}\n    {}", i + 1, hit.score, hit.title, hit.rating, hit.id, hit.snippet);
            }
        }
        "update" => {
            let json = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: moviesearch update '{{\"id\": 1, \"title\": \"...\"}}'"); std::process::exit(1)
            });
            let movie: Movie = serde_json::from_str(&json)?;
            let engine = open_engine(&settings, None)?;
            engine.update_movie(Some(&movie))?;
            println!("Updated movie {}", movie.id);
        }
        "delete" => {
            let id: MovieId = match args.first().map(|s| s.parse()) {
                Some(Ok(id)) => id,
                _ => { eprintln!("Usage: moviesearch delete <id>"); std::process::exit(1) }
            };
            let engine = open_engine(&settings, None)?;
            engine.clear_index_record(id)?;
            println!("Deleted movie {}", id);
        }
        "clear" => {
            let engine = open_engine(&settings, None)?;
            if !engine.clear_index() {
                eprintln!("Could not clear the index; see log output");
                std::process::exit(1);
            }
            println!("Index cleared");
        }
        _ => { eprintln!("Unknown command: {}", cmd); std::process::exit(1); }
    }
    Ok(())
}
