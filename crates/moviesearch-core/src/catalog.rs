use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::traits::CatalogSource;
use crate::types::Movie;

/// A catalog held in memory; handy for tests and for callers that already
/// loaded their movies elsewhere.
#[derive(Debug, Clone, Default)]
pub struct VecCatalog {
    movies: Vec<Movie>,
}

impl VecCatalog {
    pub fn new(movies: Vec<Movie>) -> Self { Self { movies } }
}

impl CatalogSource for VecCatalog {
    fn movies(&self) -> Result<Vec<Movie>> { Ok(self.movies.clone()) }
}

/// Reads a JSON array of movies from disk on every call, so a rebuild always
/// picks up the current file contents.
#[derive(Debug, Clone)]
pub struct JsonFileCatalog {
    path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }

    pub fn path(&self) -> &Path { &self.path }

    fn read_file_content(&self) -> Result<String> {
        if !self.path.exists() {
            return Err(Error::NotFound(self.path.display().to_string()));
        }
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(_) => fs::read(&self.path)
                .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
                .map_err(|e| Error::Catalog(format!("{}: {}", self.path.display(), e))),
        }
    }
}

impl CatalogSource for JsonFileCatalog {
    fn movies(&self) -> Result<Vec<Movie>> {
        let content = self.read_file_content()?;
        let movies: Vec<Movie> = serde_json::from_str(&content)
            .map_err(|e| Error::Catalog(format!("{}: {}", self.path.display(), e)))?;
        info!(path = %self.path.display(), count = movies.len(), "loaded movie catalog");
        Ok(movies)
    }
}
