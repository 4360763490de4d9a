use crate::types::{Movie, MovieId, SearchResults};

/// Supplies the full movie set for an index rebuild.
pub trait CatalogSource: Send + Sync {
    fn movies(&self) -> crate::error::Result<Vec<Movie>>;
}

/// The operations a front end consumes.
///
/// `clear_index` reports failure as `false` instead of an error; a writer that
/// cannot be obtained is the expected failure there.
pub trait MovieSearch: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn build_index(&self) -> Result<(), Self::Error>;
    fn search(&self, query: &str) -> Result<SearchResults, Self::Error>;
    fn update_movie(&self, movie: Option<&Movie>) -> Result<(), Self::Error>;
    fn clear_index(&self) -> bool;
    fn clear_index_record(&self, id: MovieId) -> Result<(), Self::Error>;
}
