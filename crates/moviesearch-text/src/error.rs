use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Index writer lock held: {0}")]
    LockHeld(String),

    #[error("Could not parse query '{query}': {source}")]
    QueryParse {
        query: String,
        #[source]
        source: tantivy::query::QueryParserError,
    },

    #[error("Tantivy error: {0}")]
    Engine(#[from] tantivy::TantivyError),

    #[error("Directory error: {0}")]
    Directory(#[from] tantivy::directory::error::OpenDirectoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Catalog(#[from] moviesearch_core::error::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;
