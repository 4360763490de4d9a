//! moviesearch-text
//!
//! Tantivy-backed movie index: schema and analyzer, document mapping,
//! relevance query construction, the writer/reader session and the search
//! facade built on top of them. See `examples/` for CLI-like usage during
//! development.

pub mod document;
pub mod engine;
pub mod error;
pub mod query;
pub mod session;
pub mod snippet;
pub mod tantivy_utils;

pub use document::MovieFields;
pub use engine::{sanitize_query, MovieSearchEngine};
pub use error::{IndexError, IndexResult};
pub use query::{QueryBuilder, QueryField};
pub use session::IndexSession;
pub use snippet::{make_snippet, DEFAULT_SNIPPET_LENGTH};
