//! Domain types shared by the index layer and its front ends.

use serde::{Deserialize, Serialize};

pub type MovieId = i64;

/// A catalog entry as handed to the index.
///
/// - `id`: unique key used to target updates and deletes
/// - `title`: analyzed and stored, searched with the highest weight
/// - `description`: analyzed only; never returned from a search
/// - `rating`: short categorical label (e.g. "PG-13"), matched exactly
///
/// Every field defaults so a sparse catalog record still maps to a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub description: String,
    pub rating: String,
}

impl Movie {
    pub fn new(
        id: MovieId,
        title: impl Into<String>,
        description: impl Into<String>,
        rating: impl Into<String>,
    ) -> Self {
        Self { id, title: title.into(), description: description.into(), rating: rating.into() }
    }
}

/// One scored match, built purely from stored index fields.
///
/// Fields missing from the stored document come back as empty strings.
/// `score` is the engine's ranking score; higher is better.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub rating: String,
    pub score: f32,
}

impl SearchHit {
    /// The stored id as a typed movie id, if it was present and numeric.
    pub fn movie_id(&self) -> Option<MovieId> {
        self.id.parse().ok()
    }
}

/// A page of hits ordered by descending score, plus the total match count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub total_hits: usize,
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn ids(&self) -> Vec<Option<MovieId>> {
        self.hits.iter().map(SearchHit::movie_id).collect()
    }
}
