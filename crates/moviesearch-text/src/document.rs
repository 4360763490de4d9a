//! Mapping between [`Movie`] values and tantivy documents.

use tantivy::schema::{Field, Schema, Value};
use tantivy::{Score, TantivyDocument, Term};

use moviesearch_core::types::{Movie, MovieId, SearchHit};

use crate::error::IndexResult;
use crate::snippet::make_snippet;
use crate::tantivy_utils::{DESCRIPTION_FIELD, ID_FIELD, RATING_FIELD, SNIPPET_FIELD, TITLE_FIELD};

/// Resolved field handles for the movie schema.
#[derive(Debug, Clone, Copy)]
pub struct MovieFields {
    pub id: Field,
    pub title: Field,
    pub description: Field,
    pub snippet: Field,
    pub rating: Field,
}

impl MovieFields {
    pub fn from_schema(schema: &Schema) -> IndexResult<Self> {
        Ok(Self {
            id: schema.get_field(ID_FIELD)?,
            title: schema.get_field(TITLE_FIELD)?,
            description: schema.get_field(DESCRIPTION_FIELD)?,
            snippet: schema.get_field(SNIPPET_FIELD)?,
            rating: schema.get_field(RATING_FIELD)?,
        })
    }

    /// The term that addresses exactly one movie for delete and update.
    pub fn id_term(&self, id: MovieId) -> Term {
        Term::from_field_i64(self.id, id)
    }

    pub fn to_document(&self, movie: &Movie, snippet_length: usize) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_i64(self.id, movie.id);
        doc.add_text(self.title, &movie.title);
        doc.add_text(self.description, &movie.description);
        doc.add_text(self.snippet, make_snippet(&movie.description, snippet_length));
        doc.add_text(self.rating, &movie.rating);
        doc
    }

    /// Reads stored fields only; anything absent becomes an empty string.
    pub fn to_hit(&self, doc: &TantivyDocument, score: Score) -> SearchHit {
        SearchHit {
            id: doc.get_first(self.id).and_then(|v| v.as_i64()).map(|id| id.to_string()).unwrap_or_default(),
            title: self.stored_text(doc, self.title),
            snippet: self.stored_text(doc, self.snippet),
            rating: self.stored_text(doc, self.rating),
            score,
        }
    }

    fn stored_text(&self, doc: &TantivyDocument, field: Field) -> String {
        doc.get_first(field).and_then(|v| v.as_str()).unwrap_or("").to_string()
    }
}
