use tracing::{debug, info, instrument};

use moviesearch_core::config::QuerySettings;
use moviesearch_core::traits::{CatalogSource, MovieSearch};
use moviesearch_core::types::{Movie, MovieId, SearchResults};

use crate::error::{IndexError, IndexResult};
use crate::query::{QueryBuilder, QueryField, FUZZY_MARKER};
use crate::session::IndexSession;
use crate::tantivy_utils::{DESCRIPTION_FIELD, TITLE_FIELD};

/// Public search surface over one [`IndexSession`] and the catalog it is
/// rebuilt from.
pub struct MovieSearchEngine<C: CatalogSource> {
    session: IndexSession,
    catalog: C,
    queries: QueryBuilder,
    fields: Vec<QueryField>,
}

impl<C: CatalogSource> MovieSearchEngine<C> {
    pub fn new(session: IndexSession, catalog: C, settings: QuerySettings) -> Self {
        let fields = vec![
            QueryField::new(TITLE_FIELD, true).with_boost(settings.title_boost),
            QueryField::new(DESCRIPTION_FIELD, false),
        ];
        let queries = QueryBuilder::new(session.index().clone(), settings);
        Self { session, catalog, queries, fields }
    }

    /// Like [`MovieSearchEngine::new`], but builds the index from the catalog
    /// when it holds no documents yet.
    pub fn open(session: IndexSession, catalog: C, settings: QuerySettings) -> IndexResult<Self> {
        let engine = Self::new(session, catalog, settings);
        if engine.session.doc_count()? == 0 {
            info!("index is empty, building from catalog");
            engine.build_index()?;
        }
        Ok(engine)
    }

    pub fn session(&self) -> &IndexSession { &self.session }

    pub fn catalog(&self) -> &C { &self.catalog }

    fn run(&self, query_string: &str) -> IndexResult<SearchResults> {
        let query = self.queries.build(query_string, &self.fields)?;
        self.session.search(query.as_ref(), self.session.settings().page_size)
    }
}

impl<C: CatalogSource> MovieSearch for MovieSearchEngine<C> {
    type Error = IndexError;

    fn build_index(&self) -> IndexResult<()> {
        let movies = self.catalog.movies()?;
        self.session.build(Some(&movies))?;
        Ok(())
    }

    /// Sanitizes `raw`, searches, and retries once with fuzzy matching when
    /// the first pass finds nothing.
    #[instrument(skip(self))]
    fn search(&self, raw: &str) -> IndexResult<SearchResults> {
        let query = sanitize_query(raw);
        if query.is_empty() {
            return Ok(SearchResults::empty());
        }
        let results = self.run(&query)?;
        if !results.is_empty() || query.ends_with(FUZZY_MARKER) {
            return Ok(results);
        }
        debug!(query = %query, "no hits, retrying with fuzzy matching");
        self.run(&format!("{}{}", query, FUZZY_MARKER))
    }

    fn update_movie(&self, movie: Option<&Movie>) -> IndexResult<()> {
        self.session.update_one(movie)
    }

    fn clear_index(&self) -> bool {
        self.session.clear_all()
    }

    fn clear_index_record(&self, id: MovieId) -> IndexResult<()> {
        self.session.delete_one(id)
    }
}

/// Keeps ASCII letters, digits, spaces and dashes; everything else is dropped
/// before the query reaches the builder.
pub fn sanitize_query(raw: &str) -> String {
    let kept: String = raw.chars().filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-').collect();
    kept.trim().to_string()
}
