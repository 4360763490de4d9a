//! Relevance query construction.
//!
//! A raw query string becomes a disjunction of boosted clauses over the
//! default field (an exact-phrase clause and "at least N tokens" clauses)
//! plus one term clause per token and field. The ranking engine sums the
//! clause scores, so documents matching more of the query rise to the top
//! without a custom scorer.
//!
//! A field's boost multiplies every clause on that field: its term clauses
//! and, for the default field, the phrase and incremental clauses too. A
//! title match weighs the same whichever clause produced it.
//!
//! A query ending in `~` skips all of that and goes through tantivy's own
//! query grammar with fuzzy matching switched on. Input the grammar rejects
//! is reduced to plain lowercase words and parsed once more.

use tantivy::query::{
    BooleanQuery, BoostQuery, EmptyQuery, Occur, PhraseQuery, Query, QueryParser, QueryParserError, TermQuery,
};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::TokenStream;
use tantivy::{Index, Term};
use tracing::{debug, warn};

use moviesearch_core::config::QuerySettings;

use crate::error::{IndexError, IndexResult};

pub const FUZZY_MARKER: char = '~';

/// Characters with a meaning in the query grammar.
const GRAMMAR_SPECIALS: &[char] = &[
    '\\', '+', '-', '!', '(', ')', ':', '^', '[', ']', '"', '{', '}', '~', '*', '?', '|', '&', '/', '\'',
];

/// A field the query should cover. Exactly one field per query is the default;
/// its analyzer tokenizes the input and it alone receives phrase and
/// incremental clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryField {
    pub name: String,
    pub is_default: bool,
    pub boost: f32,
}

impl QueryField {
    pub fn new(name: impl Into<String>, is_default: bool) -> Self {
        Self { name: name.into(), is_default, boost: 1.0 }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryToken {
    pub position: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedField {
    field: Field,
    is_default: bool,
    boost: f32,
}

pub struct QueryBuilder {
    index: Index,
    settings: QuerySettings,
}

impl QueryBuilder {
    pub fn new(index: Index, settings: QuerySettings) -> Self {
        Self { index, settings }
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    pub fn build(&self, query_string: &str, fields: &[QueryField]) -> IndexResult<Box<dyn Query>> {
        let resolved = self.resolve(fields)?;
        if query_string.ends_with(FUZZY_MARKER) {
            return self.parse_with_grammar(query_string, &resolved);
        }
        let clauses = self.boosted_clauses(query_string, &resolved)?;
        if clauses.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }
        Ok(Box::new(BooleanQuery::new(clauses)))
    }

    /// Runs `text` through the analyzer registered for `field`, keeping token
    /// positions so phrase clauses line up with what was indexed.
    pub fn tokenize(&self, text: &str, field: Field) -> IndexResult<Vec<QueryToken>> {
        let mut analyzer = self.index.tokenizer_for_field(field)?;
        let mut stream = analyzer.token_stream(text);
        let mut tokens = Vec::new();
        while let Some(token) = stream.next() {
            tokens.push(QueryToken { position: token.position, text: token.text.clone() });
        }
        Ok(tokens)
    }

    fn resolve(&self, fields: &[QueryField]) -> IndexResult<Vec<ResolvedField>> {
        let defaults = fields.iter().filter(|f| f.is_default).count();
        if defaults != 1 {
            return Err(IndexError::InvalidArgument(format!(
                "query fields need exactly one default field, got {}",
                defaults
            )));
        }
        let schema = self.index.schema();
        fields
            .iter()
            .map(|f| {
                Ok(ResolvedField { field: schema.get_field(&f.name)?, is_default: f.is_default, boost: f.boost })
            })
            .collect()
    }

    fn boosted_clauses(
        &self,
        query_string: &str,
        fields: &[ResolvedField],
    ) -> IndexResult<Vec<(Occur, Box<dyn Query>)>> {
        let default = fields
            .iter()
            .find(|f| f.is_default)
            .copied()
            .ok_or_else(|| IndexError::InvalidArgument("no default query field".into()))?;
        let tokens = self.tokenize(query_string, default.field)?;

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        if tokens.len() > 1 {
            clauses.push((Occur::Should, self.exact_phrase_query(&tokens, default)));
            for q in self.incremental_match_queries(&tokens, default) {
                clauses.push((Occur::Should, q));
            }
        }
        for token in &tokens {
            for f in fields {
                clauses.push((Occur::Should, boosted(term_query(f.field, &token.text), f.boost)));
            }
        }
        debug!(tokens = tokens.len(), clauses = clauses.len(), "built relevance query");
        Ok(clauses)
    }

    fn exact_phrase_query(&self, tokens: &[QueryToken], field: ResolvedField) -> Box<dyn Query> {
        let first = tokens.first().map_or(0, |t| t.position);
        let terms = tokens
            .iter()
            .map(|t| (t.position - first, Term::from_field_text(field.field, &t.text)))
            .collect();
        let mut phrase = PhraseQuery::new_with_offset(terms);
        phrase.set_slop(self.settings.phrase_slop);
        boosted(Box::new(phrase), self.settings.phrase_boost_per_token * tokens.len() as f32 * field.boost)
    }

    /// One clause per required match count in `2..=min(tokens, cap)`, each
    /// demanding that many of the tokens and boosted in proportion.
    fn incremental_match_queries(&self, tokens: &[QueryToken], field: ResolvedField) -> Vec<Box<dyn Query>> {
        let upper = tokens.len().min(self.settings.incremental_match_cap);
        (2..=upper)
            .map(|required| {
                let any_token = tokens
                    .iter()
                    .map(|t| (Occur::Should, term_query(field.field, &t.text)))
                    .collect();
                let q = BooleanQuery::with_minimum_required_clauses(any_token, required);
                boosted(Box::new(q), self.settings.incremental_boost_per_match * required as f32 * field.boost)
            })
            .collect()
    }

    fn parse_with_grammar(&self, query_string: &str, fields: &[ResolvedField]) -> IndexResult<Box<dyn Query>> {
        let text = query_string.trim().trim_end_matches(FUZZY_MARKER).trim();
        if text.is_empty() {
            return Ok(Box::new(EmptyQuery));
        }
        let mut parser = QueryParser::for_index(&self.index, fields.iter().map(|f| f.field).collect());
        for f in fields {
            if (f.boost - 1.0).abs() > f32::EPSILON {
                parser.set_field_boost(f.field, f.boost);
            }
            parser.set_field_fuzzy(f.field, false, self.settings.fuzzy_distance, true);
        }
        parse_with_retry(text, |input| parser.parse_query(input))
    }
}

/// Parses `text`, and on a grammar error parses its [`escape_query`] form
/// once more. A blank escaped form matches nothing; a second error is
/// reported as `QueryParse`.
fn parse_with_retry(
    text: &str,
    parse: impl Fn(&str) -> Result<Box<dyn Query>, QueryParserError>,
) -> IndexResult<Box<dyn Query>> {
    match parse(text) {
        Ok(query) => Ok(query),
        Err(err) => {
            warn!(query = text, error = %err, "query grammar rejected input, retrying escaped");
            let escaped = escape_query(text);
            if escaped.trim().is_empty() {
                return Ok(Box::new(EmptyQuery));
            }
            parse(&escaped).map_err(|source| IndexError::QueryParse { query: text.to_string(), source })
        }
    }
}

fn term_query(field: Field, text: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(Term::from_field_text(field, text), IndexRecordOption::WithFreqs))
}

fn boosted(query: Box<dyn Query>, boost: f32) -> Box<dyn Query> {
    if (boost - 1.0).abs() > f32::EPSILON { Box::new(BoostQuery::new(query, boost)) } else { query }
}

/// Reduces `text` to plain words the grammar cannot misread: special
/// characters become spaces (tantivy has no escape for some of them, `-`
/// among them) and everything is lowercased, which turns the `AND`, `OR`,
/// `NOT`, `IN` and `TO` keywords into ordinary terms. The analyzer
/// lowercases anyway, so matching is unchanged.
pub fn escape_query(text: &str) -> String {
    text.chars()
        .map(|c| if GRAMMAR_SPECIALS.contains(&c) { ' ' } else { c })
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MovieFields;
    use crate::tantivy_utils::{build_schema, register_tokenizer, DESCRIPTION_FIELD, TITLE_FIELD};
    use moviesearch_core::types::Movie;
    use tantivy::collector::TopDocs;
    use tantivy::schema::Value;
    use tantivy::TantivyDocument;

    fn index_with(movies: &[Movie]) -> (Index, MovieFields) {
        let index = Index::create_in_ram(build_schema());
        register_tokenizer(&index);
        let fields = MovieFields::from_schema(&index.schema()).unwrap();
        let mut writer = index.writer_with_num_threads(1, 15_000_000).unwrap();
        for m in movies {
            writer.add_document(fields.to_document(m, 100)).unwrap();
        }
        writer.commit().unwrap();
        (index, fields)
    }

    fn query_fields() -> Vec<QueryField> {
        vec![QueryField::new(TITLE_FIELD, true), QueryField::new(DESCRIPTION_FIELD, false)]
    }

    fn ranked(index: &Index, fields: &MovieFields, query: &dyn Query) -> Vec<(i64, f32)> {
        let searcher = index.reader().unwrap().searcher();
        searcher
            .search(query, &TopDocs::with_limit(10))
            .unwrap()
            .into_iter()
            .map(|(score, addr)| {
                let doc: TantivyDocument = searcher.doc(addr).unwrap();
                (doc.get_first(fields.id).and_then(|v| v.as_i64()).unwrap(), score)
            })
            .collect()
    }

    #[test]
    fn requires_exactly_one_default_field() {
        let (index, _) = index_with(&[]);
        let builder = QueryBuilder::new(index, QuerySettings::default());
        let none = vec![QueryField::new(TITLE_FIELD, false)];
        let two = vec![QueryField::new(TITLE_FIELD, true), QueryField::new(DESCRIPTION_FIELD, true)];
        assert!(matches!(builder.build("matrix", &none), Err(IndexError::InvalidArgument(_))));
        assert!(matches!(builder.build("matrix", &two), Err(IndexError::InvalidArgument(_))));
    }

    #[test]
    fn clause_counts_follow_token_count() {
        let (index, _) = index_with(&[]);
        let builder = QueryBuilder::new(index, QuerySettings::default());
        let fields = builder.resolve(&query_fields()).unwrap();

        // single token: one term clause per field, nothing boosted
        assert_eq!(builder.boosted_clauses("matrix", &fields).unwrap().len(), 2);
        // three tokens: phrase + incremental(2, 3) + 3 tokens x 2 fields
        assert_eq!(builder.boosted_clauses("red blue green", &fields).unwrap().len(), 1 + 2 + 6);
        // seven tokens: incremental clauses stop at 5
        let seven = "one two three four five six seven";
        assert_eq!(builder.boosted_clauses(seven, &fields).unwrap().len(), 1 + 4 + 14);
    }

    #[test]
    fn stop_words_only_yield_no_clauses() {
        let (index, fields) = index_with(&[Movie::new(1, "The Thing", "", "R")]);
        let builder = QueryBuilder::new(index.clone(), QuerySettings::default());
        let resolved = builder.resolve(&query_fields()).unwrap();
        assert!(builder.boosted_clauses("the of and", &resolved).unwrap().is_empty());
        let q = builder.build("", &query_fields()).unwrap();
        assert!(ranked(&index, &fields, q.as_ref()).is_empty());
    }

    #[test]
    fn tokens_keep_indexed_positions() {
        let (index, fields) = index_with(&[]);
        let builder = QueryBuilder::new(index, QuerySettings::default());
        let tokens = builder.tokenize("Lord of the Rings", fields.title).unwrap();
        assert_eq!(
            tokens,
            vec![
                QueryToken { position: 0, text: "lord".into() },
                QueryToken { position: 3, text: "rings".into() },
            ]
        );
    }

    #[test]
    fn adjacent_ordered_tokens_outrank_scattered_ones() {
        let (index, fields) = index_with(&[
            Movie::new(1, "Star Wars", "", "PG"),
            Movie::new(2, "Wars Beyond Distant Worlds Under a Lonely Star", "", "PG"),
        ]);
        let builder = QueryBuilder::new(index.clone(), QuerySettings::default());
        let q = builder.build("star wars", &query_fields()).unwrap();
        let hits = ranked(&index, &fields, q.as_ref());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 1);
        assert!(hits[0].1 > hits[1].1);
    }

    #[test]
    fn description_terms_still_match() {
        let (index, fields) = index_with(&[Movie::new(5, "Heat", "A detective hunts a crew of thieves.", "R")]);
        let builder = QueryBuilder::new(index.clone(), QuerySettings::default());
        let q = builder.build("thieves", &query_fields()).unwrap();
        assert_eq!(ranked(&index, &fields, q.as_ref()).first().map(|h| h.0), Some(5));
    }

    #[test]
    fn trailing_marker_switches_to_fuzzy_grammar() {
        let (index, fields) = index_with(&[Movie::new(9, "The Matrix", "", "R")]);
        let builder = QueryBuilder::new(index.clone(), QuerySettings::default());
        let exact = builder.build("matrx", &query_fields()).unwrap();
        assert!(ranked(&index, &fields, exact.as_ref()).is_empty());
        let fuzzy = builder.build("matrx~", &query_fields()).unwrap();
        assert_eq!(ranked(&index, &fields, fuzzy.as_ref()).first().map(|h| h.0), Some(9));
    }

    #[test]
    fn bare_marker_matches_nothing() {
        let (index, fields) = index_with(&[Movie::new(9, "The Matrix", "", "R")]);
        let builder = QueryBuilder::new(index.clone(), QuerySettings::default());
        let q = builder.build("  ~", &query_fields()).unwrap();
        assert!(ranked(&index, &fields, q.as_ref()).is_empty());
    }

    #[test]
    fn unbalanced_grammar_is_retried_as_plain_words() {
        let (index, fields) = index_with(&[Movie::new(9, "The Matrix", "", "R")]);
        let builder = QueryBuilder::new(index.clone(), QuerySettings::default());
        let q = builder.build("(matrix~", &query_fields()).expect("escaped retry parses");
        assert_eq!(ranked(&index, &fields, q.as_ref()).first().map(|h| h.0), Some(9));
    }

    #[test]
    fn operator_keywords_parse_after_retry() {
        let (index, fields) = index_with(&[Movie::new(9, "The Matrix", "", "R")]);
        let builder = QueryBuilder::new(index.clone(), QuerySettings::default());
        for input in ["NOT~", "IN~", "AND~", "OR~", "- -~"] {
            let q = builder.build(input, &query_fields()).unwrap_or_else(|e| panic!("{input}: {e}"));
            assert!(ranked(&index, &fields, q.as_ref()).is_empty(), "{input} matched");
        }
    }

    #[test]
    fn retry_receives_escaped_text() {
        let seen = std::cell::RefCell::new(Vec::new());
        let result = parse_with_retry("NOT (alien", |input| {
            seen.borrow_mut().push(input.to_string());
            if input.contains('(') {
                Err(QueryParserError::SyntaxError(input.to_string()))
            } else {
                Ok(Box::new(EmptyQuery) as Box<dyn Query>)
            }
        });
        assert!(result.is_ok());
        assert_eq!(*seen.borrow(), vec!["NOT (alien".to_string(), "not  alien".to_string()]);
    }

    #[test]
    fn second_grammar_failure_is_reported() {
        let calls = std::cell::Cell::new(0);
        let result = parse_with_retry("matrix", |input| {
            calls.set(calls.get() + 1);
            Err(QueryParserError::SyntaxError(input.to_string()))
        });
        match result {
            Err(IndexError::QueryParse { query, .. }) => assert_eq!(query, "matrix"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a parse error"),
        }
        assert_eq!(calls.get(), 2, "exactly one retry");
    }

    #[test]
    fn blank_escaped_text_matches_nothing_without_reparsing() {
        let calls = std::cell::Cell::new(0);
        let result = parse_with_retry("- -", |input| {
            calls.set(calls.get() + 1);
            Err(QueryParserError::SyntaxError(input.to_string()))
        });
        assert!(result.is_ok());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn title_boost_scales_every_title_clause() {
        let (index, fields) = index_with(&[Movie::new(1, "Star Wars", "", "PG")]);
        let builder = QueryBuilder::new(index.clone(), QuerySettings::default());
        let plain = vec![QueryField::new(TITLE_FIELD, true), QueryField::new(DESCRIPTION_FIELD, false)];
        let weighted = vec![QueryField::new(TITLE_FIELD, true).with_boost(4.0), QueryField::new(DESCRIPTION_FIELD, false)];

        let base = ranked(&index, &fields, builder.build("star wars", &plain).unwrap().as_ref())[0].1;
        let boosted = ranked(&index, &fields, builder.build("star wars", &weighted).unwrap().as_ref())[0].1;
        assert!((boosted - 4.0 * base).abs() < 1e-3 * boosted, "{boosted} vs 4 x {base}");
    }

    #[test]
    fn escape_leaves_plain_lowercase_words() {
        assert_eq!(escape_query("a+b (c)"), "a b  c ");
        assert_eq!(escape_query("Star-Wars NOT IN"), "star wars not in");
        assert_eq!(escape_query("plain words"), "plain words");
    }
}
