use tantivy::schema::{Schema, TextFieldIndexing, TextOptions, IndexRecordOption, INDEXED, STRING, STORED};
use tantivy::tokenizer::{TextAnalyzer, SimpleTokenizer, LowerCaser, StopWordFilter};
use tantivy::Index;

pub const TOKENIZER_NAME: &str = "movie_text";

pub const ID_FIELD: &str = "id";
pub const TITLE_FIELD: &str = "title";
pub const DESCRIPTION_FIELD: &str = "description";
pub const SNIPPET_FIELD: &str = "snippet";
pub const RATING_FIELD: &str = "rating";

const STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

/// | field | options |
/// |---|---|
/// | `id` | i64, `INDEXED \| STORED` |
/// | `title` | `movie_text`, positions, stored |
/// | `description` | `movie_text`, positions, not stored |
/// | `snippet` | `STORED` only |
/// | `rating` | `STRING \| STORED` |
pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_i64_field(ID_FIELD, INDEXED | STORED);
	schema_builder.add_text_field(TITLE_FIELD, analyzed_text_options().set_stored());
	schema_builder.add_text_field(DESCRIPTION_FIELD, analyzed_text_options());
	schema_builder.add_text_field(SNIPPET_FIELD, STORED);
	schema_builder.add_text_field(RATING_FIELD, STRING | STORED);
	schema_builder.build()
}

fn analyzed_text_options() -> TextOptions {
	let indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	TextOptions::default().set_indexing_options(indexing)
}

pub fn build_tokenizer() -> TextAnalyzer {
	TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
		.build()
}

pub fn register_tokenizer(index: &Index) {
	index.tokenizers().register(TOKENIZER_NAME, build_tokenizer());
}
