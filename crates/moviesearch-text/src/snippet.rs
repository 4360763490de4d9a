pub const DEFAULT_SNIPPET_LENGTH: usize = 100;

const ELLIPSIS: &str = "...";

/// Preview of `text` cut at `limit` characters.
///
/// Text that fits is returned unchanged; longer text keeps its first `limit`
/// characters followed by `...`. The cut ignores word boundaries.
pub fn make_snippet(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
    }
}
