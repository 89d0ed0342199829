use regex::Regex;
use std::sync::LazyLock;

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\r?\n)+").expect("line break pattern is valid"));

/// Collapses every run of line breaks into a single space and trims the result.
///
/// The model translates one segment at a time, so multi-line input is joined
/// before it is tagged and tokenized.
pub fn clean_text(text: &str) -> String {
    LINE_BREAKS.replace_all(text, " ").trim().to_string()
}
