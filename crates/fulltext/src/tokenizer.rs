//! Text analysis
//!
//! One analyzer is built in: lowercase, split on non-alphanumeric
//! characters, drop single-character tokens. Rules may name an analyzer;
//! `whitespace` keeps case and splits on whitespace only, any other name
//! uses the standard analyzer.

/// Analyzer selected by a rule's `analyzer` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Analyzer {
    /// Lowercased alphanumeric runs of at least two characters
    #[default]
    Standard,
    /// Whitespace-separated tokens, case preserved
    Whitespace,
}

impl Analyzer {
    /// Analyzer for a configured identifier
    pub fn from_id(id: Option<&str>) -> Self {
        match id {
            Some("whitespace") => Analyzer::Whitespace,
            _ => Analyzer::Standard,
        }
    }

    /// Split text into terms
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        match self {
            Analyzer::Standard => tokenize(text),
            Analyzer::Whitespace => text.split_whitespace().map(String::from).collect(),
        }
    }
}

/// Tokenize text with the standard analyzer
///
/// # Example
///
/// ```
/// use nodex_fulltext::tokenizer::tokenize;
///
/// let tokens = tokenize("Hello, World!");
/// assert_eq!(tokens, vec!["hello", "world"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| s.chars().count() >= 2)
        .map(String::from)
        .collect()
}

/// Tokenize and deduplicate, keeping first-seen order
///
/// # Example
///
/// ```
/// use nodex_fulltext::tokenizer::tokenize_unique;
///
/// let tokens = tokenize_unique("test test TEST");
/// assert_eq!(tokens, vec!["test"]);
/// ```
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
