//! Query normalisation.

/// Characters removed from queries before they reach the engine.
const STRIPPED: &[char] = &[
    '.', '`', '~', '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '{', '}', '[', ']', '\\',
    '|', ':', ';', '\'', '"', ',', '<', '>', '/', '?', '-',
];

/// A query in the form the engine expects.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedQuery {
    /// Lowercased terms separated by single spaces.
    pub term: String,
    /// The input was wrapped in double quotes.
    pub exact: bool,
}

impl NormalizedQuery {
    /// Nothing left to search for.
    pub fn is_empty(&self) -> bool {
        self.term.is_empty()
    }
}

/// Whether `raw` is a single quoted phrase, e.g. `  "exact words" `.
fn is_exact_phrase(raw: &str) -> bool {
    let trimmed = raw.trim();
    let Some(inner) = trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return false;
    };
    !inner.is_empty() && !inner.contains(['\n', '\r'])
}

/// Normalise a raw query.
///
/// Lowercases, strips punctuation and collapses whitespace. Exact-phrase
/// detection looks at the input before the quotes are stripped.
pub fn normalize(raw: &str) -> NormalizedQuery {
    let exact = is_exact_phrase(raw);
    let lowered = raw.to_lowercase();
    let stripped: String = lowered.chars().filter(|c| !STRIPPED.contains(c)).collect();
    let term = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    NormalizedQuery { term, exact }
}
