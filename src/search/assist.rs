//! Backend search assist
//!
//! A backend that searches the markdown source rather than the rendered
//! page. Its results carry context snippets for display but are advisory:
//! the session never navigates or paints from them.

use super::locator::{Matcher, SearchQuery};
use super::navigation::Direction;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Maximum number of matches a backend search returns.
pub const MAX_ASSIST_MATCHES: usize = 1000;

/// Bytes of surrounding source kept on each side of a match.
pub const CONTEXT_BYTES: usize = 50;

/// One backend match in the markdown source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistMatch {
    pub id: String,
    pub text: String,
    pub context: String,
    pub position: usize,
    pub length: usize,
}

/// A backend search response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistResult {
    pub query: String,
    pub matches: Vec<AssistMatch>,
    pub total: usize,
    pub current_index: usize,
    pub case_sensitive: bool,
}

/// The request/response contract of a search backend.
pub trait SearchAssist {
    /// The source text of the open document changed.
    fn document_changed(&mut self, source: &str);

    /// Search the current document.
    fn search(&mut self, query: &str, case_sensitive: bool) -> Result<AssistResult>;

    /// Step the backend's own cursor, returning its new index.
    fn navigate(&mut self, direction: Direction) -> Result<usize>;

    /// Forget the last search.
    fn clear(&mut self);
}

/// Search assist over the raw markdown source.
#[derive(Debug, Default)]
pub struct SourceSearchAssist {
    source: Option<String>,
    result: AssistResult,
}

impl SourceSearchAssist {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Widen `[start, end)` by `CONTEXT_BYTES` each way without splitting a char.
fn context_range(source: &str, start: usize, end: usize) -> (usize, usize) {
    let mut from = start.saturating_sub(CONTEXT_BYTES);
    while !source.is_char_boundary(from) {
        from -= 1;
    }
    let mut to = (end + CONTEXT_BYTES).min(source.len());
    while !source.is_char_boundary(to) {
        to += 1;
    }
    (from, to)
}

impl SearchAssist for SourceSearchAssist {
    fn document_changed(&mut self, source: &str) {
        self.source = Some(source.to_string());
        self.result = AssistResult::default();
    }

    fn search(&mut self, query: &str, case_sensitive: bool) -> Result<AssistResult> {
        let source = match &self.source {
            Some(source) if !source.is_empty() => source,
            _ => return Err(Error::NoDocument),
        };

        let query = query.trim();
        let Some(matcher) = Matcher::new(&SearchQuery::new(query, case_sensitive)) else {
            self.result = AssistResult::default();
            return Ok(AssistResult::default());
        };

        let mut matches = Vec::new();
        let mut from = 0;
        while let Some((start, end)) = matcher.find_at(source, from) {
            let (context_start, context_end) = context_range(source, start, end);
            matches.push(AssistMatch {
                id: format!("search-match-{}", matches.len()),
                text: source[start..end].to_string(),
                context: source[context_start..context_end].to_string(),
                position: start,
                length: end - start,
            });
            if matches.len() >= MAX_ASSIST_MATCHES {
                break;
            }
            // Overlapping: resume one char past the start of this match
            from = start + source[start..].chars().next().map_or(1, char::len_utf8);
        }

        self.result = AssistResult {
            query: query.to_string(),
            total: matches.len(),
            matches,
            current_index: 0,
            case_sensitive,
        };
        Ok(self.result.clone())
    }

    fn navigate(&mut self, direction: Direction) -> Result<usize> {
        let total = self.result.total;
        if total > 0 {
            let index = self.result.current_index;
            self.result.current_index = match direction {
                Direction::Next => (index + 1) % total,
                Direction::Prev => (index + total - 1) % total,
            };
        }
        Ok(self.result.current_index)
    }

    fn clear(&mut self) {
        self.result = AssistResult::default();
    }
}
