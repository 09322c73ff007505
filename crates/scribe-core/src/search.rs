//! Text search.
//!
//! Plain queries are escaped and compiled to a regex so both kinds of search share one path.
//! Matches are half-open byte ranges, like every other position in the crate. Empty matches
//! are skipped.

use crate::selection::Range;
use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Options that control how a search is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Match case exactly.
    pub case_sensitive: bool,
    /// Only accept matches not surrounded by word characters.
    pub whole_word: bool,
    /// Treat the query as a regex pattern.
    pub regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            whole_word: false,
            regex: false,
        }
    }
}

/// Search failures.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid regex: {0}")]
    /// The pattern failed to compile.
    InvalidRegex(#[from] regex::Error),
}

fn compile(query: &str, options: SearchOptions) -> Result<Regex, SearchError> {
    let pattern = if options.regex {
        query.to_string()
    } else {
        regex::escape(query)
    };
    Ok(RegexBuilder::new(&pattern)
        .case_insensitive(!options.case_sensitive)
        .multi_line(true)
        .build()?)
}

/// `true` for characters that make up words: alphanumerics and `_`.
pub fn is_word_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

fn matches<'a>(re: &'a Regex, text: &'a str, options: SearchOptions) -> impl Iterator<Item = Range> + 'a {
    re.find_iter(text)
        .filter(|m| !m.is_empty())
        .filter(move |m| !options.whole_word || is_whole_word(text, m.start(), m.end()))
        .map(|m| Range::new(m.start(), m.end()))
}

/// First match starting at or after byte `from`.
pub fn find_next(text: &str, query: &str, options: SearchOptions, from: usize) -> Result<Option<Range>, SearchError> {
    if query.is_empty() {
        return Ok(None);
    }
    let re = compile(query, options)?;
    Ok(matches(&re, text, options).find(|m| m.start >= from))
}

/// Last match ending at or before byte `before`.
pub fn find_prev(text: &str, query: &str, options: SearchOptions, before: usize) -> Result<Option<Range>, SearchError> {
    if query.is_empty() {
        return Ok(None);
    }
    let re = compile(query, options)?;
    Ok(matches(&re, text, options)
        .take_while(|m| m.start < before)
        .filter(|m| m.end <= before)
        .last())
}

/// Every match in `text`.
pub fn find_all(text: &str, query: &str, options: SearchOptions) -> Result<Vec<Range>, SearchError> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let re = compile(query, options)?;
    Ok(matches(&re, text, options).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_search_uses_byte_offsets() {
        let text = "héllo hello";
        let found = find_next(text, "hello", SearchOptions::default(), 0).unwrap();
        assert_eq!(found, Some(Range::new(7, 12)));
        assert_eq!(find_next(text, "", SearchOptions::default(), 0).unwrap(), None);
    }

    #[test]
    fn test_case_and_whole_word() {
        let text = "Foo food foo";
        let options = SearchOptions {
            case_sensitive: false,
            whole_word: true,
            regex: false,
        };
        assert_eq!(
            find_all(text, "foo", options).unwrap(),
            vec![Range::new(0, 3), Range::new(9, 12)]
        );
        assert_eq!(find_prev(text, "foo", options, 9).unwrap(), Some(Range::new(0, 3)));
    }

    #[test]
    fn test_regex_errors() {
        let options = SearchOptions {
            regex: true,
            ..SearchOptions::default()
        };
        assert_eq!(find_all("a1 b22", r"\d+", options).unwrap().len(), 2);
        assert!(matches!(find_all("x", "(", options), Err(SearchError::InvalidRegex(_))));
    }
}
