//! Expectation matching over a live console stream
//!
//! Patterns are matched against a rolling buffer of console bytes. A match
//! consumes the buffer through the end of the matched region, so sequential
//! expectations observe the stream in order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// How much trailing console data to keep in a timeout report
const TAIL_LEN: usize = 256;

/// Pattern to wait for in console output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExpectPattern {
    /// Match exact text (case-sensitive substring)
    Text(String),
    /// Match a regex pattern
    Regex(String),
}

impl ExpectPattern {
    /// Human-readable form for logs and timeout reports
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => format!("text {text:?}"),
            Self::Regex(pattern) => format!("regex {pattern:?}"),
        }
    }
}

impl From<&str> for ExpectPattern {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A successful expectation match
#[derive(Debug, Clone)]
pub struct ExpectMatch {
    /// Full matched text
    pub matched: String,
    /// Regex capture groups (group 0 is the whole match; text patterns have
    /// only group 0)
    pub captures: Vec<Option<String>>,
}

impl ExpectMatch {
    /// Get a capture group by index, if it participated in the match
    pub fn group(&self, index: usize) -> Option<&str> {
        self.captures.get(index).and_then(|g| g.as_deref())
    }
}

/// Expectation errors
#[derive(Error, Debug)]
pub enum ExpectError {
    /// Pattern did not appear within the deadline
    #[error("Timed out after {waited:?} waiting for {pattern} (tail: {tail:?})")]
    Timeout {
        /// Description of the pattern that was awaited
        pattern: String,
        /// How long the expectation waited
        waited: Duration,
        /// Trailing console data seen before the deadline
        tail: String,
    },

    /// The pattern string is not a valid regex
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// The console stream closed before the pattern appeared
    #[error("Console closed while waiting for {0}")]
    StreamClosed(String),
}

/// Scan `buffer` for `pattern`. On a match, returns the match plus the buffer
/// offset one past the end of the matched region (the amount to consume).
pub fn scan(buffer: &[u8], pattern: &ExpectPattern) -> Result<Option<(ExpectMatch, usize)>, ExpectError> {
    let text = String::from_utf8_lossy(buffer);

    match pattern {
        ExpectPattern::Text(needle) => Ok(text.find(needle.as_str()).map(|start| {
            let end = start + needle.len();
            (
                ExpectMatch {
                    matched: needle.clone(),
                    captures: vec![Some(needle.clone())],
                },
                end,
            )
        })),
        ExpectPattern::Regex(pattern) => {
            let re = Regex::new(pattern).map_err(|e| ExpectError::InvalidPattern(e.to_string()))?;
            Ok(re.captures(&text).and_then(|caps| {
                caps.get(0).map(|whole| {
                    let captures = (0..caps.len())
                        .map(|i| caps.get(i).map(|m| m.as_str().to_string()))
                        .collect();
                    (
                        ExpectMatch {
                            matched: whole.as_str().to_string(),
                            captures,
                        },
                        whole.end(),
                    )
                })
            }))
        }
    }
}

/// Build the tail string reported on timeout
pub fn tail_of(buffer: &[u8]) -> String {
    let start = buffer.len().saturating_sub(TAIL_LEN);
    String::from_utf8_lossy(&buffer[start..]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_match() {
        let pattern = ExpectPattern::Text("Hello world!".to_string());
        let (m, consumed) = scan(b"boot\nHello world!\nmore", &pattern).unwrap().unwrap();
        assert_eq!(m.matched, "Hello world!");
        assert_eq!(consumed, b"boot\nHello world!".len());
    }

    #[test]
    fn test_text_no_match() {
        let pattern = ExpectPattern::Text("Hello world!".to_string());
        assert!(scan(b"nothing here", &pattern).unwrap().is_none());
    }

    #[test]
    fn test_regex_capture_group() {
        let pattern = ExpectPattern::Regex(r"ELF file SHA256:\s+([a-f0-9]+)".to_string());
        let (m, _) = scan(b"ELF file SHA256:  2cf24dba5fb0\r\n", &pattern)
            .unwrap()
            .unwrap();
        assert_eq!(m.group(1), Some("2cf24dba5fb0"));
    }

    #[test]
    fn test_regex_consumes_through_match_end() {
        let pattern = ExpectPattern::Regex(r"heap size: (\d+)".to_string());
        let data = b"Minimum free heap size: 304092 bytes";
        let (m, consumed) = scan(data, &pattern).unwrap().unwrap();
        assert_eq!(m.group(1), Some("304092"));
        assert_eq!(consumed, b"Minimum free heap size: 304092".len());
    }

    #[test]
    fn test_invalid_regex() {
        let pattern = ExpectPattern::Regex("([unclosed".to_string());
        assert!(matches!(
            scan(b"data", &pattern),
            Err(ExpectError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_tail_truncation() {
        let buffer = vec![b'a'; 1000];
        assert_eq!(tail_of(&buffer).len(), 256);
    }
}
