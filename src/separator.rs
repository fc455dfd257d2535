//! Separator patterns that divide a token into key and value segments

use crate::error::KvError;
use regex::Regex;
use std::fmt;

/// Default separator: `=` or `:` with optional surrounding ASCII whitespace
pub const DEFAULT_SEPARATOR: &str = r"(?-u:\s)*[=:](?-u:\s)*";

/// A compiled separator pattern
///
/// Literal separators are escaped before compilation, so `|` or `.` match
/// themselves exactly rather than acting as regex operators.
#[derive(Debug, Clone)]
pub struct Separator {
    regex: Regex,
}

impl Separator {
    /// Compiles a regular expression separator
    pub fn pattern(pattern: &str) -> Result<Self, KvError> {
        let regex = Regex::new(pattern).map_err(|source| KvError::InvalidSeparator {
            pattern: pattern.to_string(),
            source,
        })?;
        Self::from_regex(regex)
    }

    /// Creates a separator that matches `text` exactly
    pub fn literal(text: &str) -> Result<Self, KvError> {
        if text.is_empty() {
            return Err(KvError::EmptySeparator {
                pattern: String::new(),
            });
        }
        Self::pattern(&regex::escape(text))
    }

    /// Wraps an already compiled regex
    pub fn from_regex(regex: Regex) -> Result<Self, KvError> {
        if regex.is_match("") {
            return Err(KvError::EmptySeparator {
                pattern: regex.as_str().to_string(),
            });
        }
        Ok(Self { regex })
    }

    /// Returns the source text of the compiled pattern
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Splits a token into its key and value segments.
    ///
    /// With `limit` of `None` every match splits the token and trailing empty
    /// segments are dropped, so `"a:b:"` yields `["a", "b"]`. With a limit, at
    /// most that many segments are produced and the last one keeps any further
    /// separators verbatim; a trailing empty segment is kept (`"a="` yields
    /// `["a", ""]`). An empty token yields no segments.
    pub fn split<'t>(&self, token: &'t str, limit: Option<usize>) -> Vec<&'t str> {
        if token.is_empty() {
            return Vec::new();
        }

        match limit {
            Some(n) => self.regex.splitn(token, n).collect(),
            None => {
                let mut segments: Vec<&str> = self.regex.split(token).collect();
                while segments.last().is_some_and(|s| s.is_empty()) {
                    segments.pop();
                }
                segments
            }
        }
    }
}

impl Default for Separator {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_SEPARATOR).expect("default separator is a valid pattern"),
        }
    }
}

impl PartialEq for Separator {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Separator {}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_splits_on_equals_and_colon() {
        let sep = Separator::default();
        assert_eq!(sep.split("user=mig", None), vec!["user", "mig"]);
        assert_eq!(sep.split("user:mig", None), vec!["user", "mig"]);
        assert_eq!(sep.split("machine = coconut", None), vec!["machine", "coconut"]);
        assert_eq!(sep.split("user=  mig", None), vec!["user", "mig"]);
    }

    #[test]
    fn test_default_only_trims_ascii_whitespace() {
        let sep = Separator::default();
        assert_eq!(sep.split("user\t=\x0Bmig", None), vec!["user", "mig"]);
        assert_eq!(
            sep.split("user\u{a0}=\u{a0}mig", None),
            vec!["user\u{a0}", "\u{a0}mig"]
        );
    }

    #[test]
    fn test_unlimited_split_produces_all_segments() {
        let sep = Separator::default();
        assert_eq!(
            sep.split("request:false:POST:500", None),
            vec!["request", "false", "POST", "500"]
        );
        assert_eq!(sep.split("users:mig=why", None), vec!["users", "mig", "why"]);
    }

    #[test]
    fn test_unlimited_split_drops_trailing_empty_segments() {
        let sep = Separator::default();
        assert_eq!(sep.split("a:b:", None), vec!["a", "b"]);
        assert_eq!(sep.split("flag::", None), vec!["flag"]);
        assert_eq!(sep.split("a::b", None), vec!["a", "", "b"]);
        assert_eq!(sep.split("=value", None), vec!["", "value"]);
    }

    #[test]
    fn test_limited_split_keeps_rest_verbatim() {
        let sep = Separator::default();
        assert_eq!(sep.split("size:5:6", Some(2)), vec!["size", "5:6"]);
        assert_eq!(sep.split("users:mig=why", Some(2)), vec!["users", "mig=why"]);
        assert_eq!(sep.split("key=", Some(2)), vec!["key", ""]);
        assert_eq!(sep.split("running", Some(2)), vec!["running"]);
    }

    #[test]
    fn test_empty_token_has_no_segments() {
        let sep = Separator::default();
        assert!(sep.split("", None).is_empty());
        assert!(sep.split("", Some(2)).is_empty());
    }

    #[test]
    fn test_literal_separator_is_escaped() {
        let sep = Separator::literal("|").unwrap();
        assert_eq!(sep.split("user|mig", None), vec!["user", "mig"]);
        assert_eq!(sep.split("a|b|c", None), vec!["a", "b", "c"]);
        assert_eq!(sep.as_str(), r"\|");

        let dot = Separator::literal(".").unwrap();
        assert_eq!(dot.split("a.b", None), vec!["a", "b"]);
        assert_eq!(dot.split("ab", None), vec!["ab"]);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        match Separator::pattern("(unclosed") {
            Err(KvError::InvalidSeparator { pattern, .. }) => assert_eq!(pattern, "(unclosed"),
            other => panic!("Expected InvalidSeparator error, got: {:?}", other),
        }
    }

    #[test]
    fn test_empty_matching_pattern_is_rejected() {
        assert!(matches!(
            Separator::pattern(r"\s*"),
            Err(KvError::EmptySeparator { .. })
        ));
        assert!(matches!(
            Separator::literal(""),
            Err(KvError::EmptySeparator { .. })
        ));
    }

    #[test]
    fn test_separator_equality_uses_pattern_text() {
        assert_eq!(Separator::default(), Separator::pattern(DEFAULT_SEPARATOR).unwrap());
        assert_ne!(Separator::default(), Separator::literal("|").unwrap());
    }
}
