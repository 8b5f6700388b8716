//! Text-or-pattern matchers used by stream and file content assertions.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::model::MAX_REGEX_PATTERN_LEN;

/// Compiled regex size limit, bounds memory for hostile patterns.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// A literal substring requirement or a regular-expression requirement.
///
/// On the wire a plain string is a [`Matcher::Literal`] and an object
/// `{"pattern": "...", "flags": "i"}` is a [`Matcher::Pattern`].
#[derive(Clone, Debug, PartialEq)]
pub enum Matcher {
    /// Requires the text to contain this substring.
    Literal(String),
    /// Requires the text to match this regular expression somewhere.
    Pattern(Pattern),
}

/// A compiled regular expression together with the source and flags it was written as.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    flags: String,
    regex: Regex,
}

impl Pattern {
    /// The pattern as written, without flags.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Effective flags, each of `i`, `m`, `s` at most once.
    #[must_use]
    pub fn flags(&self) -> &str {
        &self.flags
    }

    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

/// Why a pattern matcher could not be built.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MatcherError {
    #[error("pattern is {len} characters long (limit {max})", max = MAX_REGEX_PATTERN_LEN)]
    TooLong { len: usize },
    #[error("unsupported pattern flag '{0}' (expected i, m or s)")]
    UnknownFlag(char),
    #[error("invalid pattern: {0}")]
    Invalid(String),
}

impl Matcher {
    /// Literal substring matcher.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// Pattern matcher with no flags.
    pub fn pattern(pattern: &str) -> Result<Self, MatcherError> {
        Self::pattern_with_flags(pattern, "")
    }

    /// Pattern matcher with `i` (case-insensitive), `m` (multi-line) and `s` (dot-all) flags.
    pub fn pattern_with_flags(pattern: &str, flags: &str) -> Result<Self, MatcherError> {
        let flags = normalize_flags(flags)?;
        let regex = compile_safe_regex(pattern, &flags)?;
        Ok(Self::Pattern(Pattern {
            source: pattern.to_string(),
            flags,
            regex,
        }))
    }

    /// Whether `text` satisfies this matcher.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Literal(needle) => text.contains(needle.as_str()),
            Self::Pattern(pattern) => pattern.is_match(text),
        }
    }

    /// Source text of the matcher, without pattern flags.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(needle) => needle,
            Self::Pattern(pattern) => pattern.source(),
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(needle) => write!(f, "\"{needle}\""),
            Self::Pattern(pattern) => write!(f, "/{}/{}", pattern.source, pattern.flags),
        }
    }
}

/// Keep `i`, `m` and `s` once each; JS-style `g` and `u` do not change match semantics.
fn normalize_flags(flags: &str) -> Result<String, MatcherError> {
    let mut kept = String::new();
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' if !kept.contains(flag) => kept.push(flag),
            'i' | 'm' | 's' | 'g' | 'u' => {}
            other => return Err(MatcherError::UnknownFlag(other)),
        }
    }
    Ok(kept)
}

/// Compile a user-supplied pattern with length and size limits.
pub fn compile_safe_regex(pattern: &str, flags: &str) -> Result<Regex, MatcherError> {
    let len = pattern.chars().count();
    if len > MAX_REGEX_PATTERN_LEN {
        return Err(MatcherError::TooLong { len });
    }
    let flags = normalize_flags(flags)?;
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .map_err(|err| MatcherError::Invalid(err.to_string()))
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum MatcherRepr {
    Text(String),
    Pattern {
        pattern: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        flags: String,
    },
}

impl Serialize for Matcher {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            Self::Literal(text) => MatcherRepr::Text(text.clone()),
            Self::Pattern(pattern) => MatcherRepr::Pattern {
                pattern: pattern.source.clone(),
                flags: pattern.flags.clone(),
            },
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Matcher {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match MatcherRepr::deserialize(deserializer)? {
            MatcherRepr::Text(text) => Ok(Self::Literal(text)),
            MatcherRepr::Pattern { pattern, flags } => {
                Self::pattern_with_flags(&pattern, &flags).map_err(serde::de::Error::custom)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn literal_is_plain_substring() {
        let matcher = Matcher::literal("a.c");
        assert!(matcher.is_match("xa.cx"));
        assert!(!matcher.is_match("abc"));
    }

    #[test]
    fn pattern_flags_apply() {
        let matcher = Matcher::pattern_with_flags("^usage", "im").unwrap();
        assert!(matcher.is_match("pkg 1.0\nUSAGE: pkg [options]"));
    }

    #[test]
    fn oversized_pattern_is_rejected() {
        let pattern = "a".repeat(MAX_REGEX_PATTERN_LEN + 1);
        assert!(matches!(
            Matcher::pattern(&pattern),
            Err(MatcherError::TooLong { .. })
        ));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert_eq!(
            Matcher::pattern_with_flags("x", "q").unwrap_err(),
            MatcherError::UnknownFlag('q')
        );
    }

    #[test]
    fn wire_form_distinguishes_text_from_pattern() {
        let parsed: Vec<Matcher> =
            serde_json::from_str(r#"["v1.2", {"pattern": "v\\d+\\.\\d+"}]"#).unwrap();
        assert!(matches!(parsed[0], Matcher::Literal(_)));
        assert!(matches!(parsed[1], Matcher::Pattern(_)));
        assert!(parsed[1].is_match("v3.14"));
    }

    #[test]
    fn invalid_pattern_fails_deserialization() {
        let parsed: Result<Matcher, _> = serde_json::from_str(r#"{"pattern": "("}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn flags_survive_serialization() {
        let matcher = Matcher::pattern_with_flags("ready", "ig").unwrap();
        let json = serde_json::to_string(&matcher).unwrap();
        let reparsed: Matcher = serde_json::from_str(&json).unwrap();
        assert!(reparsed.is_match("READY"));
        assert_eq!(reparsed, matcher);
        assert_eq!(json, r#"{"pattern":"ready","flags":"i"}"#);
    }

    #[test]
    fn display_names_pattern_as_written() {
        let matcher = Matcher::pattern_with_flags("^v\\d+", "smi").unwrap();
        assert_eq!(matcher.to_string(), "/^v\\d+/smi");
        assert_eq!(matcher.as_str(), "^v\\d+");
        assert_eq!(Matcher::pattern("x").unwrap().to_string(), "/x/");
    }
}
