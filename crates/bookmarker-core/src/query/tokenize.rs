use std::collections::BTreeMap;

use crate::error::{BookmarkerError, Result};

/// Key under which the bare free-text word is stored.
pub const QUERY_KEY: &str = "query";

const TOKEN_SEPARATOR: char = ' ';
const KEY_VALUE_SEPARATOR: char = ':';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredicateToken {
    pub value: String,
    pub strict: bool,
}

impl PredicateToken {
    #[must_use]
    pub fn wildcard(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            strict: false,
        }
    }
}

/// Tokens keyed by the verbatim left-hand side of each `key:value` pair.
pub type Tokens = BTreeMap<String, PredicateToken>;

/// Splits a raw query into keyed tokens.
///
/// Quote characters have no special meaning. Empty fragments produced by
/// repeated or trailing spaces are skipped.
pub fn tokenize(query: &str) -> Result<Tokens> {
    let mut tokens = Tokens::new();
    for token in query.split(TOKEN_SEPARATOR) {
        if token.is_empty() {
            continue;
        }
        let parts = token.split(KEY_VALUE_SEPARATOR).collect::<Vec<_>>();
        match parts.as_slice() {
            [text] => {
                if tokens
                    .get(QUERY_KEY)
                    .is_some_and(|existing| !existing.value.is_empty())
                {
                    return Err(invalid_token(token));
                }
                tokens.insert(QUERY_KEY.to_string(), PredicateToken::wildcard(*text));
            }
            [key, value] if !key.is_empty() && !value.is_empty() => {
                tokens.insert((*key).to_string(), PredicateToken::wildcard(*value));
            }
            _ => return Err(invalid_token(token)),
        }
    }
    Ok(tokens)
}

fn invalid_token(token: &str) -> BookmarkerError {
    BookmarkerError::Parse(format!("invalid query: '{token}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(tokens: &Tokens) -> Vec<(&str, &str)> {
        tokens
            .iter()
            .map(|(key, token)| (key.as_str(), token.value.as_str()))
            .collect()
    }

    #[test]
    fn simple_query() {
        let tokens = tokenize("want:one test:two").expect("tokenize");
        assert_eq!(values(&tokens), vec![("test", "two"), ("want", "one")]);
        assert!(tokens.values().all(|token| !token.strict));
    }

    #[test]
    fn empty_query_yields_no_tokens() {
        assert!(tokenize("").expect("tokenize").is_empty());
    }

    #[test]
    fn single_value() {
        let tokens = tokenize("test:one").expect("tokenize");
        assert_eq!(values(&tokens), vec![("test", "one")]);
    }

    #[test]
    fn value_and_free_text() {
        let tokens = tokenize("test:one two").expect("tokenize");
        assert_eq!(values(&tokens), vec![("query", "two"), ("test", "one")]);
    }

    #[test]
    fn key_without_value_is_rejected() {
        let err = tokenize("test: ").expect_err("missing value");
        assert!(err.is_parse_error());
        assert!(tokenize("test:").is_err());
    }

    #[test]
    fn second_bare_word_is_rejected() {
        let err = tokenize("one two").expect_err("two bare words");
        assert_eq!(err.to_string(), "invalid query: 'two'");
    }

    #[test]
    fn multiple_separators_are_rejected() {
        assert!(tokenize("a:b:c").is_err());
        assert!(tokenize(":value").is_err());
    }

    #[test]
    fn keys_keep_their_case() {
        let tokens = tokenize("Author:ada").expect("tokenize");
        assert!(tokens.contains_key("Author"));
    }

    #[test]
    fn quotes_are_literal_text() {
        let tokens = tokenize("name:'rust'").expect("tokenize");
        assert_eq!(tokens["name"].value, "'rust'");
        assert!(!tokens["name"].strict);
    }

    #[test]
    fn repeated_spaces_are_skipped() {
        let tokens = tokenize("name:a  b ").expect("tokenize");
        assert_eq!(values(&tokens), vec![("name", "a"), ("query", "b")]);
    }
}
