// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Glob-style key patterns (`*` any run, `?` one character) used for
//! key-space prefiltering before in-memory predicates run.

use regex::Regex;

use super::entry::{MemoryTier, ADDRESS_PREFIX};

#[derive(Debug, Clone)]
pub struct KeyPattern {
    raw: String,
    regex: Regex,
}

impl KeyPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        for ch in pattern.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        Ok(Self {
            raw: pattern.to_string(),
            regex: Regex::new(&expr)?,
        })
    }

    /// Pattern covering every address in `tier` / `namespace`; `None` widens
    /// the segment to a wildcard.
    pub fn scope(tier: Option<MemoryTier>, namespace: Option<&str>) -> String {
        format!(
            "{}:{}:{}:*",
            ADDRESS_PREFIX,
            tier.map(|t| t.as_str()).unwrap_or("*"),
            namespace.unwrap_or("*")
        )
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards() {
        let pattern = KeyPattern::new("memory:short_term:*:*").unwrap();
        assert!(pattern.matches("memory:short_term:*:k1"));
        assert!(pattern.matches("memory:short_term:ns:a:b"));
        assert!(!pattern.matches("memory:long_term:ns:k1"));

        let single = KeyPattern::new("k?").unwrap();
        assert!(single.matches("k1"));
        assert!(!single.matches("k12"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let pattern = KeyPattern::new("a.b+(c)").unwrap();
        assert!(pattern.matches("a.b+(c)"));
        assert!(!pattern.matches("aXb+(c)"));
    }

    #[test]
    fn test_scope() {
        assert_eq!(KeyPattern::scope(None, None), "memory:*:*:*");
        assert_eq!(
            KeyPattern::scope(Some(MemoryTier::LongTerm), Some("docs")),
            "memory:long_term:docs:*"
        );
    }
}
