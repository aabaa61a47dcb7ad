//! Glob matching over index, action and host names.
//!
//! `*` stands for any run of characters (including none); every other
//! character matches itself. A name matches the matcher when it matches at
//! least one configured pattern.

use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Pattern {
    raw: String,
    // Literal runs between `*`s; a pattern without `*` has exactly one.
    parts: Vec<String>,
}

impl Pattern {
    fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            parts: raw.split('*').map(str::to_string).collect(),
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        if self.parts.len() == 1 {
            return self.raw == candidate;
        }

        let (Some(first), Some(last)) = (self.parts.first(), self.parts.last()) else {
            return false;
        };
        let middle = &self.parts[1..self.parts.len() - 1];

        if candidate.len() < first.len() + last.len()
            || !candidate.starts_with(first.as_str())
            || !candidate.ends_with(last.as_str())
        {
            return false;
        }

        let mut window = &candidate[first.len()..candidate.len() - last.len()];
        for part in middle {
            if part.is_empty() {
                continue;
            }
            match window.find(part.as_str()) {
                Some(pos) => window = &window[pos + part.len()..],
                None => return false,
            }
        }
        true
    }
}

/// Immutable set of glob patterns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatcherWithWildcards {
    patterns: Vec<Pattern>,
}

impl MatcherWithWildcards {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();
        Self {
            patterns: unique.iter().map(|p| Pattern::new(p)).collect(),
        }
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.raw.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True when `candidate` matches at least one pattern.
    pub fn matches(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(candidate))
    }

    /// Keeps exactly the candidates that match at least one pattern.
    pub fn filter<'a, I>(&self, candidates: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        candidates
            .into_iter()
            .filter(|c| self.matches(c))
            .cloned()
            .collect()
    }
}

impl fmt::Display for MatcherWithWildcards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.patterns().collect::<Vec<_>>().join(",");
        write!(f, "[{joined}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_set;

    #[test]
    fn star_matches_everything() {
        let matcher = MatcherWithWildcards::new(["*"]);
        let candidates = index_set(["a", "logstash-2024", ""]);
        assert_eq!(matcher.filter(&candidates), candidates);
    }

    #[test]
    fn exact_patterns_need_equality() {
        let matcher = MatcherWithWildcards::new(["logs"]);
        assert!(matcher.matches("logs"));
        assert!(!matcher.matches("logs-1"));
        assert!(!matcher.matches("log"));
    }

    #[test]
    fn wildcards_anchor_prefix_and_suffix() {
        let matcher = MatcherWithWildcards::new(["cluster:*get*"]);
        assert!(matcher.matches("cluster:admin/settings/get"));
        assert!(matcher.matches("cluster:get"));
        assert!(!matcher.matches("indices:get"));

        let matcher = MatcherWithWildcards::new(["a*b*c"]);
        assert!(matcher.matches("abc"));
        assert!(matcher.matches("a-b-c"));
        assert!(!matcher.matches("ac"));
        assert!(!matcher.matches("a-c-b"));
    }

    #[test]
    fn overlapping_prefix_and_suffix_do_not_match() {
        let matcher = MatcherWithWildcards::new(["ab*ba"]);
        assert!(!matcher.matches("aba"));
        assert!(matcher.matches("abba"));
    }

    #[test]
    fn filter_keeps_only_matches() {
        let matcher = MatcherWithWildcards::new(["logstash-*", "metrics"]);
        let available = index_set(["logstash-1", "logstash-2", "metrics", "secrets"]);
        assert_eq!(
            matcher.filter(&available),
            index_set(["logstash-1", "logstash-2", "metrics"])
        );
    }
}
