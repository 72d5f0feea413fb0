use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::collation::alphabet::{Confusable, normalize};
use crate::error::{ArchiveError, Result};

/// Single-pass confusable substitution.
///
/// Matches are leftmost-longest and do not overlap; replaced text is never
/// scanned again, so one rule's output cannot feed another rule.
#[derive(Debug, Clone)]
pub struct ConfusableMap {
    matcher: Option<AhoCorasick>,
    replacements: Vec<String>,
}

impl ConfusableMap {
    pub fn new(rules: &[Confusable]) -> Result<Self> {
        if rules.is_empty() {
            return Ok(ConfusableMap {
                matcher: None,
                replacements: Vec::new(),
            });
        }

        let inputs: Vec<String> = rules.iter().map(|r| normalize(&r.input)).collect();
        let replacements = rules.iter().map(|r| normalize(&r.canonical)).collect();
        let matcher = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostLongest)
            .build(&inputs)
            .map_err(|e| ArchiveError::invalid_alphabet(format!("confusables: {e}")))?;

        Ok(ConfusableMap {
            matcher: Some(matcher),
            replacements,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_none()
    }

    pub fn apply(&self, text: &str) -> String {
        match &self.matcher {
            Some(matcher) => matcher.replace_all(text, &self.replacements),
            None => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(input: &str, canonical: &str) -> Confusable {
        Confusable {
            input: input.into(),
            canonical: canonical.into(),
        }
    }

    #[test]
    fn test_longest_input_wins() {
        let map = ConfusableMap::new(&[rule("a", "x"), rule("ab", "y")]).unwrap();
        assert_eq!(map.apply("abab a"), "yy x");
    }

    #[test]
    fn test_non_feeding() {
        let map = ConfusableMap::new(&[rule("AA", "A"), rule("A", "a")]).unwrap();
        assert_eq!(map.apply("AAA"), "Aa");
    }

    #[test]
    fn test_empty_map_is_identity() {
        let map = ConfusableMap::new(&[]).unwrap();
        assert!(map.is_empty());
        assert_eq!(map.apply("ᐱᐱ"), "ᐱᐱ");
    }
}
