//! Per-site alphabet definition.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::collation::sort_key::MAX_ALPHABET_LENGTH;
use crate::error::{ArchiveError, Result};
use crate::model::SiteId;

/// A base character with its position in the alphabet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub grapheme: String,
    pub rank: u32,
}

/// An alternate form (e.g. uppercase) that sorts as its base character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterVariant {
    pub grapheme: String,
    pub base: String,
}

/// One confusable substitution, applied before tokenization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confusable {
    pub input: String,
    pub canonical: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Alphabet {
    pub site_id: SiteId,
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub variants: Vec<CharacterVariant>,
    /// Graphemes skipped when computing sort keys.
    #[serde(default)]
    pub ignorables: Vec<String>,
    /// Ordered; earlier rules win when two inputs match at the same place
    /// with the same length.
    #[serde(default)]
    pub confusables: Vec<Confusable>,
}

impl Alphabet {
    pub fn new(site_id: impl Into<SiteId>) -> Self {
        Alphabet {
            site_id: site_id.into(),
            ..Default::default()
        }
    }

    /// Build an alphabet whose ranks follow the order of `graphemes`, starting at 1.
    pub fn from_graphemes<I, S>(site_id: impl Into<SiteId>, graphemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut alphabet = Alphabet::new(site_id);
        for (i, g) in graphemes.into_iter().enumerate() {
            alphabet = alphabet.with_character(g, i as u32 + 1);
        }
        alphabet
    }

    pub fn with_character(mut self, grapheme: impl Into<String>, rank: u32) -> Self {
        self.characters.push(Character {
            grapheme: grapheme.into(),
            rank,
        });
        self
    }

    pub fn with_variant(mut self, grapheme: impl Into<String>, base: impl Into<String>) -> Self {
        self.variants.push(CharacterVariant {
            grapheme: grapheme.into(),
            base: base.into(),
        });
        self
    }

    pub fn with_ignorable(mut self, grapheme: impl Into<String>) -> Self {
        self.ignorables.push(grapheme.into());
        self
    }

    pub fn with_confusable(mut self, input: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.confusables.push(Confusable {
            input: input.into(),
            canonical: canonical.into(),
        });
        self
    }

    /// Base characters sorted by rank.
    pub fn ordered_characters(&self) -> Vec<&Character> {
        let mut chars: Vec<&Character> = self.characters.iter().collect();
        chars.sort_by_key(|c| c.rank);
        chars
    }

    /// Check uniqueness and size invariants.
    pub fn validate(&self) -> Result<()> {
        if self.characters.len() > MAX_ALPHABET_LENGTH {
            return Err(ArchiveError::invalid_alphabet(format!(
                "{} characters exceeds the maximum of {}",
                self.characters.len(),
                MAX_ALPHABET_LENGTH
            )));
        }

        let mut ranks = AHashSet::new();
        let mut graphemes = AHashSet::new();
        for c in &self.characters {
            if c.rank == 0 {
                return Err(ArchiveError::invalid_alphabet(format!(
                    "rank 0 is reserved (character '{}')",
                    c.grapheme
                )));
            }
            if !ranks.insert(c.rank) {
                return Err(ArchiveError::invalid_alphabet(format!(
                    "duplicate rank {}",
                    c.rank
                )));
            }
        }

        let all = self
            .characters
            .iter()
            .map(|c| c.grapheme.as_str())
            .chain(self.variants.iter().map(|v| v.grapheme.as_str()))
            .chain(self.ignorables.iter().map(String::as_str));
        for g in all {
            if g.is_empty() || g == " " {
                return Err(ArchiveError::invalid_alphabet(format!(
                    "grapheme '{g}' is not allowed"
                )));
            }
            if !graphemes.insert(normalize(g)) {
                return Err(ArchiveError::invalid_alphabet(format!(
                    "grapheme '{g}' is defined more than once"
                )));
            }
        }

        for v in &self.variants {
            if !self.characters.iter().any(|c| c.grapheme == v.base) {
                return Err(ArchiveError::invalid_alphabet(format!(
                    "variant '{}' refers to unknown base '{}'",
                    v.grapheme, v.base
                )));
            }
        }

        if let Some(c) = self.confusables.iter().find(|c| c.input.is_empty()) {
            return Err(ArchiveError::invalid_alphabet(format!(
                "confusable for '{}' has an empty input",
                c.canonical
            )));
        }

        Ok(())
    }
}

/// NFC-normalize text.
pub fn compose(text: &str) -> String {
    text.nfc().collect()
}

/// Trim and NFC-normalize user input such as graphemes and query terms.
pub fn normalize(text: &str) -> String {
    compose(text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_characters() {
        let alphabet = Alphabet::new("s1")
            .with_character("b", 2)
            .with_character("a", 1);
        let order: Vec<&str> = alphabet
            .ordered_characters()
            .iter()
            .map(|c| c.grapheme.as_str())
            .collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_rank_rejected() {
        let alphabet = Alphabet::new("s1")
            .with_character("a", 1)
            .with_character("b", 1);
        assert!(matches!(
            alphabet.validate(),
            Err(ArchiveError::InvalidAlphabet(_))
        ));
    }

    #[test]
    fn test_grapheme_unique_across_kinds() {
        let alphabet = Alphabet::from_graphemes("s1", ["a", "b"]).with_ignorable("a");
        assert!(alphabet.validate().is_err());

        let alphabet = Alphabet::from_graphemes("s1", ["a"]).with_variant("a", "a");
        assert!(alphabet.validate().is_err());
    }

    #[test]
    fn test_variant_needs_base() {
        let alphabet = Alphabet::from_graphemes("s1", ["a"]).with_variant("B", "b");
        assert!(alphabet.validate().is_err());
        let alphabet = Alphabet::from_graphemes("s1", ["a"]).with_variant("A", "a");
        assert!(alphabet.validate().is_ok());
    }

    #[test]
    fn test_size_limit() {
        let graphemes: Vec<String> = (0..=MAX_ALPHABET_LENGTH)
            .map(|i| format!("g{i}"))
            .collect();
        let alphabet = Alphabet::from_graphemes("s1", graphemes);
        assert!(alphabet.validate().is_err());
    }

    #[test]
    fn test_normalize_composes() {
        assert_eq!(normalize(" a\u{301} "), "\u{e1}");
    }
}
