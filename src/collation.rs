//! Alphabet collation.
//!
//! A [`Collator`] is compiled once from a site's [`Alphabet`] and turns titles
//! into a cleaned title plus an order key that sorts by alphabet rank under
//! plain string comparison:
//!
//! ```ignore
//! let alphabet = Alphabet::from_graphemes("site", ["a", "aa", "b"]);
//! let collator = Collator::new(&alphabet)?;
//! let result = collator.clean("aaab");
//! assert_eq!(result.order_key, "#!$");
//! ```

pub mod alphabet;
pub mod confusables;
pub mod recalculate;
pub mod sort_key;
pub mod tokenizer;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use alphabet::{Alphabet, Character, CharacterVariant, Confusable};
pub use confusables::ConfusableMap;
pub use recalculate::{
    CollationJobs, EntryChange, RecalculationMode, RecalculationReport, recalculate,
    site_alphabet,
};
pub use tokenizer::{Token, TokenKind, Tokenizer};

use crate::collation::alphabet::{compose, normalize};
use crate::collation::sort_key::{sort_code, unknown_code};
use crate::error::Result;
use crate::model::DictionaryEntry;

/// Output of [`Collator::clean`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collation {
    pub cleaned_title: String,
    pub order_key: String,
    /// Occurrences of each grapheme missing from the alphabet.
    pub unknown_counts: BTreeMap<String, usize>,
    /// True when cleaning changed the title.
    pub is_title_updated: bool,
}

impl Collation {
    pub fn has_unknown(&self) -> bool {
        !self.unknown_counts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Collator {
    confusables: ConfusableMap,
    tokenizer: Tokenizer,
}

impl Collator {
    pub fn new(alphabet: &Alphabet) -> Result<Self> {
        alphabet.validate()?;
        Ok(Collator {
            confusables: ConfusableMap::new(&alphabet.confusables)?,
            tokenizer: Tokenizer::new(alphabet)?,
        })
    }

    /// Confusable-clean text. Surrounding whitespace is kept.
    pub fn clean_confusables(&self, text: &str) -> String {
        self.confusables.apply(&compose(text))
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        self.tokenizer.tokenize(text)
    }

    /// The characters of `text` as the alphabet splits them.
    pub fn characters(&self, text: &str) -> Vec<String> {
        self.tokenize(text).into_iter().map(|t| t.text).collect()
    }

    /// Order key of already-cleaned text.
    pub fn order_key(&self, text: &str) -> String {
        let mut key = String::new();
        for token in self.tokenize(text) {
            match token.kind {
                TokenKind::Base(p) | TokenKind::Variant(p) => match sort_code(p) {
                    Some(code) => key.push(code),
                    None => key.push_str(&token.text),
                },
                TokenKind::Ignorable => {}
                TokenKind::Unknown => {
                    for c in token.text.chars() {
                        key.push_str(&unknown_code(c));
                    }
                }
            }
        }
        key
    }

    /// Confusable-clean a title, then derive its order key.
    pub fn clean(&self, title: &str) -> Collation {
        let cleaned_title = self.clean_confusables(title);

        let mut unknown_counts = BTreeMap::new();
        for token in self.tokenize(&cleaned_title) {
            if token.is_unknown() {
                *unknown_counts.entry(token.text).or_insert(0) += 1;
            }
        }

        Collation {
            order_key: self.order_key(&cleaned_title),
            is_title_updated: cleaned_title != title,
            cleaned_title,
            unknown_counts,
        }
    }

    /// Clean a dictionary entry's title and set its order key, as done
    /// whenever the entry is saved.
    pub fn apply(&self, entry: &mut DictionaryEntry) -> Collation {
        let collation = self.clean(&entry.meta.title);
        if collation.is_title_updated {
            entry.meta.title = collation.cleaned_title.clone();
        }
        entry.custom_order = collation.order_key.clone();
        collation
    }

    /// Order-key form of a starts-with prefix, or `None` when the prefix holds
    /// a grapheme the alphabet does not know.
    pub fn prefix_key(&self, prefix: &str) -> Option<String> {
        let cleaned = self.confusables.apply(&normalize(prefix));
        if cleaned.is_empty() || self.tokenize(&cleaned).iter().any(Token::is_unknown) {
            return None;
        }
        Some(self.order_key(&cleaned))
    }
}

/// One-shot collation of a single title.
pub fn collate(alphabet: &Alphabet, title: &str) -> Result<Collation> {
    Ok(Collator::new(alphabet)?.clean(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_title() {
        let collation = collate(&Alphabet::from_graphemes("s1", ["a"]), "").unwrap();
        assert_eq!(collation.order_key, "");
        assert_eq!(collation.cleaned_title, "");
        assert!(!collation.is_title_updated);
    }

    #[test]
    fn test_surrounding_whitespace_is_kept() {
        let alphabet = Alphabet::from_graphemes("s1", ["a", "b"]);
        let collation = collate(&alphabet, "  ab ").unwrap();
        assert_eq!(collation.cleaned_title, "  ab ");
        assert_eq!(collation.order_key, "  !# ");
        assert!(!collation.is_title_updated);

        // Composing a decomposed accent is a change to the title.
        let composed = collate(&alphabet, "a\u{301}b").unwrap();
        assert_eq!(composed.cleaned_title, "\u{e1}b");
        assert!(composed.is_title_updated);
    }

    #[test]
    fn test_apply_sets_title_and_order_key() {
        let alphabet = Alphabet::from_graphemes("s1", ["a", "b"]).with_confusable("á", "a");
        let collator = Collator::new(&alphabet).unwrap();
        let mut entry: DictionaryEntry = serde_json::from_value(serde_json::json!({
            "id": "1",
            "site": {"id": "s1", "slug": "s1", "title": "Site One", "visibility": "public"},
            "visibility": "public",
            "title": "bá",
            "created": "2025-03-01T09:00:00Z",
            "last_modified": "2025-03-01T09:00:00Z",
            "entry_type": "word",
        }))
        .unwrap();

        let collation = collator.apply(&mut entry);
        assert!(collation.is_title_updated);
        assert_eq!(entry.meta.title, "ba");
        assert_eq!(entry.custom_order, "#!");
    }

    #[test]
    fn test_space_sorts_first() {
        let collator = Collator::new(&Alphabet::from_graphemes("s1", ["a", "b"])).unwrap();
        assert_eq!(collator.order_key("ab ab"), "!# !#");
        assert!(collator.order_key("a b") < collator.order_key("aa"));
    }

    #[test]
    fn test_unknowns_sort_last_and_are_counted() {
        let collator = Collator::new(&Alphabet::from_graphemes("s1", ["a", "b"])).unwrap();
        let collation = collator.clean("abdd");
        assert_eq!(collation.order_key, "!#\u{2691}d\u{2691}d");
        assert_eq!(collation.unknown_counts.get("d"), Some(&2));
        assert!(collator.order_key("bd") > collator.order_key("bb"));
    }

    #[test]
    fn test_all_unknown_title() {
        let collation = collate(&Alphabet::from_graphemes("s1", ["a"]), "xy").unwrap();
        assert_eq!(collation.order_key, "\u{2691}x\u{2691}y");
        assert!(!collation.is_title_updated);
    }

    #[test]
    fn test_variants_sort_as_base_and_ignorables_skip() {
        let alphabet = Alphabet::from_graphemes("s1", ["a", "b"])
            .with_variant("A", "a")
            .with_ignorable("'");
        let collator = Collator::new(&alphabet).unwrap();
        assert_eq!(collator.order_key("Ab"), collator.order_key("ab"));
        assert_eq!(collator.order_key("a'b"), collator.order_key("ab"));
    }

    #[test]
    fn test_prefix_key() {
        let alphabet = Alphabet::from_graphemes("s1", ["a", "b"]).with_confusable("á", "a");
        let collator = Collator::new(&alphabet).unwrap();
        assert_eq!(collator.prefix_key("áb"), Some("!#".to_string()));
        assert_eq!(collator.prefix_key("az"), None);
        assert_eq!(collator.prefix_key(""), None);
    }

    #[test]
    fn test_rank_order_is_key_order() {
        let alphabet = Alphabet::new("s1")
            .with_character("z", 1)
            .with_character("y", 5)
            .with_character("x", 9);
        let collator = Collator::new(&alphabet).unwrap();
        let mut words = vec!["x", "zy", "y", "z"];
        words.sort_by_key(|w| collator.order_key(w));
        assert_eq!(words, vec!["z", "zy", "y", "x"]);
    }
}
