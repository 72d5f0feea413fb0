//! Greedy longest-match tokenizer over an alphabet.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::collation::alphabet::{Alphabet, normalize};
use crate::error::{ArchiveError, Result};

/// How a token participates in ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Base character (or the space) at this order position.
    Base(usize),
    /// Variant sorting at its base character's position.
    Variant(usize),
    Ignorable,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub kind: TokenKind,
}

impl Token {
    pub fn is_unknown(&self) -> bool {
        self.kind == TokenKind::Unknown
    }

    /// Order position, if the token takes part in ordering.
    pub fn position(&self) -> Option<usize> {
        match self.kind {
            TokenKind::Base(p) | TokenKind::Variant(p) => Some(p),
            TokenKind::Ignorable | TokenKind::Unknown => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    matcher: AhoCorasick,
    kinds: Vec<TokenKind>,
}

impl Tokenizer {
    pub fn new(alphabet: &Alphabet) -> Result<Self> {
        let ordered = alphabet.ordered_characters();

        let mut patterns = vec![" ".to_string()];
        let mut kinds = vec![TokenKind::Base(0)];
        for (i, c) in ordered.iter().enumerate() {
            patterns.push(normalize(&c.grapheme));
            kinds.push(TokenKind::Base(i + 1));
        }
        for v in &alphabet.variants {
            let Some(base) = ordered.iter().position(|c| c.grapheme == v.base) else {
                return Err(ArchiveError::invalid_alphabet(format!(
                    "variant '{}' refers to unknown base '{}'",
                    v.grapheme, v.base
                )));
            };
            patterns.push(normalize(&v.grapheme));
            kinds.push(TokenKind::Variant(base + 1));
        }
        for g in &alphabet.ignorables {
            patterns.push(normalize(g));
            kinds.push(TokenKind::Ignorable);
        }

        let matcher = AhoCorasickBuilder::new()
            .match_kind(MatchKind::LeftmostLongest)
            .build(&patterns)
            .map_err(|e| ArchiveError::invalid_alphabet(format!("tokenizer: {e}")))?;

        Ok(Tokenizer { matcher, kinds })
    }

    /// Split `text` into tokens. Text between matches becomes one unknown
    /// token per character. Total: the token texts concatenate to `text`.
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut last = 0;
        for m in self.matcher.find_iter(text) {
            push_unknown(&mut tokens, &text[last..m.start()]);
            tokens.push(Token {
                text: text[m.start()..m.end()].to_string(),
                kind: self.kinds[m.pattern().as_usize()],
            });
            last = m.end();
        }
        push_unknown(&mut tokens, &text[last..]);
        tokens
    }
}

fn push_unknown(tokens: &mut Vec<Token>, gap: &str) {
    tokens.extend(gap.chars().map(|c| Token {
        text: c.to_string(),
        kind: TokenKind::Unknown,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn test_longest_match() {
        let alphabet = Alphabet::from_graphemes("s1", ["a", "aa"]);
        let tokenizer = Tokenizer::new(&alphabet).unwrap();
        assert_eq!(texts(&tokenizer.tokenize("aaa")), vec!["aa", "a"]);
    }

    #[test]
    fn test_unknown_runs_split_per_char() {
        let alphabet = Alphabet::from_graphemes("s1", ["a", "b"]);
        let tokenizer = Tokenizer::new(&alphabet).unwrap();
        let tokens = tokenizer.tokenize("axyb");
        assert_eq!(texts(&tokens), vec!["a", "x", "y", "b"]);
        assert!(tokens[1].is_unknown());
        assert_eq!(tokens[3].kind, TokenKind::Base(2));
    }

    #[test]
    fn test_variants_space_and_ignorables() {
        let alphabet = Alphabet::from_graphemes("s1", ["a", "b"])
            .with_variant("B", "b")
            .with_ignorable("-");
        let tokenizer = Tokenizer::new(&alphabet).unwrap();
        let kinds: Vec<TokenKind> = tokenizer.tokenize("a B-").iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Base(1),
                TokenKind::Base(0),
                TokenKind::Variant(2),
                TokenKind::Ignorable,
            ]
        );
    }

    #[test]
    fn test_total_and_deterministic() {
        let alphabet = Alphabet::from_graphemes("s1", ["k", "kw", "w"]);
        let tokenizer = Tokenizer::new(&alphabet).unwrap();
        let input = "kwkw ẃ!";
        let first = tokenizer.tokenize(input);
        assert_eq!(texts(&first).concat(), input);
        assert_eq!(first, tokenizer.tokenize(input));
    }
}
