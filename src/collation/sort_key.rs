//! Printable sort codes.
//!
//! Position `n` in the collation order maps to the `n`-th code of a table built
//! from printable Basic Latin followed by Latin Extended A and B, skipping the
//! double quote and backslash. Codes increase strictly with position, so plain
//! string comparison of keys follows rank order. Position 0 is the space.

use lazy_static::lazy_static;

/// Prefix for graphemes missing from the alphabet. Sorts after every code.
pub const UNKNOWN_FLAG: char = '\u{2691}';

const EXCLUDED: [u32; 2] = [34, 92];

lazy_static! {
    static ref SORT_CODES: Vec<char> = (32u32..127)
        .chain(256u32..592)
        .filter(|c| !EXCLUDED.contains(c))
        .filter_map(char::from_u32)
        .collect();
}

/// Number of base characters an alphabet may hold; the space takes one code.
pub const MAX_ALPHABET_LENGTH: usize = 95 + 336 - EXCLUDED.len() - 1;

/// Code for an order position, or `None` past the end of the table.
pub fn sort_code(position: usize) -> Option<char> {
    SORT_CODES.get(position).copied()
}

/// Encoding of a grapheme the alphabet does not know.
pub fn unknown_code(c: char) -> String {
    let mut s = String::with_capacity(c.len_utf8() + UNKNOWN_FLAG.len_utf8());
    s.push(UNKNOWN_FLAG);
    s.push(c);
    s
}

pub fn contains_unknown(key: &str) -> bool {
    key.contains(UNKNOWN_FLAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        assert_eq!(sort_code(0), Some(' '));
        assert_eq!(sort_code(1), Some('!'));
        assert_eq!(sort_code(2), Some('#'));
        assert_eq!(SORT_CODES.len(), MAX_ALPHABET_LENGTH + 1);
        assert!(!SORT_CODES.contains(&'"'));
        assert!(!SORT_CODES.contains(&'\\'));
        assert_eq!(sort_code(MAX_ALPHABET_LENGTH + 1), None);
    }

    #[test]
    fn test_codes_strictly_increase() {
        assert!(SORT_CODES.windows(2).all(|w| w[0] < w[1]));
        let last = SORT_CODES[SORT_CODES.len() - 1];
        assert!(last < UNKNOWN_FLAG);
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(unknown_code('d'), "\u{2691}d");
        assert!(contains_unknown(&unknown_code('x')));
    }
}
