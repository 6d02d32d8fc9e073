//! Case-insensitive palindrome check.

/// True when `input` reads the same backwards, ignoring case.
/// Compares Unicode scalar values; the empty string is a palindrome.
pub fn is_palindrome(input: &str) -> bool {
    let folded: Vec<char> = input.chars().flat_map(char::to_lowercase).collect();
    folded.iter().eq(folded.iter().rev())
}

/// The line printed for `input`.
pub fn verdict(input: &str) -> String {
    if is_palindrome(input) {
        format!("Result: \"{input}\" is a palindrome.")
    } else {
        format!("Result: \"{input}\" is NOT a palindrome.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_palindromes() {
        for s in ["", "a", "aa", "aba", "Racecar", "Noon", "ÉtÉ", "été"] {
            assert!(is_palindrome(s), "{s:?}");
        }
    }

    #[test]
    fn rejects_non_palindromes() {
        for s in ["ab", "abc", "palindrome", "Ab a"] {
            assert!(!is_palindrome(s), "{s:?}");
        }
    }

    #[test]
    fn whitespace_and_punctuation_count() {
        assert!(!is_palindrome("never odd or even"));
        assert!(is_palindrome("a b a"));
    }

    #[test]
    fn verdict_lines() {
        assert_eq!(verdict("Level"), "Result: \"Level\" is a palindrome.");
        assert_eq!(verdict("hello"), "Result: \"hello\" is NOT a palindrome.");
    }
}
