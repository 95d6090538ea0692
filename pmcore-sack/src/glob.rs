//! Shell-style glob matching (`*`, `?`) used by installonly patterns and the
//! query layer's `Glob` comparator.
//!
//! No glob crate appears anywhere in the corpus this workspace is grounded
//! on, so patterns are compiled to an anchored [`regex::Regex`] instead of
//! hand-rolling a matcher, the same tradeoff `pmcore-repo`'s repomd parser
//! makes for XML.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::Error;

static SPECIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.+()|\[\]{}^$\\]").unwrap());

/// Compiles `pattern` into a [`Regex`] anchored to match the whole input.
pub fn compile_glob(pattern: &str) -> Result<Regex, Error> {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            _ if SPECIAL.is_match(&ch.to_string()) => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out.push('$');
    Regex::new(&out).map_err(|err| Error::InvalidGlob {
        pattern: pattern.to_string(),
        detail: err.to_string(),
    })
}

/// Returns `true` if `text` matches the glob `pattern`.
pub fn glob_matches(pattern: &str, text: &str) -> bool {
    compile_glob(pattern).map(|re| re.is_match(text)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_any_suffix() {
        assert!(glob_matches("kernel*", "kernel-devel"));
        assert!(!glob_matches("kernel*", "libkernel"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(glob_matches("a?c", "abc"));
        assert!(!glob_matches("a?c", "ac"));
    }

    #[test]
    fn special_characters_are_escaped() {
        assert!(glob_matches("a.b", "a.b"));
        assert!(!glob_matches("a.b", "axb"));
    }
}
