//! Lazily compiled regex validators for common string option kinds.
//!
//! Compiling on first use and caching the result mirrors the `regex_once!`
//! pattern the teacher's string types use to avoid recompiling patterns on
//! every validation call.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::Kind;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z][a-z0-9+.-]*://\S+$").expect("valid regex"));

static VARIABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

impl Kind {
    /// A string option that must look like `scheme://...`.
    pub fn url() -> Kind {
        Kind::Str { validator: Some(URL_RE.clone()) }
    }

    /// A string option restricted to a shell-variable-like identifier, used
    /// for user-defined `$NAME` variable keys.
    pub fn variable_name() -> Kind {
        Kind::Str { validator: Some(VARIABLE_NAME_RE.clone()) }
    }
}
