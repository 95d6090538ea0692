//! `$NAME`-style variable substitution for repo URLs.

use std::collections::BTreeMap;

/// A process-wide map of substitution variables: `releasever`, `basearch`,
/// `arch`, `testdatadir`, plus any user-defined `$NAME`.
#[derive(Clone, Debug, Default)]
pub struct VarMap {
    vars: BTreeMap<String, String>,
}

impl VarMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the default map from host detection: `basearch`/`arch` from
    /// the running architecture, `releasever` left unset for the caller to
    /// supply (there is no portable way to detect it without reading
    /// distro-specific files, which is out of scope here).
    pub fn from_host() -> Self {
        let mut vars = BTreeMap::new();
        vars.insert("basearch".to_string(), std::env::consts::ARCH.to_string());
        vars.insert("arch".to_string(), std::env::consts::ARCH.to_string());
        Self { vars }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Replaces every `$name` (longest-name-first, to avoid `$arch` eating
    /// part of `$basearch`) with its value. A variable with no entry expands
    /// to the empty string and logs a warning.
    pub fn expand(&self, text: &str) -> String {
        let mut names: Vec<&String> = self.vars.keys().collect();
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        'outer: while let Some(dollar) = rest.find('$') {
            out.push_str(&rest[..dollar]);
            let after = &rest[dollar + 1..];
            for name in &names {
                if after.starts_with(name.as_str()) {
                    out.push_str(self.vars.get(*name).unwrap());
                    rest = &after[name.len()..];
                    continue 'outer;
                }
            }
            let end = after.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).unwrap_or(after.len());
            let name = &after[..end];
            if name.is_empty() {
                out.push('$');
                rest = after;
            } else {
                log::warn!("undefined variable `${name}` expanded to empty string");
                rest = &after[end..];
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_variables() {
        let mut vars = VarMap::new();
        vars.set("releasever", "40");
        vars.set("basearch", "x86_64");
        assert_eq!(
            vars.expand("https://example.test/$releasever/$basearch/os"),
            "https://example.test/40/x86_64/os"
        );
    }

    #[test]
    fn longest_match_wins() {
        let mut vars = VarMap::new();
        vars.set("arch", "generic");
        vars.set("basearch", "x86_64");
        assert_eq!(vars.expand("$basearch-$arch"), "x86_64-generic");
    }

    #[test]
    fn unknown_variable_expands_to_empty() {
        let vars = VarMap::new();
        assert_eq!(vars.expand("prefix-$unknown-suffix"), "prefix--suffix");
    }
}
