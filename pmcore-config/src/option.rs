//! The typed, priority-ranked option cell.
//!
//! Per the design notes, the source's polymorphic `Option` class hierarchy is
//! replaced with one struct holding a tagged [`Kind`] plus a `set(priority,
//! value_text)` that dispatches on it, rather than a trait object per kind.

use std::{cell::RefCell, rc::Rc};

use regex::Regex;

use crate::{
    units::{parse_bandwidth, parse_seconds, parse_throttle, Throttle},
    Error, Priority,
};

/// The kind of value an [`OptionCell`] holds, and the validation it applies
/// on write.
#[derive(Clone, Debug)]
pub enum Kind {
    Bool,
    /// A string, optionally validated against a case-insensitive regex.
    Str { validator: Option<Regex> },
    /// A whitespace-or-comma separated list of strings.
    StringList,
    Int { min: Option<i64>, max: Option<i64> },
    Float,
    /// A closed enum of values; `canonicalize` lowercases for comparison but
    /// stores the caller's casing unless a case-insensitive match was used,
    /// in which case the canonical (first-listed) casing is stored.
    Enum { allowed: Vec<String> },
    Seconds,
    Bandwidth,
    Throttle,
    Path { must_exist: bool, must_be_absolute: bool },
}

fn invalid(name: &str, description: &'static str, detail: impl Into<String>) -> Error {
    Error::InvalidValue {
        domain: "Option",
        name: name.to_string(),
        description,
        detail: detail.into(),
    }
}

impl Kind {
    /// Validates and canonicalizes `text`, returning the value to store.
    fn validate(&self, name: &str, text: &str) -> Result<String, Error> {
        match self {
            Kind::Bool => match text.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok("true".to_string()),
                "0" | "false" | "no" | "off" => Ok("false".to_string()),
                _ => Err(invalid(name, "not a valid boolean", text.to_string())),
            },
            Kind::Str { validator } => {
                if text.is_empty() {
                    return Ok(String::new());
                }
                if let Some(re) = validator {
                    if !re.is_match(text) {
                        return Err(invalid(
                            name,
                            "does not match the required pattern",
                            text.to_string(),
                        ));
                    }
                }
                Ok(text.to_string())
            }
            Kind::StringList => Ok(text.to_string()),
            Kind::Int { min, max } => {
                let value: i64 = text
                    .trim()
                    .parse()
                    .map_err(|_| invalid(name, "not a valid integer", text.to_string()))?;
                if let Some(min) = min {
                    if value < *min {
                        return Err(invalid(name, "below the allowed minimum", text.to_string()));
                    }
                }
                if let Some(max) = max {
                    if value > *max {
                        return Err(invalid(name, "above the allowed maximum", text.to_string()));
                    }
                }
                Ok(value.to_string())
            }
            Kind::Float => {
                text.trim()
                    .parse::<f64>()
                    .map_err(|_| invalid(name, "not a valid float", text.to_string()))?;
                Ok(text.trim().to_string())
            }
            Kind::Enum { allowed } => {
                allowed
                    .iter()
                    .find(|candidate| candidate.eq_ignore_ascii_case(text.trim()))
                    .cloned()
                    .ok_or_else(|| invalid(name, "not a recognized value", text.to_string()))
            }
            Kind::Seconds => {
                parse_seconds(name, text)?;
                Ok(text.trim().to_string())
            }
            Kind::Bandwidth => {
                parse_bandwidth(name, text)?;
                Ok(text.trim().to_string())
            }
            Kind::Throttle => {
                parse_throttle(name, text)?;
                Ok(text.trim().to_string())
            }
            Kind::Path { must_exist, must_be_absolute } => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(String::new());
                }
                if *must_be_absolute && !trimmed.starts_with('/') {
                    return Err(invalid(name, "must be an absolute path", trimmed.to_string()));
                }
                if *must_exist && !std::path::Path::new(trimmed).exists() {
                    return Err(invalid(name, "path does not exist", trimmed.to_string()));
                }
                Ok(trimmed.to_string())
            }
        }
    }
}

/// A typed configuration cell: tracks the highest-priority value written so
/// far, and (for child cells) falls back to a parent cell until a value of
/// its own has been set.
#[derive(Clone, Debug)]
pub struct OptionCell {
    name: String,
    kind: Kind,
    priority: Priority,
    text: Option<String>,
    parent: Option<Rc<RefCell<OptionCell>>>,
}

impl OptionCell {
    /// Creates a new, unset option cell of the given kind.
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            priority: Priority::Empty,
            text: None,
            parent: None,
        }
    }

    /// Creates a new option cell seeded with a default value at
    /// [`Priority::Default`].
    pub fn with_default(name: impl Into<String>, kind: Kind, default: impl Into<String>) -> Result<Self, Error> {
        let mut cell = Self::new(name, kind);
        cell.set(Priority::Default, &default.into())?;
        Ok(cell)
    }

    /// Creates a child cell that reads through to `parent` until it is
    /// itself set.
    pub fn child(name: impl Into<String>, kind: Kind, parent: Rc<RefCell<OptionCell>>) -> Self {
        Self {
            name: name.into(),
            kind,
            priority: Priority::Empty,
            text: None,
            parent: Some(parent),
        }
    }

    /// Returns the option's name, as used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes `value_text`, at `priority`.
    ///
    /// Silently does nothing if `priority` does not outrank the priority
    /// already stored on this cell (not the effective, parent-aware
    /// priority — only this cell's own history of writes).
    pub fn set(&mut self, priority: Priority, value_text: &str) -> Result<(), Error> {
        if priority < self.priority {
            log::debug!(
                "ignoring write to `{}` at priority {:?}: already set at {:?}",
                self.name,
                priority,
                self.priority
            );
            return Ok(());
        }
        let validated = self.kind.validate(&self.name, value_text)?;
        self.text = Some(validated);
        self.priority = priority;
        Ok(())
    }

    /// Returns the effective priority: the higher of this cell's own
    /// priority and its parent's effective priority, if any.
    pub fn effective_priority(&self) -> Priority {
        match &self.parent {
            Some(parent) => self.priority.max(parent.borrow().effective_priority()),
            None => self.priority,
        }
    }

    /// Returns the raw stored text, reading through to the parent if this
    /// cell has never been set.
    pub fn get_text(&self) -> Option<String> {
        match &self.text {
            Some(text) => Some(text.clone()),
            None => self.parent.as_ref().and_then(|p| p.borrow().get_text()),
        }
    }

    pub fn get_bool(&self) -> Option<bool> {
        self.get_text().map(|t| t == "true")
    }

    pub fn get_string(&self) -> Option<String> {
        self.get_text()
    }

    pub fn get_string_list(&self) -> Option<Vec<String>> {
        self.get_text().map(|t| {
            t.split([',', ' ', '\t', '\n'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    pub fn get_int(&self) -> Option<i64> {
        self.get_text().and_then(|t| t.parse().ok())
    }

    pub fn get_float(&self) -> Option<f64> {
        self.get_text().and_then(|t| t.parse().ok())
    }

    /// Returns the seconds value, with `never` mapped to `u64::MAX`.
    pub fn get_seconds(&self) -> Option<u64> {
        self.get_text()
            .map(|t| parse_seconds(&self.name, &t).expect("validated at write time"))
    }

    pub fn get_bandwidth(&self) -> Option<u64> {
        self.get_text()
            .map(|t| parse_bandwidth(&self.name, &t).expect("validated at write time"))
    }

    pub fn get_throttle(&self) -> Option<Throttle> {
        self.get_text()
            .map(|t| parse_throttle(&self.name, &t).expect("validated at write time"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_write_wins() {
        let mut cell = OptionCell::new("cost", Kind::Int { min: Some(1), max: None });
        cell.set(Priority::MainConfig, "1000").unwrap();
        cell.set(Priority::RepoConfig, "500").unwrap();
        assert_eq!(cell.get_int(), Some(500));
    }

    #[test]
    fn lower_priority_write_is_silently_rejected() {
        let mut cell = OptionCell::new("cost", Kind::Int { min: Some(1), max: None });
        cell.set(Priority::RepoConfig, "500").unwrap();
        cell.set(Priority::MainConfig, "1000").unwrap();
        assert_eq!(cell.get_int(), Some(500));
    }

    #[test]
    fn bad_value_is_a_typed_error() {
        let mut cell = OptionCell::new("cost", Kind::Int { min: Some(1), max: None });
        let err = cell.set(Priority::MainConfig, "not-a-number").unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }

    #[test]
    fn child_reads_through_parent_until_set() {
        let parent = Rc::new(RefCell::new(OptionCell::new("reposdir", Kind::Str { validator: None })));
        parent.borrow_mut().set(Priority::MainConfig, "/etc/repos.d").unwrap();

        let mut child = OptionCell::child("cachedir_override", Kind::Str { validator: None }, parent.clone());
        assert_eq!(child.get_string().as_deref(), Some("/etc/repos.d"));
        assert_eq!(child.effective_priority(), Priority::MainConfig);

        child.set(Priority::RepoConfig, "/srv/repos.d").unwrap();
        assert_eq!(child.get_string().as_deref(), Some("/srv/repos.d"));
        assert_eq!(child.effective_priority(), Priority::RepoConfig);
    }

    #[test]
    fn enum_rejects_unknown_value() {
        let mut cell = OptionCell::new(
            "proxy_auth_method",
            Kind::Enum {
                allowed: vec!["any".into(), "basic".into(), "digest".into()],
            },
        );
        assert!(cell.set(Priority::MainConfig, "bogus").is_err());
        cell.set(Priority::MainConfig, "Basic").unwrap();
        assert_eq!(cell.get_string().as_deref(), Some("basic"));
    }
}
