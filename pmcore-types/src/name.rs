//! Package, repository, and architecture names.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// An RPM package name.
///
/// Names are non-empty and may contain alphanumerics, `-`, `_`, `.`, `+`; the
/// restriction mirrors the set accepted by `rpm`'s header name field rather
/// than any stricter convention, since package names are supplied by
/// third-party repositories this library does not control.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`], validating the allowed character set.
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+'))
        {
            return Err(Error::InvalidName(name));
        }
        Ok(Self(name))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Name::new(s)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An ASCII repository identifier, `[A-Za-z0-9_.\-:]+`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct RepoId(String);

impl RepoId {
    /// Creates a new [`RepoId`], validating the allowed character set.
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();
        if id.is_empty()
            || !id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ':'))
        {
            return Err(Error::InvalidName(id));
        }
        Ok(Self(id))
    }

    /// Returns the repo id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RepoId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RepoId::new(s)
    }
}

impl Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A package architecture, e.g. `x86_64`, `noarch`, `src`.
///
/// Unlike [`Name`] this is deliberately open (RPM architectures are an
/// unbounded, repo-defined set), so it is a thin validated wrapper rather
/// than a closed enum.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Architecture(String);

impl Architecture {
    /// The pseudo-architecture shared by packages installable on any architecture.
    pub const NOARCH: &'static str = "noarch";

    /// Creates a new [`Architecture`].
    pub fn new(arch: impl Into<String>) -> Result<Self, Error> {
        let arch = arch.into();
        if arch.is_empty() || !arch.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::InvalidArchitecture(arch));
        }
        Ok(Self(arch))
    }

    /// Returns the architecture as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is the `noarch` pseudo-architecture.
    pub fn is_noarch(&self) -> bool {
        self.0 == Self::NOARCH
    }
}

impl FromStr for Architecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Architecture::new(s)
    }
}

impl Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("penny-lib")]
    #[case("glibc++_devel")]
    #[case("a")]
    fn valid_names(#[case] input: &str) {
        assert!(Name::new(input).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("foo bar")]
    #[case("foo/bar")]
    fn invalid_names(#[case] input: &str) {
        assert!(Name::new(input).is_err());
    }

    #[test]
    fn noarch_detection() {
        let arch = Architecture::new("noarch").unwrap();
        assert!(arch.is_noarch());
        let arch = Architecture::new("x86_64").unwrap();
        assert!(!arch.is_noarch());
    }
}
