//! Canonical package identity.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Architecture, Evr, Name};

/// The (Name, Epoch, Version, Release, Architecture) tuple that canonically
/// identifies a package.
///
/// Two packages are "the same package" iff their `Nevra`s are equal; epoch
/// defaults to `0` and is folded into [`Evr`] equality (so `1.0-1` and
/// `0:1.0-1` are the same NEVRA).
#[derive(Clone, Debug, Eq, Hash, Serialize, Deserialize)]
pub struct Nevra {
    name: Name,
    evr: Evr,
    arch: Architecture,
}

impl Nevra {
    /// Creates a new [`Nevra`].
    pub fn new(name: Name, evr: Evr, arch: Architecture) -> Self {
        Self { name, evr, arch }
    }

    /// Returns the package name.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the epoch/version/release.
    pub fn evr(&self) -> &Evr {
        &self.evr
    }

    /// Returns the architecture.
    pub fn arch(&self) -> &Architecture {
        &self.arch
    }
}

impl PartialEq for Nevra {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.evr == other.evr && self.arch == other.arch
    }
}

impl Display for Nevra {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}.{}", self.name, self.evr, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nevra(name: &str, evr: &str, arch: &str) -> Nevra {
        Nevra::new(
            Name::new(name).unwrap(),
            Evr::parse(evr).unwrap(),
            Architecture::new(arch).unwrap(),
        )
    }

    #[test]
    fn equal_to_clone() {
        let pkg = nevra("flying", "3-0", "noarch");
        assert_eq!(pkg, pkg.clone());
    }

    #[test]
    fn differs_when_any_component_differs() {
        let base = nevra("flying", "3-0", "noarch");
        assert_ne!(base, nevra("falling", "3-0", "noarch"));
        assert_ne!(base, nevra("flying", "4-0", "noarch"));
        assert_ne!(base, nevra("flying", "3-0", "x86_64"));
    }

    #[test]
    fn epoch_zero_is_canonically_equal_to_omitted() {
        assert_eq!(nevra("flying", "0:3-0", "noarch"), nevra("flying", "3-0", "noarch"));
    }
}
