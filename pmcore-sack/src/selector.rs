//! Underspecified package selectors, translated into a candidate
//! [`PackageSet`] the goal layer turns into solver jobs.

use pmcore_types::{Evr, PackageSet};

use crate::query::{Base, Comparator, Key, Query};
use crate::sack::Sack;
use crate::Error;

/// An underspecified selector: at most one filter per key.
///
/// Unlike [`Query`], a selector carries no considered-set starting point of
/// its own; it is resolved against a sack only when [`Selector::select`] is
/// called.
#[derive(Clone, Debug, Default)]
pub struct Selector {
    name: Option<String>,
    arch: Option<String>,
    evr: Option<String>,
    version: Option<String>,
    provides: Option<String>,
    file: Option<String>,
    reponame: Option<String>,
    pkg: Option<PackageSet>,
}

macro_rules! setter {
    ($method:ident, $field:ident) => {
        pub fn $method(mut self, value: impl Into<String>) -> Result<Self, Error> {
            if self.$field.is_some() {
                return Err(Error::BadSelector {
                    detail: format!("{} already set on this selector", stringify!($field)),
                });
            }
            self.$field = Some(value.into());
            Ok(self)
        }
    };
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    setter!(name, name);
    setter!(arch, arch);
    setter!(evr, evr);
    setter!(version, version);
    setter!(provides, provides);
    setter!(file, file);
    setter!(reponame, reponame);

    pub fn pkg(mut self, pkg: PackageSet) -> Result<Self, Error> {
        if self.pkg.is_some() {
            return Err(Error::BadSelector { detail: "pkg already set on this selector".to_string() });
        }
        self.pkg = Some(pkg);
        Ok(self)
    }

    /// Translates this selector against `sack`'s considered set.
    ///
    /// A selector that requires no key, or matches no package, yields an
    /// empty set rather than an error; the caller's goal layer treats an
    /// empty job as a no-op.
    pub fn select(&self, sack: &Sack) -> Result<PackageSet, Error> {
        if self.name.is_none() && self.provides.is_none() && self.file.is_none() && self.pkg.is_none() {
            return Err(Error::BadSelector {
                detail: "selector needs at least one of name, provides, file, or pkg".to_string(),
            });
        }

        let mut candidates = if let Some(pkg) = &self.pkg {
            if pkg.pool() != sack.pool_id() {
                return Err(Error::PoolMismatch { left: pkg.pool().0, right: sack.pool_id().0 });
            }
            pkg.clone()
        } else {
            let mut query = Query::new(sack);
            if let Some(name) = &self.name {
                query.ifilter(Key::Name, glob_or_eq(name), name)?;
            }
            if let Some(provides) = &self.provides {
                query.ifilter(Key::Provides, glob_or_eq(provides), provides)?;
            }
            if let Some(file) = &self.file {
                query.ifilter(Key::File, glob_or_eq(file), file)?;
            }
            query.run_set()
        };

        if let Some(arch) = &self.arch {
            if !is_known_arch(arch) {
                return Err(Error::InvalidArchitecture { arch: arch.clone() });
            }
            let mut query = Query::new(sack);
            query.ifilter(Key::Arch, Comparator::new(Base::Eq), arch)?;
            candidates = candidates.intersection(&query.run_set())?;
        }

        if let Some(evr) = &self.evr {
            Evr::parse(evr).map_err(|_| Error::BadSelector { detail: format!("invalid evr `{evr}`") })?;
            let mut query = Query::new(sack);
            query.ifilter(Key::Evr, Comparator::new(Base::Eq), evr)?;
            candidates = candidates.intersection(&query.run_set())?;
        } else if let Some(version) = &self.version {
            let mut query = Query::new(sack);
            query.ifilter(Key::Version, Comparator::new(Base::Eq), version)?;
            candidates = candidates.intersection(&query.run_set())?;
        }

        if let Some(reponame) = &self.reponame {
            let mut query = Query::new(sack);
            query.ifilter(Key::RepoName, Comparator::new(Base::Eq), reponame)?;
            candidates = candidates.intersection(&query.run_set())?;
        }

        Ok(candidates)
    }
}

fn glob_or_eq(value: &str) -> Comparator {
    if value.contains(['*', '?']) {
        Comparator::new(Base::Glob)
    } else {
        Comparator::new(Base::Eq)
    }
}

fn is_known_arch(arch: &str) -> bool {
    !arch.is_empty() && arch.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_types::{Architecture, Epoch, Name, Nevra, PackageBuilder, PoolId, Reason, RepoHandle, RepoId};

    fn pkg(name: &str, version: &str, arch: &str) -> pmcore_types::Package {
        let nevra = Nevra::new(Name::new(name).unwrap(), Evr::new(Epoch(0), version, "1"), Architecture::new(arch).unwrap());
        PackageBuilder::new(nevra, RepoHandle(0)).reason(Reason::User).build()
    }

    fn sack() -> Sack {
        let mut sack = Sack::new(PoolId(0));
        sack.attach_repo(RepoHandle(0), RepoId::new("test-repo").unwrap());
        sack.add_package(pkg("bash", "5.1", "x86_64"));
        sack.add_package(pkg("kernel-core", "5.4", "x86_64"));
        sack.make_provides_ready();
        sack
    }

    #[test]
    fn bare_selector_with_no_key_is_bad_selector() {
        let sack = sack();
        let selector = Selector::new();
        assert!(matches!(selector.select(&sack), Err(Error::BadSelector { .. })));
    }

    #[test]
    fn name_selector_resolves_to_matching_package() {
        let sack = sack();
        let selector = Selector::new().name("bash").unwrap();
        let result = selector.select(&sack).unwrap();
        assert_eq!(result.size(), 1);
    }

    #[test]
    fn unmatched_selector_is_empty_not_an_error() {
        let sack = sack();
        let selector = Selector::new().name("doesnotexist").unwrap();
        let result = selector.select(&sack).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn invalid_arch_is_rejected() {
        let sack = sack();
        let selector = Selector::new().name("bash").unwrap().arch("x86 64").unwrap();
        assert!(matches!(selector.select(&sack), Err(Error::InvalidArchitecture { .. })));
    }

    #[test]
    fn glob_name_expands_to_matching_packages() {
        let sack = sack();
        let selector = Selector::new().name("kernel*").unwrap();
        let result = selector.select(&sack).unwrap();
        assert_eq!(result.size(), 1);
    }
}
