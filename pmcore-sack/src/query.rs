//! Lazy ifilter queries over a sack's considered set.

use std::cmp::Ordering;
use std::collections::HashMap;

use pmcore_types::{Evr, Package, PackageId, PackageSet};

use crate::glob::glob_matches;
use crate::sack::Sack;
use crate::Error;

/// The field a filter matches against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Key {
    Name,
    Epoch,
    Version,
    Release,
    Arch,
    Evr,
    Nevra,
    RepoName,
    Summary,
    Description,
    Url,
    File,
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Recommends,
    Suggests,
    Enhances,
    Supplements,
    Installed,
    Downgrades,
    Upgrades,
    LatestPerArch,
    Latest,
    Empty,
}

/// The base comparison a filter performs, before the `NOT` modifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Base {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Glob,
    Substr,
}

/// A comparator: a [`Base`] comparison, optionally negated, optionally
/// case-insensitive (meaningful only for [`Base::Glob`] and [`Base::Substr`]).
#[derive(Clone, Copy, Debug)]
pub struct Comparator {
    pub base: Base,
    pub negate: bool,
    pub case_insensitive: bool,
}

impl Comparator {
    pub fn new(base: Base) -> Self {
        Self { base, negate: false, case_insensitive: false }
    }

    pub fn not(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    fn apply_str(self, candidate: &str, value: &str) -> bool {
        let (candidate_cmp, value_cmp);
        let (candidate, value) = if self.case_insensitive {
            candidate_cmp = candidate.to_lowercase();
            value_cmp = value.to_lowercase();
            (candidate_cmp.as_str(), value_cmp.as_str())
        } else {
            (candidate, value)
        };
        let result = match self.base {
            Base::Eq => candidate == value,
            Base::Neq => candidate != value,
            Base::Glob => glob_matches(value, candidate),
            Base::Substr => candidate.contains(value),
            Base::Gt | Base::Gte | Base::Lt | Base::Lte => {
                let ord = candidate.cmp(value);
                Self::ordering_matches(self.base, ord)
            }
        };
        result != self.negate
    }

    fn ordering_matches(base: Base, ord: Ordering) -> bool {
        match base {
            Base::Gt => ord == Ordering::Greater,
            Base::Gte => ord != Ordering::Less,
            Base::Lt => ord == Ordering::Less,
            Base::Lte => ord != Ordering::Greater,
            _ => false,
        }
    }

    fn apply_evr(self, candidate: &Evr, value: &Evr) -> bool {
        let ord = candidate.cmp(value);
        let result = match self.base {
            Base::Eq => ord == Ordering::Equal,
            Base::Neq => ord != Ordering::Equal,
            _ => Self::ordering_matches(self.base, ord),
        };
        result != self.negate
    }
}

/// A lazy filter chain over a sack's considered set.
pub struct Query<'a> {
    sack: &'a Sack,
    ids: PackageSet,
}

impl<'a> Query<'a> {
    /// Starts a query from every package in the sack's considered set.
    /// Callers must have already called [`Sack::make_provides_ready`].
    pub fn new(sack: &'a Sack) -> Self {
        Self { sack, ids: sack.considered().clone() }
    }

    fn pkg(&self, id: PackageId) -> &Package {
        self.sack.pool().get(id).expect("considered set only holds live ids")
    }

    /// Applies one filter in place, narrowing the current result set.
    pub fn ifilter(&mut self, key: Key, cmp: Comparator, value: &str) -> Result<&mut Self, Error> {
        match key {
            Key::Empty => self.ids = PackageSet::new(self.sack.pool_id()),
            Key::Name => self.retain(|p| cmp.apply_str(p.nevra().name().as_str(), value)),
            Key::Arch => self.retain(|p| cmp.apply_str(p.nevra().arch().as_str(), value)),
            Key::Version => self.retain(|p| cmp.apply_str(p.nevra().evr().version(), value)),
            Key::Release => self.retain(|p| cmp.apply_str(p.nevra().evr().release(), value)),
            Key::Epoch => self.retain(|p| cmp.apply_str(&p.nevra().evr().epoch().to_string(), value)),
            Key::Evr => {
                let target = Evr::parse(value).map_err(|_| Error::BadSelector {
                    detail: format!("invalid evr `{value}`"),
                })?;
                self.retain(|p| cmp.apply_evr(p.nevra().evr(), &target));
            }
            Key::Nevra => self.retain(|p| cmp.apply_str(&p.nevra().to_string(), value)),
            Key::RepoName => {
                let sack = self.sack;
                self.retain(|p| {
                    sack.repo_id(p.owning_repo())
                        .map(|id| cmp.apply_str(id.as_str(), value))
                        .unwrap_or(false)
                });
            }
            Key::Summary => self.retain(|p| cmp.apply_str(p.summary(), value)),
            Key::Description => self.retain(|p| cmp.apply_str(p.description(), value)),
            Key::Url => self.retain(|p| cmp.apply_str(p.url(), value)),
            Key::File => self.retain(|p| p.files().iter().any(|f| cmp.apply_str(f, value))),
            Key::Provides => self.retain(|p| p.provides().iter().any(|d| cmp.apply_str(d.name().as_str(), value))),
            Key::Requires => self.retain(|p| p.requires().iter().any(|d| cmp.apply_str(d.name().as_str(), value))),
            Key::Conflicts => self.retain(|p| p.conflicts().iter().any(|d| cmp.apply_str(d.name().as_str(), value))),
            Key::Obsoletes => self.retain(|p| p.obsoletes().iter().any(|d| cmp.apply_str(d.name().as_str(), value))),
            Key::Recommends => self.retain(|p| p.recommends().iter().any(|d| cmp.apply_str(d.name().as_str(), value))),
            Key::Suggests => self.retain(|p| p.suggests().iter().any(|d| cmp.apply_str(d.name().as_str(), value))),
            Key::Enhances => self.retain(|p| p.enhances().iter().any(|d| cmp.apply_str(d.name().as_str(), value))),
            Key::Supplements => self.retain(|p| p.supplements().iter().any(|d| cmp.apply_str(d.name().as_str(), value))),
            Key::Installed => self.retain(|p| p.is_installed() != cmp.negate),
            Key::Downgrades => self.filter_relative_to_installed(Ordering::Less),
            Key::Upgrades => self.filter_relative_to_installed(Ordering::Greater),
            Key::LatestPerArch => self.keep_latest(true),
            Key::Latest => self.keep_latest(false),
        }
        Ok(self)
    }

    fn retain(&mut self, predicate: impl Fn(&Package) -> bool) {
        let mut kept = PackageSet::new(self.sack.pool_id());
        for id in self.ids.iter() {
            if predicate(self.pkg(id)) {
                kept.add(id);
            }
        }
        self.ids = kept;
    }

    /// Keeps only available packages whose EVR compares as `relation` against
    /// an installed package sharing the same name and architecture.
    fn filter_relative_to_installed(&mut self, relation: Ordering) {
        let installed: Vec<&Package> = self
            .sack
            .pool()
            .iter()
            .map(|(_, p)| p)
            .filter(|p| p.is_installed())
            .collect();
        self.retain(|p| {
            installed.iter().any(|inst| {
                inst.nevra().name() == p.nevra().name()
                    && inst.nevra().arch() == p.nevra().arch()
                    && p.nevra().evr().cmp(inst.nevra().evr()) == relation
            })
        });
    }

    /// Keeps only the highest-EVR package per name (or per name+arch when
    /// `per_arch` is set).
    fn keep_latest(&mut self, per_arch: bool) {
        let mut best: HashMap<(String, Option<String>), (PackageId, Evr)> = HashMap::new();
        for id in self.ids.iter() {
            let pkg = self.pkg(id);
            let key = (
                pkg.nevra().name().as_str().to_string(),
                per_arch.then(|| pkg.nevra().arch().as_str().to_string()),
            );
            let evr = pkg.nevra().evr().clone();
            best.entry(key)
                .and_modify(|(best_id, best_evr)| {
                    if evr.cmp(best_evr) == Ordering::Greater {
                        *best_id = id;
                        *best_evr = evr.clone();
                    }
                })
                .or_insert((id, evr));
        }
        let mut kept = PackageSet::new(self.sack.pool_id());
        for (id, _) in best.into_values() {
            kept.add(id);
        }
        self.ids = kept;
    }

    /// Terminates the query, returning packages in ascending id order.
    pub fn run(&self) -> Vec<&Package> {
        self.ids.iter().map(|id| self.pkg(id)).collect()
    }

    /// Terminates the query, returning the matching set as a [`PackageSet`].
    pub fn run_set(&self) -> PackageSet {
        self.ids.clone()
    }

    pub fn get_first(&self) -> Option<&Package> {
        self.ids.iter().next().map(|id| self.pkg(id))
    }

    pub fn count(&self) -> usize {
        self.ids.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_types::{Architecture, Epoch, Name, Nevra, PackageBuilder, PoolId, Reason, RepoHandle, RepoId};

    fn pkg(name: &str, version: &str, arch: &str, installed: bool) -> Package {
        let nevra = Nevra::new(Name::new(name).unwrap(), Evr::new(Epoch(0), version, "1"), Architecture::new(arch).unwrap());
        let mut builder = PackageBuilder::new(nevra, RepoHandle(0)).reason(Reason::User);
        if installed {
            builder = builder.install_time(Some(1));
        }
        builder.build()
    }

    fn sack_with(packages: Vec<Package>) -> Sack {
        let mut sack = Sack::new(PoolId(0));
        sack.attach_repo(RepoHandle(0), RepoId::new("test-repo").unwrap());
        for p in packages {
            sack.add_package(p);
        }
        sack.make_provides_ready();
        sack
    }

    #[test]
    fn name_eq_filters_exact_match() {
        let sack = sack_with(vec![pkg("bash", "5.1", "x86_64", false), pkg("zsh", "5.1", "x86_64", false)]);
        let mut q = Query::new(&sack);
        q.ifilter(Key::Name, Comparator::new(Base::Eq), "bash").unwrap();
        assert_eq!(q.count(), 1);
        assert_eq!(q.get_first().unwrap().nevra().name().as_str(), "bash");
    }

    #[test]
    fn glob_matches_name_prefix() {
        let sack = sack_with(vec![pkg("kernel-core", "5.4", "x86_64", false), pkg("bash", "5.1", "x86_64", false)]);
        let mut q = Query::new(&sack);
        q.ifilter(Key::Name, Comparator::new(Base::Glob), "kernel*").unwrap();
        assert_eq!(q.count(), 1);
    }

    #[test]
    fn latest_keeps_highest_evr_per_name() {
        let sack = sack_with(vec![pkg("bash", "5.1", "x86_64", false), pkg("bash", "5.2", "x86_64", false)]);
        let mut q = Query::new(&sack);
        q.ifilter(Key::Latest, Comparator::new(Base::Eq), "").unwrap();
        assert_eq!(q.count(), 1);
        assert_eq!(q.get_first().unwrap().nevra().evr().version(), "5.2");
    }

    #[test]
    fn upgrades_compares_against_installed() {
        let sack = sack_with(vec![
            pkg("bash", "5.1", "x86_64", true),
            pkg("bash", "5.2", "x86_64", false),
            pkg("bash", "5.0", "x86_64", false),
        ]);
        let mut q = Query::new(&sack);
        q.ifilter(Key::Upgrades, Comparator::new(Base::Eq), "").unwrap();
        assert_eq!(q.count(), 1);
        assert_eq!(q.get_first().unwrap().nevra().evr().version(), "5.2");
    }

    #[test]
    fn not_modifier_inverts_installed_filter() {
        let sack = sack_with(vec![pkg("bash", "5.1", "x86_64", true), pkg("zsh", "5.1", "x86_64", false)]);
        let mut q = Query::new(&sack);
        q.ifilter(Key::Installed, Comparator::new(Base::Eq).not(), "").unwrap();
        assert_eq!(q.count(), 1);
        assert_eq!(q.get_first().unwrap().nevra().name().as_str(), "zsh");
    }

    #[test]
    fn empty_key_clears_results() {
        let sack = sack_with(vec![pkg("bash", "5.1", "x86_64", false)]);
        let mut q = Query::new(&sack);
        q.ifilter(Key::Empty, Comparator::new(Base::Eq), "").unwrap();
        assert_eq!(q.count(), 0);
    }
}
