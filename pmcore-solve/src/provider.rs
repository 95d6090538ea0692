//! resolvo [`DependencyProvider`] backed by a [`pmcore_sack::Sack`].

use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};

use pmcore_sack::Sack;
use pmcore_types::{Package, PackageId, ReldepFlag};
use resolvo::utils::Pool;
use resolvo::{
    Candidates, Condition, ConditionId, ConditionalRequirement, Dependencies, DependencyProvider,
    HintDependenciesAvailable, Interner, KnownDependencies, NameId, Requirement, SolvableId,
    SolverCache, StringId, VersionSetId, VersionSetUnionId,
};

use crate::types::{PmMatchSpec, PmRecord, PmRecordKind};

/// Priority given to packages already installed on the system, so the
/// solver prefers keeping them over an equally-versioned repo candidate.
const INSTALLED_PRIORITY: i32 = i32::MAX;

/// Adapts a [`Sack`]'s considered set into resolvo's solvable/version-set
/// pool, one solve at a time. Built fresh for each [`crate::Goal::run`].
pub struct PmDependencyProvider {
    pool: Pool<PmMatchSpec, pmcore_types::Name>,
    records: HashMap<NameId, Candidates>,
    solvables: HashMap<SolvableId, PmRecord>,
    real_solvable_of: HashMap<PackageId, SolvableId>,
    packages: HashMap<PackageId, Package>,
}

impl PmDependencyProvider {
    /// Interns every package in `sack`'s considered set, plus one virtual
    /// solvable per provided capability that isn't the package's own name.
    pub fn build(sack: &Sack) -> Self {
        let mut provider = Self {
            pool: Pool::default(),
            records: HashMap::new(),
            solvables: HashMap::new(),
            real_solvable_of: HashMap::new(),
            packages: HashMap::new(),
        };

        for id in sack.considered().iter() {
            let Some(pkg) = sack.pool().get(id) else { continue };
            let priority = if pkg.is_installed() { INSTALLED_PRIORITY } else { 0 };
            let name = pkg.nevra().name().clone();
            let name_id = provider.pool.intern_package_name(name.clone());
            let record = PmRecord {
                name: name.clone(),
                evr: Some(pkg.nevra().evr().clone()),
                kind: PmRecordKind::Real,
                package: id,
                installed: pkg.is_installed(),
                priority,
            };
            let solvable = provider.pool.intern_solvable(name_id, record.clone());
            provider.records.entry(name_id).or_default().candidates.push(solvable);
            provider.solvables.insert(solvable, record);
            provider.real_solvable_of.insert(id, solvable);
            provider.packages.insert(id, pkg.clone());

            for provide in pkg.provides() {
                if provide.name() == &name {
                    continue;
                }
                let provide_name_id = provider.pool.intern_package_name(provide.name().clone());
                let provide_record = PmRecord {
                    name: provide.name().clone(),
                    evr: provide.evr().cloned(),
                    kind: PmRecordKind::Virtual { via: id },
                    package: id,
                    installed: pkg.is_installed(),
                    priority,
                };
                let provide_solvable = provider.pool.intern_solvable(provide_name_id, provide_record.clone());
                provider.records.entry(provide_name_id).or_default().candidates.push(provide_solvable);
                provider.solvables.insert(provide_solvable, provide_record);
            }
        }

        for candidates in provider.records.values_mut() {
            candidates.hint_dependencies_available = HintDependenciesAvailable::All;
        }

        provider
    }

    pub fn pool(&self) -> &Pool<PmMatchSpec, pmcore_types::Name> {
        &self.pool
    }

    /// Returns the [`PackageId`] backing `solvable`, real or virtual.
    pub fn package_of(&self, solvable: SolvableId) -> Option<PackageId> {
        self.solvables.get(&solvable).map(|r| r.package)
    }

    pub fn is_real(&self, solvable: SolvableId) -> bool {
        self.solvables.get(&solvable).is_some_and(|r| !r.is_virtual())
    }

    /// Interns a requirement against `name` and returns the wrapped job.
    pub fn requirement_for(&mut self, reldep: &pmcore_types::Reldep) -> Requirement {
        let name_id = self.pool.intern_package_name(reldep.name().clone());
        let spec = if reldep.flag() == ReldepFlag::Unversioned {
            PmMatchSpec::any()
        } else {
            PmMatchSpec::from_requirement(reldep.clone())
        };
        let version_set = self.pool.intern_version_set(name_id, spec);
        Requirement::Single(version_set)
    }

    /// Solvable id for a known real package, if it was interned (i.e. is
    /// part of the considered set this provider was built from).
    pub fn solvable_for(&self, id: PackageId) -> Option<SolvableId> {
        self.real_solvable_of.get(&id).copied()
    }
}

impl Interner for PmDependencyProvider {
    fn display_solvable(&self, solvable: SolvableId) -> impl Display + '_ {
        &self.pool.resolve_solvable(solvable).record
    }

    fn display_name(&self, name: NameId) -> impl Display + '_ {
        self.pool.resolve_package_name(name)
    }

    fn display_version_set(&self, version_set: VersionSetId) -> impl Display + '_ {
        self.pool.resolve_version_set(version_set)
    }

    fn display_string(&self, string_id: StringId) -> impl Display + '_ {
        self.pool.resolve_string(string_id)
    }

    fn version_set_name(&self, version_set: VersionSetId) -> NameId {
        self.pool.resolve_version_set_package_name(version_set)
    }

    fn solvable_name(&self, solvable: SolvableId) -> NameId {
        self.pool.resolve_solvable(solvable).name
    }

    fn version_sets_in_union(&self, version_set_union: VersionSetUnionId) -> impl Iterator<Item = VersionSetId> {
        self.pool.resolve_version_set_union(version_set_union)
    }

    fn resolve_condition(&self, condition: ConditionId) -> Condition {
        self.pool.resolve_condition(condition).clone()
    }
}

impl DependencyProvider for PmDependencyProvider {
    async fn filter_candidates(&self, candidates: &[SolvableId], version_set: VersionSetId, inverse: bool) -> Vec<SolvableId> {
        let spec = self.pool.resolve_version_set(version_set);
        candidates
            .iter()
            .copied()
            .filter(|&solvable| spec.matches(&self.pool.resolve_solvable(solvable).record) ^ inverse)
            .collect()
    }

    async fn get_candidates(&self, name: NameId) -> Option<Candidates> {
        self.records.get(&name).cloned()
    }

    async fn sort_candidates(&self, _solver: &SolverCache<Self>, solvables: &mut [SolvableId]) {
        sort_candidates(&self.pool, solvables);
    }

    async fn get_dependencies(&self, solvable: SolvableId) -> Dependencies {
        let mut known = KnownDependencies::default();
        let record = &self.pool.resolve_solvable(solvable).record;

        match &record.kind {
            PmRecordKind::Virtual { via } => {
                let Some(via_solvable) = self.real_solvable_of.get(via) else {
                    let reason = self.pool.intern_string(format!("missing backing package for provide {}", record.name));
                    return Dependencies::Unknown(reason);
                };
                let via_record = &self.solvables[via_solvable];
                let via_req = pmcore_types::Reldep::versioned(
                    via_record.name.clone(),
                    ReldepFlag::Eq,
                    via_record.evr.clone().expect("real packages always carry an evr"),
                );
                let via_name_id = self.pool.intern_package_name(via_record.name.clone());
                let version_set = self.pool.intern_version_set(via_name_id, PmMatchSpec::from_requirement(via_req));
                known.requirements.push(ConditionalRequirement { requirement: Requirement::Single(version_set), condition: None });
            }
            PmRecordKind::Real => {
                let Some(pkg) = self.packages.get(&record.package) else {
                    let reason = self.pool.intern_string(format!("missing metadata for {}", record.name));
                    return Dependencies::Unknown(reason);
                };
                for dep in pkg.requires() {
                    let name_id = self.pool.intern_package_name(dep.name().clone());
                    let spec = if dep.flag() == ReldepFlag::Unversioned {
                        PmMatchSpec::any()
                    } else {
                        PmMatchSpec::from_requirement(dep.clone())
                    };
                    let version_set = self.pool.intern_version_set(name_id, spec);
                    known.requirements.push(ConditionalRequirement { requirement: Requirement::Single(version_set), condition: None });
                }
                for dep in pkg.conflicts() {
                    let name_id = self.pool.intern_package_name(dep.name().clone());
                    let version_set = self.pool.intern_version_set(name_id, PmMatchSpec::from_conflict(dep.clone()));
                    known.constrains.push(version_set);
                }
                for dep in pkg.recommends() {
                    let name_id = self.pool.intern_package_name(dep.name().clone());
                    let spec = if dep.flag() == ReldepFlag::Unversioned {
                        PmMatchSpec::any()
                    } else {
                        PmMatchSpec::from_requirement(dep.clone())
                    };
                    let version_set = self.pool.intern_version_set(name_id, spec);
                    known.constrains.push(version_set);
                }
            }
        }

        Dependencies::Known(known)
    }
}

/// Prefers installed and higher-priority packages, then higher EVR, then
/// real solvables over the provide-only solvables standing in for them.
pub fn sort_candidates(pool: &Pool<PmMatchSpec, pmcore_types::Name>, solvables: &mut [SolvableId]) {
    solvables.sort_by(|&a, &b| {
        let ra = &pool.resolve_solvable(a).record;
        let rb = &pool.resolve_solvable(b).record;
        rb.priority
            .cmp(&ra.priority)
            .then_with(|| rb.evr.cmp(&ra.evr))
            .then_with(|| ra.is_virtual().cmp(&rb.is_virtual()))
    });
}

impl Debug for PmDependencyProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PmDependencyProvider").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_sack::Sack;
    use pmcore_types::{Architecture, Epoch, Evr, Name, Nevra, PackageBuilder, PoolId, Reason, RepoId};

    fn pkg(name: &str, version: &str, installed: bool, provides: Vec<pmcore_types::Reldep>) -> Package {
        let nevra = Nevra::new(Name::new(name).unwrap(), Evr::new(Epoch(0), version, "1"), Architecture::new("x86_64").unwrap());
        let mut builder = PackageBuilder::new(nevra, pmcore_types::RepoHandle(0)).provides(provides).reason(Reason::Unknown);
        if installed {
            builder = builder.install_time(Some(1));
        }
        builder.build()
    }

    fn sack_with(packages: Vec<Package>) -> Sack {
        let mut sack = Sack::new(PoolId(0));
        sack.attach_repo(pmcore_types::RepoHandle(0), RepoId::new("test-repo").unwrap());
        for p in packages {
            sack.add_package(p);
        }
        sack.make_provides_ready();
        sack
    }

    #[test]
    fn build_interns_a_real_solvable_and_a_distinct_provide() {
        let provide = pmcore_types::Reldep::unversioned(Name::new("webserver").unwrap());
        let mut sack = sack_with(vec![pkg("httpd", "1.0", false, vec![provide])]);
        sack.make_provides_ready();
        let httpd_id = sack.pool().by_name(&Name::new("httpd").unwrap())[0];

        let provider = PmDependencyProvider::build(&sack);
        let real_solvable = provider.solvable_for(httpd_id).expect("real package interned");
        assert!(provider.is_real(real_solvable));
        assert_eq!(provider.package_of(real_solvable), Some(httpd_id));

        let webserver_solvable = provider
            .records
            .keys()
            .copied()
            .find(|&name_id| provider.pool.resolve_package_name(name_id).as_str() == "webserver")
            .and_then(|name_id| provider.records[&name_id].candidates.first().copied())
            .expect("provide was interned under its own name");
        assert!(!provider.is_real(webserver_solvable));
        assert_eq!(provider.package_of(webserver_solvable), Some(httpd_id));
    }

    #[test]
    fn sort_candidates_prefers_installed_then_higher_evr_then_real() {
        let sack = sack_with(vec![pkg("foo", "1.0", false, vec![]), pkg("foo", "2.0", true, vec![])]);
        let provider = PmDependencyProvider::build(&sack);
        let foo_id_old = sack.pool().by_name(&Name::new("foo").unwrap())[0];
        let foo_id_new = sack.pool().by_name(&Name::new("foo").unwrap())[1];
        let mut solvables = vec![
            provider.solvable_for(foo_id_old).unwrap(),
            provider.solvable_for(foo_id_new).unwrap(),
        ];
        sort_candidates(&provider.pool, &mut solvables);
        assert_eq!(provider.package_of(solvables[0]), Some(foo_id_new));
    }
}
