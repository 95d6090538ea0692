//! The goal: staged intents, action bits, protected packages, and the
//! solve/trim/project pipeline that turns them into a [`Solution`].

use std::collections::{HashMap, HashSet};
use std::path::Path;

use pmcore_sack::Sack;
use pmcore_types::{PackageId, Reason, ReldepFlag};
use resolvo::{ConditionalRequirement, Problem as ResolvoProblem, UnsolvableOrCancelled};

use crate::provider::PmDependencyProvider;
use crate::solution::{ResolutionAction, Solution};
use crate::Error;

/// One staged intent, pending translation into solver jobs at [`Goal::run`].
#[derive(Clone, Debug)]
enum Action {
    Install,
    InstallOptional,
    Upgrade,
    UpgradeAll,
    Downgrade,
    DistroSync,
    DistroSyncAll,
    Erase { clean_deps: bool },
    Reinstall,
    UserInstalled,
}

#[derive(Clone, Debug)]
struct StagedJob {
    action: Action,
    target: Option<PackageId>,
}

/// Accumulated solver flags, set once and consulted on every [`Goal::run`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ActionBits {
    pub best: bool,
    pub force_best: bool,
    pub allow_uninstall: bool,
    pub allow_downgrade: bool,
    pub verify: bool,
    pub ignore_weak: bool,
    pub ignore_weak_deps: bool,
}

/// A deduplicated, human-readable description of why a solve failed.
#[derive(Clone, Debug)]
pub struct SolverProblem {
    pub message: String,
    pub rules: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum GoalFailure {
    Unsolvable(SolverProblem),
    RemovalOfProtectedPkg(Vec<PackageId>),
}

/// Accumulates intents and, on [`Goal::run`], solves them against a [`Sack`].
pub struct Goal {
    staging: Vec<StagedJob>,
    bits: ActionBits,
    protected: HashSet<PackageId>,
    running_kernel: Option<PackageId>,
    failure: Option<GoalFailure>,
    solution: Option<Solution>,
}

impl Default for Goal {
    fn default() -> Self {
        Self::new()
    }
}

impl Goal {
    pub fn new() -> Self {
        Self {
            staging: Vec::new(),
            bits: ActionBits::default(),
            protected: HashSet::new(),
            running_kernel: None,
            failure: None,
            solution: None,
        }
    }

    pub fn bits_mut(&mut self) -> &mut ActionBits {
        &mut self.bits
    }

    pub fn protect(&mut self, id: PackageId) {
        self.protected.insert(id);
    }

    fn push(&mut self, action: Action, target: PackageId) {
        self.staging.push(StagedJob { action, target: Some(target) });
    }

    pub fn install(&mut self, id: PackageId) {
        self.push(Action::Install, id);
    }

    pub fn install_optional(&mut self, id: PackageId) {
        self.push(Action::InstallOptional, id);
    }

    pub fn upgrade(&mut self, id: PackageId) {
        self.push(Action::Upgrade, id);
    }

    pub fn upgrade_all(&mut self) {
        self.staging.push(StagedJob { action: Action::UpgradeAll, target: None });
    }

    pub fn downgrade(&mut self, id: PackageId) {
        self.bits.allow_downgrade = true;
        self.push(Action::Downgrade, id);
    }

    pub fn distro_sync(&mut self, id: PackageId) {
        self.push(Action::DistroSync, id);
    }

    pub fn distro_sync_all(&mut self) {
        self.staging.push(StagedJob { action: Action::DistroSyncAll, target: None });
    }

    pub fn erase(&mut self, id: PackageId, clean_deps: bool) {
        self.push(Action::Erase { clean_deps }, id);
    }

    pub fn reinstall(&mut self, id: PackageId) {
        self.push(Action::Reinstall, id);
    }

    pub fn user_installed(&mut self, id: PackageId) {
        self.push(Action::UserInstalled, id);
    }

    pub fn failure(&self) -> Option<&GoalFailure> {
        self.failure.as_ref()
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    /// `reset()`: discards the solver and its transaction, clears staging.
    /// Protected set and action bits survive.
    pub fn reset(&mut self) {
        self.staging.clear();
        self.failure = None;
        self.solution = None;
    }

    /// `clone()`: copies staging, protected set, action bits, and any
    /// `removal_of_protected` list. Never copies a prior solution — the
    /// clone is "not yet solved".
    pub fn fork(&self) -> Self {
        let removal_of_protected = match &self.failure {
            Some(GoalFailure::RemovalOfProtectedPkg(ids)) => Some(GoalFailure::RemovalOfProtectedPkg(ids.clone())),
            _ => None,
        };
        Self {
            staging: self.staging.clone(),
            bits: self.bits,
            protected: self.protected.clone(),
            running_kernel: self.running_kernel,
            failure: removal_of_protected,
            solution: None,
        }
    }

    /// Solves the staged intents against `sack`'s considered set.
    ///
    /// Always protects `sack`'s running kernel in addition to the goal's own
    /// protected set. Installonly packages beyond the configured limit are
    /// trimmed as a post-solve pass (see module docs for why this isn't
    /// folded into the SAT encoding itself).
    pub fn run(&mut self, sack: &mut Sack) -> Result<&Solution, Error> {
        sack.make_provides_ready();
        self.running_kernel = sack.running_kernel();

        let mut provider = PmDependencyProvider::build(sack);
        let mut requirements = Vec::new();
        let mut soft_requirements = Vec::new();
        let mut explicit = HashSet::new();
        let mut explicit_erase = HashSet::new();
        let mut clean_deps_targets = HashSet::new();
        let mut user_installed_override = HashSet::new();

        for job in self.staging.clone() {
            let Some(id) = job.target else {
                self.stage_bulk(sack, &job.action, &mut requirements, &mut explicit);
                continue;
            };
            explicit.insert(id);
            if let Action::Erase { clean_deps } = job.action {
                explicit_erase.insert(id);
                if clean_deps {
                    clean_deps_targets.insert(id);
                }
            }
            let Some(pkg) = sack.pool().get(id) else { continue };
            let name = pkg.nevra().name().clone();
            match job.action {
                Action::Install | Action::Reinstall => {
                    let req = pmcore_types::Reldep::versioned(name, ReldepFlag::Eq, pkg.nevra().evr().clone());
                    requirements.push(ConditionalRequirement { requirement: provider.requirement_for(&req), condition: None });
                }
                Action::InstallOptional => {
                    if let Some(solvable) = provider.solvable_for(id) {
                        soft_requirements.push(solvable);
                    }
                }
                Action::Upgrade | Action::DistroSync => {
                    let flag = if matches!(job.action, Action::DistroSync) { ReldepFlag::Eq } else { ReldepFlag::Ge };
                    let req = pmcore_types::Reldep::versioned(name, flag, pkg.nevra().evr().clone());
                    requirements.push(ConditionalRequirement { requirement: provider.requirement_for(&req), condition: None });
                }
                Action::Downgrade => {
                    let req = pmcore_types::Reldep::versioned(name, ReldepFlag::Eq, pkg.nevra().evr().clone());
                    requirements.push(ConditionalRequirement { requirement: provider.requirement_for(&req), condition: None });
                }
                Action::Erase { .. } => {
                    // Explicit erase: no keep-requirement is added, so the
                    // solver is free to drop it (and, for clean_deps, its
                    // orphaned dependents) as unneeded.
                }
                Action::UserInstalled => {
                    user_installed_override.insert(id);
                }
                Action::UpgradeAll | Action::DistroSyncAll => unreachable!("bulk actions have no target"),
            }
        }

        // Anything installed, not explicitly staged, stays unless uninstall
        // is broadly allowed.
        if !self.bits.allow_uninstall {
            for (id, pkg) in sack.pool().iter() {
                if !pkg.is_installed() || explicit.contains(&id) || !sack.considered().contains(id) {
                    continue;
                }
                let req = pmcore_types::Reldep::unversioned(pkg.nevra().name().clone());
                requirements.push(ConditionalRequirement { requirement: provider.requirement_for(&req), condition: None });
            }
        }

        let problem = ResolvoProblem::new().requirements(requirements).soft_requirements(soft_requirements);
        let mut solver = resolvo::Solver::new(provider);
        let raw_solution = match solver.solve(problem) {
            Ok(sol) => sol,
            Err(UnsolvableOrCancelled::Unsolvable(unsat)) => {
                let message = "no solution satisfies the requested changes".to_string();
                let rules = dedup_lines(&unsat.display_user_friendly(&solver).to_string());
                self.failure = Some(GoalFailure::Unsolvable(SolverProblem { message, rules }));
                return Err(Error::Unsolvable(self.failure_message()));
            }
            Err(UnsolvableOrCancelled::Cancelled(_)) => {
                return Err(Error::Unsolvable("solve was cancelled".to_string()));
            }
        };

        let mut selected: HashSet<PackageId> = HashSet::new();
        let provider = PmDependencyProvider::build(sack);
        for &solvable in &raw_solution {
            if provider.is_real(solvable) {
                if let Some(id) = provider.package_of(solvable) {
                    selected.insert(id);
                }
            }
        }
        // clean_deps erasure: walk the erased packages' requirements and drop
        // any now-unrequired Reason::Dependency package still in `selected`,
        // cascading through what that package itself required.
        cascade_clean_deps(sack, &mut selected, &clean_deps_targets);

        // resolvo keeps at most one solvable per name per solution, which
        // can't represent several simultaneously-installed installonly
        // packages (e.g. kernels) sharing a name. Re-admit every currently
        // installed installonly package that wasn't explicitly erased so the
        // trimming pass below has the real candidate set to work from.
        for (id, pkg) in sack.pool().iter() {
            if pkg.is_installed() && sack.is_installonly(pkg) && sack.considered().contains(id) && !explicit_erase.contains(&id) {
                selected.insert(id);
            }
        }
        // Installonly trimming: keep at most `installonly_limit` installed
        // kernel-family packages, the running kernel always among them.
        let trimmed = self.trim_installonly(sack, &mut selected);
        if trimmed {
            self.bits.allow_uninstall = true;
        }

        self.project(sack, &selected, &user_installed_override)
    }

    fn stage_bulk(&self, sack: &Sack, action: &Action, requirements: &mut Vec<ConditionalRequirement>, explicit: &mut HashSet<PackageId>) {
        let mut provider = PmDependencyProvider::build(sack);
        for (id, pkg) in sack.pool().iter() {
            if !pkg.is_installed() || !sack.considered().contains(id) {
                continue;
            }
            explicit.insert(id);
            let flag = match action {
                Action::DistroSyncAll => ReldepFlag::Eq,
                _ => ReldepFlag::Ge,
            };
            let req = pmcore_types::Reldep::versioned(pkg.nevra().name().clone(), flag, pkg.nevra().evr().clone());
            requirements.push(ConditionalRequirement { requirement: provider.requirement_for(&req), condition: None });
        }
    }

    fn trim_installonly(&mut self, sack: &Sack, selected: &mut HashSet<PackageId>) -> bool {
        let limit = sack.installonly_limit() as usize;
        let mut by_name: HashMap<pmcore_types::Name, Vec<PackageId>> = HashMap::new();
        for (id, pkg) in sack.pool().iter() {
            if sack.is_installonly(pkg) && selected.contains(&id) {
                by_name.entry(pkg.nevra().name().clone()).or_default().push(id);
            }
        }
        let mut trimmed = false;
        for group in by_name.values_mut() {
            if group.len() <= limit {
                continue;
            }
            group.sort_by(|&a, &b| {
                let pa = sack.pool().get(a).unwrap();
                let pb = sack.pool().get(b).unwrap();
                let a_running = self.running_kernel == Some(a);
                let b_running = self.running_kernel == Some(b);
                // Running kernel sorts first (kept); ties broken by newest first.
                b_running.cmp(&a_running).then_with(|| pb.nevra().evr().cmp(pa.nevra().evr()))
            });
            for &drop in group.iter().skip(limit) {
                selected.remove(&drop);
                trimmed = true;
            }
        }
        trimmed
    }

    fn project(&mut self, sack: &Sack, selected: &HashSet<PackageId>, user_installed: &HashSet<PackageId>) -> Result<&Solution, Error> {
        let mut actions = Vec::new();
        let mut reasons = HashMap::new();

        for &id in selected {
            let pkg = sack.pool().get(id).expect("selected ids come from the pool");
            if !pkg.is_installed() {
                // Installonly packages (kernels and the like) are meant to
                // coexist at several versions at once, so a same-name
                // installed package going away (e.g. trimmed by
                // `trim_installonly`) is never this package's upgrade
                // target, just a separate, unrelated removal.
                let same_name_installed = if sack.is_installonly(pkg) {
                    None
                } else {
                    sack.pool().iter().find(|(other, other_pkg)| {
                        other_pkg.is_installed() && other_pkg.nevra().name() == pkg.nevra().name() && !selected.contains(other)
                    })
                };
                match same_name_installed {
                    Some((from, from_pkg)) => {
                        let action = if pkg.nevra().evr() > from_pkg.nevra().evr() {
                            ResolutionAction::Upgrade { from, to: id }
                        } else {
                            ResolutionAction::Downgrade { from, to: id }
                        };
                        actions.push(action);
                        reasons.insert(id, from_pkg.reason());
                    }
                    None => {
                        let reason = if user_installed.contains(&id) { Reason::User } else { pkg.reason() };
                        actions.push(ResolutionAction::Install(id));
                        reasons.insert(id, reason);
                    }
                }
            } else {
                reasons.insert(id, pkg.reason());
            }
        }

        for (id, pkg) in sack.pool().iter() {
            if pkg.is_installed() && !selected.contains(&id) && sack.considered().contains(id) {
                let obsoleted_by = selected.iter().find(|&&other| {
                    sack.pool().get(other).is_some_and(|o| o.obsoletes().iter().any(|dep| dep.name() == pkg.nevra().name()))
                });
                let conflicted_by = selected.iter().find(|&&other| {
                    sack.pool().get(other).is_some_and(|o| o.conflicts().iter().any(|dep| dep.name() == pkg.nevra().name()))
                });
                match (obsoleted_by, conflicted_by) {
                    (Some(&by), _) => actions.push(ResolutionAction::Obsoleted { id, by }),
                    (None, Some(_)) => actions.push(ResolutionAction::Remove(id)),
                    (None, None) => actions.push(ResolutionAction::Unneeded(id)),
                }
            }
        }

        if let Some(kernel) = self.running_kernel {
            self.protected.insert(kernel);
        }
        let removal_of_protected: Vec<PackageId> = actions
            .iter()
            .filter_map(|a| match a {
                ResolutionAction::Remove(id) | ResolutionAction::Unneeded(id) | ResolutionAction::Obsoleted { id, .. }
                    if self.protected.contains(id) =>
                {
                    Some(*id)
                }
                _ => None,
            })
            .collect();
        if !removal_of_protected.is_empty() {
            self.failure = Some(GoalFailure::RemovalOfProtectedPkg(removal_of_protected.clone()));
            return Err(Error::RemovalOfProtectedPkg(removal_of_protected));
        }

        let mut suggested_names: HashSet<&pmcore_types::Name> = HashSet::new();
        for &id in selected {
            if let Some(pkg) = sack.pool().get(id) {
                for dep in pkg.suggests() {
                    suggested_names.insert(dep.name());
                }
            }
        }
        let suggested: Vec<PackageId> = sack
            .pool()
            .iter()
            .filter(|(id, pkg)| !selected.contains(id) && suggested_names.contains(pkg.nevra().name()))
            .map(|(id, _)| id)
            .collect();

        self.solution = Some(Solution::new(actions, reasons, suggested));
        Ok(self.solution.as_ref().expect("just set"))
    }

    fn failure_message(&self) -> String {
        match &self.failure {
            Some(GoalFailure::Unsolvable(problem)) => problem.message.clone(),
            Some(GoalFailure::RemovalOfProtectedPkg(ids)) => format!("solution would remove protected packages: {ids:?}"),
            None => "unknown failure".to_string(),
        }
    }

    /// The solver's internal problem count plus one if a protected-removal
    /// failure was also recorded.
    pub fn problem_count(&self) -> usize {
        match &self.failure {
            Some(GoalFailure::Unsolvable(_)) => 1,
            Some(GoalFailure::RemovalOfProtectedPkg(_)) => 1,
            None => 0,
        }
    }

    /// Serializes solver state for post-mortem debugging.
    pub fn write_debugdata(&self, dir: &Path) -> Result<(), Error> {
        std::fs::create_dir_all(dir).map_err(|source| Error::FileInvalid { path: dir.display().to_string(), source })?;
        let path = dir.join("goal-debug.txt");
        let mut text = format!("staging: {} jobs\nbits: {:?}\nprotected: {:?}\n", self.staging.len(), self.bits, self.protected);
        if let Some(failure) = &self.failure {
            text.push_str(&format!("failure: {failure:?}\n"));
        }
        std::fs::write(&path, text).map_err(|source| Error::FileInvalid { path: path.display().to_string(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_types::{Architecture, Epoch, Evr, Name, Nevra, PackageBuilder, PoolId, RepoId};

    fn pkg(name: &str, version: &str, installed: bool, requires: Vec<pmcore_types::Reldep>) -> pmcore_types::Package {
        let nevra = Nevra::new(Name::new(name).unwrap(), Evr::new(Epoch(0), version, "1"), Architecture::new("x86_64").unwrap());
        let mut builder = PackageBuilder::new(nevra, pmcore_types::RepoHandle(0)).requires(requires).reason(Reason::Unknown);
        if installed {
            builder = builder.install_time(Some(1));
        }
        builder.build()
    }

    fn sack_with(packages: Vec<pmcore_types::Package>) -> Sack {
        let mut sack = Sack::new(PoolId(0));
        sack.attach_repo(pmcore_types::RepoHandle(0), RepoId::new("test-repo").unwrap());
        for p in packages {
            sack.add_package(p);
        }
        sack.make_provides_ready();
        sack
    }

    #[test]
    fn install_pulls_in_its_requirement() {
        let dep = pmcore_types::Reldep::unversioned(Name::new("libfoo").unwrap());
        let mut sack = sack_with(vec![
            pkg("app", "1.0", false, vec![dep]),
            pkg("libfoo", "1.0", false, vec![]),
        ]);
        let app_id = sack.pool().by_name(&Name::new("app").unwrap())[0];

        let mut goal = Goal::new();
        goal.install(app_id);
        let solution = goal.run(&mut sack).unwrap();
        assert_eq!(solution.installs().len(), 2);
    }

    #[test]
    fn protected_package_removal_fails_the_goal() {
        let mut sack = sack_with(vec![pkg("glibc", "1.0", true, vec![])]);
        let glibc_id = sack.pool().by_name(&Name::new("glibc").unwrap())[0];

        let mut goal = Goal::new();
        goal.protect(glibc_id);
        goal.bits_mut().allow_uninstall = true;
        goal.erase(glibc_id, false);
        let err = goal.run(&mut sack).unwrap_err();
        assert!(matches!(err, Error::RemovalOfProtectedPkg(ids) if ids == vec![glibc_id]));
    }

    #[test]
    fn clean_deps_erase_cascades_to_orphaned_dependency() {
        let dep = pmcore_types::Reldep::unversioned(Name::new("libfoo").unwrap());
        let mut app = pkg("app", "1.0", true, vec![dep]);
        let mut libfoo = pkg("libfoo", "1.0", true, vec![]);
        app = pmcore_types::PackageBuilder::new(app.nevra().clone(), pmcore_types::RepoHandle(0))
            .requires(app.requires().to_vec())
            .reason(Reason::User)
            .install_time(Some(1))
            .build();
        libfoo = pmcore_types::PackageBuilder::new(libfoo.nevra().clone(), pmcore_types::RepoHandle(0))
            .reason(Reason::Dependency)
            .install_time(Some(1))
            .build();
        let mut sack = sack_with(vec![app, libfoo]);
        let app_id = sack.pool().by_name(&Name::new("app").unwrap())[0];

        let mut goal = Goal::new();
        goal.erase(app_id, true);
        let solution = goal.run(&mut sack).unwrap();

        let libfoo_id = sack.pool().by_name(&Name::new("libfoo").unwrap())[0];
        assert!(solution.removals().contains(&libfoo_id) || solution.unneeded().contains(&libfoo_id));
    }

    #[test]
    fn installonly_trimming_keeps_at_most_the_limit() {
        let mut sack = sack_with(vec![
            pkg("kernel", "1.0", true, vec![]),
            pkg("kernel", "2.0", true, vec![]),
            pkg("kernel", "3.0", true, vec![]),
            pkg("kernel", "4.0", true, vec![]),
        ]);
        sack.set_installonly_limit(3);
        sack.make_provides_ready();

        let mut goal = Goal::new();
        goal.upgrade_all();
        let solution = goal.run(&mut sack).unwrap();
        let kept: Vec<_> = sack
            .pool()
            .iter()
            .filter(|(id, _)| !solution.removals().contains(id) && !solution.unneeded().contains(id))
            .collect();
        assert!(kept.len() <= 3);
    }

    fn kernel_with_release(version: &str, release: &str, installed: bool) -> pmcore_types::Package {
        let nevra = Nevra::new(Name::new("kernel").unwrap(), Evr::new(Epoch(0), version, release), Architecture::new("x86_64").unwrap());
        let mut builder = PackageBuilder::new(nevra, pmcore_types::RepoHandle(0)).reason(Reason::Unknown);
        if installed {
            builder = builder.install_time(Some(1));
        }
        builder.build()
    }

    #[test]
    fn installonly_trimming_counts_a_newly_installed_kernel_toward_the_limit() {
        let mut sack = sack_with(vec![
            kernel_with_release("5.1", "1", true),
            kernel_with_release("5.2", "2", true),
            kernel_with_release("5.3", "3", true),
            kernel_with_release("5.4", "4", false),
        ]);
        sack.set_installonly_limit(3);
        sack.resolve_running_kernel("2");
        sack.make_provides_ready();

        let new_kernel_id = sack.pool().by_name(&Name::new("kernel").unwrap()).iter().copied().find(|&id| !sack.pool().get(id).unwrap().is_installed()).unwrap();

        let mut goal = Goal::new();
        goal.install(new_kernel_id);
        let solution = goal.run(&mut sack).unwrap();

        assert_eq!(solution.installs(), vec![new_kernel_id]);
        let old_kernel_id = sack.pool().by_name(&Name::new("kernel").unwrap()).iter().copied().find(|&id| sack.pool().get(id).unwrap().nevra().evr().version() == "5.1").unwrap();
        assert!(solution.removals().contains(&old_kernel_id) || solution.unneeded().contains(&old_kernel_id));
    }
}

/// Removes packages that only `clean_deps_targets` required and nothing
/// still in `selected` requires anymore, recursively.
fn cascade_clean_deps(sack: &Sack, selected: &mut HashSet<PackageId>, clean_deps_targets: &HashSet<PackageId>) {
    let mut frontier: Vec<pmcore_types::Name> = clean_deps_targets
        .iter()
        .filter_map(|id| sack.pool().get(*id))
        .flat_map(|pkg| pkg.requires().iter().map(|dep| dep.name().clone()))
        .collect();

    while let Some(name) = frontier.pop() {
        let candidate = sack
            .pool()
            .iter()
            .find(|(id, pkg)| selected.contains(id) && pkg.is_installed() && pkg.nevra().name() == &name && pkg.reason() == Reason::Dependency);
        let Some((candidate_id, candidate_pkg)) = candidate else { continue };

        let still_required = sack.pool().iter().any(|(other_id, other_pkg)| {
            selected.contains(&other_id) && other_id != candidate_id && other_pkg.requires().iter().any(|dep| dep.name() == &name)
        });
        if still_required {
            continue;
        }

        selected.remove(&candidate_id);
        frontier.extend(candidate_pkg.requires().iter().map(|dep| dep.name().clone()));
    }
}

fn dedup_lines(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || !seen.insert(line.to_string()) {
            continue;
        }
        out.push(line.to_string());
    }
    out
}
