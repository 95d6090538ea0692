//! The transaction plan: the immutable, ordered projection of a
//! [`pmcore_solve::Solution`] against a [`pmcore_sack::Sack`].

use pmcore_sack::Sack;
use pmcore_solve::{ResolutionAction, Solution};
use pmcore_types::{Architecture, Checksum, Epoch, Name, PackageAction, PackageId, Reason, RepoId};

/// One package's entry in the plan, carrying enough of its identity for the
/// downloader and rpm drivers to act without going back to the sack.
#[derive(Clone, Debug)]
pub struct PlanItem {
    pub package: PackageId,
    pub name: Name,
    pub epoch: Epoch,
    pub version: String,
    pub release: String,
    pub arch: Architecture,
    pub repoid: RepoId,
    pub location: String,
    pub checksum: Option<Checksum>,
    pub download_size: u64,
    pub action: PackageAction,
    pub reason: Reason,
    /// The package this item replaces, for the upgrade/downgrade/obsolete
    /// pairs the rpm driver turns into an install-plus-erase.
    pub replaces: Option<PackageId>,
}

impl PlanItem {
    fn snapshot(sack: &Sack, id: PackageId, action: PackageAction, reason: Reason, replaces: Option<PackageId>) -> Option<Self> {
        let pkg = sack.pool().get(id)?;
        Some(Self {
            package: id,
            name: pkg.nevra().name().clone(),
            epoch: pkg.nevra().evr().epoch(),
            version: pkg.nevra().evr().version().to_string(),
            release: pkg.nevra().evr().release().to_string(),
            arch: pkg.nevra().arch().clone(),
            repoid: sack.repo_id(pkg.owning_repo()).cloned().unwrap_or_else(|| RepoId::new("unknown").unwrap()),
            location: pkg.location().to_string(),
            checksum: pkg.checksum().cloned(),
            download_size: pkg.download_size(),
            action,
            reason,
            replaces,
        })
    }
}

/// The ordered, immutable result of a successful [`pmcore_solve::Goal::run`],
/// ready to feed the downloader and the rpm driver.
#[derive(Clone, Debug, Default)]
pub struct TransactionPlan {
    items: Vec<PlanItem>,
}

impl TransactionPlan {
    /// Projects `solution` against `sack`, carrying over each surviving
    /// package's previously recorded reason and pairing upgrade/downgrade/
    /// obsolete actions with the package they replace (§4.8).
    pub fn from_solution(sack: &Sack, solution: &Solution) -> Self {
        let mut items = Vec::new();

        for action in solution.actions() {
            match *action {
                ResolutionAction::Install(id) => {
                    let reason = solution.reason(id).unwrap_or(Reason::Unknown);
                    items.extend(PlanItem::snapshot(sack, id, PackageAction::Install, reason, None));
                }
                ResolutionAction::Reinstall(id) => {
                    let reason = solution.reason(id).unwrap_or(Reason::Unknown);
                    items.extend(PlanItem::snapshot(sack, id, PackageAction::Reinstall, reason, None));
                }
                ResolutionAction::Upgrade { from, to } => {
                    let reason = solution.reason(to).unwrap_or(Reason::Unknown);
                    items.extend(PlanItem::snapshot(sack, to, PackageAction::Upgrade, reason, Some(from)));
                    let prior_reason = sack.pool().get(from).map(|p| p.reason()).unwrap_or(Reason::Unknown);
                    items.extend(PlanItem::snapshot(sack, from, PackageAction::Upgraded, prior_reason, Some(to)));
                }
                ResolutionAction::Downgrade { from, to } => {
                    let reason = solution.reason(to).unwrap_or(Reason::Unknown);
                    items.extend(PlanItem::snapshot(sack, to, PackageAction::Downgrade, reason, Some(from)));
                    let prior_reason = sack.pool().get(from).map(|p| p.reason()).unwrap_or(Reason::Unknown);
                    items.extend(PlanItem::snapshot(sack, from, PackageAction::Downgraded, prior_reason, Some(to)));
                }
                ResolutionAction::Obsoleted { id, by } => {
                    let prior_reason = sack.pool().get(id).map(|p| p.reason()).unwrap_or(Reason::Unknown);
                    items.extend(PlanItem::snapshot(sack, id, PackageAction::Obsoleted, prior_reason, Some(by)));
                }
                ResolutionAction::Remove(id) | ResolutionAction::Unneeded(id) => {
                    let prior_reason = sack.pool().get(id).map(|p| p.reason()).unwrap_or(Reason::Unknown);
                    items.extend(PlanItem::snapshot(sack, id, PackageAction::Remove, prior_reason, None));
                }
            }
        }

        Self { items }
    }

    pub fn items(&self) -> &[PlanItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items whose artifact must be on disk before execution (§4.9).
    pub fn install_class(&self) -> impl Iterator<Item = &PlanItem> {
        self.items.iter().filter(|item| item.action.is_install_class())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_sack::Sack;
    use pmcore_solve::ResolutionAction;
    use pmcore_types::{Architecture as Arch, Epoch as Ep, Evr, Nevra, PackageBuilder, PoolId, RepoHandle};
    use std::collections::HashMap;

    fn pkg(name: &str, version: &str, reason: Reason) -> pmcore_types::Package {
        let nevra = Nevra::new(Name::new(name).unwrap(), Evr::new(Ep(0), version, "1"), Arch::new("x86_64").unwrap());
        PackageBuilder::new(nevra, RepoHandle(0)).reason(reason).location(format!("{name}-{version}.rpm")).build()
    }

    fn sack_with_one(name: &str, version: &str, reason: Reason) -> (Sack, PackageId) {
        let mut sack = Sack::new(PoolId(0));
        sack.attach_repo(RepoHandle(0), RepoId::new("test-repo").unwrap());
        let id = sack.add_package(pkg(name, version, reason));
        sack.make_provides_ready();
        (sack, id)
    }

    #[test]
    fn install_action_carries_its_solved_reason() {
        let (sack, id) = sack_with_one("foo", "1.0", Reason::Unknown);
        let mut reasons = HashMap::new();
        reasons.insert(id, Reason::User);
        let solution = Solution::new(vec![ResolutionAction::Install(id)], reasons, Vec::new());

        let plan = TransactionPlan::from_solution(&sack, &solution);
        assert_eq!(plan.items().len(), 1);
        assert_eq!(plan.items()[0].action, PackageAction::Install);
        assert_eq!(plan.items()[0].reason, Reason::User);
    }

    #[test]
    fn upgrade_produces_a_paired_upgrade_and_upgraded_item() {
        let mut sack = Sack::new(PoolId(0));
        sack.attach_repo(RepoHandle(0), RepoId::new("test-repo").unwrap());
        let old = sack.add_package(pkg("foo", "1.0", Reason::User));
        let new = sack.add_package(pkg("foo", "2.0", Reason::Unknown));
        sack.make_provides_ready();

        let mut reasons = HashMap::new();
        reasons.insert(new, Reason::User);
        let solution = Solution::new(vec![ResolutionAction::Upgrade { from: old, to: new }], reasons, Vec::new());

        let plan = TransactionPlan::from_solution(&sack, &solution);
        assert_eq!(plan.items().len(), 2);
        assert_eq!(plan.items()[0].action, PackageAction::Upgrade);
        assert_eq!(plan.items()[0].replaces, Some(old));
        assert_eq!(plan.items()[1].action, PackageAction::Upgraded);
        assert_eq!(plan.items()[1].reason, Reason::User);
    }
}
