//! Result projection: what a successful solve means for the caller.

use std::collections::HashMap;

use pmcore_types::{PackageId, Reason};

/// One entry of the materialized result, classified the way §4.7's
/// "result projection" names them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResolutionAction {
    Install(PackageId),
    Reinstall(PackageId),
    Upgrade { from: PackageId, to: PackageId },
    Downgrade { from: PackageId, to: PackageId },
    Obsoleted { id: PackageId, by: PackageId },
    Remove(PackageId),
    /// No longer required by anything, but not forced out (the solver's
    /// unneeded-orphan set).
    Unneeded(PackageId),
}

/// The materialized outcome of a successful [`crate::Goal::run`].
#[derive(Clone, Debug, Default)]
pub struct Solution {
    actions: Vec<ResolutionAction>,
    reasons: HashMap<PackageId, Reason>,
    suggested: Vec<PackageId>,
}

impl Solution {
    /// Assembles a solution from its parts. `Goal::run` is the usual way a
    /// solution comes into being; this is exposed directly so callers (and
    /// tests) can project a plan from a hand-built result too.
    pub fn new(actions: Vec<ResolutionAction>, reasons: HashMap<PackageId, Reason>, suggested: Vec<PackageId>) -> Self {
        Self { actions, reasons, suggested }
    }

    pub fn installs(&self) -> Vec<PackageId> {
        self.actions
            .iter()
            .filter_map(|a| matches!(a, ResolutionAction::Install(_)).then(|| self.id_of(a)))
            .collect()
    }

    pub fn reinstalls(&self) -> Vec<PackageId> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                ResolutionAction::Reinstall(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn upgrades(&self) -> Vec<(PackageId, PackageId)> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                ResolutionAction::Upgrade { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn downgrades(&self) -> Vec<(PackageId, PackageId)> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                ResolutionAction::Downgrade { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    pub fn obsoleted(&self) -> Vec<(PackageId, PackageId)> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                ResolutionAction::Obsoleted { id, by } => Some((*id, *by)),
                _ => None,
            })
            .collect()
    }

    pub fn removals(&self) -> Vec<PackageId> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                ResolutionAction::Remove(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn unneeded(&self) -> Vec<PackageId> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                ResolutionAction::Unneeded(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn suggested(&self) -> &[PackageId] {
        &self.suggested
    }

    pub fn reason(&self, id: PackageId) -> Option<Reason> {
        self.reasons.get(&id).copied()
    }

    pub fn actions(&self) -> &[ResolutionAction] {
        &self.actions
    }

    fn id_of(&self, action: &ResolutionAction) -> PackageId {
        match action {
            ResolutionAction::Install(id)
            | ResolutionAction::Reinstall(id)
            | ResolutionAction::Remove(id)
            | ResolutionAction::Unneeded(id) => *id,
            ResolutionAction::Upgrade { to, .. } | ResolutionAction::Downgrade { to, .. } => *to,
            ResolutionAction::Obsoleted { id, .. } => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installs_filters_other_action_kinds() {
        let actions = vec![
            ResolutionAction::Install(PackageId(1)),
            ResolutionAction::Remove(PackageId(2)),
        ];
        let solution = Solution::new(actions, HashMap::new(), Vec::new());
        assert_eq!(solution.installs(), vec![PackageId(1)]);
        assert_eq!(solution.removals(), vec![PackageId(2)]);
    }

    #[test]
    fn reason_lookup_reflects_classifier() {
        let mut reasons = HashMap::new();
        reasons.insert(PackageId(1), Reason::Dependency);
        let solution = Solution::new(Vec::new(), reasons, Vec::new());
        assert_eq!(solution.reason(PackageId(1)), Some(Reason::Dependency));
        assert_eq!(solution.reason(PackageId(2)), None);
    }
}
