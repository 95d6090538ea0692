//! Classification of why a package is present (installed or planned).

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Why a package transaction item exists, carried from the solve trace
/// through to transaction-plan items and persisted history rows.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Reason {
    /// Explicitly requested by the user.
    User,
    /// Pulled in to satisfy another package's hard requirement.
    Dependency,
    /// Pulled in to satisfy a weak dependency (recommends/supplements).
    WeakDependency,
    /// Removed as a side effect of `clean_deps` erasure.
    Clean,
    /// Pulled in as a member of a comps group.
    Group,
    /// Reason could not be determined (e.g. pre-existing history row).
    #[default]
    Unknown,
}

impl Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Reason::User => "user",
            Reason::Dependency => "dependency",
            Reason::WeakDependency => "weak-dependency",
            Reason::Clean => "clean",
            Reason::Group => "group",
            Reason::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// The action taken (or recorded) for a single package within a transaction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum PackageAction {
    Install,
    Reinstall,
    Upgrade,
    Upgraded,
    Downgrade,
    Downgraded,
    Obsolete,
    Obsoleted,
    Remove,
    ReasonChange,
}

impl Display for PackageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PackageAction::Install => "install",
            PackageAction::Reinstall => "reinstall",
            PackageAction::Upgrade => "upgrade",
            PackageAction::Upgraded => "upgraded",
            PackageAction::Downgrade => "downgrade",
            PackageAction::Downgraded => "downgraded",
            PackageAction::Obsolete => "obsolete",
            PackageAction::Obsoleted => "obsoleted",
            PackageAction::Remove => "remove",
            PackageAction::ReasonChange => "reason-change",
        };
        write!(f, "{s}")
    }
}

impl PackageAction {
    /// Returns `true` for actions that require the package artifact to be
    /// downloaded before execution (install, reinstall, upgrade, downgrade).
    pub fn is_install_class(self) -> bool {
        matches!(
            self,
            PackageAction::Install
                | PackageAction::Reinstall
                | PackageAction::Upgrade
                | PackageAction::Downgrade
        )
    }
}
