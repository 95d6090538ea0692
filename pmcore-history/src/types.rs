//! Rows and lookup keys for the history store.

use pmcore_types::{PackageAction, Reason};

/// One of the three kinds of thing a reason can be recorded against.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Entity {
    CompsGroup(String),
    CompsEnvironment(String),
    RpmPackage { name: String, arch: String },
}

/// Lifecycle state of a transaction record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionState {
    InProgress,
    Done,
    Error,
}

impl TransactionState {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            TransactionState::InProgress => "in-progress",
            TransactionState::Done => "done",
            TransactionState::Error => "error",
        }
    }

    pub(crate) fn parse(s: &str) -> Self {
        match s {
            "done" => TransactionState::Done,
            "error" => TransactionState::Error,
            _ => TransactionState::InProgress,
        }
    }
}

/// Everything needed to open a new transaction record (§4.10 step 4).
#[derive(Clone, Debug)]
pub struct NewTransaction {
    pub dt_begin: i64,
    pub rpmdb_version: String,
    pub releasever: String,
    pub user_id: i64,
    pub cmdline: String,
    pub comment: Option<String>,
}

/// A persisted transaction header.
#[derive(Clone, Debug)]
pub struct TransactionRecord {
    pub id: i64,
    pub dt_begin: i64,
    pub dt_end: Option<i64>,
    pub rpmdb_version: String,
    pub releasever: String,
    pub user_id: i64,
    pub cmdline: String,
    pub comment: Option<String>,
    pub state: TransactionState,
}

/// A single package's entry within a transaction.
#[derive(Clone, Debug)]
pub struct TransactionItemRecord {
    pub id: i64,
    pub trans_id: i64,
    pub name: String,
    pub epoch: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub repoid: String,
    pub action: PackageAction,
    pub reason: Reason,
    pub failed: bool,
}

/// Filter applied by [`crate::HistoryStore::list_transactions`]. All fields
/// are conjunctive; `None` means unconstrained.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub package_name: Option<String>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub limit: Option<u32>,
}

pub(crate) fn reason_to_str(reason: Reason) -> &'static str {
    match reason {
        Reason::User => "user",
        Reason::Dependency => "dependency",
        Reason::WeakDependency => "weak-dependency",
        Reason::Clean => "clean",
        Reason::Group => "group",
        Reason::Unknown => "unknown",
    }
}

pub(crate) fn reason_from_str(s: &str) -> Reason {
    match s {
        "user" => Reason::User,
        "dependency" => Reason::Dependency,
        "weak-dependency" => Reason::WeakDependency,
        "clean" => Reason::Clean,
        "group" => Reason::Group,
        _ => Reason::Unknown,
    }
}

pub(crate) fn action_to_str(action: PackageAction) -> &'static str {
    match action {
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
    }
}

pub(crate) fn action_from_str(s: &str) -> PackageAction {
    match s {
        "reinstall" => PackageAction::Reinstall,
        "upgrade" => PackageAction::Upgrade,
        "upgraded" => PackageAction::Upgraded,
        "downgrade" => PackageAction::Downgrade,
        "downgraded" => PackageAction::Downgraded,
        "obsolete" => PackageAction::Obsolete,
        "obsoleted" => PackageAction::Obsoleted,
        "remove" => PackageAction::Remove,
        "reason-change" => PackageAction::ReasonChange,
        _ => PackageAction::Install,
    }
}
