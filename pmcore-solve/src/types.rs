//! Match specifications and solvable records for the resolvo pool.
//!
//! Unlike a generic package-relation model, pmcore's provides index already
//! flattens self-provides and explicit `Provides:` entries into one
//! namespace keyed by [`Name`] (see `pmcore_sack::Pool`), so a single
//! [`PmRecord`] kind distinguishes only whether a solvable stands for the
//! package itself or for one of its provided capabilities.

use std::fmt::{self, Display, Formatter};

use pmcore_types::{Evr, Name, PackageId, Reldep, ReldepFlag};
use resolvo::utils::VersionSet;

/// What a solvable's record represents.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PmRecordKind {
    /// The solvable is the package itself.
    Real,
    /// The solvable stands for a capability `via` provides; satisfying it
    /// pulls in `via` as a regular dependency.
    Virtual { via: PackageId },
}

/// A solvable's resolvo-visible payload: the capability name it was
/// interned under, the EVR it satisfies requirements at (if any), and which
/// real package backs it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PmRecord {
    pub name: Name,
    pub evr: Option<Evr>,
    pub kind: PmRecordKind,
    pub package: PackageId,
    pub installed: bool,
    /// Repo priority (higher wins ties); local system packages sort highest.
    pub priority: i32,
}

impl PmRecord {
    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, PmRecordKind::Virtual { .. })
    }
}

impl Display for PmRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.evr {
            Some(evr) => write!(f, "{}-{}", self.name, evr),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A requirement or conflict against a named capability.
///
/// `requirement: None` matches any EVR (including unversioned provides);
/// `conflict` inverts the match and never matches virtual (provide-only)
/// solvables, matching rpm's rule that a package only conflicts with real
/// packages, not with the capabilities it provides itself.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct PmMatchSpec {
    pub requirement: Option<Reldep>,
    pub conflict: bool,
}

impl PmMatchSpec {
    pub fn any() -> Self {
        Self { requirement: None, conflict: false }
    }

    pub fn from_requirement(requirement: Reldep) -> Self {
        Self { requirement: Some(requirement), conflict: false }
    }

    pub fn from_conflict(requirement: Reldep) -> Self {
        Self { requirement: Some(requirement), conflict: true }
    }

    pub fn matches(&self, record: &PmRecord) -> bool {
        if self.conflict && record.is_virtual() {
            return true;
        }
        let matches = match &self.requirement {
            None => true,
            Some(req) => match &record.evr {
                Some(evr) => req.is_satisfied_by(evr),
                None => req.flag() == ReldepFlag::Unversioned,
            },
        };
        matches ^ self.conflict
    }
}

impl VersionSet for PmMatchSpec {
    type V = PmRecord;
}

impl Display for PmMatchSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let prefix = if self.conflict { "not " } else { "" };
        match &self.requirement {
            Some(req) => write!(f, "{prefix}{req}"),
            None => write!(f, "{prefix}<any>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmcore_types::Epoch;

    fn record(evr: Option<&str>) -> PmRecord {
        PmRecord {
            name: Name::new("foo").unwrap(),
            evr: evr.map(|e| Evr::parse(e).unwrap()),
            kind: PmRecordKind::Real,
            package: PackageId(0),
            installed: false,
            priority: 0,
        }
    }

    #[test]
    fn unversioned_requirement_matches_anything() {
        let spec = PmMatchSpec::any();
        assert!(spec.matches(&record(Some("1-1"))));
        assert!(spec.matches(&record(None)));
    }

    #[test]
    fn versioned_requirement_rejects_unversioned_provide() {
        let req = Reldep::versioned(Name::new("foo").unwrap(), ReldepFlag::Ge, Evr::new(Epoch(0), "2", "1"));
        let spec = PmMatchSpec::from_requirement(req);
        assert!(!spec.matches(&record(None)));
        assert!(spec.matches(&record(Some("3-1"))));
        assert!(!spec.matches(&record(Some("1-1"))));
    }

    #[test]
    fn conflict_never_matches_virtual_solvables() {
        let req = Reldep::unversioned(Name::new("foo").unwrap());
        let spec = PmMatchSpec::from_conflict(req);
        let mut virt = record(Some("1-1"));
        virt.kind = PmRecordKind::Virtual { via: PackageId(1) };
        assert!(spec.matches(&virt));
    }
}
