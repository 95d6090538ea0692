//! Interned reldep (name, flags, EVR) dependency expressions.

use std::{fmt::Display, str::FromStr, sync::Arc};

use crate::{Error, Evr, Name};

/// A version-comparison flag on a [`Reldep`], or the unversioned marker.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ReldepFlag {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Unversioned,
}

impl ReldepFlag {
    /// Returns `true` if `evr.cmp(other)` satisfies this comparison flag.
    ///
    /// For [`ReldepFlag::Unversioned`] this always returns `true`.
    pub fn is_satisfied_by(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            ReldepFlag::Lt => ordering == Less,
            ReldepFlag::Le => ordering != Greater,
            ReldepFlag::Eq => ordering == Equal,
            ReldepFlag::Ge => ordering != Less,
            ReldepFlag::Gt => ordering == Greater,
            ReldepFlag::Unversioned => true,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ReldepFlag::Lt => "<",
            ReldepFlag::Le => "<=",
            ReldepFlag::Eq => "=",
            ReldepFlag::Ge => ">=",
            ReldepFlag::Gt => ">",
            ReldepFlag::Unversioned => "",
        }
    }
}

/// A dependency expression: `name`, optionally qualified by a comparison
/// flag and an [`Evr`] bound (`name OP evr`).
///
/// Two reldeps with identical `(name, flag, evr)` triples are considered
/// equal; within an interning pool, equal reldeps share storage and compare
/// by pointer identity in O(1) (see [`crate::RelPool`]).
#[derive(Clone, Debug)]
pub struct Reldep {
    name: Name,
    flag: ReldepFlag,
    evr: Option<Evr>,
}

impl Reldep {
    /// Creates an unversioned reldep.
    pub fn unversioned(name: Name) -> Self {
        Self {
            name,
            flag: ReldepFlag::Unversioned,
            evr: None,
        }
    }

    /// Creates a versioned reldep.
    pub fn versioned(name: Name, flag: ReldepFlag, evr: Evr) -> Self {
        Self {
            name,
            flag,
            evr: Some(evr),
        }
    }

    /// Parses a reldep string of the form `name OP evr` or a bare `name`.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let input = input.trim();
        for (token, flag) in [
            ("<=", ReldepFlag::Le),
            (">=", ReldepFlag::Ge),
            ("<", ReldepFlag::Lt),
            (">", ReldepFlag::Gt),
            ("=", ReldepFlag::Eq),
        ] {
            if let Some((name, evr)) = input.split_once(token) {
                let name = Name::new(name.trim())?;
                let evr = Evr::parse(evr.trim())?;
                return Ok(Self::versioned(name, flag, evr));
            }
        }
        let name = Name::new(input)?;
        Ok(Self::unversioned(name))
    }

    /// Returns the dependency name.
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// Returns the comparison flag.
    pub fn flag(&self) -> ReldepFlag {
        self.flag
    }

    /// Returns the EVR bound, if versioned.
    pub fn evr(&self) -> Option<&Evr> {
        self.evr.as_ref()
    }

    /// Returns `true` if `candidate_evr` satisfies this reldep when matched
    /// against a provide of the same name at `candidate_evr`.
    pub fn is_satisfied_by(&self, candidate_evr: &Evr) -> bool {
        match &self.evr {
            None => true,
            Some(required) => self.flag.is_satisfied_by(candidate_evr.cmp(required)),
        }
    }
}

impl FromStr for Reldep {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Reldep::parse(s)
    }
}

impl Display for Reldep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(evr) = &self.evr {
            write!(f, " {} {}", self.flag.as_str(), evr)?;
        }
        Ok(())
    }
}

impl PartialEq for Reldep {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.flag == other.flag && self.evr == other.evr
    }
}
impl Eq for Reldep {}

impl std::hash::Hash for Reldep {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.flag.hash(state);
        self.evr.hash(state);
    }
}

/// A handle to a [`Reldep`] interned in a [`RelPool`].
///
/// Equality of handles is pool identity (pointer equality of the backing
/// `Arc`), matching the spec's "equality is identity" rule; ordering is
/// deliberately not defined.
#[derive(Clone, Debug)]
pub struct InternedReldep(Arc<Reldep>);

impl PartialEq for InternedReldep {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for InternedReldep {}

impl std::ops::Deref for InternedReldep {
    type Target = Reldep;

    fn deref(&self) -> &Reldep {
        &self.0
    }
}

/// Interning pool for [`Reldep`] values.
///
/// Reldeps with equal `(name, flag, evr)` content are interned to the same
/// [`InternedReldep`] handle, so later equality checks are pointer
/// comparisons rather than value comparisons.
#[derive(Debug, Default)]
pub struct RelPool {
    interned: Vec<Arc<Reldep>>,
}

impl RelPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `reldep`, returning a handle shared with any prior equal
    /// reldep already in the pool.
    pub fn intern(&mut self, reldep: Reldep) -> InternedReldep {
        if let Some(existing) = self.interned.iter().find(|existing| ***existing == reldep) {
            return InternedReldep(existing.clone());
        }
        let arc = Arc::new(reldep);
        self.interned.push(arc.clone());
        InternedReldep(arc)
    }
}

/// An ordered sequence of reldeps, e.g. one package's `requires` list.
pub type ReldepList = Vec<InternedReldep>;
