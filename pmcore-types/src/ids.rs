//! Opaque pool-relative identifiers.
//!
//! These ids are raw indices into a pool's internal tables. They are only
//! meaningful when paired with the pool that minted them; every API that
//! consumes one takes `(sack handle, id)` together rather than storing a
//! reference back to the pool.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Identifies the pool instance an id or [`crate::PackageSet`] belongs to.
///
/// Two values constructed from different pools must never be compared or
/// combined; set operations assert this at construction time.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct PoolId(pub u32);

/// An opaque package id, stable only within the sack instance that issued it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct PackageId(pub u32);

impl Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl PackageId {
    /// Returns the raw index backing this id.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An opaque, sack-internal handle for a repo attached to a sack.
///
/// Distinct from the externally visible, ASCII [`crate::RepoId`] string
/// identity: a `RepoHandle` is only meaningful against the sack that
/// allocated it and is reused instead of cloning strings on every lookup.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct RepoHandle(pub u32);

impl Display for RepoHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "repo#{}", self.0)
    }
}
