//! Core value types shared across the resolution and transaction pipeline:
//! package identity, RPM-style version ordering, interned dependency
//! expressions, and the read-only package attribute record.

mod checksum;
mod error;
mod evr;
mod ids;
mod name;
mod nevra;
mod package;
mod reason;
mod reldep;
mod set;

pub use checksum::{Checksum, ChecksumKind};
pub use error::Error;
pub use evr::{rpmvercmp, Epoch, Evr};
pub use ids::{PackageId, PoolId, RepoHandle};
pub use name::{Architecture, Name, RepoId};
pub use nevra::Nevra;
pub use package::{Package, PackageBuilder};
pub use reason::{PackageAction, Reason};
pub use reldep::{InternedReldep, RelPool, Reldep, ReldepFlag, ReldepList};
pub use set::PackageSet;
