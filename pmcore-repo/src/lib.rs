//! Repo metadata lifecycle: variable substitution, the refresh protocol,
//! mirror failover, and package download.

mod error;
mod fetch;
mod primary;
mod repo;
mod repomd;
mod vars;

pub use error::Error;
pub use fetch::{fetch_to_file, FetchOutcome, Mirror};
pub use primary::parse_primary;
pub use repo::{Enabled, MetadataKind, Repo, RepoKind, RepomdEntry, UpdateFlags};
pub use repomd::{parse_repomd, Repomd};
pub use vars::VarMap;
