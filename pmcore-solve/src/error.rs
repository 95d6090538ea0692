//! Errors surfaced by the goal and solver layers.

use pmcore_types::PackageId;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Types(#[from] pmcore_types::Error),

    #[error(transparent)]
    Sack(#[from] pmcore_sack::Error),

    /// The solver could not find a solution; carries the problem list
    /// already formatted for display.
    #[error("no solution: {0}")]
    Unsolvable(String),

    /// The solver's transaction would remove a protected package.
    #[error("solution would remove protected package(s): {0:?}")]
    RemovalOfProtectedPkg(Vec<PackageId>),

    /// `write_debugdata` could not write to `path`.
    #[error("cannot write debug data to {path}: {source}")]
    FileInvalid { path: String, #[source] source: std::io::Error },
}
