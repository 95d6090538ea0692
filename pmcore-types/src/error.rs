//! Errors for pmcore-types.

/// Errors that can occur while constructing or parsing core value types.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A package, repo, or architecture name failed validation.
    #[error("invalid name `{0}`")]
    InvalidName(String),

    /// An EVR (epoch:version-release) string could not be parsed.
    #[error("invalid EVR `{0}`")]
    InvalidEvr(String),

    /// A reldep string (`name OP evr`) could not be parsed.
    #[error("invalid reldep `{0}`")]
    InvalidReldep(String),

    /// A NEVRA string could not be parsed.
    #[error("invalid NEVRA `{0}`")]
    InvalidNevra(String),

    /// A checksum string had an unrecognized algorithm id or malformed digest.
    #[error("invalid checksum `{0}`")]
    InvalidChecksum(String),

    /// An architecture string did not match any known or `noarch` architecture.
    #[error("invalid architecture `{0}`")]
    InvalidArchitecture(String),

    /// Two package sets that do not share a pool were combined.
    #[error("package sets from different pools cannot be combined (left pool {left}, right pool {right})")]
    PoolMismatch {
        /// The pool id of the left-hand operand.
        left: u32,
        /// The pool id of the right-hand operand.
        right: u32,
    },
}
