//! Errors for the sack, query, and selector layer.

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("pool mismatch: package set from pool {left} used against pool {right}")]
    PoolMismatch { left: u32, right: u32 },

    #[error("bad selector: {detail}")]
    BadSelector { detail: String },

    #[error("invalid architecture `{arch}`")]
    InvalidArchitecture { arch: String },

    #[error("invalid glob pattern `{pattern}`: {detail}")]
    InvalidGlob { pattern: String, detail: String },
}

impl From<pmcore_types::Error> for Error {
    fn from(value: pmcore_types::Error) -> Self {
        match value {
            pmcore_types::Error::PoolMismatch { left, right } => Error::PoolMismatch { left, right },
            other => Error::BadSelector { detail: other.to_string() },
        }
    }
}
