//! Errors for the repo lifecycle.

/// Failures a repo operation can surface, each carrying the repo id so log
/// matching and caller dispatch stay independent of message wording.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport failure reaching every configured mirror.
    #[error("repo `{repo_id}`: not available: {detail}")]
    NotAvailable { repo_id: String, detail: String },

    /// A downloaded file's checksum did not match `repomd.xml`.
    #[error("repo `{repo_id}`: checksum mismatch for `{file}`")]
    ChecksumMismatch { repo_id: String, file: String },

    /// `repo_gpgcheck` is on and signature verification failed.
    #[error("repo `{repo_id}`: GPG verification failed: {detail}")]
    GpgVerificationFailed { repo_id: String, detail: String },

    /// The on-disk cache directory could not be written to.
    #[error("repo `{repo_id}`: cannot write cache: {source}")]
    CannotWriteCache {
        repo_id: String,
        #[source]
        source: std::io::Error,
    },

    /// A metadata file failed to parse or violated an invariant.
    #[error("repo `{repo_id}`: invalid file `{file}`: {detail}")]
    FileInvalid { repo_id: String, file: String, detail: String },

    /// Caller error: e.g. downloading packages from a local-kind repo.
    #[error("repo `{repo_id}`: internal error: {detail}")]
    Internal { repo_id: String, detail: String },
}

impl Error {
    pub fn repo_id(&self) -> &str {
        match self {
            Error::NotAvailable { repo_id, .. }
            | Error::ChecksumMismatch { repo_id, .. }
            | Error::GpgVerificationFailed { repo_id, .. }
            | Error::CannotWriteCache { repo_id, .. }
            | Error::FileInvalid { repo_id, .. }
            | Error::Internal { repo_id, .. } => repo_id,
        }
    }
}
