//! Errors for plan projection, download, and rpm execution.

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Repo(#[from] pmcore_repo::Error),

    #[error(transparent)]
    History(#[from] pmcore_history::Error),

    #[error("a required repo failed to provide package(s): {0:?}")]
    RequiredDownloadFailed(Vec<String>),

    #[error("rpm transaction failed with exit status {0}")]
    RpmTransactionFailed(i32),

    #[error("transaction was cancelled")]
    Cancelled,

    #[error("plan item `{0}` has no owning repo recorded")]
    MissingRepo(String),
}
