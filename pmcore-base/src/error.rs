//! Errors for config loading, repo discovery, and the other facade steps.

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Config(#[from] pmcore_config::Error),

    #[error(transparent)]
    Repo(#[from] pmcore_repo::Error),

    #[error(transparent)]
    History(#[from] pmcore_history::Error),

    #[error(transparent)]
    Solve(#[from] pmcore_solve::Error),

    #[error(transparent)]
    Transaction(#[from] pmcore_transaction::Error),

    #[error("cannot read `{path}`: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("repo id `{0}` is invalid: {1}")]
    InvalidRepoId(String, pmcore_types::Error),

    #[error("repo `{0}` is not attached to this base")]
    UnknownRepo(String),
}
