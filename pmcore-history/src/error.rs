//! Errors for the history store.

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("history database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("cannot create history directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("history database at `{path}` has unrecognized schema version `{version}`")]
    UnknownSchemaVersion { path: String, version: String },

    #[error("no transaction with id {0} is open")]
    NoOpenTransaction(i64),
}
