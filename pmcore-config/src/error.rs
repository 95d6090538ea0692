//! Errors for pmcore-config.

/// Errors that can occur while loading or setting configuration options.
///
/// Domain, name, description, and detail are kept as stable, separately
/// accessible fields (rather than folded into one formatted string) so log
/// matching in calling code stays robust across message wording changes.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A value failed to parse or validate for its declared option kind.
    #[error("{domain}.{name}: {description} ({detail})")]
    InvalidValue {
        domain: &'static str,
        name: String,
        description: &'static str,
        detail: String,
    },

    /// I/O error while reading a config file.
    #[error("I/O error reading `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A `.conf` file's INI syntax could not be parsed.
    #[error("malformed config file `{path}` at line {line}: {detail}")]
    Syntax {
        path: String,
        line: usize,
        detail: String,
    },
}
