//! The top-level facade: configuration loading, repo discovery from system
//! configuration, and the sack/history wiring a caller needs before it can
//! resolve and run a transaction.

mod base;
mod error;
mod logger;

pub use base::Base;
pub use error::Error;
pub use logger::init_logger;
