//! Typed, priority-ranked configuration option model.
//!
//! Configuration is modeled as a flat namespace of [`option::OptionCell`]s
//! rather than a struct-per-section tree, so that generic INI loading can
//! write into any option by name without per-section glue code.

mod error;
mod ini;
mod option;
mod priority;
mod schema;
mod units;
mod validators;

pub use error::Error;
pub use ini::{parse_ini, IniDocument, IniEntry};
pub use option::{Kind, OptionCell};
pub use priority::Priority;
pub use schema::{ConfigSchema, MainConfig, RepoConfig};
pub use units::{parse_bandwidth, parse_seconds, parse_throttle, Throttle, NEVER};
