//! Dependency resolution: turns staged install/erase/upgrade intents into a
//! [`Solution`] by driving a [`resolvo`] solve over a [`pmcore_sack::Sack`]'s
//! considered set.

mod error;
mod goal;
mod provider;
mod solution;
mod types;

pub use error::Error;
pub use goal::{ActionBits, Goal, GoalFailure, SolverProblem};
pub use provider::PmDependencyProvider;
pub use solution::{ResolutionAction, Solution};
pub use types::{PmMatchSpec, PmRecord, PmRecordKind};
