//! Projects a solved goal into an ordered transaction plan, downloads the
//! artifacts it needs, and drives the rpm transaction that applies it.

mod downloader;
mod error;
mod plan;
mod rpmdriver;

pub use downloader::{download_plan, Downloaded};
pub use error::Error;
pub use plan::{PlanItem, TransactionPlan};
pub use rpmdriver::{run_plan, RpmRunResult, RpmTransactionHandle, TransactionElement};
