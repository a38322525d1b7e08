//! Execution engine: protocol, run queue, status machine, output sink, and
//! the manager that ties them to one execution context.

pub mod manager;
pub mod output;
pub mod protocol;
pub mod queue;
pub mod status;

pub use manager::{RuntimeManager, RuntimeNotice, RuntimeSettings, SubmitOutcome};
pub use output::{Channel, OutputRecord};
pub use status::ExecutionStatus;
