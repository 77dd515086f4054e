//! What a run leaves behind: one log entry per visited node and the overall
//! result handed back to the caller.

mod log;
mod result;

pub use log::{LogStatus, NodeExecutionLog};
pub use result::{ExecutionResult, RESPONSE_SEPARATOR, RunState};
