pub mod capabilities;
mod context;
pub mod session;

pub use context::{ExecutionContext, Services};
