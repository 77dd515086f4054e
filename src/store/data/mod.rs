mod automation;
mod log;

pub use automation::Automation;
pub use log::LogRecord;
