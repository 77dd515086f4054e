mod action;
mod models;

pub use action::SwitchAction;
pub use models::{MatchMode, SwitchSettings};
