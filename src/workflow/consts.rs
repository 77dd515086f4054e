/// Context key holding the trigger payload.
pub const TRIGGER_KEY: &str = "trigger";
/// Context key mirroring every variable assigned during a run.
pub const VARIABLES_KEY: &str = "variables";
/// Context keys no node or variable may take over.
pub const RESERVED_NAMES: &[&str] = &[TRIGGER_KEY, VARIABLES_KEY];

pub const BRANCH_TRUE: &str = "true";
pub const BRANCH_FALSE: &str = "false";
pub const BRANCH_ELSE: &str = "else";
pub const BRANCH_DEFAULT: &str = "default";
pub const CASE_BRANCH_PREFIX: &str = "case_";
