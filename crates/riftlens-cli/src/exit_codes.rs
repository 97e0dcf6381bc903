//! Process exit codes. Part of the command-line contract.

pub const SUCCESS: i32 = 0;
pub const ANALYSIS_FAILED: i32 = 1; // Pipeline finished in the failed state
pub const CONFIG_ERROR: i32 = 2; // Bad arguments, unreadable input or invalid config
