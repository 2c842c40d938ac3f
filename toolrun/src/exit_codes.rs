//! Stable exit codes for toolrun CLI commands.

/// The tool ran and exited successfully (or `--dry-run` rendered a command).
pub const OK: i32 = 0;
/// The tool could not be launched, exited non-zero, timed out or was cancelled.
pub const FAILED: i32 = 1;
/// Invalid configuration, missing options or an input no variant accepts.
pub const INVALID: i32 = 2;
