//! Wrappers for the individual build tools.
//!
//! Each wrapper owns a [`crate::task::ToolTask`] bound to its tool's static
//! grammar and exposes named setters for the options that grammar renders.

pub mod msbuild;
pub mod nuget_pack;
pub mod nuget_update;

/// Option naming the executable to run instead of the tool's default.
pub const COMMAND: &str = "command";
