//! Build-task wrappers for external .NET tooling.
//!
//! Each tool (MSBuild, `nuget update`, `nuget pack`) is described by a static
//! [`core::grammar::Grammar`]. Options collected on a [`task::ToolTask`] are
//! rendered into argument tokens, run by a [`io::executor::CommandExecutor`],
//! and checked by a [`report::FailureReporter`]. The architecture keeps a
//! strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (option storage, argument
//!   rendering, variant dispatch). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config files, process execution,
//!   log sinks, manifest synthesis). Isolated to enable scripting in tests.
//!
//! [`tools`] holds the per-tool wrappers built from those pieces.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod report;
pub mod task;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
