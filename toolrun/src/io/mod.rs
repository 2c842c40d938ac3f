//! Side-effecting helpers: configuration files, processes, log sinks.

pub mod config;
pub mod executor;
pub mod nuspec;
pub mod process;
pub mod sink;
