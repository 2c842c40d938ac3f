//! Deterministic, pure logic for describing tool invocations.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod dispatch;
pub mod grammar;
pub mod options;
pub mod params;
pub mod types;
