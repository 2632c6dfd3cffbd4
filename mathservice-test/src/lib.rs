//! Test utilities for the math service and its clients.
//!
//! See the modules for all available utilities.

pub mod server;
pub mod tracing;
