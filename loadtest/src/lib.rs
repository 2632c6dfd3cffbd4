//! This is a load test library which runs virtual users against the math service.
//!
//! A [`Scenario`] defines a number of independent *virtual users*. Every user loops forever:
//! it sends one addition request, then pauses for a *think time* drawn uniformly from a configured
//! interval before sending the next one. Since every user draws its own pauses, requests from
//! different users are not synchronized.
//!
//! Failed requests, whether due to transport errors or non-success status codes, are logged and
//! counted, but never stop a user. The run ends after a given duration or on Ctrl-C, and produces
//! a [`Report`] with success and failure counts and latency percentiles.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod http;
pub mod loadtest;
pub mod scenario;

pub use crate::loadtest::{Report, run};
pub use crate::scenario::Scenario;
