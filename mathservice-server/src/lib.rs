//! The math service.
//!
//! A stateless HTTP service with a single operation: `POST /` adds the two numbers of an
//! [`AddRequest`](mathservice_types::AddRequest) and returns the sum after a fixed
//! [simulated delay](endpoints::add::SIMULATED_DELAY). The delay is a timer on the async runtime, so
//! the number of requests that can wait concurrently is bounded by connection capacity only.

pub mod cli;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod extractors;
pub mod healthcheck;
pub mod observability;
pub mod web;
