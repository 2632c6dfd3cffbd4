//! Module implementing the math service webserver.
//!
//! The main server application is implemented in the [`App`] struct, which sets up routing and
//! middleware. It is a tower service that can be run using any compatible server framework.
//!
//! To listen to incoming connections, use the [`server()`] function, which opens a TCP listener and
//! serves the application until the process is signalled. [`bind()`] opens the listener on its own,
//! for callers that run [`App`] themselves.
//!
//! Besides the endpoint handlers, the application answers unknown paths, unsupported methods and
//! handler panics with a JSON body of the form `{"detail": "..."}`.
//!
//! # Testing
//!
//! For end-to-end tests of the server, see the `mathservice-test` crate, which provides a test
//! server listening on a random port.

mod app;
mod middleware;
mod server;

pub use app::App;
pub use server::{bind, server};
