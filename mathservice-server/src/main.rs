//! The math service binary.
//!
//! See the `mathservice_server` library for the service itself.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

fn main() -> anyhow::Result<()> {
    mathservice_server::cli::execute()
}
