//! In-memory collaborators for exercising writers and publishers.
//!
//! Compiled for unit tests and, through the `test-util` feature, for the
//! integration tests under `tests/`.

mod collecting_reporter;
mod scripted_transport;

pub use collecting_reporter::CollectingReporter;
pub use scripted_transport::ScriptedTransport;
