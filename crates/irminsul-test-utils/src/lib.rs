//! Shared testing utilities: a scripted HTTP transport and wiki page fixtures.

pub mod fixtures;
pub mod transport;

pub use transport::{RecordedCall, Scripted, ScriptedTransport};
