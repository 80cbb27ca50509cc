//! Commandeer: natural-language command orchestration.
//!
//! Free-form instructions are interpreted into exactly one tool call,
//! validated and dispatched to a registered capability, and returned in a
//! uniform response envelope.

pub mod config;
pub mod error;
pub mod interpreter;
pub mod orchestrator;
pub mod server;
pub mod setup;
pub mod tools;
pub mod types;

pub use orchestrator::Orchestrator;
