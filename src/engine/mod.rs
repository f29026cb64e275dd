// src/engine/mod.rs

//! Update transaction engine.
//!
//! The pure core state machine lives in [`stage`]; the async/IO shell that
//! sequences backup, stop, swap, start, health check and rollback is
//! implemented in [`orchestrator`].

pub mod orchestrator;
pub mod stage;

pub use orchestrator::Orchestrator;
pub use stage::{InvalidTransition, Stage, StatusTrail, Transaction, TransactionReport};
