//! Core of the kiosk order service.
//!
//! This crate holds the in-memory production queue and the order lifecycle
//! manager that keeps the queue consistent with the persistent store, along
//! with startup recovery and the builder that wires everything from
//! configuration.

pub mod builder;
pub mod lifecycle;
pub mod queue;
pub mod recovery;
pub mod state;
pub mod utils;

pub use builder::{BuilderError, KioskBuilder, KioskFactories};
pub use lifecycle::{LifecycleError, OrderLifecycle};
pub use queue::OrderQueue;
pub use recovery::{RecoveryReport, RecoveryService};
pub use state::OrderStateMachine;
