//! State management for orders.
//!
//! Provides the order state machine that applies and persists status changes.

pub mod order;

pub use order::OrderStateMachine;
