//! Common types for the kiosk order service.
//!
//! This crate holds the order model shared by every other crate in the
//! workspace: orders and products, the order state machine, the identity
//! rule, inbound order decoding, backend configuration schemas and the HTTP
//! response envelope.

/// HTTP response envelope.
pub mod api;
/// Decoding of untyped order documents into typed orders.
pub mod decode;
/// Orders, products and the order state machine.
pub mod order;
/// Registry trait for pluggable implementations.
pub mod registry;
/// Configuration schema validation.
pub mod validation;

pub use api::*;
pub use decode::{decode_order, OrderDecodeError};
pub use order::*;
pub use registry::ImplementationRegistry;
pub use validation::*;
