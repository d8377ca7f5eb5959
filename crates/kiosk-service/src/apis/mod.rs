//! Endpoint handlers of the kiosk HTTP API.

pub mod order;
