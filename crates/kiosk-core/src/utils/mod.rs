//! Utility functions for the kiosk core.

pub mod formatting;

pub use formatting::{format_id, render_queue_state};
