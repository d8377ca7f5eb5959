//! String formatting utilities.
//!
//! Renders queue contents as a plain-text table for startup output and
//! debug logs.

use kiosk_types::{Order, UNASSIGNED_ID};
use std::fmt::{self, Write};

/// Formats an identifier for display, "N/A" when unassigned.
pub fn format_id(id: i64) -> String {
	if id == UNASSIGNED_ID {
		"N/A".to_string()
	} else {
		id.to_string()
	}
}

/// Renders the queued orders as a table, head of the queue first.
pub fn render_queue_state(orders: &[Order]) -> String {
	if orders.is_empty() {
		return "=== Queue is empty ===".to_string();
	}

	let mut out = String::new();
	match write_queue_table(&mut out, orders) {
		Ok(()) => out.trim_end().to_string(),
		Err(_) => format!("=== Queue state: {} order(s) ===", orders.len()),
	}
}

fn write_queue_table(out: &mut impl Write, orders: &[Order]) -> fmt::Result {
	writeln!(out, "=== Queue state: {} order(s) ===", orders.len())?;
	writeln!(
		out,
		"{:<5} {:<8} {:<6} {:<12} {:<8}",
		"Pos", "ID", "Box", "Status", "Products"
	)?;
	for (position, order) in orders.iter().enumerate() {
		writeln!(
			out,
			"{:<5} {:<8} {:<6} {:<12} {:<8}",
			position + 1,
			format_id(order.id),
			format_id(order.box_id),
			order.status,
			order.products.len()
		)?;
	}
	Ok(())
}
