//! Order and product types for the kiosk production line.
//!
//! This module defines the order model shared by the queue, the persistent
//! store and the HTTP boundary, together with the order state machine and the
//! identity rule used when orders are matched by value.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Identifier value carried by orders and products that have not been assigned one.
pub const UNASSIGNED_ID: i64 = -1;

/// Default product type for new products.
pub const DEFAULT_PRODUCT_TYPE: &str = "ice cream";

/// Status of an order (or product) in the production line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	/// Order is waiting in the queue.
	#[default]
	Pending,
	/// Order has been pulled by the production worker.
	Production,
	/// Order has been produced.
	Completed,
	/// Order was cancelled before completion.
	Cancelled,
}

impl OrderStatus {
	/// Returns the persisted string representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Production => "production",
			OrderStatus::Completed => "completed",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Checks whether moving from `self` to `next` follows the order state machine.
	///
	/// pending -> production -> {completed, cancelled}, plus pending -> cancelled.
	pub fn can_transition_to(&self, next: OrderStatus) -> bool {
		static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
			let mut m = HashMap::new();
			m.insert(
				OrderStatus::Pending,
				HashSet::from([OrderStatus::Production, OrderStatus::Cancelled]),
			);
			m.insert(
				OrderStatus::Production,
				HashSet::from([OrderStatus::Completed, OrderStatus::Cancelled]),
			);
			m.insert(OrderStatus::Completed, HashSet::new()); // terminal
			m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
			m
		});

		TRANSITIONS
			.get(self)
			.is_some_and(|allowed| allowed.contains(&next))
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"production" => Ok(Self::Production),
			"completed" => Ok(Self::Completed),
			"cancelled" => Ok(Self::Cancelled),
			other => Err(format!("unknown order status '{}'", other)),
		}
	}
}

/// Syrup addition on a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Syrup {
	pub name: String,
	pub qtd: i64,
}

/// Topping addition on a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topping {
	pub name: String,
	pub qtd: i64,
}

/// A single item of an order, e.g. one ice-cream cup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
	/// Product identifier, [`UNASSIGNED_ID`] when not assigned.
	pub id: i64,
	/// Cup size.
	pub cup: i64,
	/// Product type, "ice cream" unless stated otherwise.
	#[serde(rename = "type")]
	pub product_type: String,
	/// Product-level status. Tracked but not enforced.
	pub status: OrderStatus,
	pub flavour: String,
	pub syrups: Vec<Syrup>,
	pub toppings: Vec<Topping>,
}

impl Default for Product {
	fn default() -> Self {
		Self {
			id: UNASSIGNED_ID,
			cup: UNASSIGNED_ID,
			product_type: DEFAULT_PRODUCT_TYPE.to_string(),
			status: OrderStatus::Pending,
			flavour: String::new(),
			syrups: Vec::new(),
			toppings: Vec::new(),
		}
	}
}

/// A customer order made of one or more products.
///
/// Structural equality (`PartialEq`) compares every field. Matching orders by
/// identity goes through [`same_identity`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
	/// Order identifier, externally supplied. [`UNASSIGNED_ID`] for new orders.
	pub id: i64,
	/// Target box/slot, [`UNASSIGNED_ID`] when not assigned.
	#[serde(rename = "box")]
	pub box_id: i64,
	/// Current status of the order.
	pub status: OrderStatus,
	/// Number of product units the order declares.
	pub size: i64,
	/// Products in production sequence.
	pub products: Vec<Product>,
}

impl Default for Order {
	fn default() -> Self {
		Self {
			id: UNASSIGNED_ID,
			box_id: UNASSIGNED_ID,
			status: OrderStatus::Pending,
			size: 0,
			products: Vec::new(),
		}
	}
}

impl Order {
	/// Creates a pending order with the given identifier and box.
	pub fn new(id: i64, box_id: i64) -> Self {
		Self {
			id,
			box_id,
			..Self::default()
		}
	}

	/// Returns true if the order carries an externally supplied identifier.
	pub fn is_assigned(&self) -> bool {
		self.id != UNASSIGNED_ID
	}
}

/// Entities that carry an identifier subject to the unassigned sentinel.
pub trait Identified {
	/// Returns the entity identifier, [`UNASSIGNED_ID`] when not assigned.
	fn identifier(&self) -> i64;
}

impl Identified for Order {
	fn identifier(&self) -> i64 {
		self.id
	}
}

impl Identified for Product {
	fn identifier(&self) -> i64 {
		self.id
	}
}

/// Identity rule for orders and products.
///
/// Two values are the same entity iff both have an assigned identifier and
/// the identifiers match. An unassigned value is never the same as anything,
/// including another unassigned value.
pub fn same_identity<T: Identified>(a: &T, b: &T) -> bool {
	let (a, b) = (a.identifier(), b.identifier());
	a != UNASSIGNED_ID && b != UNASSIGNED_ID && a == b
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unassigned_orders_are_never_the_same() {
		let a = Order::default();
		let b = Order::default();
		assert!(!same_identity(&a, &b));
		assert!(!same_identity(&a, &a));
	}

	#[test]
	fn test_matching_ids_are_the_same_regardless_of_fields() {
		let a = Order::new(7, 1);
		let mut b = Order::new(7, 3);
		b.status = OrderStatus::Cancelled;
		b.size = 4;
		assert!(same_identity(&a, &b));
		assert_ne!(a, b);
		assert!(!same_identity(&a, &Order::new(8, 1)));
	}

	#[test]
	fn test_product_identity() {
		let a = Product {
			id: 101,
			..Product::default()
		};
		let b = Product {
			id: 101,
			flavour: "vanilla".into(),
			..Product::default()
		};
		assert!(same_identity(&a, &b));
		assert!(!same_identity(&Product::default(), &Product::default()));
	}

	#[test]
	fn test_status_transitions() {
		use OrderStatus::*;
		assert!(Pending.can_transition_to(Production));
		assert!(Pending.can_transition_to(Cancelled));
		assert!(Production.can_transition_to(Completed));
		assert!(Production.can_transition_to(Cancelled));
		assert!(!Pending.can_transition_to(Completed));
		assert!(!Completed.can_transition_to(Cancelled));
		assert!(!Cancelled.can_transition_to(Cancelled));
	}

	#[test]
	fn test_status_string_forms() {
		for status in [
			OrderStatus::Pending,
			OrderStatus::Production,
			OrderStatus::Completed,
			OrderStatus::Cancelled,
		] {
			assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
			assert_eq!(
				serde_json::to_value(status).unwrap(),
				serde_json::Value::String(status.to_string())
			);
		}
		assert!("shipped".parse::<OrderStatus>().is_err());
	}

	#[test]
	fn test_product_wire_fields() {
		let product = Product {
			id: 101,
			cup: 2,
			flavour: "vanilla".into(),
			syrups: vec![Syrup {
				name: "chocolate".into(),
				qtd: 1,
			}],
			..Product::default()
		};
		let value = serde_json::to_value(&product).unwrap();
		assert_eq!(value["type"], "ice cream");
		assert_eq!(value["status"], "pending");
		assert_eq!(value["syrups"][0]["qtd"], 1);
		assert!(value["toppings"].as_array().unwrap().is_empty());
	}
}
