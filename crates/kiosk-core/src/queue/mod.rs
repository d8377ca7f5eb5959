//! In-memory production queue.
//!
//! Orders wait here, FIFO by arrival, until a worker pulls them into
//! production. A secondary index keyed by order id gives constant-time lookup
//! without disturbing the arrival order. Orders with an unassigned id are
//! queued but never indexed.

use crate::utils::render_queue_state;
use kiosk_types::{same_identity, Order};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// FIFO queue of orders with lookup by identifier.
#[derive(Debug, Default)]
pub struct OrderQueue {
	/// Orders in arrival order.
	orders: VecDeque<Order>,
	/// Assigned ids to a copy of the queued order.
	index: HashMap<i64, Order>,
}

impl OrderQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends an order to the tail.
	///
	/// An order whose assigned id is already queued is ignored and the
	/// existing entry is left untouched. Returns whether the order was added.
	pub fn enqueue(&mut self, order: Order) -> bool {
		if order.is_assigned() {
			if self.index.contains_key(&order.id) {
				tracing::debug!(order_id = order.id, "Order already queued, ignoring");
				return false;
			}
			self.index.insert(order.id, order.clone());
		}

		tracing::debug!(order_id = order.id, position = self.orders.len() + 1, "Order queued");
		self.orders.push_back(order);
		true
	}

	/// Removes and returns the head of the queue.
	pub fn dequeue(&mut self) -> Option<Order> {
		let order = self.orders.pop_front()?;
		if order.is_assigned() {
			self.index.remove(&order.id);
		}
		Some(order)
	}

	/// Removes the first queued order with the same identity as `order`.
	///
	/// Always fails for an unassigned order.
	pub fn remove(&mut self, order: &Order) -> bool {
		let Some(position) = self
			.orders
			.iter()
			.position(|queued| same_identity(queued, order))
		else {
			return false;
		};

		self.orders.remove(position);
		self.index.remove(&order.id);
		true
	}

	/// Looks up a queued order by id.
	pub fn get_by_identifier(&self, id: i64) -> Option<&Order> {
		self.index.get(&id)
	}

	pub fn size(&self) -> usize {
		self.orders.len()
	}

	pub fn is_empty(&self) -> bool {
		self.orders.is_empty()
	}

	/// Iterates over the queued orders, head first.
	pub fn iter(&self) -> impl Iterator<Item = &Order> {
		self.orders.iter()
	}

	/// Returns a copy of the queued orders, head first.
	pub fn orders(&self) -> Vec<Order> {
		self.orders.iter().cloned().collect()
	}

	#[cfg(test)]
	fn index_in_sync(&self) -> bool {
		let assigned: Vec<&Order> = self.orders.iter().filter(|o| o.is_assigned()).collect();
		assigned.len() == self.index.len()
			&& assigned
				.iter()
				.all(|o| self.index.get(&o.id).is_some_and(|indexed| indexed == *o))
	}
}

impl fmt::Display for OrderQueue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&render_queue_state(&self.orders()))
	}
}
