//! Codec between in-memory orders and rows of the `Orders` table.
//!
//! The store never persists [`Order`] values directly. Orders are flattened
//! into [`OrderRecord`] rows whose `products` column holds the product list
//! as JSON text, produced and consumed only by [`encode_products`] and
//! [`decode_products`].

use crate::StorageError;
use kiosk_types::{Order, OrderStatus, Product};
use serde::{Deserialize, Serialize};

/// Name of the table (or collection) holding order rows.
pub const ORDERS_TABLE: &str = "Orders";

/// Timestamp format of the `timestamp` column, local time.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the `Orders` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
	pub id: i64,
	#[serde(rename = "box")]
	pub box_id: i64,
	pub status: String,
	pub size: i64,
	/// JSON array of products.
	pub products: String,
	/// Creation time of the row.
	pub timestamp: String,
	/// Sync flag kept for compatibility; always written as 0.
	pub is_synced: i64,
}

impl OrderRecord {
	/// Flattens an order into a fresh row stamped with the current local time.
	pub fn from_order(order: &Order) -> Result<Self, StorageError> {
		Ok(Self {
			id: order.id,
			box_id: order.box_id,
			status: order.status.as_str().to_string(),
			size: order.size,
			products: encode_products(&order.products)?,
			timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
			is_synced: 0,
		})
	}

	/// Rebuilds the order held by this row.
	pub fn to_order(&self) -> Result<Order, StorageError> {
		let status = self
			.status
			.parse::<OrderStatus>()
			.map_err(StorageError::Serialization)?;

		Ok(Order {
			id: self.id,
			box_id: self.box_id,
			status,
			size: self.size,
			products: decode_products(&self.products)?,
		})
	}
}

/// Encodes a product list into the JSON text stored in the `products` column.
pub fn encode_products(products: &[Product]) -> Result<String, StorageError> {
	serde_json::to_string(products).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Decodes the JSON text of the `products` column.
pub fn decode_products(raw: &str) -> Result<Vec<Product>, StorageError> {
	serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;
	use kiosk_types::{Syrup, Topping};

	fn sample_order() -> Order {
		Order {
			id: 42,
			box_id: 3,
			status: OrderStatus::Production,
			size: 2,
			products: vec![
				Product {
					id: 1,
					cup: 2,
					flavour: "vanilla".into(),
					syrups: vec![Syrup {
						name: "chocolate".into(),
						qtd: 1,
					}],
					..Product::default()
				},
				Product {
					id: 2,
					cup: 1,
					flavour: "strawberry".into(),
					toppings: vec![Topping {
						name: "peanuts".into(),
						qtd: 2,
					}],
					..Product::default()
				},
			],
		}
	}

	#[test]
	fn test_record_columns() {
		let record = OrderRecord::from_order(&sample_order()).unwrap();
		assert_eq!(record.status, "production");
		assert_eq!(record.is_synced, 0);
		assert_eq!(record.timestamp.len(), "2024-01-01 00:00:00".len());

		let products: serde_json::Value = serde_json::from_str(&record.products).unwrap();
		assert_eq!(products[0]["type"], "ice cream");
		assert_eq!(products[0]["syrups"][0]["name"], "chocolate");
		assert_eq!(products[1]["toppings"][0]["qtd"], 2);
	}

	#[test]
	fn test_record_restores_order() {
		let order = sample_order();
		let record = OrderRecord::from_order(&order).unwrap();
		assert_eq!(record.to_order().unwrap(), order);
	}

	#[test]
	fn test_product_order_is_kept() {
		let products = decode_products(&encode_products(&sample_order().products).unwrap()).unwrap();
		assert_eq!(products[0].id, 1);
		assert_eq!(products[1].id, 2);
	}

	#[test]
	fn test_bad_rows_are_rejected() {
		let mut record = OrderRecord::from_order(&sample_order()).unwrap();
		record.products = "not json".into();
		assert!(matches!(record.to_order(), Err(StorageError::Serialization(_))));

		let mut record = OrderRecord::from_order(&sample_order()).unwrap();
		record.status = "shipped".into();
		assert!(matches!(record.to_order(), Err(StorageError::Serialization(_))));
	}
}
