//! Up-front decoding of inbound order documents.
//!
//! Inbound payloads arrive as untyped JSON. They are decoded field by field
//! into an [`Order`] so that a malformed document yields an error naming the
//! offending field instead of a partially constructed order.

use crate::{Order, OrderStatus, Product};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Errors produced while decoding an order document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderDecodeError {
	/// The document is not a JSON object.
	#[error("Order must be a JSON object, got {0}")]
	NotAnObject(&'static str),
	/// A field is present but has the wrong shape.
	#[error("Invalid value for field '{field}': {message}")]
	InvalidField { field: String, message: String },
}

/// Decodes an inbound JSON document into an [`Order`].
///
/// Absent fields take the order defaults (id -1, box -1, status pending,
/// size 0, no products). Unknown fields are ignored.
pub fn decode_order(value: Value) -> Result<Order, OrderDecodeError> {
	let mut fields = match value {
		Value::Object(fields) => fields,
		other => return Err(OrderDecodeError::NotAnObject(json_type_name(&other))),
	};

	let mut order = Order::default();
	if let Some(v) = fields.remove("id") {
		order.id = decode_field("id", v)?;
	}
	if let Some(v) = fields.remove("box") {
		order.box_id = decode_field("box", v)?;
	}
	if let Some(v) = fields.remove("status") {
		order.status = decode_field::<OrderStatus>("status", v)?;
	}
	if let Some(v) = fields.remove("size") {
		order.size = decode_field("size", v)?;
	}
	if let Some(v) = fields.remove("products") {
		order.products = decode_field::<Vec<Product>>("products", v)?;
	}

	Ok(order)
}

fn decode_field<T: DeserializeOwned>(field: &str, value: Value) -> Result<T, OrderDecodeError> {
	serde_json::from_value(value).map_err(|e| OrderDecodeError::InvalidField {
		field: field.to_string(),
		message: e.to_string(),
	})
}

fn json_type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
