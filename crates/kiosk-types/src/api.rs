//! Response envelope for the kiosk HTTP API.
//!
//! Every endpoint answers with a JSON object carrying a `status` of
//! `"success"` or `"error"`, an optional human-readable `message`, and the
//! payload of the endpoint (an order or an order status) when there is one.

use crate::{Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// Outcome marker carried by every response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
	Success,
	Error,
}

/// JSON response envelope with its HTTP status code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
	/// HTTP status code, not part of the body.
	#[serde(skip, default = "default_status_code")]
	pub status_code: u16,
	pub status: ResponseStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub order: Option<Order>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub order_status: Option<OrderStatus>,
}

fn default_status_code() -> u16 {
	200
}

impl ApiResponse {
	/// Successful response with an optional message.
	pub fn success(status_code: u16, message: Option<String>) -> Self {
		Self {
			status_code,
			status: ResponseStatus::Success,
			message,
			order: None,
			order_status: None,
		}
	}

	/// Error response with a message.
	pub fn error(status_code: u16, message: impl Into<String>) -> Self {
		Self {
			status_code,
			status: ResponseStatus::Error,
			message: Some(message.into()),
			order: None,
			order_status: None,
		}
	}

	fn with_order(mut self, order: Order) -> Self {
		self.order = Some(order);
		self
	}

	pub fn order_created(order: Order) -> Self {
		Self::success(201, Some("Order received".into())).with_order(order)
	}

	pub fn order_retrieved(order: Order) -> Self {
		Self::success(200, None).with_order(order)
	}

	pub fn order_finished() -> Self {
		Self::success(200, Some("Order marked as completed".into()))
	}

	pub fn order_cancelled(order_id: Option<i64>) -> Self {
		let message = match order_id {
			Some(id) => format!("Order {} cancelled", id),
			None => "Order cancelled".to_string(),
		};
		Self::success(200, Some(message))
	}

	pub fn order_status(status: OrderStatus) -> Self {
		let mut response = Self::success(200, None);
		response.order_status = Some(status);
		response
	}

	pub fn queue_empty() -> Self {
		Self::error(404, "Queue is empty")
	}

	pub fn order_not_found() -> Self {
		Self::error(404, "Order not found")
	}

	pub fn order_not_in_queue() -> Self {
		Self::error(404, "Order not found in queue")
	}

	pub fn endpoint_not_found() -> Self {
		Self::error(404, "Endpoint not found")
	}

	pub fn invalid_order_format() -> Self {
		Self::error(400, "Invalid order format")
	}

	pub fn invalid_order_id() -> Self {
		Self::error(400, "Invalid ID")
	}

	pub fn failed_to_finish() -> Self {
		Self::error(400, "Failed to finish order")
	}

	pub fn internal_error(message: impl Into<String>) -> Self {
		Self::error(500, message)
	}
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ApiResponse {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self)).into_response()
	}
}
