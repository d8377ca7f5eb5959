//! Order endpoints of the kiosk API.
//!
//! Each handler translates one request into a lifecycle call and the result
//! into an [`ApiResponse`]. Lifecycle storage failures are answered with 500;
//! malformed input with 400.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use kiosk_core::LifecycleError;
use kiosk_types::ApiResponse;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::server::AppState;

/// Query string carrying an order id.
#[derive(Debug, Deserialize)]
pub struct IdQuery {
	pub id: Option<String>,
}

impl IdQuery {
	/// Parses the id, rejecting missing, non-numeric and negative values.
	fn order_id(&self) -> Option<i64> {
		self.id
			.as_deref()
			.and_then(|raw| raw.trim().parse::<i64>().ok())
			.filter(|id| *id >= 0)
	}
}

fn lifecycle_error(e: LifecycleError) -> ApiResponse {
	match e {
		LifecycleError::Validation(e) => {
			warn!(error = %e, "Rejected order");
			ApiResponse::error(400, format!("Invalid order format: {}", e))
		},
		LifecycleError::Storage(e) => {
			warn!(error = %e, "Order storage failed");
			ApiResponse::internal_error(e.to_string())
		},
	}
}

/// True for bodies that carry no order at all: `null`, `false`, `0`, `""`,
/// `[]` and `{}`.
fn is_empty_document(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::Bool(b) => !b,
		Value::Number(n) => n.as_f64() == Some(0.0),
		Value::String(s) => s.is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(fields) => fields.is_empty(),
	}
}

fn body_or_reject(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiResponse> {
	let Json(value) = payload.map_err(|rejection| {
		warn!(error = %rejection, "Unreadable request body");
		ApiResponse::invalid_order_format()
	})?;

	if is_empty_document(&value) {
		warn!("Empty request body");
		return Err(ApiResponse::invalid_order_format());
	}
	Ok(value)
}

/// Handles POST /order/put requests.
pub async fn put_order(
	State(state): State<AppState>,
	payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
	let raw = match body_or_reject(payload) {
		Ok(raw) => raw,
		Err(response) => return response,
	};

	match state.lifecycle.create_order(raw).await {
		Ok(order) => {
			info!(order_id = order.id, "Order received");
			ApiResponse::order_created(order)
		},
		Err(e) => lifecycle_error(e),
	}
}

/// Handles GET /order/get requests.
pub async fn get_order(State(state): State<AppState>) -> ApiResponse {
	match state.lifecycle.get_next_order().await {
		Ok(Some(order)) => ApiResponse::order_retrieved(order),
		Ok(None) => ApiResponse::queue_empty(),
		Err(e) => lifecycle_error(e),
	}
}

/// Handles POST /order/finish requests.
pub async fn finish_order(
	State(state): State<AppState>,
	payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
	let raw = match body_or_reject(payload) {
		Ok(raw) => raw,
		Err(response) => return response,
	};

	match state.lifecycle.finish_order(raw).await {
		Ok(true) => ApiResponse::order_finished(),
		Ok(false) => ApiResponse::failed_to_finish(),
		Err(e) => lifecycle_error(e),
	}
}

/// Handles POST /order/cancel requests.
pub async fn cancel_order(
	State(state): State<AppState>,
	payload: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
	let raw = match body_or_reject(payload) {
		Ok(raw) => raw,
		Err(response) => return response,
	};

	match state.lifecycle.cancel_order(raw).await {
		Ok(true) => ApiResponse::order_cancelled(None),
		Ok(false) => ApiResponse::order_not_in_queue(),
		Err(e) => lifecycle_error(e),
	}
}

/// Handles GET /order/cancel_by_id?id=N requests.
pub async fn cancel_order_by_id(
	State(state): State<AppState>,
	Query(query): Query<IdQuery>,
) -> ApiResponse {
	let Some(id) = query.order_id() else {
		return ApiResponse::invalid_order_id();
	};

	match state.lifecycle.cancel_order_by_identifier(id).await {
		Ok(true) => ApiResponse::order_cancelled(Some(id)),
		Ok(false) => ApiResponse::order_not_in_queue(),
		Err(e) => lifecycle_error(e),
	}
}

/// Handles GET /order/status?id=N requests.
pub async fn order_status(
	State(state): State<AppState>,
	Query(query): Query<IdQuery>,
) -> ApiResponse {
	let Some(id) = query.order_id() else {
		return ApiResponse::invalid_order_id();
	};

	match state.lifecycle.get_order_status(id).await {
		Some(status) => ApiResponse::order_status(status),
		None => ApiResponse::order_not_found(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn query(id: Option<&str>) -> IdQuery {
		IdQuery {
			id: id.map(str::to_string),
		}
	}

	#[test]
	fn test_id_query_parsing() {
		assert_eq!(query(Some("12")).order_id(), Some(12));
		assert_eq!(query(Some(" 0 ")).order_id(), Some(0));
		assert_eq!(query(Some("-1")).order_id(), None);
		assert_eq!(query(Some("abc")).order_id(), None);
		assert_eq!(query(None).order_id(), None);
	}

	#[test]
	fn test_empty_bodies_are_rejected() {
		for body in [json!(null), json!({}), json!([]), json!(""), json!(0), json!(false)] {
			let response = body_or_reject(Ok(Json(body.clone()))).unwrap_err();
			assert_eq!(response.status_code, 400, "body {}", body);
			assert_eq!(response.message.as_deref(), Some("Invalid order format"));
		}

		for body in [json!({"id": 1}), json!([1]), json!(7), json!(true)] {
			assert_eq!(body_or_reject(Ok(Json(body.clone()))).unwrap(), body);
		}
	}
}
