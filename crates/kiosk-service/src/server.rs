//! HTTP server for the kiosk API.
//!
//! Routes order requests to the lifecycle manager. Every response is a JSON
//! envelope; unknown paths get a 404 envelope as well.

use axum::{
	routing::{get, post},
	Router,
};
use kiosk_config::ApiConfig;
use kiosk_core::OrderLifecycle;
use kiosk_types::ApiResponse;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::apis::order;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Lifecycle manager handling every order request.
	pub lifecycle: Arc<OrderLifecycle>,
}

/// Builds the API router.
pub fn router(lifecycle: Arc<OrderLifecycle>) -> Router {
	Router::new()
		.nest(
			"/order",
			Router::new()
				.route("/put", post(order::put_order))
				.route("/get", get(order::get_order))
				.route("/finish", post(order::finish_order))
				.route("/cancel", post(order::cancel_order))
				.route("/cancel_by_id", get(order::cancel_order_by_id))
				.route("/status", get(order::order_status)),
		)
		.fallback(handle_not_found)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(AppState { lifecycle })
}

/// Starts the HTTP server and runs it until Ctrl-C.
pub async fn start_server(
	api_config: ApiConfig,
	lifecycle: Arc<OrderLifecycle>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(lifecycle);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Kiosk API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	tracing::info!("Kiosk API server stopped");
	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "Failed to listen for shutdown signal");
		return;
	}
	tracing::info!("Shutdown signal received");
}

async fn handle_not_found() -> ApiResponse {
	ApiResponse::endpoint_not_found()
}
