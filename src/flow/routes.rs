//! REST endpoints for the browser rendering layer.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::debug;

use super::controller::{OrderSession, UiEvent};

/// Shared state for order routes.
#[derive(Clone)]
pub struct OrderRouteState {
    /// Holding the lock for a whole event keeps input strictly sequential.
    pub session: Arc<Mutex<OrderSession>>,
}

/// GET /api/order/state
async fn get_state(State(state): State<OrderRouteState>) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    Json(session.snapshot().await)
}

/// GET /api/order/menu
async fn get_menu(State(state): State<OrderRouteState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    Json(serde_json::json!({
        "store": session.store(),
        "items": session.menu().items(),
    }))
}

/// POST /api/order/events
///
/// Applies one UI event and returns the resulting snapshot. Once the
/// session is locked the event is ignored and 409 is returned.
async fn post_event(
    State(state): State<OrderRouteState>,
    Json(event): Json<UiEvent>,
) -> impl IntoResponse {
    let mut session = state.session.lock().await;
    if session.is_locked() {
        debug!(?event, "Event rejected, session locked");
        return (StatusCode::CONFLICT, Json(session.snapshot().await)).into_response();
    }
    session.dispatch(event).await;
    Json(session.snapshot().await).into_response()
}

/// Build the order REST routes.
pub fn order_routes(state: OrderRouteState) -> Router {
    Router::new()
        .route("/api/order/state", get(get_state))
        .route("/api/order/menu", get(get_menu))
        .route("/api/order/events", post(post_event))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
