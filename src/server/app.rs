use axum::{http::HeaderValue, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::api_routes;
use crate::websocket::ws_handler;

use super::AppState;

pub fn create_app(state: AppState) -> Router {
    let ws_path = state.settings.websocket.path.clone();

    Router::new()
        // Dashboard WebSocket endpoint
        .route(&ws_path, get(ws_handler))
        .merge(api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.settings.server.cors_origins))
        .with_state(state)
}

/// Allow any origin unless an explicit list is configured
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(allowed))
    }
}
