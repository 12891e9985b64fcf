use crate::{websocket_listener, ConnectionHandler};
use axum::extract::WebSocketUpgrade;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_session_route(connection_handler: ConnectionHandler) -> Router {
    Router::new().route(
        "/session",
        get(move |ws: WebSocketUpgrade| {
            websocket_listener::handle_websocket(
                ws,
                ConnectionHandler::new_from(&connection_handler),
            )
        }),
    )
}

pub fn create_health_route() -> Router {
    Router::new().route("/health", get(|| async { "ok" }))
}

/// Full application router
pub fn create_router(connection_handler: ConnectionHandler) -> Router {
    Router::new()
        .merge(create_session_route(connection_handler))
        .merge(create_health_route())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
