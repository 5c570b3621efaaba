pub mod config;
pub mod control;
pub mod errors;
pub mod mesh;
pub mod room;
pub mod signaling;
pub mod transport;

pub use config::*;
pub use control::*;
pub use errors::*;
pub use mesh::*;
pub use room::*;
pub use signaling::*;
pub use transport::*;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared state for one process: the WebSocket transport and the rooms
/// that report through it.
pub fn build_state(config: &CoordinatorConfig) -> Arc<AppState> {
    let signaling = SignalingService::new(config.ice_servers.clone());
    let rooms = RoomManager::new(config, Arc::new(signaling.clone()));
    Arc::new(AppState { signaling, rooms })
}

/// `GET /ws` upgrades to the signaling socket.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state)
}
