// Declare modules to be part of the library crate

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use state::AppState;

/// Builds the HTTP API over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/spaces", get(handlers::list_spaces))
        .route("/spaces/:name/search", post(handlers::search))
        .route("/spaces/:name/variance", get(handlers::variance))
        .route("/spaces/:name/reduce", post(handlers::reduce))
        .route("/spaces/:name/cluster", post(handlers::cluster))
        .route("/reduce/joint", post(handlers::joint_reduce))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
