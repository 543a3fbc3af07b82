use axum::{
    Router,
    routing::{delete, get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/convertir", post(handler::create_conversion))
        .route("/convertir/:id", delete(handler::delete_conversion))
        .route("/historico", get(handler::list_conversions))
}
