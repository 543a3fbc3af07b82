use std::sync::Arc;

use axum::{Json, response::IntoResponse};
use tracing::info;

use crate::api::StatusResponse;
use crate::store::ConversionStore;
use crate::validation::RequiredField;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConversionStore>,
    pub required_fields: Arc<[RequiredField]>,
}

impl AppState {
    pub fn new(store: Arc<dyn ConversionStore>, required_fields: &[RequiredField]) -> Self {
        AppState {
            store,
            required_fields: required_fields.into(),
        }
    }
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(StatusResponse::new("ok"))
}
