//! Dispatch progress reporting.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use domain::{DispatchOutcome, ReportedItem};
use serde::Deserialize;

use crate::error::ApiError;
use crate::{AppState, Store};

#[derive(Deserialize)]
pub struct DispatchProgressRequest {
    pub destination: String,
    pub items: Vec<ReportedItem>,
}

/// POST /dispatch/progress: spread shipped units over open orders.
#[tracing::instrument(skip(state, req), fields(destination = %req.destination))]
pub async fn progress<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<DispatchProgressRequest>,
) -> Result<Json<Vec<DispatchOutcome>>, ApiError> {
    Ok(Json(
        state
            .dispatch
            .register_progress(&req.destination, req.items)
            .await?,
    ))
}
