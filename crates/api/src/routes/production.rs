//! Production task board endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{LineItemId, OrderId};
use domain::{
    AggregatedItems, BatchUpdateResult, LineProductionStatus, Order, ProductionOutcome,
    ProductionStage, TaskUpdate,
};
use serde::Deserialize;

use super::parse_id;
use crate::error::ApiError;
use crate::{AppState, Store};

#[derive(Deserialize)]
pub struct TaskUpdateRequest {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TaskUpdateRequest {
    fn into_update(self) -> Result<TaskUpdate, ApiError> {
        let stage = self
            .stage
            .map(|s| s.trim().parse::<ProductionStage>())
            .transpose()
            .map_err(domain::DomainError::from)?;
        Ok(TaskUpdate {
            stage,
            notes: self.notes,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateRequest {
    pub order_ids: Vec<String>,
    #[serde(flatten)]
    pub update: TaskUpdateRequest,
}

#[derive(Deserialize)]
pub struct LineStatusRequest {
    pub status: LineProductionStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    #[serde(alias = "name")]
    pub product_name: String,
    #[serde(alias = "quantity")]
    pub quantity_made: u32,
}

/// GET /production: the task board.
#[tracing::instrument(skip(state))]
pub async fn tasks<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.production.tasks().await?))
}

/// PATCH /production/{id}: change an order's stage and/or notes.
#[tracing::instrument(skip(state, req))]
pub async fn update_task<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<TaskUpdateRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let update = req.into_update()?;
    Ok(Json(state.production.update_task(order_id, update).await?))
}

/// PATCH /production/batch: apply one update to several orders.
#[tracing::instrument(skip(state, req))]
pub async fn batch_update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<BatchUpdateRequest>,
) -> Result<Json<BatchUpdateResult>, ApiError> {
    let order_ids = req
        .order_ids
        .iter()
        .map(|id| parse_id::<OrderId>(id, "order id"))
        .collect::<Result<Vec<_>, _>>()?;
    let update = req.update.into_update()?;
    Ok(Json(
        state.production.batch_update_tasks(order_ids, update).await?,
    ))
}

/// PATCH /production/{id}/items/{item_id}: set one line's production flag.
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, item_id)): Path<(String, String)>,
    Json(req): Json<LineStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let line_id: LineItemId = parse_id(&item_id, "line item id")?;
    Ok(Json(
        state
            .production
            .update_product_status(order_id, line_id, req.status, req.notes)
            .await?,
    ))
}

/// POST /production/progress: report units made of one product.
#[tracing::instrument(skip(state, req))]
pub async fn progress<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ProgressRequest>,
) -> Result<Json<ProductionOutcome>, ApiError> {
    Ok(Json(
        state
            .production
            .register_progress(&req.product_name, req.quantity_made)
            .await?,
    ))
}

/// GET /production/aggregated: pending units by product and delivery day.
#[tracing::instrument(skip(state))]
pub async fn aggregated<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<AggregatedItems>, ApiError> {
    Ok(Json(state.production.aggregated_items().await?))
}
