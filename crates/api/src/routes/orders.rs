//! Order intake, invoicing and per-order dispatch endpoints.

use std::sync::Arc;

use accounting::InvoiceBatchReport;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{DispatchId, OrderId};
use domain::{DispatchEdit, InvoiceUpdate, NewDispatch, NewOrder, Order, PaymentDetails, PlacedOrder};
use serde::Serialize;

use super::parse_id;
use crate::error::ApiError;
use crate::{AppState, Store};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchCreatedResponse {
    pub dispatch_id: DispatchId,
    pub order: Order,
}

/// POST /orders: validate and store a new order.
#[tracing::instrument(skip(state, new))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(new): Json<NewOrder>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    let placed = state.orders.create_order(new).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// GET /orders: latest orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.orders.list_orders().await?))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.orders.get_order(order_id).await?))
}

/// PUT /orders/{id}/invoice: change the invoice request.
#[tracing::instrument(skip(state, update))]
pub async fn update_invoice<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(update): Json<InvoiceUpdate>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.orders.update_invoice_data(order_id, update).await?))
}

/// POST /orders/batch-invoice: issue one batch of pending invoices.
#[tracing::instrument(skip(state))]
pub async fn batch_invoice<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<InvoiceBatchReport>, ApiError> {
    Ok(Json(state.billing.process_pending_invoices().await?))
}

/// POST /orders/{id}/collection: record a payment and send it to accounting.
#[tracing::instrument(skip(state, payment))]
pub async fn collection<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(payment): Json<PaymentDetails>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    Ok(Json(state.billing.register_collection(order_id, payment).await?))
}

/// POST /orders/{id}/dispatches: append a hand-entered dispatch record.
#[tracing::instrument(skip(state, dispatch))]
pub async fn register_dispatch<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(dispatch): Json<NewDispatch>,
) -> Result<(StatusCode, Json<DispatchCreatedResponse>), ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let (order, dispatch_id) = state.dispatch.register_dispatch(order_id, dispatch).await?;
    Ok((
        StatusCode::CREATED,
        Json(DispatchCreatedResponse { dispatch_id, order }),
    ))
}

/// PUT /orders/{id}/dispatches/{dispatch_id}: edit a recent dispatch record.
#[tracing::instrument(skip(state, edit))]
pub async fn update_dispatch<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, dispatch_id)): Path<(String, String)>,
    Json(edit): Json<DispatchEdit>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id(&id, "order id")?;
    let dispatch_id: DispatchId = parse_id(&dispatch_id, "dispatch id")?;
    Ok(Json(
        state
            .dispatch
            .update_dispatch(order_id, dispatch_id, edit)
            .await?,
    ))
}
