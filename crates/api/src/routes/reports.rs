//! Report statistics and cached sales analytics.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use reports::{Dashboard, ReportStats, SyncReport};
use serde::Deserialize;

use super::parse_optional_date;
use crate::error::ApiError;
use crate::{AppState, Store};

/// `from` / `to` as `YYYY-MM-DD` or `DD/MM/YYYY`, both optional.
#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

/// GET /reports/stats
#[tracing::instrument(skip(state))]
pub async fn stats<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<ReportStats>, ApiError> {
    let from = parse_optional_date(params.from.as_deref())?;
    let to = parse_optional_date(params.to.as_deref())?;
    Ok(Json(state.reports.get_stats(from, to).await?))
}

/// GET /analytics/dashboard
#[tracing::instrument(skip(state))]
pub async fn dashboard<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Dashboard>, ApiError> {
    let from = parse_optional_date(params.from.as_deref())?;
    let to = parse_optional_date(params.to.as_deref())?;
    Ok(Json(state.analytics.dashboard(from, to).await?))
}

/// POST /analytics/sync: body optional, defaults to yesterday.
#[tracing::instrument(skip(state, body))]
pub async fn sync<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    body: Option<Json<RangeParams>>,
) -> Result<Json<SyncReport>, ApiError> {
    let Json(params) = body.unwrap_or_default();
    let from = parse_optional_date(params.from.as_deref())?;
    let to = parse_optional_date(params.to.as_deref())?;
    Ok(Json(state.analytics.sync(from, to).await?))
}
