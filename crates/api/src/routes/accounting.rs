//! Pass-through lookups against the accounting service.

use std::sync::Arc;

use accounting::{DocumentFilter, Person, ProductFilter, document_total};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use domain::Money;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parse_optional_date;
use crate::error::ApiError;
use crate::{AppState, Store};

#[derive(Deserialize)]
pub struct PersonQuery {
    #[serde(default)]
    pub identificacion: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Deserialize)]
pub struct DocumentQuery {
    #[serde(default)]
    pub fecha_emision: Option<String>,
    #[serde(default)]
    pub fecha_inicial: Option<String>,
    #[serde(default)]
    pub fecha_final: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub persona_identificacion: Option<String>,
}

impl DocumentQuery {
    fn into_filter(self) -> Result<DocumentFilter, ApiError> {
        Ok(DocumentFilter {
            issued_on: parse_optional_date(self.fecha_emision.as_deref())?,
            from: parse_optional_date(self.fecha_inicial.as_deref())?,
            to: parse_optional_date(self.fecha_final.as_deref())?,
            document_type: self.tipo,
            person_id: self.persona_identificacion,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsResponse {
    pub count: usize,
    pub total_sales: Money,
    pub data: Vec<Value>,
}

/// GET /persons?identificacion=...|search=...
#[tracing::instrument(skip(state, query))]
pub async fn find_persons<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<PersonQuery>,
) -> Result<Json<Vec<Person>>, ApiError> {
    let needle = query
        .identificacion
        .or(query.search)
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest("Search parameter (identificacion or search) is required".into())
        })?;

    let persons = state.billing.accounting().find_persons(&needle).await?;
    if persons.is_empty() {
        return Err(ApiError::NotFound(format!("No person matches {needle}")));
    }
    Ok(Json(persons))
}

/// POST /persons
#[tracing::instrument(skip(state, person))]
pub async fn create_person<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(person): Json<Person>,
) -> Result<(StatusCode, Json<Person>), ApiError> {
    let created = state.billing.accounting().create_person(&person).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list_products<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Value>>, ApiError> {
    Ok(Json(state.billing.accounting().list_products(&filter).await?))
}

/// GET /documents: issued documents with their total.
#[tracing::instrument(skip(state, query))]
pub async fn list_documents<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<DocumentsResponse>, ApiError> {
    let filter = query.into_filter()?;
    let data = state.billing.accounting().list_documents(&filter).await?;
    Ok(Json(DocumentsResponse {
        count: data.len(),
        total_sales: data.iter().map(document_total).sum(),
        data,
    }))
}
