//! HTTP API for the bakery order backend.
//!
//! Thin axum handlers over the domain, billing and report services, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use accounting::{AccountingService, BillingService};
use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, patch, post, put};
use domain::{
    Clock, DispatchService, OrderRepository, OrderService, ProductionService, SystemClock,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{OrderStore, SummaryStore};
use reports::{AnalyticsService, ReportService};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// Storage the server runs on: orders plus cached summaries.
pub trait Store: OrderStore + SummaryStore + Clone + 'static {}

impl<T: OrderStore + SummaryStore + Clone + 'static> Store for T {}

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub orders: OrderService<S>,
    pub production: ProductionService<S>,
    pub dispatch: DispatchService<S>,
    pub billing: BillingService<S>,
    pub reports: ReportService<S>,
    pub analytics: AnalyticsService<S>,
}

impl<S: Store> AppState<S> {
    /// Wires every service to one store on the wall clock.
    pub fn new(store: S, accounting: Arc<dyn AccountingService>, config: &Config) -> Self {
        Self::with_clock(store, accounting, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        store: S,
        accounting: Arc<dyn AccountingService>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> Self {
        let tz = config.timezone;
        let repo = OrderRepository::with_clock(store.clone(), clock.clone());

        Self {
            orders: OrderService::new(repo.clone(), tz, config.business_name.clone()),
            production: ProductionService::new(repo.clone(), tz),
            dispatch: DispatchService::new(repo.clone()),
            billing: BillingService::new(
                repo.clone(),
                accounting.clone(),
                config.accounting.invoice_settings(),
                tz,
            )
            .with_batch_size(config.invoice_batch_size),
            reports: ReportService::new(repo, tz),
            analytics: AnalyticsService::with_clock(store, accounting, clock, tz),
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    cors_origins: &[String],
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/orders",
            post(routes::orders::create::<S>).get(routes::orders::list::<S>),
        )
        .route("/orders/batch-invoice", post(routes::orders::batch_invoice::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/invoice", put(routes::orders::update_invoice::<S>))
        .route("/orders/{id}/collection", post(routes::orders::collection::<S>))
        .route(
            "/orders/{id}/dispatches",
            post(routes::orders::register_dispatch::<S>),
        )
        .route(
            "/orders/{id}/dispatches/{dispatch_id}",
            put(routes::orders::update_dispatch::<S>),
        )
        .route("/production", get(routes::production::tasks::<S>))
        .route("/production/batch", patch(routes::production::batch_update::<S>))
        .route("/production/progress", post(routes::production::progress::<S>))
        .route("/production/aggregated", get(routes::production::aggregated::<S>))
        .route("/production/{id}", patch(routes::production::update_task::<S>))
        .route(
            "/production/{id}/items/{item_id}",
            patch(routes::production::update_item::<S>),
        )
        .route("/dispatch/progress", post(routes::dispatch::progress::<S>))
        .route("/reports/stats", get(routes::reports::stats::<S>))
        .route("/analytics/dashboard", get(routes::reports::dashboard::<S>))
        .route("/analytics/sync", post(routes::reports::sync::<S>))
        .route(
            "/persons",
            get(routes::accounting::find_persons::<S>).post(routes::accounting::create_person::<S>),
        )
        .route("/products", get(routes::accounting::list_products::<S>))
        .route("/documents", get(routes::accounting::list_documents::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}
