use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{Company, CompanyId, Tier, UserId};
use super::query::TierQueryService;
use super::service::{TierWorkflowError, TierWorkflowService};
use super::store::{NotificationDispatcher, StoreError, TierStore};

/// Handler state bundling the workflow and query services.
pub struct TierRoutes<S, N> {
    pub workflow: Arc<TierWorkflowService<S, N>>,
    pub query: Arc<TierQueryService<S>>,
}

impl<S, N> Clone for TierRoutes<S, N> {
    fn clone(&self) -> Self {
        Self {
            workflow: self.workflow.clone(),
            query: self.query.clone(),
        }
    }
}

/// Router builder exposing the tier workflow and query endpoints.
pub fn tier_router<S, N>(
    workflow: Arc<TierWorkflowService<S, N>>,
    query: Arc<TierQueryService<S>>,
) -> Router
where
    S: TierStore + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route("/api/v1/tiers/recompute", post(recompute_handler::<S, N>))
        .route("/api/v1/tiers/review", get(review_handler::<S, N>))
        .route("/api/v1/tiers/statistics", get(statistics_handler::<S, N>))
        .route(
            "/api/v1/companies/:company_id/tier/override",
            post(override_handler::<S, N>),
        )
        .route(
            "/api/v1/companies/:company_id/tier/approve",
            post(approve_handler::<S, N>),
        )
        .route(
            "/api/v1/companies/:company_id/tier/history",
            get(history_handler::<S, N>),
        )
        .with_state(TierRoutes { workflow, query })
}

#[derive(Debug, Deserialize)]
pub(crate) struct OverrideTierRequest {
    pub(crate) new_tier: Tier,
    pub(crate) actor_id: String,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApproveTierRequest {
    pub(crate) actor_id: String,
}

/// Company subset returned after a tier change.
#[derive(Debug, Serialize)]
pub(crate) struct CompanyTierView {
    pub(crate) id: CompanyId,
    pub(crate) name: String,
    pub(crate) tier: Tier,
}

impl From<Company> for CompanyTierView {
    fn from(company: Company) -> Self {
        Self {
            id: company.id,
            name: company.name,
            tier: company.tier,
        }
    }
}

pub(crate) async fn recompute_handler<S, N>(State(routes): State<TierRoutes<S, N>>) -> Response
where
    S: TierStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match routes.workflow.recompute_all() {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn review_handler<S, N>(State(routes): State<TierRoutes<S, N>>) -> Response
where
    S: TierStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match routes.query.companies_needing_review() {
        Ok(candidates) => (StatusCode::OK, axum::Json(candidates)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn statistics_handler<S, N>(State(routes): State<TierRoutes<S, N>>) -> Response
where
    S: TierStore + 'static,
    N: NotificationDispatcher + 'static,
{
    match routes.query.tier_statistics() {
        Ok(statistics) => (StatusCode::OK, axum::Json(statistics)).into_response(),
        Err(error) => store_error_response(error),
    }
}

pub(crate) async fn override_handler<S, N>(
    State(routes): State<TierRoutes<S, N>>,
    Path(company_id): Path<String>,
    axum::Json(request): axum::Json<OverrideTierRequest>,
) -> Response
where
    S: TierStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let company_id = CompanyId(company_id);
    let actor_id = UserId(request.actor_id);

    match routes
        .workflow
        .override_tier(&company_id, request.new_tier, &actor_id, request.notes)
    {
        Ok(company) => {
            let view = CompanyTierView::from(company);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn approve_handler<S, N>(
    State(routes): State<TierRoutes<S, N>>,
    Path(company_id): Path<String>,
    axum::Json(request): axum::Json<ApproveTierRequest>,
) -> Response
where
    S: TierStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let company_id = CompanyId(company_id);
    let actor_id = UserId(request.actor_id);

    match routes.workflow.approve_suggested(&company_id, &actor_id) {
        Ok(company) => {
            let view = CompanyTierView::from(company);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => workflow_error_response(error),
    }
}

pub(crate) async fn history_handler<S, N>(
    State(routes): State<TierRoutes<S, N>>,
    Path(company_id): Path<String>,
) -> Response
where
    S: TierStore + 'static,
    N: NotificationDispatcher + 'static,
{
    let company_id = CompanyId(company_id);
    match routes.query.tier_history(&company_id) {
        Ok(entries) => (StatusCode::OK, axum::Json(entries)).into_response(),
        Err(error) => store_error_response(error),
    }
}

fn workflow_error_response(error: TierWorkflowError) -> Response {
    let status = match &error {
        TierWorkflowError::CompanyNotFound | TierWorkflowError::ActorNotFound => {
            StatusCode::NOT_FOUND
        }
        TierWorkflowError::Permission { .. } => StatusCode::FORBIDDEN,
        TierWorkflowError::NoOp { .. } => StatusCode::BAD_REQUEST,
        TierWorkflowError::Store(_) | TierWorkflowError::Notify(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

fn store_error_response(error: StoreError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
