//! Axum REST API handlers.
//!
//! Thin JSON shims over the engine operations: deserialize the request,
//! call the engine, serialize the result. No business logic lives here —
//! the engine is the single source of truth, and a handler only reports
//! what it confirmed. All amounts are integer minor currency units.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use escrow_engine::{cancel, ledger, machine, registry};
use escrow_engine::{ContractDetail, MilestoneSpec, Party, WalletAccount};

use crate::errors::ApiError;

pub struct ApiState {
    pub pool: SqlitePool,
    pub fee_bps: u32,
}

// ─────────────────────────────────────────────────────────
// Request shapes
// ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateContractRequest {
    pub title: String,
    pub client_id: String,
    pub freelancer_id: String,
    pub total_budget: i64,
    pub milestones: Vec<MilestoneSpec>,
}

#[derive(Deserialize)]
pub struct CallerBody {
    pub caller_id: String,
}

#[derive(Deserialize)]
pub struct SubmitBody {
    pub caller_id: String,
    pub note: String,
    pub delivery_ref: String,
}

#[derive(Deserialize)]
pub struct RevisionBody {
    pub caller_id: String,
    pub feedback: String,
}

#[derive(Deserialize)]
pub struct DepositBody {
    #[serde(default = "default_deposit_party")]
    pub party: Party,
    pub amount: i64,
}

fn default_deposit_party() -> Party {
    Party::Client
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub client: Option<String>,
    pub freelancer: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ContractsResponse {
    pub count: usize,
    pub contracts: Vec<ContractDetail>,
}

#[derive(Serialize)]
pub struct BalanceResponse {
    pub owner: String,
    pub party: Party,
    pub balance: i64,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /contracts`
pub async fn create_contract(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<CreateContractRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = registry::create_contract(
        &state.pool,
        &req.title,
        &req.client_id,
        &req.freelancer_id,
        req.total_budget,
        &req.milestones,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// `GET /contracts?client=&freelancer=`
pub async fn list_contracts(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ContractsResponse>, ApiError> {
    let contracts = registry::list_contracts(
        &state.pool,
        query.client.as_deref(),
        query.freelancer.as_deref(),
    )
    .await?;
    Ok(Json(ContractsResponse {
        count: contracts.len(),
        contracts,
    }))
}

/// `GET /contracts/:id`
pub async fn get_contract(
    State(state): State<Arc<ApiState>>,
    Path(contract_id): Path<i64>,
) -> Result<Json<ContractDetail>, ApiError> {
    Ok(Json(registry::get_contract(&state.pool, contract_id).await?))
}

/// `POST /contracts/:id/milestones/:mid/fund`
pub async fn fund_milestone(
    State(state): State<Arc<ApiState>>,
    Path((contract_id, milestone_id)): Path<(i64, i64)>,
    Json(body): Json<CallerBody>,
) -> Result<impl IntoResponse, ApiError> {
    let milestone =
        machine::fund_milestone(&state.pool, contract_id, milestone_id, &body.caller_id).await?;
    Ok(Json(milestone))
}

/// `POST /contracts/:id/milestones/:mid/submit`
pub async fn submit_work(
    State(state): State<Arc<ApiState>>,
    Path((contract_id, milestone_id)): Path<(i64, i64)>,
    Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError> {
    let milestone = machine::submit_work(
        &state.pool,
        contract_id,
        milestone_id,
        &body.caller_id,
        &body.note,
        &body.delivery_ref,
    )
    .await?;
    Ok(Json(milestone))
}

/// `POST /contracts/:id/milestones/:mid/revision`
pub async fn request_revision(
    State(state): State<Arc<ApiState>>,
    Path((contract_id, milestone_id)): Path<(i64, i64)>,
    Json(body): Json<RevisionBody>,
) -> Result<impl IntoResponse, ApiError> {
    let milestone = machine::request_revision(
        &state.pool,
        contract_id,
        milestone_id,
        &body.caller_id,
        &body.feedback,
    )
    .await?;
    Ok(Json(milestone))
}

/// `POST /contracts/:id/milestones/:mid/release`
///
/// Returns the released milestone together with its `{net, fee}` split.
pub async fn release_escrow(
    State(state): State<Arc<ApiState>>,
    Path((contract_id, milestone_id)): Path<(i64, i64)>,
    Json(body): Json<CallerBody>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = machine::release_escrow(
        &state.pool,
        contract_id,
        milestone_id,
        &body.caller_id,
        state.fee_bps,
    )
    .await?;
    Ok(Json(outcome))
}

/// `POST /contracts/:id/cancel`
pub async fn cancel_contract(
    State(state): State<Arc<ApiState>>,
    Path(contract_id): Path<i64>,
    Json(body): Json<CallerBody>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = cancel::cancel_contract(&state.pool, contract_id, &body.caller_id).await?;
    Ok(Json(outcome))
}

/// `GET /wallets/:owner/:party`
pub async fn wallet_balance(
    State(state): State<Arc<ApiState>>,
    Path((owner, party)): Path<(String, Party)>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = ledger::balance(&state.pool, &owner, party).await?;
    Ok(Json(BalanceResponse {
        owner,
        party,
        balance,
    }))
}

/// `POST /wallets/:owner/deposit`
///
/// External top-up — the confirmation callback of whatever payment
/// processor fronts the marketplace, reduced to a credit.
pub async fn deposit(
    State(state): State<Arc<ApiState>>,
    Path(owner): Path<String>,
    Json(body): Json<DepositBody>,
) -> Result<Json<WalletAccount>, ApiError> {
    let account = ledger::deposit(&state.pool, &owner, body.party, body.amount).await?;
    Ok(Json(account))
}
