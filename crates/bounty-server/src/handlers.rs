use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Query, State},
    http::{StatusCode, request::Parts},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use bounty_audit::AuditEntry;
use bounty_board::{Call, Operation, Receipt, ReceiptValue};
use bounty_escrow::EscrowEntry;
use bounty_reputation::UserRating;
use bounty_types::{Amount, BountyError, Principal, Score, Task, TaskId};

use crate::error::{ApiError, Envelope};
use crate::state::AppState;

pub const PRINCIPAL_HEADER: &str = "x-principal";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/tasks", post(create_task))
        .route("/api/v1/tasks/count", get(task_count))
        .route("/api/v1/tasks/{task_id}", get(get_task))
        .route("/api/v1/tasks/{task_id}/escrow", get(get_escrow))
        .route("/api/v1/tasks/{task_id}/claim", post(claim_task))
        .route("/api/v1/tasks/{task_id}/complete", post(complete_task))
        .route("/api/v1/tasks/{task_id}/cancel", post(cancel_task))
        .route("/api/v1/tasks/{task_id}/rate-worker", post(rate_worker))
        .route("/api/v1/tasks/{task_id}/rate-creator", post(rate_creator))
        .route("/api/v1/accounts/{account}/rating", get(get_rating))
        .route("/api/v1/accounts/{account}/balance", get(get_balance))
        .route("/api/v1/batch", post(execute_batch))
        .route("/api/v1/audit", get(list_audit))
        .route("/api/v1/audit/verify", get(verify_audit))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Identity of the caller, taken from the `x-principal` header.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| Caller(Principal::from(v)))
            .ok_or(ApiError::MissingCaller)
    }
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

async fn health() -> &'static str {
    "ok"
}

/// Run one operation under the board lock and commit its events.
async fn run(state: &AppState, call: Call) -> Result<ReceiptValue, ApiError> {
    let mut board = state.board.lock().await;
    state
        .transact(&mut board, |board| {
            let receipt: Receipt = board.execute(&call)?;
            Ok((receipt.value, receipt.events))
        })
        .await
}

#[derive(Deserialize)]
struct CreateTaskRequest {
    bounty: Amount,
    description: String,
}

async fn create_task(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Envelope<ReceiptValue>>), ApiError> {
    let op = Operation::CreateTask {
        bounty: req.bounty,
        description: req.description,
    };
    let value = run(&state, Call::new(caller, op)).await?;
    Ok((StatusCode::CREATED, Json(Envelope::Ok(value))))
}

#[derive(Serialize)]
struct TaskCount {
    task_count: u64,
}

async fn task_count(State(state): State<AppState>) -> Json<TaskCount> {
    let board = state.board.lock().await;
    Json(TaskCount {
        task_count: board.task_count(),
    })
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<Task>, ApiError> {
    let board = state.board.lock().await;
    Ok(Json(board.task(task_id)?.clone()))
}

async fn get_escrow(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<EscrowEntry>, ApiError> {
    let board = state.board.lock().await;
    board.task(task_id)?;
    let entry = board
        .escrow(task_id)
        .ok_or(BountyError::EscrowMissing(task_id))?;
    Ok(Json(entry.clone()))
}

async fn claim_task(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(task_id): Path<TaskId>,
) -> ApiResult<ReceiptValue> {
    let value = run(&state, Call::new(caller, Operation::ClaimTask { task_id })).await?;
    Ok(Json(Envelope::Ok(value)))
}

async fn complete_task(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(task_id): Path<TaskId>,
) -> ApiResult<ReceiptValue> {
    let value = run(&state, Call::new(caller, Operation::CompleteTask { task_id })).await?;
    Ok(Json(Envelope::Ok(value)))
}

async fn cancel_task(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(task_id): Path<TaskId>,
) -> ApiResult<ReceiptValue> {
    let value = run(&state, Call::new(caller, Operation::CancelTask { task_id })).await?;
    Ok(Json(Envelope::Ok(value)))
}

#[derive(Deserialize)]
struct RateRequest {
    score: Score,
}

async fn rate_worker(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(task_id): Path<TaskId>,
    Json(req): Json<RateRequest>,
) -> ApiResult<ReceiptValue> {
    let op = Operation::RateWorker {
        task_id,
        score: req.score,
    };
    let value = run(&state, Call::new(caller, op)).await?;
    Ok(Json(Envelope::Ok(value)))
}

async fn rate_creator(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(task_id): Path<TaskId>,
    Json(req): Json<RateRequest>,
) -> ApiResult<ReceiptValue> {
    let op = Operation::RateCreator {
        task_id,
        score: req.score,
    };
    let value = run(&state, Call::new(caller, op)).await?;
    Ok(Json(Envelope::Ok(value)))
}

async fn get_rating(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Json<UserRating> {
    let board = state.board.lock().await;
    Json(board.user_rating(&Principal::from(account)))
}

#[derive(Serialize)]
struct Balance {
    account: Principal,
    balance: Amount,
}

async fn get_balance(State(state): State<AppState>, Path(account): Path<String>) -> Json<Balance> {
    let board = state.board.lock().await;
    let account = Principal::from(account);
    let balance = board.balance(&account);
    Json(Balance { account, balance })
}

#[derive(Deserialize)]
struct BatchRequest {
    operations: Vec<Operation>,
}

/// Every operation in a batch runs as the header caller.
async fn execute_batch(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Json(req): Json<BatchRequest>,
) -> ApiResult<Vec<ReceiptValue>> {
    let calls: Vec<Call> = req
        .operations
        .into_iter()
        .map(|op| Call::new(caller.clone(), op))
        .collect();

    let mut board = state.board.lock().await;
    let values = state
        .transact(&mut board, |board| {
            let receipts = board.execute_batch(&calls)?;
            let values: Vec<ReceiptValue> = receipts.iter().map(|r| r.value).collect();
            let events = receipts.into_iter().flat_map(|r| r.events).collect();
            Ok((values, events))
        })
        .await?;
    Ok(Json(Envelope::Ok(values)))
}

#[derive(Deserialize)]
struct AuditQuery {
    task: Option<TaskId>,
}

async fn list_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let entries = match query.task {
        Some(task_id) => state.audit.query_by_task(task_id).await?,
        None => state.audit.all_entries().await?,
    };
    Ok(Json(entries))
}

#[derive(Serialize)]
struct AuditStatus {
    intact: bool,
    entries: usize,
}

async fn verify_audit(State(state): State<AppState>) -> Result<Json<AuditStatus>, ApiError> {
    let intact = state.audit.verify_integrity().await?;
    let entries = state.audit.all_entries().await?.len();
    Ok(Json(AuditStatus { intact, entries }))
}
