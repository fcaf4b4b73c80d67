use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::{AuthUser, ManagerUser},
    error::AppResult,
    state::AppState,
};

use super::dto::{
    CreateExpenseRequest, DecisionRequest, ExpenseWithCreator, MonthFilter, StatusFilter,
    UserTotal,
};
use super::repo_types::Expense;
use super::services;

pub fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", post(create_expense))
        .route("/expenses/me", get(list_my_expenses))
}

/// Every route here takes `ManagerUser`.
pub fn manager_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses))
        .route("/expenses/:id/decision", post(decide_expense))
        .route("/expenses/stats/totals-by-user", get(totals_by_user))
}

#[instrument(skip(state, identity, body), fields(user_id = %identity.user_id))]
pub async fn create_expense(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(body): Json<CreateExpenseRequest>,
) -> AppResult<Json<Expense>> {
    services::create_expense(&state, &identity, body).await.map(Json)
}

#[instrument(skip(state, identity), fields(user_id = %identity.user_id))]
pub async fn list_my_expenses(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(filter): Query<MonthFilter>,
) -> AppResult<Json<Vec<Expense>>> {
    services::list_mine(&state, &identity, filter).await.map(Json)
}

#[instrument(skip(state, _manager))]
pub async fn list_expenses(
    State(state): State<AppState>,
    ManagerUser(_manager): ManagerUser,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<Vec<ExpenseWithCreator>>> {
    services::list_all(&state, filter.status).await.map(Json)
}

#[instrument(skip(state, manager, body), fields(manager_id = %manager.user_id))]
pub async fn decide_expense(
    State(state): State<AppState>,
    ManagerUser(manager): ManagerUser,
    Path(id): Path<Uuid>,
    Json(body): Json<DecisionRequest>,
) -> AppResult<Json<Expense>> {
    services::decide(&state, &manager, id, body.decision)
        .await
        .map(Json)
}

#[instrument(skip(state, _manager))]
pub async fn totals_by_user(
    State(state): State<AppState>,
    ManagerUser(_manager): ManagerUser,
) -> AppResult<Json<Vec<UserTotal>>> {
    services::totals_by_user(&state).await.map(Json)
}
