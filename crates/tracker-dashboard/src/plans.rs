//! Plan CRUD and dependency handlers (spec §4.9's `/api/plans*` rows).

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracker_core::{Plan, state_machine};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    pub title: String,
    pub project_path: String,
    pub description: Option<String>,
    pub depends_on_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyResponse {
    pub dependency: Option<Plan>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDependencyRequest {
    pub depends_on_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanStartResponse {
    pub allowed: bool,
    pub reason: Option<String>,
    pub blocked_by: Option<Plan>,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Plan>>, ApiError> {
    let plans = state.store.list()?;
    Ok(Json(plans))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Plan>, ApiError> {
    Ok(Json(state.store.get(id)?))
}

/// Create a plan with no plan file yet (spec §4.9: "title, projectPath,
/// description?, dependsOnId?"); a plan drafted this way gets its markdown
/// later via `/api/plans/:id/plan`.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<Plan>), ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    if req.project_path.trim().is_empty() {
        return Err(ApiError::bad_request("projectPath must not be empty"));
    }
    let plan = state
        .store
        .create_task(&req.project_path, &req.title, req.description.as_deref())?;
    if let Some(dep_id) = req.depends_on_id {
        state.store.set_dependency(plan.id, Some(dep_id))?;
    }
    let plan = state.store.get(plan.id)?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// Delete a plan; the Store itself rejects one with live dependents, but the
/// status guard (only `open` plans may be deleted) is enforced here (spec
/// §4.9: "rejected unless status = open").
pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    let plan = state.store.get(id)?;
    if plan.status != tracker_core::PlanStatus::Open {
        return Err(ApiError::conflict(format!(
            "cannot delete plan #{id}: status is {} (must be open)",
            plan.status
        )));
    }
    state.store.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_dependency(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DependencyResponse>, ApiError> {
    let dependency = state.store.get_dependency(id)?;
    Ok(Json(DependencyResponse { dependency }))
}

pub async fn set_dependency(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<SetDependencyRequest>,
) -> Result<Json<DependencyResponse>, ApiError> {
    state.store.set_dependency(id, req.depends_on_id)?;
    let dependency = state.store.get_dependency(id)?;
    Ok(Json(DependencyResponse { dependency }))
}

pub async fn dependents(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Plan>>, ApiError> {
    Ok(Json(state.store.get_dependents(id)?))
}

pub async fn can_start(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CanStartResponse>, ApiError> {
    let plan = state.store.get(id)?;
    let predecessor = state.store.get_dependency(id)?;
    let guard = state_machine::can_start(predecessor.as_ref());
    let _ = plan;
    Ok(Json(CanStartResponse {
        allowed: guard.allowed,
        reason: guard.reason,
        blocked_by: guard.blocked_by,
    }))
}
