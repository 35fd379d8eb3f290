//! Spawn workers for one plan or every unblocked open plan (spec §4.9's
//! `/api/plans/:id/work` and `/api/plans/work-all`).
//!
//! A spawned run is detached: the handler returns as soon as the job is
//! launched in a background task, matching spec §5's "agent subprocesses
//! outlive the CLI/dashboard process that spawned them" cancellation model.
//! Progress is observable only via `/api/plans/:id/logs` and the plan's
//! `status` field, never via this endpoint's response.

use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use tracker_core::state_machine;
use tracker_scheduler::{PipelineContext, run_plan};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkResponse {
    pub plan_id: i64,
    pub spawned: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkAllResponse {
    pub spawned: Vec<i64>,
    pub skipped: Vec<WorkResponse>,
}

fn spawn_pipeline(state: AppState, plan: tracker_core::Plan) {
    tokio::spawn(async move {
        let ctx = PipelineContext {
            store: &state.store,
            config: &state.config,
            worktree_base: state.worktree_base.clone(),
            logs_dir: state.logs_dir.clone(),
            session_id: ulid::Ulid::new().to_string(),
        };
        let plan_id = plan.id;
        match run_plan(&ctx, plan).await {
            Ok(outcome) => {
                tracing::info!(plan_id, reason = ?outcome.reason, "plan pipeline finished");
            }
            Err(err) => {
                tracing::error!(plan_id, error = %err, "plan pipeline failed");
            }
        }
    });
}

/// Spawn a worker for one plan, honoring `can_start` (spec §4.9).
pub async fn work_one(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<WorkResponse>), ApiError> {
    let plan = state.store.get(id)?;
    let predecessor = state.store.get_dependency(id)?;
    let guard = state_machine::can_start(predecessor.as_ref());
    if !guard.allowed {
        return Ok((
            StatusCode::OK,
            Json(WorkResponse {
                plan_id: id,
                spawned: false,
                reason: guard.reason,
            }),
        ));
    }

    spawn_pipeline(state, plan);
    Ok((
        StatusCode::ACCEPTED,
        Json(WorkResponse {
            plan_id: id,
            spawned: true,
            reason: None,
        }),
    ))
}

/// Spawn workers for every unblocked open plan across every project (spec
/// §4.9: "Spawn workers for every unblocked open plan").
pub async fn work_all(State(state): State<AppState>) -> Result<Json<WorkAllResponse>, ApiError> {
    let unblocked = state.store.unblocked_open_tasks()?;
    let mut spawned = Vec::new();
    for plan in unblocked {
        let plan_id = plan.id;
        spawn_pipeline(state.clone(), plan);
        spawned.push(plan_id);
    }
    Ok(Json(WorkAllResponse {
        spawned,
        skipped: Vec::new(),
    }))
}
