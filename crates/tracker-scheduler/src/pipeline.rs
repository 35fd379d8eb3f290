//! Glues worktree setup, the review loop, and status transitions into the
//! single "run this plan" operation `tracker-cli work` and the dashboard's
//! `/api/plans/:id/work` endpoint both need (spec §4.5-§4.8).
//!
//! This lives in the scheduler crate rather than duplicated in both callers:
//! the scheduler is the only component that already knows how to drive a
//! batch of plans end to end (`run_batch`'s `work_one` closure), so the
//! per-plan pipeline is its natural home.

use std::path::{Path, PathBuf};

use tracker_config::Config;
use tracker_core::{Plan, PlanStatus};
use tracker_review::{LoopOutcome, ReviewParams, StopReason};
use tracker_store::Store;

/// Everything the pipeline needs that isn't already on the `Plan` record.
pub struct PipelineContext<'a> {
    pub store: &'a Store,
    pub config: &'a Config,
    pub worktree_base: PathBuf,
    pub logs_dir: PathBuf,
    pub session_id: String,
}

/// What happened to one plan after a full pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub plan_id: i64,
    pub reason: PipelineReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineReason {
    WorkerInitFailed,
    NoChanges,
    Approved,
    ReviewerRunFailed,
    RoundsExhausted,
    WorkerResumeFailed,
}

impl From<StopReason> for PipelineReason {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::NoChanges => PipelineReason::NoChanges,
            StopReason::Approved => PipelineReason::Approved,
            StopReason::ReviewerRunFailed => PipelineReason::ReviewerRunFailed,
            StopReason::RoundsExhausted => PipelineReason::RoundsExhausted,
            StopReason::WorkerResumeFailed => PipelineReason::WorkerResumeFailed,
        }
    }
}

/// Resolve the plan's markdown content: the file on disk if `plan_path` is
/// set and present, otherwise the stored description, otherwise empty (a
/// plan that was never drafted still gets a worker turn, per spec §4.2).
fn load_plan_content(plan: &Plan) -> String {
    if !plan.plan_path.is_empty() {
        if let Ok(content) = std::fs::read_to_string(&plan.plan_path) {
            return content;
        }
    }
    plan.description.clone().unwrap_or_default()
}

/// Determine (and persist) the working directory for this plan: a fresh
/// worktree when worktrees are enabled, else the project root directly
/// (spec §4.3: "worktrees are the default, but may be disabled").
fn resolve_cwd(ctx: &PipelineContext<'_>, plan: &Plan) -> Result<PathBuf, String> {
    if !ctx.config.worktree.enabled {
        return Ok(PathBuf::from(&plan.project_path));
    }
    if let Some(existing) = &plan.worktree_path {
        return Ok(PathBuf::from(existing));
    }

    let branch = plan
        .branch
        .clone()
        .unwrap_or_else(|| tracker_vcs::branch_name(plan.id, &plan.title));
    let project_path = Path::new(&plan.project_path);
    let path = tracker_worktree::create(
        &ctx.worktree_base,
        project_path,
        &branch,
        plan.id,
        ctx.config.worktree.copy_gitignored,
    )
    .map_err(|e| e.to_string())?;

    ctx.store.update_branch(plan.id, &branch).map_err(|e| e.to_string())?;
    ctx.store
        .update_worktree_path(plan.id, &path.to_string_lossy())
        .map_err(|e| e.to_string())?;
    Ok(path)
}

/// Run one plan through worktree setup, the bounded review loop, and the
/// resulting status transition, updating `ctx.store` along the way.
///
/// Mirrors `tracker_core::state_machine::Transition`: a failed initial
/// worker turn leaves the plan `in-progress` for a later `resume`; every
/// other exit path advances it to `in-review` (spec §4.6, §4.8).
pub async fn run_plan(ctx: &PipelineContext<'_>, plan: Plan) -> Result<PipelineOutcome, String> {
    let plan_id = plan.id;
    ctx.store
        .update_status(plan_id, PlanStatus::InProgress)
        .map_err(|e| e.to_string())?;

    let cwd = resolve_cwd(ctx, &plan)?;
    let plan_content = load_plan_content(&plan);
    let log_path = ctx
        .logs_dir
        .join(tracker_config::paths::log_file_name(plan_id, chrono::Utc::now()));

    let params = ReviewParams {
        plan_id,
        plan_content,
        cwd: cwd.clone(),
        max_rounds: ctx.config.max_review_rounds,
        skip_permissions: ctx.config.skip_permissions,
        log_path,
        session_id: ctx.session_id.clone(),
    };

    let outcome = tracker_review::run_loop(
        &tracker_review::RealRunner,
        |path| tracker_vcs::diff_range(path, "main...HEAD"),
        params,
    )
    .await
    .map_err(|e| e.to_string())?;

    match outcome {
        LoopOutcome::WorkerInitFailed => Ok(PipelineOutcome {
            plan_id,
            reason: PipelineReason::WorkerInitFailed,
        }),
        LoopOutcome::Done {
            session_id,
            rounds_used,
            reason,
        } => {
            ctx.store.update_session(plan_id, &session_id).map_err(|e| e.to_string())?;
            for _ in 0..rounds_used {
                ctx.store.increment_review_rounds_used(plan_id).map_err(|e| e.to_string())?;
            }
            ctx.store
                .update_status(plan_id, PlanStatus::InReview)
                .map_err(|e| e.to_string())?;
            Ok(PipelineOutcome {
                plan_id,
                reason: reason.into(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tracker_config::WorktreeConfig;

    fn plan(id: i64, project: &str) -> Plan {
        Plan {
            id,
            plan_path: String::new(),
            title: format!("plan {id}"),
            description: Some("do the thing".to_string()),
            project_path: project.to_string(),
            display_name: format!("plan {id}"),
            status: PlanStatus::Open,
            branch: None,
            session_id: None,
            planning_session_id: None,
            worktree_path: None,
            depends_on: None,
            review_rounds_used: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn load_plan_content_falls_back_to_description() {
        let p = plan(1, "/repo");
        assert_eq!(load_plan_content(&p), "do the thing");
    }

    #[test]
    fn load_plan_content_empty_when_nothing_set() {
        let mut p = plan(1, "/repo");
        p.description = None;
        assert_eq!(load_plan_content(&p), "");
    }

    #[test]
    fn resolve_cwd_uses_project_path_when_worktrees_disabled() {
        let store = Store::open_in_memory().unwrap();
        let mut config = Config::default();
        config.worktree = WorktreeConfig {
            enabled: false,
            copy_gitignored: false,
            auto_cleanup_on_complete: false,
        };
        let ctx = PipelineContext {
            store: &store,
            config: &config,
            worktree_base: PathBuf::from("/base"),
            logs_dir: PathBuf::from("/logs"),
            session_id: "s1".to_string(),
        };
        let p = plan(1, "/repo");
        assert_eq!(resolve_cwd(&ctx, &p).unwrap(), PathBuf::from("/repo"));
    }

    #[test]
    fn resolve_cwd_reuses_existing_worktree_path() {
        let store = Store::open_in_memory().unwrap();
        let config = Config::default();
        let ctx = PipelineContext {
            store: &store,
            config: &config,
            worktree_base: PathBuf::from("/base"),
            logs_dir: PathBuf::from("/logs"),
            session_id: "s1".to_string(),
        };
        let mut p = plan(1, "/repo");
        p.worktree_path = Some("/base/repo/1".to_string());
        assert_eq!(resolve_cwd(&ctx, &p).unwrap(), PathBuf::from("/base/repo/1"));
    }
}
