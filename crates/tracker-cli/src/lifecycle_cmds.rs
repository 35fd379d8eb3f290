//! `checkout`, `resume`, `complete`, `reset`, `cancel` (spec §3 lifecycle,
//! §6).

use std::path::Path;

use anyhow::{Context, Result, bail};
use tracker_core::{Plan, PlanStatus, state_machine};

use crate::context::AppContext;

/// Resolve an explicit id, or fall back to matching the current directory's
/// checked-out branch against a stored plan branch (so `tracker complete`
/// run from inside a worktree needs no argument).
fn resolve_plan(ctx: &AppContext, id: Option<i64>) -> Result<Plan> {
    if let Some(id) = id {
        return Ok(ctx.store.get(id)?);
    }
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let branch = tracker_vcs::current_branch(&cwd).context(
        "no plan id given and the current directory isn't a git checkout on a plan branch",
    )?;
    ctx.store
        .list()?
        .into_iter()
        .find(|p| p.branch.as_deref() == Some(branch.as_str()))
        .ok_or_else(|| anyhow::anyhow!("no plan matches the current branch '{branch}'"))
}

/// Ensure a plan has a worktree/branch ready and print its path, without
/// invoking the agent (spec §6: `checkout <id>`).
pub fn checkout(ctx: &AppContext, id: i64) -> Result<()> {
    let plan = ctx.store.get(id)?;
    let branch = plan
        .branch
        .clone()
        .unwrap_or_else(|| tracker_vcs::branch_name(plan.id, &plan.title));

    let path = if ctx.config.worktree.enabled {
        let project_path = Path::new(&plan.project_path);
        let path = tracker_worktree::create(
            &ctx.worktree_base,
            project_path,
            &branch,
            plan.id,
            ctx.config.worktree.copy_gitignored,
        )?;
        if plan.branch.is_none() {
            ctx.store.update_branch(id, &branch)?;
        }
        if plan.worktree_path.is_none() {
            ctx.store.update_worktree_path(id, &path.to_string_lossy())?;
        }
        path
    } else {
        let project_path = Path::new(&plan.project_path);
        if !tracker_vcs::branch_exists(project_path, &branch)? {
            let created = tracker_vcs::create_branch(project_path, &branch, "main")?;
            if !created.ok {
                bail!("failed to create branch {branch}: {}", created.stderr);
            }
        }
        let result = tracker_vcs::checkout(project_path, &branch)?;
        if !result.ok {
            bail!("failed to check out {branch}: {}", result.stderr);
        }
        if plan.branch.is_none() {
            ctx.store.update_branch(id, &branch)?;
        }
        project_path.to_path_buf()
    };

    println!("{}", path.display());
    Ok(())
}

/// Retry a plan whose initial worker run previously failed, leaving it
/// `in-progress` (spec §7: "Agent non-zero exits leave the plan in its
/// current status ... so the user can inspect logs and retry").
pub async fn resume(ctx: &AppContext, id: i64) -> Result<()> {
    let plan = ctx.store.get(id)?;
    if plan.status != PlanStatus::InProgress {
        bail!(
            "plan #{id} is '{}', not 'in-progress'; only a plan whose worker run failed can be resumed",
            plan.status
        );
    }

    let run_ctx = tracker_scheduler::PipelineContext {
        store: &ctx.store,
        config: &ctx.config,
        worktree_base: ctx.worktree_base.clone(),
        logs_dir: ctx.logs_dir.clone(),
        session_id: ulid::Ulid::new().to_string(),
    };
    let outcome = tracker_scheduler::run_plan(&run_ctx, plan)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    println!("Plan #{id} finished: {:?}", outcome.reason);
    Ok(())
}

/// Merge a plan's branch into `main` and mark it completed (spec §4.8, §9's
/// open question: merge `main -> branch -> main`, never rebase).
pub fn complete(ctx: &AppContext, id: Option<i64>, db_only: bool) -> Result<()> {
    let plan = resolve_plan(ctx, id)?;
    let predecessor = ctx.store.get_dependency(plan.id)?;
    let guard = state_machine::can_complete(predecessor.as_ref());
    if !guard.allowed {
        bail!(guard.reason.unwrap_or_else(|| "plan cannot be completed yet".to_string()));
    }

    if !db_only {
        let Some(branch) = &plan.branch else {
            bail!("plan #{} has no branch to merge", plan.id);
        };
        let project_path = Path::new(&plan.project_path);
        let checkout_result = tracker_vcs::checkout(project_path, "main")?;
        if !checkout_result.ok {
            bail!("failed to check out main: {}", checkout_result.stderr);
        }
        let merge_result = tracker_vcs::merge(project_path, branch)?;
        if !merge_result.ok {
            bail!(
                "merge of {branch} into main failed (resolve conflicts on the branch, then retry): {}",
                merge_result.stderr
            );
        }
    }

    ctx.store.update_status(plan.id, PlanStatus::Completed)?;

    if ctx.config.worktree.auto_cleanup_on_complete {
        if let Some(_worktree_path) = &plan.worktree_path {
            tracker_worktree::remove(&ctx.worktree_base, Path::new(&plan.project_path), plan.id)?;
        }
    }

    println!("Plan #{} completed", plan.id);
    Ok(())
}

/// Return a plan to `open`, optionally deleting its branch (spec §4.8:
/// "always" allowed from any active status).
pub fn reset(ctx: &AppContext, id: i64, delete_branch: bool) -> Result<()> {
    let plan = ctx.store.get(id)?;
    ctx.store.update_status(id, PlanStatus::Open)?;

    if delete_branch {
        if let Some(branch) = &plan.branch {
            let project_path = Path::new(&plan.project_path);
            let _ = tracker_vcs::branch_delete(project_path, branch, true);
        }
        if plan.worktree_path.is_some() {
            tracker_worktree::remove(&ctx.worktree_base, Path::new(&plan.project_path), id)?;
            ctx.store.update_worktree_path(id, "")?;
        }
    }

    println!("Plan #{id} reset to open");
    Ok(())
}

/// Delete a plan record and its branch; the Store rejects it if dependents
/// still exist (spec §3).
pub fn cancel(ctx: &AppContext, id: i64) -> Result<()> {
    let plan = ctx.store.get(id)?;

    if let Some(branch) = &plan.branch {
        let project_path = Path::new(&plan.project_path);
        let _ = tracker_vcs::branch_delete(project_path, branch, true);
    }
    if plan.worktree_path.is_some() {
        let _ = tracker_worktree::remove(&ctx.worktree_base, Path::new(&plan.project_path), id);
    }

    ctx.store.delete(id)?;
    println!("Cancelled plan #{id}");
    Ok(())
}
