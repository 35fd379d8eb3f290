//! `work [id...]` (spec §4.7-§4.8, §6): drive the worker/review loop for
//! one or more plans, or every unblocked open plan when none are named.

use anyhow::Result;
use tracker_core::{GuardResult, Plan, state_machine};
use tracker_scheduler::{PipelineContext, run_batch};

use crate::context::AppContext;

pub async fn work(ctx: &AppContext, ids: Vec<i64>) -> Result<()> {
    let plans = if ids.is_empty() {
        ctx.store.unblocked_open_tasks()?
    } else {
        let mut collected = Vec::with_capacity(ids.len());
        for id in ids {
            collected.push(ctx.store.get(id)?);
        }
        collected
    };

    if plans.is_empty() {
        println!("Nothing to work on.");
        return Ok(());
    }

    let guard_store = ctx.store.clone();
    let can_start = move |plan: &Plan| -> GuardResult {
        match guard_store.get_dependency(plan.id) {
            Ok(dep) => state_machine::can_start(dep.as_ref()),
            Err(e) => GuardResult::deny(e.to_string(), None),
        }
    };

    let worktree_base = ctx.worktree_base.clone();
    let logs_dir = ctx.logs_dir.clone();
    let config = ctx.config.clone();
    let store_for_work = ctx.store.clone();

    let results = run_batch(plans, can_start, move |plan| {
        let worktree_base = worktree_base.clone();
        let logs_dir = logs_dir.clone();
        let config = config.clone();
        let store = store_for_work.clone();
        Box::pin(async move {
            let run_ctx = PipelineContext {
                store: &store,
                config: &config,
                worktree_base,
                logs_dir,
                session_id: ulid::Ulid::new().to_string(),
            };
            tracker_scheduler::run_plan(&run_ctx, plan)
                .await
                .map(|_| ())
        })
    })
    .await;

    for result in results {
        match result.outcome {
            tracker_scheduler::PlanRunOutcome::Skipped { reason, .. } => {
                println!("Plan #{} skipped: {reason}", result.plan_id);
            }
            tracker_scheduler::PlanRunOutcome::Ran(Ok(())) => {
                println!("Plan #{} finished", result.plan_id);
            }
            tracker_scheduler::PlanRunOutcome::Ran(Err(e)) => {
                println!("Plan #{} failed: {e}", result.plan_id);
            }
        }
    }

    Ok(())
}
