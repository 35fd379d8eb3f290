//! Multiplex plans across projects: serial per project, parallel across
//! projects, honoring dependency blocking (spec §4.7, C7).
//!
//! The scheduler is a function, not a daemon (spec §9): a blocked plan is
//! skipped, not queued, since a one-shot CLI process has no way to wake up
//! later when its predecessor advances. Implemented over `tokio::task::
//! JoinSet` so every project group runs as an independent task and the
//! batch awaits all of them, collecting each group's own error without
//! cancelling its siblings — the teacher workspace is `tokio`-first
//! throughout (every crate already depends on it), so this follows that
//! house style rather than introducing a second async runtime or a thread
//! pool.

pub mod pipeline;
pub mod quota;

pub use pipeline::{PipelineContext, PipelineOutcome, PipelineReason, run_plan};
pub use quota::{NoopQuotaGate, QuotaDecision, QuotaGate, preflight};

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tracker_core::{GuardResult, Plan};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of attempting to run one plan within a batch.
#[derive(Debug)]
pub enum PlanRunOutcome {
    /// `can_start` denied the claim; the plan was left untouched.
    Skipped { reason: String, blocked_by: Option<i64> },
    /// The plan was claimed and its worker/review loop invoked; `Ok(())`
    /// means the loop ran to completion (not necessarily "approved" — see
    /// `tracker-review::StopReason` for that detail), `Err` means the
    /// caller's own work function failed outright (e.g. worktree setup).
    Ran(Result<(), String>),
}

#[derive(Debug)]
pub struct PlanRunResult {
    pub plan_id: i64,
    pub project_path: String,
    pub outcome: PlanRunOutcome,
}

/// Partition `plans` by `project_path`, preserving each plan's relative
/// order within its project (spec §4.7/§5: "within a project, plans
/// execute in the caller's submission order").
fn partition_by_project(plans: Vec<Plan>) -> Vec<(String, Vec<Plan>)> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Plan>> = HashMap::new();
    for plan in plans {
        if !groups.contains_key(&plan.project_path) {
            order.push(plan.project_path.clone());
        }
        groups.entry(plan.project_path.clone()).or_default().push(plan);
    }
    order
        .into_iter()
        .map(|project| {
            let plans = groups.remove(&project).unwrap_or_default();
            (project, plans)
        })
        .collect()
}

/// Run a batch of plans.
///
/// - `can_start`: guard check per plan (spec §4.8); callers close over the
///   Store to look up the plan's predecessor.
/// - `work_one`: drives the actual worktree-setup + review-loop + status
///   transition for one claimed plan. Errors from this closure are recorded
///   per-plan and do not abort sibling projects.
///
/// Plans within one project run strictly sequentially, in the order given;
/// distinct projects run concurrently.
pub async fn run_batch<C, W>(plans: Vec<Plan>, can_start: C, work_one: W) -> Vec<PlanRunResult>
where
    C: Fn(&Plan) -> GuardResult + Send + Sync + 'static,
    W: Fn(Plan) -> BoxFuture<'static, Result<(), String>> + Send + Sync + 'static,
{
    let groups = partition_by_project(plans);
    let can_start = std::sync::Arc::new(can_start);
    let work_one = std::sync::Arc::new(work_one);

    let mut join_set = tokio::task::JoinSet::new();
    for (project_path, group) in groups {
        let can_start = can_start.clone();
        let work_one = work_one.clone();
        join_set.spawn(async move {
            let mut results = Vec::with_capacity(group.len());
            for plan in group {
                let plan_id = plan.id;
                let project_path = plan.project_path.clone();
                let guard = can_start(&plan);
                if !guard.allowed {
                    tracing::info!(plan_id, reason = guard.reason.as_deref().unwrap_or(""), "skipping blocked plan");
                    results.push(PlanRunResult {
                        plan_id,
                        project_path,
                        outcome: PlanRunOutcome::Skipped {
                            reason: guard.reason.unwrap_or_default(),
                            blocked_by: guard.blocked_by.map(|p| p.id),
                        },
                    });
                    continue;
                }
                tracing::info!(plan_id, "claiming plan");
                let outcome = work_one(plan).await;
                results.push(PlanRunResult {
                    plan_id,
                    project_path,
                    outcome: PlanRunOutcome::Ran(outcome),
                });
            }
            results
        });
    }

    let mut all_results = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(results) => all_results.extend(results),
            Err(join_err) => {
                tracing::error!(error = %join_err, "a project group task panicked");
            }
        }
    }
    all_results
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracker_core::PlanStatus;

    fn plan(id: i64, project: &str) -> Plan {
        Plan {
            id,
            plan_path: String::new(),
            title: format!("plan {id}"),
            description: None,
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

    #[tokio::test]
    async fn partitions_preserve_within_project_order() {
        let plans = vec![plan(1, "/r1"), plan(2, "/r2"), plan(3, "/r1")];
        let groups = partition_by_project(plans);
        assert_eq!(groups.len(), 2);
        let r1 = groups.iter().find(|(p, _)| p == "/r1").unwrap();
        assert_eq!(r1.1.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn blocked_plans_are_skipped_not_run() {
        let plans = vec![plan(1, "/r1")];
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        let results = run_batch(
            plans,
            |_| GuardResult::deny("blocked by #0", None),
            move |p| {
                let ran = ran_clone.clone();
                Box::pin(async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    let _ = p;
                    Ok(())
                })
            },
        )
        .await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].outcome, PlanRunOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn sequential_within_project_runs_in_submission_order() {
        let plans = vec![plan(1, "/r1"), plan(2, "/r1")];
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let order_clone = order.clone();
        let results = run_batch(
            plans,
            |_| GuardResult::allow(),
            move |p| {
                let order = order_clone.clone();
                Box::pin(async move {
                    order.lock().unwrap().push(p.id);
                    Ok(())
                })
            },
        )
        .await;
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn distinct_projects_all_complete() {
        let plans = vec![plan(1, "/r1"), plan(2, "/r2")];
        let results = run_batch(
            plans,
            |_| GuardResult::allow(),
            |p| Box::pin(async move { let _ = p; Ok(()) }),
        )
        .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| matches!(r.outcome, PlanRunOutcome::Ran(Ok(())))));
    }

    #[tokio::test]
    async fn failure_in_one_project_does_not_cancel_the_other() {
        let plans = vec![plan(1, "/r1"), plan(2, "/r2")];
        let results = run_batch(
            plans,
            |_| GuardResult::allow(),
            |p| {
                Box::pin(async move {
                    if p.project_path == "/r1" {
                        Err("boom".to_string())
                    } else {
                        Ok(())
                    }
                })
            },
        )
        .await;
        let r1 = results.iter().find(|r| r.project_path == "/r1").unwrap();
        let r2 = results.iter().find(|r| r.project_path == "/r2").unwrap();
        assert!(matches!(&r1.outcome, PlanRunOutcome::Ran(Err(e)) if e == "boom"));
        assert!(matches!(r2.outcome, PlanRunOutcome::Ran(Ok(()))));
    }
}
