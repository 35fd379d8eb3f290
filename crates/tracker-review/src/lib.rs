//! Bounded worker↔reviewer dialogue (spec §4.6, C6).
//!
//! `run_loop` is the design-level algorithm from spec §4.6 translated
//! directly: one initial worker turn, then up to `max_rounds` review/revise
//! rounds. It is generic over how an agent turn is actually executed (real
//! subprocess vs. a test double) and over how a diff is fetched, so the
//! bounded-rounds/verdict-parsing logic stays testable without a real `git`
//! checkout or a real `claude` binary — grounded on the teacher's general
//! preference for pure, dependency-injected core logic (e.g.
//! `csa-session::state`'s guard functions) over logic entangled with I/O.

pub mod prompts;
pub mod verdict;

pub use verdict::{Verdict, parse_verdict};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tracker_agent::{AgentInvocation, AgentOutcome, SessionMode};
use tracker_core::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Executes one agent turn. `RealRunner` below delegates to
/// `tracker_agent::run`; tests supply a canned double instead.
pub trait AgentTurnRunner: Send + Sync {
    fn run_turn(&self, invocation: AgentInvocation) -> BoxFuture<'static, Result<AgentOutcome>>;
}

/// Production runner: spawns the real `claude` subprocess via `tracker-agent`.
pub struct RealRunner;

impl AgentTurnRunner for RealRunner {
    fn run_turn(&self, invocation: AgentInvocation) -> BoxFuture<'static, Result<AgentOutcome>> {
        Box::pin(tracker_agent::run(invocation))
    }
}

/// Parameters for one plan's review loop.
pub struct ReviewParams {
    pub plan_id: i64,
    pub plan_content: String,
    pub cwd: PathBuf,
    pub max_rounds: u32,
    pub skip_permissions: bool,
    pub log_path: PathBuf,
    /// Fresh UUID for the worker's initial `--session-id`; callers own
    /// generation so results are reproducible in tests.
    pub session_id: String,
}

/// Why the loop stopped, once the initial worker turn has succeeded. Per
/// spec §4.6, every one of these still advances the plan to `in-review`;
/// only [`LoopOutcome::WorkerInitFailed`] leaves it at `in-progress`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `diff` came back empty right after the worker turn: no-op.
    NoChanges,
    /// Reviewer rendered `<verdict>APPROVE</verdict>`.
    Approved,
    /// A reviewer turn itself failed (non-zero exit); inconclusive.
    ReviewerRunFailed,
    /// `max_rounds` reviews all came back `REQUEST_CHANGES`.
    RoundsExhausted,
    /// A worker revision turn failed after `REQUEST_CHANGES`.
    WorkerResumeFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The very first worker turn failed; plan stays `in-progress`.
    WorkerInitFailed,
    Done {
        session_id: String,
        rounds_used: u32,
        reason: StopReason,
    },
}

fn invocation(
    params: &ReviewParams,
    prompt: String,
    session: SessionMode,
) -> AgentInvocation {
    let mut inv = AgentInvocation::new(params.plan_id, prompt, params.cwd.clone(), session);
    inv.skip_permissions = params.skip_permissions;
    inv.log_path = params.log_path.clone();
    inv
}

/// Run the bounded worker↔reviewer dialogue described in spec §4.6.
///
/// `diff_fn` fetches `main...HEAD` for `cwd`; injected so tests can avoid a
/// real git checkout.
pub async fn run_loop(
    runner: &dyn AgentTurnRunner,
    diff_fn: impl Fn(&Path) -> Result<String>,
    params: ReviewParams,
) -> Result<LoopOutcome> {
    tracing::info!(plan_id = params.plan_id, session_id = %params.session_id, "starting review loop");

    let worker0 = invocation(
        &params,
        prompts::worker_prompt(&params.plan_content),
        SessionMode::New(params.session_id.clone()),
    );
    let worker0_result = runner.run_turn(worker0).await;
    let worker0_ok = matches!(&worker0_result, Ok(outcome) if outcome.exit_code == 0);
    if !worker0_ok {
        tracing::warn!(plan_id = params.plan_id, "initial worker turn failed");
        return Ok(LoopOutcome::WorkerInitFailed);
    }

    for round in 1..=params.max_rounds {
        let diff = diff_fn(&params.cwd)?;
        if diff.trim().is_empty() {
            tracing::info!(plan_id = params.plan_id, "no diff produced; stopping");
            return Ok(LoopOutcome::Done {
                session_id: params.session_id,
                rounds_used: round - 1,
                reason: StopReason::NoChanges,
            });
        }

        let reviewer = invocation(
            &params,
            prompts::review_prompt(&params.plan_content, &diff),
            SessionMode::New(format!("{}-review-{round}", params.session_id)),
        );
        let reviewer_result = runner.run_turn(reviewer).await;
        let reviewer_outcome = match reviewer_result {
            Ok(outcome) if outcome.exit_code == 0 => outcome,
            _ => {
                tracing::warn!(plan_id = params.plan_id, round, "reviewer turn failed");
                return Ok(LoopOutcome::Done {
                    session_id: params.session_id,
                    rounds_used: round,
                    reason: StopReason::ReviewerRunFailed,
                });
            }
        };

        match verdict::parse_verdict(&reviewer_outcome.transcript) {
            Verdict::Approve => {
                tracing::info!(plan_id = params.plan_id, round, "reviewer approved");
                return Ok(LoopOutcome::Done {
                    session_id: params.session_id,
                    rounds_used: round,
                    reason: StopReason::Approved,
                });
            }
            Verdict::RequestChanges { feedback } => {
                let resume = invocation(
                    &params,
                    prompts::revision_prompt(&feedback),
                    SessionMode::Resume(params.session_id.clone()),
                );
                let resume_result = runner.run_turn(resume).await;
                let resume_ok = matches!(&resume_result, Ok(outcome) if outcome.exit_code == 0);
                if !resume_ok {
                    tracing::warn!(plan_id = params.plan_id, round, "worker revision turn failed");
                    return Ok(LoopOutcome::Done {
                        session_id: params.session_id,
                        rounds_used: round,
                        reason: StopReason::WorkerResumeFailed,
                    });
                }
            }
        }
    }

    tracing::info!(plan_id = params.plan_id, "review rounds exhausted");
    Ok(LoopOutcome::Done {
        session_id: params.session_id,
        rounds_used: params.max_rounds,
        reason: StopReason::RoundsExhausted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedRunner {
        outcomes: Mutex<Vec<Result<AgentOutcome>>>,
        invocations: Mutex<Vec<AgentInvocation>>,
    }

    impl ScriptedRunner {
        fn new(outcomes: Vec<Result<AgentOutcome>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                invocations: Mutex::new(Vec::new()),
            }
        }
    }

    impl AgentTurnRunner for ScriptedRunner {
        fn run_turn(&self, invocation: AgentInvocation) -> BoxFuture<'static, Result<AgentOutcome>> {
            self.invocations.lock().unwrap().push(invocation);
            let mut outcomes = self.outcomes.lock().unwrap();
            let result = if outcomes.is_empty() {
                Ok(AgentOutcome::default())
            } else {
                outcomes.remove(0)
            };
            Box::pin(async move { result })
        }
    }

    fn ok_outcome(transcript: &str) -> Result<AgentOutcome> {
        Ok(AgentOutcome {
            exit_code: 0,
            transcript: transcript.to_string(),
        })
    }

    fn params() -> ReviewParams {
        ReviewParams {
            plan_id: 1,
            plan_content: "# Plan\ndo the thing".to_string(),
            cwd: PathBuf::from("/tmp/plan-1"),
            max_rounds: 5,
            skip_permissions: false,
            log_path: PathBuf::from("/tmp/plan-1.jsonl"),
            session_id: "session-1".to_string(),
        }
    }

    #[tokio::test]
    async fn worker_init_failure_stops_immediately() {
        let runner = ScriptedRunner::new(vec![Err(tracker_core::Error::agent("boom"))]);
        let outcome = run_loop(&runner, |_| Ok(String::new()), params()).await.unwrap();
        assert_eq!(outcome, LoopOutcome::WorkerInitFailed);
    }

    #[tokio::test]
    async fn empty_diff_after_worker_is_a_no_op() {
        let runner = ScriptedRunner::new(vec![ok_outcome("worker done")]);
        let outcome = run_loop(&runner, |_| Ok(String::new()), params()).await.unwrap();
        assert_eq!(
            outcome,
            LoopOutcome::Done {
                session_id: "session-1".to_string(),
                rounds_used: 0,
                reason: StopReason::NoChanges,
            }
        );
    }

    #[tokio::test]
    async fn approval_on_first_round_stops_with_rounds_used_one() {
        let runner = ScriptedRunner::new(vec![
            ok_outcome("worker done"),
            ok_outcome("<verdict>APPROVE</verdict>"),
        ]);
        let outcome = run_loop(&runner, |_| Ok("diff content".to_string()), params())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LoopOutcome::Done {
                session_id: "session-1".to_string(),
                rounds_used: 1,
                reason: StopReason::Approved,
            }
        );
    }

    #[tokio::test]
    async fn reviewer_failure_is_inconclusive() {
        let runner = ScriptedRunner::new(vec![
            ok_outcome("worker done"),
            Err(tracker_core::Error::agent("reviewer crashed")),
        ]);
        let outcome = run_loop(&runner, |_| Ok("diff content".to_string()), params())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LoopOutcome::Done {
                session_id: "session-1".to_string(),
                rounds_used: 1,
                reason: StopReason::ReviewerRunFailed,
            }
        );
    }

    #[tokio::test]
    async fn missing_verdict_tag_is_treated_as_request_changes() {
        let runner = ScriptedRunner::new(vec![
            ok_outcome("worker done"),
            ok_outcome("I forgot the tag but it looks fine"),
            ok_outcome("revision applied"),
            ok_outcome("<verdict>APPROVE</verdict>"),
        ]);
        let mut p = params();
        p.max_rounds = 5;
        let outcome = run_loop(&runner, |_| Ok("diff content".to_string()), p).await.unwrap();
        assert_eq!(
            outcome,
            LoopOutcome::Done {
                session_id: "session-1".to_string(),
                rounds_used: 2,
                reason: StopReason::Approved,
            }
        );
    }

    #[tokio::test]
    async fn rounds_exhausted_still_counts_as_advance_to_in_review() {
        let mut outcomes = vec![ok_outcome("worker done")];
        for _ in 0..3 {
            outcomes.push(ok_outcome("<verdict>REQUEST_CHANGES</verdict>"));
            outcomes.push(ok_outcome("revision applied"));
        }
        let runner = ScriptedRunner::new(outcomes);
        let mut p = params();
        p.max_rounds = 3;
        let outcome = run_loop(&runner, |_| Ok("diff content".to_string()), p).await.unwrap();
        assert_eq!(
            outcome,
            LoopOutcome::Done {
                session_id: "session-1".to_string(),
                rounds_used: 3,
                reason: StopReason::RoundsExhausted,
            }
        );
    }

    #[tokio::test]
    async fn worker_resume_failure_stops_loop() {
        let runner = ScriptedRunner::new(vec![
            ok_outcome("worker done"),
            ok_outcome("<verdict>REQUEST_CHANGES</verdict>"),
            Err(tracker_core::Error::agent("resume crashed")),
        ]);
        let outcome = run_loop(&runner, |_| Ok("diff content".to_string()), params())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LoopOutcome::Done {
                session_id: "session-1".to_string(),
                rounds_used: 1,
                reason: StopReason::WorkerResumeFailed,
            }
        );
    }
}
