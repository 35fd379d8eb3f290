//! Optional usage/quota pre-flight (spec §4.7, §6 `usageLimits.*`).
//!
//! Modeled as a trait with a no-op default so the scheduler has no hard
//! dependency on any specific quota HTTP API — spec §6 frames this as "an
//! external-interface detail," and the teacher workspace's own `csa-
//! scheduler::rate_limit` makes the same choice of isolating the
//! decision-making from the transport that detects it.

use std::time::Duration;

use crate::BoxFuture;

/// What the pre-flight check decided for this batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    /// Enough headroom; proceed immediately.
    Proceed,
    /// Under threshold; wait `retry_after`, bounded by the batch's overall
    /// `max_wait`, then re-check.
    Wait(Duration),
    /// Over threshold and unrecoverable within `max_wait`; abort the whole
    /// batch (spec §4.7: "either wait ... or abort the whole batch").
    Abort(String),
}

pub trait QuotaGate: Send + Sync {
    fn check(&self) -> BoxFuture<'static, QuotaDecision>;
}

/// Default gate when `usageLimits.enabled` is false: always proceeds.
pub struct NoopQuotaGate;

impl QuotaGate for NoopQuotaGate {
    fn check(&self) -> BoxFuture<'static, QuotaDecision> {
        Box::pin(async { QuotaDecision::Proceed })
    }
}

/// Poll `gate` until it says `Proceed` or `Abort`, bounded by `max_wait`.
/// Returns `Ok(())` to proceed, `Err(reason)` to abort the batch.
pub async fn preflight(gate: &dyn QuotaGate, max_wait: Duration) -> Result<(), String> {
    let start = tokio::time::Instant::now();
    loop {
        match gate.check().await {
            QuotaDecision::Proceed => return Ok(()),
            QuotaDecision::Abort(reason) => return Err(reason),
            QuotaDecision::Wait(retry_after) => {
                if start.elapsed() + retry_after > max_wait {
                    return Err(format!(
                        "quota pre-flight did not clear within {max_wait:?}"
                    ));
                }
                tokio::time::sleep(retry_after).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedGate(Mutex<Vec<QuotaDecision>>);

    impl QuotaGate for ScriptedGate {
        fn check(&self) -> BoxFuture<'static, QuotaDecision> {
            let mut decisions = self.0.lock().unwrap();
            let next = if decisions.is_empty() {
                QuotaDecision::Proceed
            } else {
                decisions.remove(0)
            };
            Box::pin(async move { next })
        }
    }

    #[tokio::test]
    async fn noop_gate_always_proceeds() {
        assert_eq!(preflight(&NoopQuotaGate, Duration::from_secs(1)).await, Ok(()));
    }

    #[tokio::test]
    async fn abort_decision_aborts_immediately() {
        let gate = ScriptedGate(Mutex::new(vec![QuotaDecision::Abort("over budget".into())]));
        let result = preflight(&gate, Duration::from_secs(1)).await;
        assert_eq!(result, Err("over budget".to_string()));
    }

    #[tokio::test]
    async fn wait_then_proceed_within_bound() {
        let gate = ScriptedGate(Mutex::new(vec![
            QuotaDecision::Wait(Duration::from_millis(1)),
            QuotaDecision::Proceed,
        ]));
        let result = preflight(&gate, Duration::from_secs(5)).await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn wait_exceeding_max_wait_aborts() {
        let gate = ScriptedGate(Mutex::new(vec![QuotaDecision::Wait(Duration::from_secs(100))]));
        let result = preflight(&gate, Duration::from_millis(1)).await;
        assert!(result.is_err());
    }
}
