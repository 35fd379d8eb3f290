//! Legal transitions across plan statuses (spec §4.8).
//!
//! Pure functions only: no I/O, no Store access. Callers look up the
//! predecessor plan themselves and pass it in, so this module stays testable
//! without a database.

use crate::types::{GuardResult, Plan, PlanStatus};

/// `can_start(id)`: dependency is null, or predecessor is in-review/completed.
pub fn can_start(predecessor: Option<&Plan>) -> GuardResult {
    match predecessor {
        None => GuardResult::allow(),
        Some(p) if matches!(p.status, PlanStatus::InReview | PlanStatus::Completed) => {
            GuardResult::allow()
        }
        Some(p) => GuardResult::deny(
            format!(
                "blocked by plan #{} (status: {}); it must reach in-review or completed first",
                p.id, p.status
            ),
            Some(p.clone()),
        ),
    }
}

/// `can_complete(id)`: dependency is null, or predecessor is completed.
pub fn can_complete(predecessor: Option<&Plan>) -> GuardResult {
    match predecessor {
        None => GuardResult::allow(),
        Some(p) if matches!(p.status, PlanStatus::Completed) => GuardResult::allow(),
        Some(p) => GuardResult::deny(
            format!(
                "blocked by plan #{} (status: {}); it must be completed first",
                p.id, p.status
            ),
            Some(p.clone()),
        ),
    }
}

/// Transitions a caller may request; `StateMachine::apply` validates them
/// against the current status before a caller persists the new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Claim,
    WorkerSucceeded,
    ReviewLoopReturned,
    Complete,
    Reset,
    Cancel,
}

/// Validate `transition` against `current`, without applying it.
/// Returns the resulting status on success.
pub fn apply(current: PlanStatus, transition: Transition) -> Result<PlanStatus, String> {
    use PlanStatus::*;
    use Transition::*;

    match (current, transition) {
        (Open, Claim) => Ok(InProgress),
        (InProgress, ReviewLoopReturned) => Ok(InReview),
        (InProgress, Reset) => Ok(Open),
        (InReview, Complete) => Ok(Completed),
        (InReview, Reset) => Ok(Open),
        (Completed, Reset) => Ok(Open),
        (_, Cancel) => Err("cancel deletes the record; it has no resulting status".to_string()),
        (from, to) => Err(format!("illegal transition {to:?} from status {from}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn plan_with_status(id: i64, status: PlanStatus) -> Plan {
        Plan {
            id,
            plan_path: String::new(),
            title: "t".to_string(),
            description: None,
            project_path: "/r".to_string(),
            display_name: "t".to_string(),
            status,
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
    fn can_start_with_no_dependency() {
        assert!(can_start(None).allowed);
    }

    #[test]
    fn can_start_blocked_while_predecessor_open() {
        let predecessor = plan_with_status(1, PlanStatus::Open);
        let guard = can_start(Some(&predecessor));
        assert!(!guard.allowed);
        assert_eq!(guard.blocked_by.unwrap().id, 1);
    }

    #[test]
    fn can_start_allowed_once_predecessor_in_review() {
        let predecessor = plan_with_status(1, PlanStatus::InReview);
        assert!(can_start(Some(&predecessor)).allowed);
    }

    #[test]
    fn can_complete_requires_predecessor_completed() {
        let predecessor = plan_with_status(1, PlanStatus::InReview);
        assert!(!can_complete(Some(&predecessor)).allowed);

        let predecessor = plan_with_status(1, PlanStatus::Completed);
        assert!(can_complete(Some(&predecessor)).allowed);
    }

    #[test]
    fn transitions_follow_the_lifecycle_table() {
        assert_eq!(
            apply(PlanStatus::Open, Transition::Claim),
            Ok(PlanStatus::InProgress)
        );
        assert_eq!(
            apply(PlanStatus::InProgress, Transition::ReviewLoopReturned),
            Ok(PlanStatus::InReview)
        );
        assert_eq!(
            apply(PlanStatus::InReview, Transition::Complete),
            Ok(PlanStatus::Completed)
        );
        assert_eq!(
            apply(PlanStatus::Completed, Transition::Reset),
            Ok(PlanStatus::Open)
        );
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        assert!(apply(PlanStatus::Open, Transition::Complete).is_err());
        assert!(apply(PlanStatus::Completed, Transition::Claim).is_err());
    }
}
