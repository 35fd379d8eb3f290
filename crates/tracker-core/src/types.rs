use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a plan (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanStatus {
    Open,
    InProgress,
    InReview,
    Completed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::InReview => "in-review",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "in-progress" => Some(Self::InProgress),
            "in-review" => Some(Self::InReview),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted implementation plan (spec §3).
///
/// `worktree_path` is either null or `<base>/<project-slug>/<id>`; callers
/// that need the active working directory should prefer it over
/// `project_path` whenever it is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: i64,
    /// Absolute path to the plan markdown file; empty while still drafting.
    pub plan_path: String,
    pub title: String,
    pub description: Option<String>,
    pub project_path: String,
    pub display_name: String,
    pub status: PlanStatus,
    pub branch: Option<String>,
    pub session_id: Option<String>,
    pub planning_session_id: Option<String>,
    pub worktree_path: Option<String>,
    pub depends_on: Option<i64>,
    pub review_rounds_used: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a guard check (`can_start`/`can_complete`); never thrown,
/// always returned (spec §7).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GuardResult {
    pub allowed: bool,
    pub reason: Option<String>,
    pub blocked_by: Option<Plan>,
}

impl GuardResult {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            blocked_by: None,
        }
    }

    pub fn deny(reason: impl Into<String>, blocked_by: Option<Plan>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            blocked_by,
        }
    }
}
