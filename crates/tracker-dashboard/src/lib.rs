//! HTTP surface + SSE log tail + live work spawn (spec §4.9, C9).
//!
//! Routes are assembled into one `axum::Router` over a shared [`AppState`];
//! each handler lives in its own module, mirroring how `csa-mcp-hub::serve`
//! groups its axum routes by concern rather than putting everything in one
//! file. `tracker-cli`'s `ui` command is the only caller of [`serve`]; the
//! dashboard crate itself never calls `std::process::exit` or touches
//! stdio, so it stays usable from tests via `axum::Router` directly.

mod error;
mod logs;
mod plan_gen;
mod plans;
mod state;
mod work;

pub use error::ApiError;
pub use state::AppState;

use axum::Router;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;

/// Build the full `/api/*` router described by spec §4.9's endpoint table.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/plans", get(plans::list).post(plans::create))
        .route("/api/plans/work-all", post(work::work_all))
        .route("/api/usage", get(usage::snapshot))
        .route("/api/plans/{id}", get(plans::get).delete(plans::delete))
        .route("/api/plans/{id}/work", post(work::work_one))
        .route("/api/plans/{id}/logs", get(logs::tail))
        .route("/api/plans/{id}/plan-content", get(plan_gen::plan_content))
        .route("/api/plans/{id}/plan", post(plan_gen::generate))
        .route("/api/plans/{id}/chat", post(plan_gen::chat))
        .route(
            "/api/plans/{id}/dependency",
            get(plans::get_dependency).put(plans::set_dependency),
        )
        .route("/api/plans/{id}/dependents", get(plans::dependents))
        .route("/api/plans/{id}/can-start", get(plans::can_start))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the dashboard until the process is signalled to stop
/// (spec §4.9, §5: the dashboard applies the same advisory-SIGINT
/// cancellation rule as the CLI, enforced by the caller via
/// `tracker_agent::child_table`).
pub async fn serve(addr: std::net::SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    tracing::info!(%addr, "dashboard listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

mod usage {
    use axum::extract::State;
    use axum::Json;
    use serde::Serialize;

    use crate::state::AppState;

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UsageSnapshot {
        pub enabled: bool,
        pub min_available_input_tokens: u64,
        pub min_available_requests: u32,
        pub max_cost_per_session: f64,
        pub max_wait_minutes: u32,
        pub organization_tier: Option<u8>,
    }

    /// Current quota snapshot (spec §4.9's `GET /api/usage`).
    ///
    /// The actual remaining-quota numbers come from an external usage
    /// service (spec §4.7, §6: "an external-interface detail"); this crate
    /// has no such client, so it reports the configured *gate*, not a live
    /// remaining-balance reading. A real deployment would wire a
    /// `tracker_scheduler::QuotaGate` implementation behind this endpoint.
    pub async fn snapshot(State(state): State<AppState>) -> Json<UsageSnapshot> {
        let limits = &state.config.usage_limits;
        Json(UsageSnapshot {
            enabled: limits.enabled,
            min_available_input_tokens: limits.min_available_input_tokens,
            min_available_requests: limits.min_available_requests,
            max_cost_per_session: limits.max_cost_per_session,
            max_wait_minutes: limits.max_wait_minutes,
            organization_tier: limits.organization_tier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracker_config::Config;
    use tracker_store::Store;

    fn test_state() -> AppState {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let config = Arc::new(Config::default());
        AppState::new(
            store,
            config,
            std::env::temp_dir().join("tracker-test-logs"),
            std::env::temp_dir().join("tracker-test-worktrees"),
            std::env::temp_dir().join("tracker-test-plans"),
        )
    }

    #[tokio::test]
    async fn router_builds_without_panicking() {
        let _ = router(test_state());
    }
}
