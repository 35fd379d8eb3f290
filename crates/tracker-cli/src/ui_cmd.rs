//! `ui [port]` (spec §4.9, §6): start the dashboard's HTTP/SSE API.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracker_dashboard::AppState;

use crate::context::AppContext;

const DEFAULT_PORT: u16 = 4173;

pub async fn ui(ctx: AppContext, port: Option<u16>) -> Result<()> {
    let addr: SocketAddr = ([127, 0, 0, 1], port.unwrap_or(DEFAULT_PORT)).into();
    let state = AppState::new(
        ctx.store,
        ctx.config,
        ctx.logs_dir,
        ctx.worktree_base,
        ctx.plans_dir,
    );

    println!("Dashboard listening on http://{addr}");
    tracker_dashboard::serve(addr, state)
        .await
        .context("dashboard server failed")
}
