//! Shared server state handed to every handler.

use std::path::PathBuf;
use std::sync::Arc;

use tracker_config::Config;
use tracker_store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub config: Arc<Config>,
    pub logs_dir: PathBuf,
    pub worktree_base: PathBuf,
    pub plans_dir: PathBuf,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        config: Arc<Config>,
        logs_dir: PathBuf,
        worktree_base: PathBuf,
        plans_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            config,
            logs_dir,
            worktree_base,
            plans_dir,
        }
    }
}
