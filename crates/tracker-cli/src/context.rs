//! Shared bootstrap every subcommand needs: the Store, Config, and the
//! well-known paths from spec §6.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracker_config::{Config, paths};
use tracker_store::Store;

/// `store`/`config` are `Arc`-wrapped so `work`/`ui` can hand a `'static`
/// clone to spawned tasks (the review loop's per-project concurrency,
/// spec §4.7) without the rest of the CLI having to think about it.
pub struct AppContext {
    pub store: Arc<Store>,
    pub config: Arc<Config>,
    pub logs_dir: PathBuf,
    pub worktree_base: PathBuf,
    pub plans_dir: PathBuf,
}

impl AppContext {
    pub fn bootstrap() -> Result<Self> {
        let db_path = paths::db_path();
        let store = Store::open(&db_path).with_context(|| {
            format!("failed to open plan database at {}", db_path.display())
        })?;
        let config = Config::load_or_default(&paths::config_path());
        Ok(Self {
            store: Arc::new(store),
            config: Arc::new(config),
            logs_dir: paths::logs_dir(),
            worktree_base: paths::worktree_base(),
            plans_dir: paths::plans_dir(),
        })
    }
}

/// Resolve a project path argument, defaulting to the current directory,
/// into an absolute path (the Store's invariants assume absolute paths,
/// spec §3).
pub fn resolve_project_path(raw: Option<&str>) -> Result<String> {
    let path = match raw {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .context("failed to read current directory")?
            .join(path)
    };
    Ok(absolute.to_string_lossy().to_string())
}
