//! Argument parsing (spec §6, C10): one `Commands` variant per CLI command,
//! matching `cli-sub-agent`'s `#[derive(Parser)]`/`Subcommand` style.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tracker",
    version,
    about = "Multi-project agent orchestrator: registers plans, drives a coding agent \
             through an isolated branch, and runs a bounded review loop.",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new plan with no plan file yet; draft it later with `plan`.
    Create {
        /// Task/plan title.
        title: String,
        /// Project repository path (defaults to the current directory).
        #[arg(short = 'p', long = "project")]
        project: Option<String>,
        /// Free-text description.
        #[arg(short = 'd', long = "description")]
        description: Option<String>,
        /// Predecessor plan id this plan depends on.
        #[arg(long = "depends-on")]
        depends_on: Option<i64>,
    },

    /// Register an existing plan markdown file.
    Add {
        /// Path to the plan markdown file.
        plan_path: String,
        /// Project repository path.
        project_dir: String,
    },

    /// List all plans, grouped by project.
    List,

    /// Set a plan's status directly (bypassing the normal lifecycle guards).
    Status {
        id: i64,
        /// One of: open, in-progress, in-review, completed.
        status: String,
    },

    /// Print a plan's markdown content.
    Plan { id: i64 },

    /// Drive the worker/review loop for the given plans (all unblocked open
    /// plans if none given).
    Work { ids: Vec<i64> },

    /// Check out a plan's branch/worktree without running the agent.
    Checkout { id: i64 },

    /// Resume a plan whose initial worker run previously failed.
    Resume { id: i64 },

    /// Merge a plan's branch into `main` and mark it completed.
    Complete {
        id: Option<i64>,
        /// Update the Store only; skip the actual git merge.
        #[arg(long)]
        db_only: bool,
    },

    /// Return a plan to `open`, optionally deleting its branch.
    Reset {
        id: i64,
        /// Delete the plan's branch too.
        #[arg(long)]
        delete_branch: bool,
    },

    /// Delete a plan record and its branch.
    Cancel { id: i64 },

    /// Remove orphaned worktrees that no longer match a plan record.
    Cleanup,

    /// Set a plan's dependency.
    SetDependency { id: i64, depends_on: i64 },

    /// Clear a plan's dependency.
    ClearDependency { id: i64 },

    /// Print a plan's dependency chain, root to leaf.
    ShowDeps { id: i64 },

    /// Read or write a config key (dotted path, e.g. `usageLimits.enabled`).
    Config {
        key: Option<String>,
        value: Option<String>,
    },

    /// Print a shell function that wraps `tracker checkout` with a `cd`.
    InstallShellFunction {
        #[arg(long)]
        auto: bool,
        #[arg(long)]
        bash: bool,
        #[arg(long)]
        zsh: bool,
    },

    /// Start the dashboard's HTTP/SSE API.
    Ui {
        /// Port to listen on (default 4173).
        port: Option<u16>,
    },
}
