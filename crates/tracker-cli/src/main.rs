use anyhow::Result;
use clap::Parser;

mod cleanup_cmd;
mod cli;
mod config_cmd;
mod context;
mod lifecycle_cmds;
mod plan_cmds;
mod shell_cmd;
mod signals;
mod ui_cmd;
mod work_cmd;

use cli::{Cli, Commands};
use context::AppContext;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    if let Err(e) = run().await {
        eprintln!("\x1b[31merror:\x1b[0m {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // These two commands don't touch the plan database, so they skip
    // `AppContext::bootstrap` entirely.
    match cli.command {
        Commands::Config { key, value } => return config_cmd::config(key, value),
        Commands::InstallShellFunction { auto, bash, zsh } => {
            return shell_cmd::install_shell_function(auto, bash, zsh);
        }
        command => dispatch(command).await,
    }
}

async fn dispatch(command: Commands) -> Result<()> {
    let ctx = AppContext::bootstrap()?;
    signals::install();

    match command {
        Commands::Create {
            title,
            project,
            description,
            depends_on,
        } => plan_cmds::create(&ctx, title, project, description, depends_on),
        Commands::Add {
            plan_path,
            project_dir,
        } => plan_cmds::add(&ctx, plan_path, project_dir),
        Commands::List => plan_cmds::list(&ctx),
        Commands::Status { id, status } => plan_cmds::status(&ctx, id, status),
        Commands::Plan { id } => plan_cmds::plan_content(&ctx, id),
        Commands::Work { ids } => work_cmd::work(&ctx, ids).await,
        Commands::Checkout { id } => lifecycle_cmds::checkout(&ctx, id),
        Commands::Resume { id } => lifecycle_cmds::resume(&ctx, id).await,
        Commands::Complete { id, db_only } => lifecycle_cmds::complete(&ctx, id, db_only),
        Commands::Reset { id, delete_branch } => lifecycle_cmds::reset(&ctx, id, delete_branch),
        Commands::Cancel { id } => lifecycle_cmds::cancel(&ctx, id),
        Commands::Cleanup => cleanup_cmd::cleanup(&ctx),
        Commands::SetDependency { id, depends_on } => {
            plan_cmds::set_dependency(&ctx, id, depends_on)
        }
        Commands::ClearDependency { id } => plan_cmds::clear_dependency(&ctx, id),
        Commands::ShowDeps { id } => plan_cmds::show_deps(&ctx, id),
        Commands::Ui { port } => ui_cmd::ui(ctx, port).await,
        Commands::Config { .. } | Commands::InstallShellFunction { .. } => {
            unreachable!("handled in `run` before dispatch")
        }
    }
}
