//! `create`, `add`, `list`, `status`, `plan`, `show-deps`, `set-dependency`,
//! `clear-dependency` (spec §6).

use anyhow::{Context, Result, bail};
use tracker_core::{Plan, PlanStatus};

use crate::context::{AppContext, resolve_project_path};

pub fn create(
    ctx: &AppContext,
    title: String,
    project: Option<String>,
    description: Option<String>,
    depends_on: Option<i64>,
) -> Result<()> {
    let project_path = resolve_project_path(project.as_deref())?;
    let plan = ctx
        .store
        .create_task(&project_path, &title, description.as_deref())?;
    if let Some(dep_id) = depends_on {
        ctx.store.set_dependency(plan.id, Some(dep_id))?;
    }
    println!("Created plan #{}: {}", plan.id, plan.title);
    Ok(())
}

pub fn add(ctx: &AppContext, plan_path: String, project_dir: String) -> Result<()> {
    let absolute_plan_path = std::fs::canonicalize(&plan_path)
        .with_context(|| format!("plan file not found: {plan_path}"))?;
    let project_path = resolve_project_path(Some(&project_dir))?;
    let plan = ctx.store.add_plan(
        &absolute_plan_path.to_string_lossy(),
        &project_path,
        None,
    )?;
    println!("Registered plan #{}: {}", plan.id, plan.title);
    Ok(())
}

fn format_plan_line(plan: &Plan) -> String {
    let dep = plan
        .depends_on
        .map(|d| format!(" (depends on #{d})"))
        .unwrap_or_default();
    format!(
        "#{:<4} [{:<11}] {}{}  — {}",
        plan.id, plan.status, plan.title, dep, plan.project_path
    )
}

pub fn list(ctx: &AppContext) -> Result<()> {
    let plans = ctx.store.list()?;
    if plans.is_empty() {
        println!("No plans yet. Create one with `tracker create <title>`.");
        return Ok(());
    }
    let mut current_project = String::new();
    for plan in &plans {
        if plan.project_path != current_project {
            current_project = plan.project_path.clone();
            println!("\n{current_project}");
        }
        println!("  {}", format_plan_line(plan));
    }
    Ok(())
}

pub fn status(ctx: &AppContext, id: i64, status: String) -> Result<()> {
    let parsed = PlanStatus::from_str(&status)
        .ok_or_else(|| anyhow::anyhow!("unknown status '{status}' (expected one of: open, in-progress, in-review, completed)"))?;
    ctx.store.update_status(id, parsed)?;
    println!("Plan #{id} status set to {parsed}");
    Ok(())
}

pub fn plan_content(ctx: &AppContext, id: i64) -> Result<()> {
    let plan = ctx.store.get(id)?;
    if plan.plan_path.is_empty() {
        bail!("plan #{id} has no plan file yet; generate one through the dashboard or `tracker add`");
    }
    let content = std::fs::read_to_string(&plan.plan_path)
        .with_context(|| format!("failed to read plan file {}", plan.plan_path))?;
    print!("{content}");
    Ok(())
}

pub fn show_deps(ctx: &AppContext, id: i64) -> Result<()> {
    let plan = ctx.store.get(id)?;
    let chain = ctx.store.get_dependency_chain(id)?;
    if chain.is_empty() {
        println!("Plan #{id} ({}) has no dependencies.", plan.title);
        return Ok(());
    }
    println!("Dependency chain for #{id} ({}), root to leaf:", plan.title);
    for dep in &chain {
        println!("  #{} [{}] {}", dep.id, dep.status, dep.title);
    }
    Ok(())
}

pub fn set_dependency(ctx: &AppContext, id: i64, depends_on: i64) -> Result<()> {
    ctx.store.set_dependency(id, Some(depends_on))?;
    println!("Plan #{id} now depends on #{depends_on}");
    Ok(())
}

pub fn clear_dependency(ctx: &AppContext, id: i64) -> Result<()> {
    ctx.store.set_dependency(id, None)?;
    println!("Cleared plan #{id}'s dependency");
    Ok(())
}
