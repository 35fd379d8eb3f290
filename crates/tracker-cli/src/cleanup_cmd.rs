//! `cleanup` (spec §6): remove worktree directories that no longer match
//! any plan record, then prune each known project's stale `git worktree`
//! metadata.

use std::collections::HashSet;

use anyhow::Result;

use crate::context::AppContext;

pub fn cleanup(ctx: &AppContext) -> Result<()> {
    let plans = ctx.store.list()?;

    let known: Vec<(String, i64)> = plans
        .iter()
        .map(|p| {
            (
                tracker_worktree::project_slug(std::path::Path::new(&p.project_path)),
                p.id,
            )
        })
        .collect();

    let orphans = tracker_worktree::scan_orphans(&ctx.worktree_base, &known)?;
    if orphans.is_empty() {
        println!("No orphaned worktrees found.");
    }
    for orphan in &orphans {
        std::fs::remove_dir_all(&orphan.path)?;
        println!("Removed orphaned worktree {}", orphan.path.display());
    }

    let mut pruned_projects: HashSet<String> = HashSet::new();
    for plan in &plans {
        if pruned_projects.insert(plan.project_path.clone()) {
            let _ = tracker_vcs::worktree_prune(std::path::Path::new(&plan.project_path));
        }
    }

    Ok(())
}
