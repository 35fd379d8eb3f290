//! Additive schema migration for the `plans` table (spec §4.1).
//!
//! On open, the base table is created if missing, then every column this
//! crate's code expects is introspected via `PRAGMA table_info` and added
//! with `ALTER TABLE ... ADD COLUMN` if absent. Columns are never removed
//! or renamed online, matching spec §4.1's additive-only rule.

use rusqlite::Connection;
use tracker_core::{Error, Result};

/// One column this crate expects `plans` to carry, in the order new
/// deployments create them. `default_sql` is the literal SQL fragment used
/// for both the original `CREATE TABLE` and any later `ADD COLUMN` backfill,
/// so the two paths can never drift.
struct ColumnSpec {
    name: &'static str,
    ddl: &'static str,
}

const COLUMNS: &[ColumnSpec] = &[
    ColumnSpec { name: "id", ddl: "id INTEGER PRIMARY KEY AUTOINCREMENT" },
    ColumnSpec { name: "plan_path", ddl: "plan_path TEXT NOT NULL DEFAULT ''" },
    ColumnSpec { name: "title", ddl: "title TEXT NOT NULL DEFAULT ''" },
    ColumnSpec { name: "description", ddl: "description TEXT" },
    ColumnSpec { name: "project_path", ddl: "project_path TEXT NOT NULL DEFAULT ''" },
    ColumnSpec { name: "display_name", ddl: "display_name TEXT NOT NULL DEFAULT ''" },
    ColumnSpec { name: "status", ddl: "status TEXT NOT NULL DEFAULT 'open'" },
    ColumnSpec { name: "branch", ddl: "branch TEXT" },
    ColumnSpec { name: "session_id", ddl: "session_id TEXT" },
    ColumnSpec { name: "planning_session_id", ddl: "planning_session_id TEXT" },
    ColumnSpec { name: "worktree_path", ddl: "worktree_path TEXT" },
    ColumnSpec { name: "depends_on", ddl: "depends_on INTEGER" },
    ColumnSpec { name: "review_rounds_used", ddl: "review_rounds_used INTEGER NOT NULL DEFAULT 0" },
    ColumnSpec { name: "created_at", ddl: "created_at TEXT NOT NULL DEFAULT ''" },
    ColumnSpec { name: "updated_at", ddl: "updated_at TEXT NOT NULL DEFAULT ''" },
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS plans (id INTEGER PRIMARY KEY AUTOINCREMENT)")
        .map_err(|e| Error::store(format!("failed to create plans table: {e}")))?;

    let existing = existing_columns(conn)?;

    for column in COLUMNS {
        if column.name == "id" || existing.contains(&column.name.to_string()) {
            continue;
        }
        tracing::debug!(column = column.name, "adding missing column to plans table");
        let sql = format!("ALTER TABLE plans ADD COLUMN {}", column.ddl);
        conn.execute(&sql, [])
            .map_err(|e| Error::store(format!("failed to add column {}: {e}", column.name)))?;
    }

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_plans_project ON plans(project_path);
         CREATE INDEX IF NOT EXISTS idx_plans_depends_on ON plans(depends_on);",
    )
    .map_err(|e| Error::store(format!("failed to create indexes: {e}")))?;

    Ok(())
}

fn existing_columns(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("PRAGMA table_info(plans)")
        .map_err(|e| Error::store(e.to_string()))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| Error::store(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::store(e.to_string()))?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        let cols = existing_columns(&conn).unwrap();
        assert!(cols.contains(&"status".to_string()));
        assert!(cols.contains(&"depends_on".to_string()));
    }

    #[test]
    fn run_backfills_missing_column_on_legacy_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE plans (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL DEFAULT '')",
        )
        .unwrap();
        run(&conn).unwrap();
        let cols = existing_columns(&conn).unwrap();
        assert!(cols.contains(&"worktree_path".to_string()));
        assert!(cols.contains(&"review_rounds_used".to_string()));
    }
}
