//! Durable plan records and dependency edges (spec §3, §4.1).

pub mod graph;
mod migrations;
pub mod planfile;

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracker_core::{Error, Plan, PlanStatus, Result};

/// Durable plan store, backed by a single SQLite file (spec §3, §5).
///
/// Wrapped in a `Mutex` per spec §5's "single-writer per process" rule;
/// multiple OS processes may still open the same file concurrently and rely
/// on SQLite's own locking, exactly as spec §5 calls for.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(|e| Error::store(e.to_string()))?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::store(e.to_string()))?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Register a plan whose file already exists on disk, extracting its
    /// title unless one is supplied explicitly.
    pub fn add_plan(&self, plan_path: &str, project_path: &str, title: Option<&str>) -> Result<Plan> {
        let resolved_title = title.map(str::to_string).unwrap_or_else(|| {
            planfile::parse_title(Path::new(plan_path)).unwrap_or_else(|| "Untitled plan".to_string())
        });
        self.insert_plan(plan_path, project_path, &resolved_title, None)
    }

    /// Create a plan record with no plan file yet (drafted later).
    pub fn create_task(&self, project_path: &str, title: &str, description: Option<&str>) -> Result<Plan> {
        self.insert_plan("", project_path, title, description)
    }

    fn insert_plan(
        &self,
        plan_path: &str,
        project_path: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Plan> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        conn.execute(
            "INSERT INTO plans
                (plan_path, title, description, project_path, display_name, status,
                 review_rounds_used, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'open', 0, ?6, ?6)",
            params![plan_path, title, description, project_path, title, now_str],
        )
        .map_err(|e| Error::store(e.to_string()))?;
        let id = conn.last_insert_rowid();
        drop(conn);
        self.get(id)
    }

    pub fn get(&self, id: i64) -> Result<Plan> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.query_row(SELECT_PLAN_SQL, params![id], row_to_plan)
            .optional()
            .map_err(|e| Error::store(e.to_string()))?
            .ok_or(Error::NotFound(id))
    }

    pub fn list(&self) -> Result<Vec<Plan>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn
            .prepare(&format!("{SELECT_PLAN_SQL_BASE} ORDER BY project_path, created_at DESC"))
            .map_err(|e| Error::store(e.to_string()))?;
        collect_plans(&mut stmt, [])
    }

    pub fn list_by_project(&self, project_path: &str) -> Result<Vec<Plan>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn
            .prepare(&format!(
                "{SELECT_PLAN_SQL_BASE} WHERE project_path = ?1 ORDER BY created_at DESC"
            ))
            .map_err(|e| Error::store(e.to_string()))?;
        collect_plans(&mut stmt, params![project_path])
    }

    pub fn update_status(&self, id: i64, status: PlanStatus) -> Result<()> {
        self.update_text_field(id, "status", status.as_str())
    }

    pub fn update_branch(&self, id: i64, branch: &str) -> Result<()> {
        self.update_text_field(id, "branch", branch)
    }

    pub fn update_session(&self, id: i64, session_id: &str) -> Result<()> {
        self.update_text_field(id, "session_id", session_id)
    }

    pub fn update_planning_session(&self, id: i64, session_id: &str) -> Result<()> {
        self.update_text_field(id, "planning_session_id", session_id)
    }

    pub fn update_plan_path(&self, id: i64, plan_path: &str) -> Result<()> {
        self.update_text_field(id, "plan_path", plan_path)
    }

    pub fn update_worktree_path(&self, id: i64, worktree_path: &str) -> Result<()> {
        self.update_text_field(id, "worktree_path", worktree_path)
    }

    pub fn update_title(&self, id: i64, title: &str) -> Result<()> {
        self.update_text_field(id, "title", title)
    }

    pub fn increment_review_rounds_used(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let now = Utc::now().to_rfc3339();
        let changed = conn
            .execute(
                "UPDATE plans SET review_rounds_used = review_rounds_used + 1, updated_at = ?2 WHERE id = ?1",
                params![id, now],
            )
            .map_err(|e| Error::store(e.to_string()))?;
        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    fn update_text_field(&self, id: i64, column: &'static str, value: &str) -> Result<()> {
        // `column` is always a literal from this module, never caller input.
        let conn = self.conn.lock().expect("store mutex poisoned");
        let now = Utc::now().to_rfc3339();
        let sql = format!("UPDATE plans SET {column} = ?2, updated_at = ?3 WHERE id = ?1");
        let changed = conn
            .execute(&sql, params![id, value, now])
            .map_err(|e| Error::store(e.to_string()))?;
        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    /// Delete a plan; forbidden while it has dependents (spec §3).
    pub fn delete(&self, id: i64) -> Result<()> {
        let dependents = self.get_dependents(id)?;
        if !dependents.is_empty() {
            let ids: Vec<String> = dependents.iter().map(|p| p.id.to_string()).collect();
            return Err(Error::state(format!(
                "cannot delete plan #{id}: plans {} depend on it",
                ids.join(", ")
            )));
        }
        let conn = self.conn.lock().expect("store mutex poisoned");
        let changed = conn
            .execute("DELETE FROM plans WHERE id = ?1", params![id])
            .map_err(|e| Error::store(e.to_string()))?;
        if changed == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }

    /// Set (or clear, with `None`) a plan's dependency, validating spec
    /// §4.1's ordered checks: target exists, same project, not self, no
    /// cycle.
    pub fn set_dependency(&self, id: i64, depends_on: Option<i64>) -> Result<()> {
        let Some(candidate) = depends_on else {
            let conn = self.conn.lock().expect("store mutex poisoned");
            conn.execute(
                "UPDATE plans SET depends_on = NULL, updated_at = ?2 WHERE id = ?1",
                params![id, Utc::now().to_rfc3339()],
            )
            .map_err(|e| Error::store(e.to_string()))?;
            return Ok(());
        };

        let plan = self.get(id)?;
        let target = self.get(candidate)?;

        if candidate == id {
            return Err(Error::dependency("a plan cannot depend on itself"));
        }
        if target.project_path != plan.project_path {
            return Err(Error::cross_project());
        }

        let edges = self.all_edges()?;
        if graph::would_create_cycle(&edges, id, candidate) {
            return Err(Error::cycle());
        }

        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "UPDATE plans SET depends_on = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, candidate, Utc::now().to_rfc3339()],
        )
        .map_err(|e| Error::store(e.to_string()))?;
        Ok(())
    }

    pub fn get_dependency(&self, id: i64) -> Result<Option<Plan>> {
        let plan = self.get(id)?;
        match plan.depends_on {
            Some(dep_id) => Ok(Some(self.get(dep_id)?)),
            None => Ok(None),
        }
    }

    pub fn get_dependents(&self, id: i64) -> Result<Vec<Plan>> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn
            .prepare(&format!("{SELECT_PLAN_SQL_BASE} WHERE depends_on = ?1"))
            .map_err(|e| Error::store(e.to_string()))?;
        collect_plans(&mut stmt, params![id])
    }

    pub fn would_create_cycle(&self, id: i64, candidate: i64) -> Result<bool> {
        let edges = self.all_edges()?;
        Ok(graph::would_create_cycle(&edges, id, candidate))
    }

    pub fn get_dependency_chain(&self, id: i64) -> Result<Vec<Plan>> {
        let edges = self.all_edges()?;
        graph::dependency_chain(&edges, id)
            .into_iter()
            .map(|plan_id| self.get(plan_id))
            .collect()
    }

    /// Open plans whose dependency (if any) is in-review or completed.
    pub fn unblocked_open_tasks(&self) -> Result<Vec<Plan>> {
        let all = self.list()?;
        let mut by_id = std::collections::HashMap::new();
        for p in &all {
            by_id.insert(p.id, p.clone());
        }
        Ok(all
            .into_iter()
            .filter(|p| p.status == PlanStatus::Open)
            .filter(|p| match p.depends_on.and_then(|d| by_id.get(&d)) {
                None => p.depends_on.is_none(),
                Some(dep) => matches!(dep.status, PlanStatus::InReview | PlanStatus::Completed),
            })
            .collect())
    }

    /// Open plans whose dependency is not yet in-review/completed.
    pub fn blocked_tasks(&self) -> Result<Vec<Plan>> {
        let all = self.list()?;
        let mut by_id = std::collections::HashMap::new();
        for p in &all {
            by_id.insert(p.id, p.clone());
        }
        Ok(all
            .into_iter()
            .filter(|p| p.status == PlanStatus::Open)
            .filter(|p| match p.depends_on.and_then(|d| by_id.get(&d)) {
                None => false,
                Some(dep) => !matches!(dep.status, PlanStatus::InReview | PlanStatus::Completed),
            })
            .collect())
    }

    fn all_edges(&self) -> Result<graph::Edges> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn
            .prepare("SELECT id, depends_on FROM plans")
            .map_err(|e| Error::store(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?))
            })
            .map_err(|e| Error::store(e.to_string()))?;
        let mut edges = graph::Edges::new();
        for row in rows {
            let (id, dep) = row.map_err(|e| Error::store(e.to_string()))?;
            edges.insert(id, dep);
        }
        Ok(edges)
    }
}

const SELECT_PLAN_SQL_BASE: &str = "SELECT id, plan_path, title, description, project_path, \
    display_name, status, branch, session_id, planning_session_id, worktree_path, depends_on, \
    review_rounds_used, created_at, updated_at FROM plans";
const SELECT_PLAN_SQL: &str = "SELECT id, plan_path, title, description, project_path, \
    display_name, status, branch, session_id, planning_session_id, worktree_path, depends_on, \
    review_rounds_used, created_at, updated_at FROM plans WHERE id = ?1";

fn row_to_plan(row: &Row<'_>) -> rusqlite::Result<Plan> {
    let status_str: String = row.get(6)?;
    let created_str: String = row.get(13)?;
    let updated_str: String = row.get(14)?;
    Ok(Plan {
        id: row.get(0)?,
        plan_path: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        project_path: row.get(4)?,
        display_name: row.get(5)?,
        status: PlanStatus::from_str(&status_str).unwrap_or(PlanStatus::Open),
        branch: row.get(7)?,
        session_id: row.get(8)?,
        planning_session_id: row.get(9)?,
        worktree_path: row.get(10)?,
        depends_on: row.get(11)?,
        review_rounds_used: row.get::<_, i64>(12)? as u32,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_str)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        updated_at: chrono::DateTime::parse_from_rfc3339(&updated_str)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

fn collect_plans(
    stmt: &mut rusqlite::Statement<'_>,
    params: impl rusqlite::Params,
) -> Result<Vec<Plan>> {
    let rows = stmt
        .query_map(params, row_to_plan)
        .map_err(|e| Error::store(e.to_string()))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::store(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory().unwrap()
    }

    #[test]
    fn create_task_then_get_roundtrips() {
        let s = store();
        let plan = s.create_task("/repo", "Add X", Some("desc")).unwrap();
        assert_eq!(plan.status, PlanStatus::Open);
        let fetched = s.get(plan.id).unwrap();
        assert_eq!(fetched.title, "Add X");
        assert_eq!(fetched.description.as_deref(), Some("desc"));
    }

    #[test]
    fn list_by_project_filters() {
        let s = store();
        s.create_task("/r1", "A", None).unwrap();
        s.create_task("/r2", "B", None).unwrap();
        assert_eq!(s.list_by_project("/r1").unwrap().len(), 1);
        assert_eq!(s.list().unwrap().len(), 2);
    }

    #[test]
    fn update_status_then_update_status_is_idempotent() {
        let s = store();
        let plan = s.create_task("/r", "A", None).unwrap();
        s.update_status(plan.id, PlanStatus::InProgress).unwrap();
        s.update_status(plan.id, PlanStatus::InProgress).unwrap();
        assert_eq!(s.get(plan.id).unwrap().status, PlanStatus::InProgress);
    }

    #[test]
    fn set_dependency_roundtrip_and_clear() {
        let s = store();
        let a = s.create_task("/r", "A", None).unwrap();
        let b = s.create_task("/r", "B", None).unwrap();
        s.set_dependency(b.id, Some(a.id)).unwrap();
        assert_eq!(s.get_dependency(b.id).unwrap().unwrap().id, a.id);
        s.set_dependency(b.id, None).unwrap();
        assert!(s.get_dependency(b.id).unwrap().is_none());
    }

    #[test]
    fn set_dependency_rejects_cross_project() {
        let s = store();
        let a = s.create_task("/r1", "A", None).unwrap();
        let b = s.create_task("/r2", "B", None).unwrap();
        let err = s.set_dependency(b.id, Some(a.id)).unwrap_err();
        assert!(err.to_string().contains("same project"));
    }

    #[test]
    fn set_dependency_rejects_self() {
        let s = store();
        let a = s.create_task("/r", "A", None).unwrap();
        let err = s.set_dependency(a.id, Some(a.id)).unwrap_err();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn set_dependency_rejects_cycle() {
        let s = store();
        let a = s.create_task("/r", "A", None).unwrap();
        let b = s.create_task("/r", "B", None).unwrap();
        s.set_dependency(b.id, Some(a.id)).unwrap();
        let err = s.set_dependency(a.id, Some(b.id)).unwrap_err();
        assert!(err.to_string().contains("circular"));
    }

    #[test]
    fn delete_rejected_while_dependents_exist() {
        let s = store();
        let a = s.create_task("/r", "A", None).unwrap();
        let b = s.create_task("/r", "B", None).unwrap();
        s.set_dependency(b.id, Some(a.id)).unwrap();
        let err = s.delete(a.id).unwrap_err();
        assert!(err.to_string().contains("depend on it"));
    }

    #[test]
    fn unblocked_and_blocked_tasks_partition_correctly() {
        let s = store();
        let a = s.create_task("/r", "A", None).unwrap();
        let b = s.create_task("/r", "B", None).unwrap();
        s.set_dependency(b.id, Some(a.id)).unwrap();

        let unblocked = s.unblocked_open_tasks().unwrap();
        let blocked = s.blocked_tasks().unwrap();
        assert!(unblocked.iter().any(|p| p.id == a.id));
        assert!(blocked.iter().any(|p| p.id == b.id));

        s.update_status(a.id, PlanStatus::InReview).unwrap();
        let unblocked = s.unblocked_open_tasks().unwrap();
        assert!(unblocked.iter().any(|p| p.id == b.id));
    }

    #[test]
    fn get_dependency_chain_orders_root_to_leaf() {
        let s = store();
        let a = s.create_task("/r", "A", None).unwrap();
        let b = s.create_task("/r", "B", None).unwrap();
        let c = s.create_task("/r", "C", None).unwrap();
        s.set_dependency(b.id, Some(a.id)).unwrap();
        s.set_dependency(c.id, Some(b.id)).unwrap();

        let chain = s.get_dependency_chain(c.id).unwrap();
        let ids: Vec<i64> = chain.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[test]
    fn delete_nonexistent_plan_errors() {
        let s = store();
        assert!(s.delete(999).is_err());
    }
}
