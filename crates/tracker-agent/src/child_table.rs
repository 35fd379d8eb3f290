//! Process-wide registry of spawned agent PIDs (spec §4.9, C12).
//!
//! Grounded on `csa-process`'s pattern of tracking live children for signal
//! delivery, narrowed to what the orchestrator actually needs: a PID set
//! that a SIGINT handler can walk to decide whether children are still
//! alive, and that `tracker stop` (future work, spec §9) could read.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildHandle {
    pub plan_id: i64,
    pub pid: u32,
}

fn table() -> &'static Mutex<HashMap<u32, i64>> {
    static TABLE: OnceLock<Mutex<HashMap<u32, i64>>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(HashMap::new()))
}

pub fn register(plan_id: i64, pid: u32) {
    table().lock().expect("child table mutex poisoned").insert(pid, plan_id);
}

pub fn unregister(pid: u32) {
    table().lock().expect("child table mutex poisoned").remove(&pid);
}

pub fn live_children() -> Vec<ChildHandle> {
    table()
        .lock()
        .expect("child table mutex poisoned")
        .iter()
        .map(|(&pid, &plan_id)| ChildHandle { plan_id, pid })
        .collect()
}

pub fn is_empty() -> bool {
    table().lock().expect("child table mutex poisoned").is_empty()
}

/// Send SIGTERM to every registered child (advisory SIGINT handling, spec §5).
#[cfg(unix)]
pub fn terminate_all() {
    for handle in live_children() {
        // SAFETY: kill() with a non-zero pid and SIGTERM has no preconditions
        // beyond a valid signal number; failure (e.g. ESRCH) is ignored since
        // the child may have already exited.
        unsafe {
            libc::kill(handle.pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_unregister_roundtrip() {
        register(1, 12345);
        assert!(!is_empty());
        assert!(live_children().iter().any(|c| c.pid == 12345 && c.plan_id == 1));
        unregister(12345);
        assert!(live_children().iter().all(|c| c.pid != 12345));
    }
}
