//! Shared types, error kinds, and the pure plan state machine (spec §3, §4.8, §7).

pub mod error;
pub mod state_machine;
pub mod types;

pub use error::{Error, Result};
pub use state_machine::{Transition, apply, can_complete, can_start};
pub use types::{GuardResult, Plan, PlanStatus};
