/// Error kinds shared across the orchestrator core (spec §7).
///
/// Guard failures (`can_start`/`can_complete`) are *not* represented here —
/// they return a typed `GuardResult` instead of an error, per spec §7.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Input(String),

    #[error("No plan with id {0}")]
    NotFound(i64),

    #[error("{0}")]
    State(String),

    #[error("{0}")]
    Dependency(String),

    #[error("vcs command failed: {0}")]
    Vcs(String),

    #[error("agent process failed: {0}")]
    Agent(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        Self::Dependency(message.into())
    }

    pub fn cycle() -> Self {
        Self::Dependency("would create a circular dependency".to_string())
    }

    pub fn cross_project() -> Self {
        Self::Dependency("dependency must be in the same project".to_string())
    }

    pub fn vcs(message: impl Into<String>) -> Self {
        Self::Vcs(message.into())
    }

    pub fn agent(message: impl Into<String>) -> Self {
        Self::Agent(message.into())
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }
}
