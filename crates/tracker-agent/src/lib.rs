//! Drives the external coding-agent subprocess (spec §4.5, C5).
//!
//! Built on `tokio::process::Command` following `csa-process::spawn_tool`:
//! piped stdout/stderr, `kill_on_drop(true)`, own process group via
//! `libc::setsid()` in `pre_exec` on Unix, and concurrent stdout/stderr
//! draining via `tokio::select!` so a chatty stderr stream can never block
//! stdout consumption (or vice versa). Unlike `csa-process`, there is no
//! idle-timeout watchdog here: agent turns can legitimately think for a long
//! time, and round-level bounding is the review loop's job (spec §4.6), not
//! this crate's.

mod child_table;
mod stream_parser;

pub use child_table::{live_children, terminate_all, ChildHandle};

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::Command;
use tracker_core::{Error, Result};

/// Which session-continuation flag to pass to the agent binary.
#[derive(Debug, Clone)]
pub enum SessionMode {
    /// First turn for this plan: `--session-id <id>`.
    New(String),
    /// Continuing an existing session: `--resume <id>`.
    Resume(String),
}

impl SessionMode {
    /// The continuation id this mode carries, regardless of whether it's a
    /// fresh `--session-id` or a `--resume` of an existing one.
    pub fn session_id(&self) -> &str {
        match self {
            SessionMode::New(id) | SessionMode::Resume(id) => id,
        }
    }
}

/// One worker or reviewer turn to run.
#[derive(Debug, Clone)]
pub struct AgentInvocation {
    pub plan_id: i64,
    pub prompt: String,
    /// Working directory: the plan's worktree if one exists, else the
    /// project root (spec §4.5).
    pub cwd: PathBuf,
    pub session: SessionMode,
    pub skip_permissions: bool,
    /// Where the raw JSONL stream is appended, one line per frame.
    pub log_path: PathBuf,
    /// Binary name to invoke; overridable for testing, defaults to `claude`.
    pub binary: String,
}

impl AgentInvocation {
    pub fn new(plan_id: i64, prompt: impl Into<String>, cwd: PathBuf, session: SessionMode) -> Self {
        let log_path = cwd.join(".tracker-agent.jsonl");
        Self {
            plan_id,
            prompt: prompt.into(),
            cwd,
            session,
            skip_permissions: false,
            log_path,
            binary: "claude".to_string(),
        }
    }
}

/// Outcome of a completed agent invocation.
#[derive(Debug, Clone, Default)]
pub struct AgentOutcome {
    pub exit_code: i32,
    /// Concatenated `text` content from every `assistant` frame, in order,
    /// plus the terminal `result` frame's text if present.
    pub transcript: String,
}

/// Build the argument vector for one invocation (spec §4.5):
/// `-p -` (prompt on stdin), `--session-id`/`--resume`, optionally
/// `--dangerously-skip-permissions`, then `--verbose --output-format
/// stream-json`.
fn build_args(invocation: &AgentInvocation) -> Vec<String> {
    let mut args = vec!["-p".to_string(), "-".to_string()];
    match &invocation.session {
        SessionMode::New(id) => {
            args.push("--session-id".to_string());
            args.push(id.clone());
        }
        SessionMode::Resume(id) => {
            args.push("--resume".to_string());
            args.push(id.clone());
        }
    }
    if invocation.skip_permissions {
        args.push("--dangerously-skip-permissions".to_string());
    }
    args.push("--verbose".to_string());
    args.push("--output-format".to_string());
    args.push("stream-json".to_string());
    args
}

/// Write the prompt to a temp file, read it back into memory, and delete the
/// temp file before the child ever sees it (spec §4.5: the prompt travels to
/// the child over stdin, not as a file argument; the temp file only exists
/// to avoid holding arbitrarily large prompts in memory while they're
/// assembled).
fn stage_prompt(prompt: &str) -> Result<Vec<u8>> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(prompt.as_bytes())?;
    file.flush()?;
    let bytes = std::fs::read(file.path())?;
    // `file` unlinks on drop at the end of this function.
    Ok(bytes)
}

/// Run one agent turn to completion: spawn, stream stdout/stderr
/// concurrently into the JSONL log and transcript buffer, then wait for
/// exit.
pub async fn run(invocation: AgentInvocation) -> Result<AgentOutcome> {
    let prompt_bytes = stage_prompt(&invocation.prompt)?;
    let args = build_args(&invocation);

    tracing::info!(
        plan_id = invocation.plan_id,
        session_id = invocation.session.session_id(),
        cwd = %invocation.cwd.display(),
        "spawning agent turn"
    );

    let mut cmd = Command::new(&invocation.binary);
    cmd.args(&args)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Honor the OpenTelemetry endpoint override the dashboard/CLI may have
    // set in the parent's environment; child inherits it automatically via
    // `cmd.env_clear()` being left unset, so no explicit propagation needed.

    #[cfg(unix)]
    unsafe {
        cmd.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    let mut child = cmd.spawn().map_err(|e| Error::agent(format!("failed to spawn agent: {e}")))?;
    let pid = child.id().unwrap_or(0);
    child_table::register(invocation.plan_id, pid);

    if let Some(mut stdin) = child.stdin.take() {
        use tokio::io::AsyncWriteExt;
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&prompt_bytes).await {
                tracing::warn!(error = %e, "failed writing prompt to agent stdin");
            }
            let _ = stdin.shutdown().await;
        });
    }

    let outcome = drain_and_wait(&mut child, &invocation.log_path).await;
    child_table::unregister(pid);

    let status = child
        .wait()
        .await
        .map_err(|e| Error::agent(format!("failed waiting for agent exit: {e}")))?;

    outcome.map(|mut o| {
        o.exit_code = status.code().unwrap_or(-1);
        o
    })
}

async fn drain_and_wait(child: &mut tokio::process::Child, log_path: &Path) -> Result<AgentOutcome> {
    let stdout = child.stdout.take().ok_or_else(|| Error::agent("no stdout handle"))?;
    let stderr = child.stderr.take().ok_or_else(|| Error::agent("no stderr handle"))?;

    let mut log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    const READ_BUF_SIZE: usize = 4096;
    let mut stdout_reader = BufReader::new(stdout);
    let mut stderr_reader = BufReader::new(stderr);
    let mut stdout_line_buf = String::new();
    let mut stderr_line_buf = String::new();
    let mut stdout_buf = [0u8; READ_BUF_SIZE];
    let mut stderr_buf = [0u8; READ_BUF_SIZE];
    let mut stdout_done = false;
    let mut stderr_done = false;

    let mut transcript = String::new();
    let mut saw_result = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            result = stdout_reader.read(&mut stdout_buf), if !stdout_done => {
                match result {
                    Ok(0) => {
                        flush_stdout_line(&mut stdout_line_buf, &mut log_file, &mut transcript, &mut saw_result);
                        stdout_done = true;
                    }
                    Ok(n) => {
                        let chunk = String::from_utf8_lossy(&stdout_buf[..n]);
                        stdout_line_buf.push_str(&chunk);
                        while let Some(pos) = stdout_line_buf.find('\n') {
                            let line: String = stdout_line_buf.drain(..=pos).collect();
                            apply_stdout_line(line.trim_end_matches('\n'), &mut log_file, &mut transcript, &mut saw_result);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "stdout read error");
                        stdout_done = true;
                    }
                }
            }
            result = stderr_reader.read(&mut stderr_buf), if !stderr_done => {
                match result {
                    Ok(0) => {
                        stderr_done = true;
                    }
                    Ok(n) => {
                        let chunk = String::from_utf8_lossy(&stderr_buf[..n]);
                        stderr_line_buf.push_str(&chunk);
                        while let Some(pos) = stderr_line_buf.find('\n') {
                            let line: String = stderr_line_buf.drain(..=pos).collect();
                            tracing::debug!(line = %line.trim_end_matches('\n'), "agent stderr");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "stderr read error");
                        stderr_done = true;
                    }
                }
            }
        }
    }

    let _ = saw_result;
    Ok(AgentOutcome {
        exit_code: 0,
        transcript,
    })
}

fn apply_stdout_line(
    line: &str,
    log_file: &mut std::fs::File,
    transcript: &mut String,
    saw_result: &mut bool,
) {
    if !line.is_empty() {
        let _ = writeln!(log_file, "{line}");
    }
    let effect = stream_parser::parse_line(line);
    if let Some(text) = effect.transcript_text {
        if !transcript.is_empty() {
            transcript.push('\n');
        }
        transcript.push_str(&text);
    }
    if effect.is_result {
        *saw_result = true;
    }
}

fn flush_stdout_line(
    buf: &mut String,
    log_file: &mut std::fs::File,
    transcript: &mut String,
    saw_result: &mut bool,
) {
    if !buf.is_empty() {
        let line = std::mem::take(buf);
        apply_stdout_line(&line, log_file, transcript, saw_result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(session: SessionMode) -> AgentInvocation {
        AgentInvocation::new(1, "do the thing", PathBuf::from("/tmp/whatever"), session)
    }

    #[test]
    fn new_session_uses_session_id_flag() {
        let args = build_args(&invocation(SessionMode::New("abc".to_string())));
        assert_eq!(args[0], "-p");
        assert_eq!(args[1], "-");
        assert_eq!(args[2], "--session-id");
        assert_eq!(args[3], "abc");
    }

    #[test]
    fn resume_session_uses_resume_flag() {
        let args = build_args(&invocation(SessionMode::Resume("xyz".to_string())));
        assert_eq!(args[2], "--resume");
        assert_eq!(args[3], "xyz");
    }

    #[test]
    fn skip_permissions_inserts_flag() {
        let mut inv = invocation(SessionMode::New("abc".to_string()));
        inv.skip_permissions = true;
        let args = build_args(&inv);
        assert!(args.contains(&"--dangerously-skip-permissions".to_string()));
    }

    #[test]
    fn default_omits_skip_permissions() {
        let args = build_args(&invocation(SessionMode::New("abc".to_string())));
        assert!(!args.contains(&"--dangerously-skip-permissions".to_string()));
    }

    #[test]
    fn args_always_end_with_stream_json_output_format() {
        let args = build_args(&invocation(SessionMode::New("abc".to_string())));
        assert_eq!(args.last().unwrap(), "stream-json");
        assert_eq!(args[args.len() - 2], "--output-format");
    }

    #[test]
    fn stage_prompt_roundtrips_and_unlinks() {
        let bytes = stage_prompt("hello world").unwrap();
        assert_eq!(bytes, b"hello world");
    }
}
