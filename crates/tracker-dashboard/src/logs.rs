//! SSE log tail (spec §4.9, §6's wire format): `event: log\ndata: <raw-jsonl-line>\n\n`
//! per record, `event: done\ndata: timeout\n\n` if no log file ever appears.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::extract::{Path as AxumPath, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};

use crate::state::AppState;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_WAIT_POLLS: u32 = 120; // ~60s at 0.5s/poll

enum TailState {
    WaitingForFile {
        plan_id: i64,
        logs_dir: PathBuf,
        waited_polls: u32,
    },
    Tailing {
        path: PathBuf,
        offset: u64,
        pending: VecDeque<String>,
    },
    Finished,
}

/// Newest `<id>-*.jsonl` file under `logs_dir`; the timestamp suffix's
/// separator substitution preserves lexicographic = chronological order.
fn find_latest_log(logs_dir: &Path, plan_id: i64) -> Option<PathBuf> {
    let prefix = format!("{plan_id}-");
    let entries = std::fs::read_dir(logs_dir).ok()?;
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix) && n.ends_with(".jsonl"))
                .unwrap_or(false)
        })
        .max_by_key(|p| p.file_name().map(|n| n.to_os_string()))
}

/// Read whole lines appended since `offset`; leaves a dangling partial line
/// unconsumed so it is re-read complete on the next poll.
fn read_new_lines(path: &Path, offset: u64) -> std::io::Result<(Vec<String>, u64)> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;

    if buf.is_empty() {
        return Ok((Vec::new(), offset));
    }

    let mut consumed = 0u64;
    let mut lines = Vec::new();
    let mut rest = buf.as_str();
    while let Some(pos) = rest.find('\n') {
        let (line, remainder) = rest.split_at(pos);
        if !line.is_empty() {
            lines.push(line.to_string());
        }
        consumed += (pos + 1) as u64;
        rest = &remainder[1..];
    }
    Ok((lines, offset + consumed))
}

async fn step(mut state: TailState) -> Option<(Result<Event, Infallible>, TailState)> {
    loop {
        match state {
            TailState::Finished => return None,
            TailState::WaitingForFile {
                plan_id,
                logs_dir,
                waited_polls,
            } => {
                if let Some(path) = find_latest_log(&logs_dir, plan_id) {
                    state = TailState::Tailing {
                        path,
                        offset: 0,
                        pending: VecDeque::new(),
                    };
                    continue;
                }
                if waited_polls >= MAX_WAIT_POLLS {
                    let event = Event::default().event("done").data("timeout");
                    return Some((Ok(event), TailState::Finished));
                }
                tokio::time::sleep(POLL_INTERVAL).await;
                state = TailState::WaitingForFile {
                    plan_id,
                    logs_dir,
                    waited_polls: waited_polls + 1,
                };
            }
            TailState::Tailing {
                path,
                offset,
                mut pending,
            } => {
                if let Some(line) = pending.pop_front() {
                    let event = Event::default().event("log").data(line);
                    return Some((Ok(event), TailState::Tailing { path, offset, pending }));
                }
                match read_new_lines(&path, offset) {
                    Ok((lines, new_offset)) if !lines.is_empty() => {
                        let mut pending: VecDeque<String> = lines.into();
                        let line = pending.pop_front().expect("just checked non-empty");
                        let event = Event::default().event("log").data(line);
                        return Some((
                            Ok(event),
                            TailState::Tailing {
                                path,
                                offset: new_offset,
                                pending,
                            },
                        ));
                    }
                    Ok((_, new_offset)) => {
                        tokio::time::sleep(POLL_INTERVAL).await;
                        state = TailState::Tailing {
                            path,
                            offset: new_offset,
                            pending,
                        };
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, path = %path.display(), "log tail read failed");
                        tokio::time::sleep(POLL_INTERVAL).await;
                        state = TailState::Tailing { path, offset, pending };
                    }
                }
            }
        }
    }
}

pub async fn tail(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<i64>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let initial = TailState::WaitingForFile {
        plan_id: id,
        logs_dir: state.logs_dir.clone(),
        waited_polls: 0,
    };
    let events = stream::unfold(initial, step);
    Sse::new(events).keep_alive(KeepAlive::default())
}
