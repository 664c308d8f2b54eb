// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session runtime: spawn, stream, collect, stop.
//!
//! Each session owns one child process. Stdout and stderr are read on
//! independent tasks and funneled through a single writer loop so event
//! lines never interleave mid-chunk. The status machine is
//! `running → {ended | failed | stopped}`; terminal states are sticky and
//! a stop that races the exit wins.

use crate::error::RuntimeError;
use crate::stream::StreamJsonCollector;
use crate::usage::extract_usage_figures;
use guild_adapters::CLAUDE_STREAM_JSON;
use guild_core::{
    event_types, EventEnvelope, ProjectId, RunId, RunStatus, Usage, UsageConfidence, UsageSource,
};
use guild_store::{records, EventLog, Workspace};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::io::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, watch};

/// Upper bound on one `provider.raw` chunk; oversize reads are split.
const MAX_EVENT_CHUNK: usize = 8 * 1024;

/// Read buffer size per stream.
const READ_BUF: usize = 16 * 1024;

#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub workspace_dir: PathBuf,
    pub project_id: ProjectId,
    pub run_id: RunId,
    pub argv: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub stdin_text: Option<String>,
    pub final_text_file_abs: Option<PathBuf>,
    /// Only [`CLAUDE_STREAM_JSON`] is recognized.
    pub parser: Option<String>,
    pub cwd: Option<PathBuf>,
    pub deadline: Option<Duration>,
    /// Actor recorded on every envelope this session appends.
    pub actor: String,
}

/// Snapshot returned by `poll_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SessionStatus {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// Everything `collect_session` returns once the session is terminal.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SessionOutcome {
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub output_relpaths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

struct SessionHandle {
    workspace: Workspace,
    project_id: ProjectId,
    run_id: RunId,
    state: Mutex<SessionStatus>,
    stop_requested: AtomicBool,
    child_pid: Mutex<Option<u32>>,
    usage: Mutex<Option<Usage>>,
    output_relpaths: Mutex<Vec<String>>,
    done_rx: watch::Receiver<bool>,
}

#[derive(Clone)]
pub struct SessionRuntime {
    log: EventLog,
    sessions: Arc<Mutex<HashMap<String, Arc<SessionHandle>>>>,
}

impl SessionRuntime {
    pub fn new(log: EventLog) -> Self {
        Self { log, sessions: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Run ids with a live (non-terminal or collected) session.
    pub fn known_run_ids(&self) -> Vec<RunId> {
        self.sessions.lock().values().map(|h| h.run_id).collect()
    }

    /// Current status for a run, when a session exists for it.
    pub fn status_for_run(&self, run_id: &RunId) -> Option<SessionStatus> {
        self.sessions
            .lock()
            .values()
            .find(|h| h.run_id == *run_id)
            .map(|h| *h.state.lock())
    }

    /// Launch a child for an existing run record.
    pub async fn launch_session(&self, spec: LaunchSpec) -> Result<String, RuntimeError> {
        let ws = Workspace::new(&spec.workspace_dir);
        let run = records::read_run(&ws, &spec.project_id, &spec.run_id)?;
        if run.status.is_terminal() {
            return Err(RuntimeError::Conflict(format!(
                "run {} is already {}",
                run.run_id, run.status
            )));
        }

        let session_ref = format!("ses-{}", uuid::Uuid::new_v4().simple());
        let events_path = ws.events_jsonl(&spec.project_id, &spec.run_id);

        self.append(
            &events_path,
            &spec,
            &session_ref,
            event_types::RUN_STARTED,
            json!({ "argv": redact_argv(&spec.argv) }),
        )?;
        self.append(&events_path, &spec, &session_ref, event_types::RUN_EXECUTING, json!({}))?;

        // Persist stdin before the child sees it.
        let outputs_dir = ws.run_outputs_dir(&spec.project_id, &spec.run_id);
        guild_store::ensure_dir(&outputs_dir)?;
        if let Some(stdin_text) = &spec.stdin_text {
            guild_store::atomic_write(&outputs_dir.join("stdin.txt"), stdin_text.as_bytes())?;
        }

        let mut command = build_command(&spec);
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                self.append(
                    &events_path,
                    &spec,
                    &session_ref,
                    event_types::RUN_FAILED,
                    json!({ "error": e.to_string() }),
                )?;
                let mut failed = run;
                failed.transition(RunStatus::Failed);
                records::write_run(&ws, &failed)?;
                return Err(RuntimeError::Spawn(e.to_string()));
            }
        };

        if let Some(stdin_text) = spec.stdin_text.clone() {
            if let Some(mut stdin) = child.stdin.take() {
                tokio::spawn(async move {
                    use tokio::io::AsyncWriteExt;
                    let _ = stdin.write_all(stdin_text.as_bytes()).await;
                    let _ = stdin.shutdown().await;
                });
            }
        }

        let (done_tx, done_rx) = watch::channel(false);
        let handle = Arc::new(SessionHandle {
            workspace: ws.clone(),
            project_id: spec.project_id,
            run_id: spec.run_id,
            state: Mutex::new(SessionStatus { status: RunStatus::Running, exit_code: None }),
            stop_requested: AtomicBool::new(false),
            child_pid: Mutex::new(child.id()),
            usage: Mutex::new(None),
            output_relpaths: Mutex::new(Vec::new()),
            done_rx,
        });
        self.sessions.lock().insert(session_ref.clone(), Arc::clone(&handle));

        if let Some(deadline) = spec.deadline {
            let runtime = self.clone();
            let deadline_ref = session_ref.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                let _ = runtime.stop_session(&deadline_ref);
            });
        }

        let runtime = self.clone();
        let driver_ref = session_ref.clone();
        tokio::spawn(async move {
            runtime.drive(child, handle, spec, driver_ref, done_tx).await;
        });

        Ok(session_ref)
    }

    /// Non-blocking status check.
    pub fn poll_session(&self, session_ref: &str) -> Result<SessionStatus, RuntimeError> {
        let sessions = self.sessions.lock();
        let handle = sessions
            .get(session_ref)
            .ok_or_else(|| RuntimeError::NotFound(session_ref.to_string()))?;
        let status = *handle.state.lock();
        Ok(status)
    }

    /// Wait for the terminal state and return outputs + usage.
    pub async fn collect_session(&self, session_ref: &str) -> Result<SessionOutcome, RuntimeError> {
        let handle = {
            let sessions = self.sessions.lock();
            sessions
                .get(session_ref)
                .cloned()
                .ok_or_else(|| RuntimeError::NotFound(session_ref.to_string()))?
        };
        let mut done = handle.done_rx.clone();
        while !*done.borrow() {
            if done.changed().await.is_err() {
                break;
            }
        }
        let state = *handle.state.lock();
        let output_relpaths = handle.output_relpaths.lock().clone();
        let usage = handle.usage.lock().clone();
        Ok(SessionOutcome {
            status: state.status,
            exit_code: state.exit_code,
            output_relpaths,
            usage,
        })
    }

    /// Request termination; the signal goes to the whole process group.
    pub fn stop_session(&self, session_ref: &str) -> Result<(), RuntimeError> {
        let handle = {
            let sessions = self.sessions.lock();
            sessions
                .get(session_ref)
                .cloned()
                .ok_or_else(|| RuntimeError::NotFound(session_ref.to_string()))?
        };
        handle.stop_requested.store(true, Ordering::SeqCst);
        if let Some(pid) = *handle.child_pid.lock() {
            signal_group(pid);
        }
        Ok(())
    }

    fn append(
        &self,
        events_path: &std::path::Path,
        spec: &LaunchSpec,
        session_ref: &str,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<EventEnvelope, RuntimeError> {
        let envelope =
            EventEnvelope::new(spec.run_id, session_ref, spec.actor.clone(), event_type, payload);
        Ok(self.log.append(events_path, envelope)?)
    }

    /// Own the child until it exits, then settle the run.
    async fn drive(
        &self,
        mut child: tokio::process::Child,
        handle: Arc<SessionHandle>,
        spec: LaunchSpec,
        session_ref: String,
        done_tx: watch::Sender<bool>,
    ) {
        let ws = handle.workspace.clone();
        let events_path = ws.events_jsonl(&spec.project_id, &spec.run_id);
        let outputs_dir = ws.run_outputs_dir(&spec.project_id, &spec.run_id);

        let (chunk_tx, mut chunk_rx) = mpsc::channel::<(&'static str, Vec<u8>)>(64);
        if let Some(stdout) = child.stdout.take() {
            spawn_reader("stdout", stdout, chunk_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader("stderr", stderr, chunk_tx.clone());
        }
        drop(chunk_tx);

        let mut stdout_file = open_append(&outputs_dir.join("stdout.txt"));
        let mut stderr_file = open_append(&outputs_dir.join("stderr.txt"));
        let mut stdout_chars = 0usize;
        let mut stderr_chars = 0usize;
        let mut usage_lines: Vec<String> = Vec::new();
        let mut line_buffers: HashMap<&'static str, String> = HashMap::new();
        let mut collector = if spec.parser.as_deref() == Some(CLAUDE_STREAM_JSON) {
            Some(StreamJsonCollector::new())
        } else {
            None
        };

        // Single writer: every chunk becomes file bytes + provider.raw
        // events, and completed lines feed the parser and usage scan.
        while let Some((stream, bytes)) = chunk_rx.recv().await {
            let file = if stream == "stdout" { &mut stdout_file } else { &mut stderr_file };
            if let Some(file) = file {
                let _ = file.write_all(&bytes);
            }
            if stream == "stdout" {
                stdout_chars += bytes.len();
            } else {
                stderr_chars += bytes.len();
            }

            let text = String::from_utf8_lossy(&bytes).into_owned();
            for piece in split_chunks(&text, MAX_EVENT_CHUNK) {
                let _ = self.append(
                    &events_path,
                    &spec,
                    &session_ref,
                    event_types::PROVIDER_RAW,
                    json!({ "stream": stream, "chunk": piece }),
                );
            }

            let buffer = line_buffers.entry(stream).or_default();
            buffer.push_str(&text);
            while let Some(pos) = buffer.find('\n') {
                let line: String = buffer.drain(..=pos).collect();
                let line = line.trim_end();
                if line.contains("usage") || line.contains("tokenUsage") {
                    usage_lines.push(line.to_string());
                }
                if stream == "stdout" {
                    if let Some(collector) = collector.as_mut() {
                        collector.feed_line(line);
                    }
                }
            }
        }

        let exit = child.wait().await;
        let exit_code = exit.as_ref().ok().and_then(|s| s.code());

        let stopped = handle.stop_requested.load(Ordering::SeqCst);
        let mut terminal = if stopped {
            RunStatus::Stopped
        } else if exit_code == Some(0) {
            RunStatus::Ended
        } else {
            RunStatus::Failed
        };

        // Usage: provider-reported when a usage line was observed,
        // otherwise a character-based estimate.
        let reported = extract_usage_figures(usage_lines.iter().map(String::as_str));
        let mut usage = match reported {
            Some(figures) => Usage {
                source: UsageSource::ProviderReported,
                confidence: UsageConfidence::High,
                input_tokens: figures.input_tokens,
                output_tokens: figures.output_tokens,
                total_tokens: figures.total_tokens,
                cost_usd: None,
            },
            None => Usage::estimate_from_chars(stdout_chars, stderr_chars),
        };

        let machine = records::read_machine_config(&ws).unwrap_or_default();
        let run = records::read_run(&ws, &spec.project_id, &spec.run_id).ok();
        if let Some(run) = &run {
            if let Some(pricing) = machine.pricing_for(run.provider) {
                usage.cost_usd = Some(pricing.cost_usd(usage.input_tokens, usage.output_tokens));
            }
        }

        let usage_type = match usage.source {
            UsageSource::ProviderReported => event_types::USAGE_REPORTED,
            UsageSource::EstimatedChars => event_types::USAGE_ESTIMATED,
        };
        let _ = self.append(
            &events_path,
            &spec,
            &session_ref,
            usage_type,
            serde_json::to_value(&usage).unwrap_or_default(),
        );

        // Budget decision against the project's hard limit.
        if let Ok(project) = records::read_project(&ws, &spec.project_id) {
            if let Some(budget) = project.budget {
                let cost = usage.cost_usd.unwrap_or(0.0);
                let limit = budget.hard_cost_usd;
                let allowed = limit.map_or(true, |l| cost <= l);
                let _ = self.append(
                    &events_path,
                    &spec,
                    &session_ref,
                    event_types::BUDGET_DECISION,
                    json!({ "allowed": allowed, "cost_usd": cost, "limit_usd": limit }),
                );
                if !allowed {
                    let _ = self.append(
                        &events_path,
                        &spec,
                        &session_ref,
                        event_types::BUDGET_EXCEEDED,
                        json!({ "cost_usd": cost, "limit_usd": limit }),
                    );
                    if terminal != RunStatus::Stopped {
                        terminal = RunStatus::Failed;
                    }
                }
            }
        }

        // Final assistant text from the stream parser.
        if let Some(collector) = &collector {
            if let Some(text) = collector.final_text() {
                let target = spec
                    .final_text_file_abs
                    .clone()
                    .unwrap_or_else(|| outputs_dir.join("last_message.md"));
                let _ = guild_store::atomic_write(&target, text.as_bytes());
            }
        }

        let terminal_type = match terminal {
            RunStatus::Ended => event_types::RUN_ENDED,
            RunStatus::Stopped => event_types::RUN_STOPPED,
            _ => event_types::RUN_FAILED,
        };
        let _ = self.append(
            &events_path,
            &spec,
            &session_ref,
            terminal_type,
            json!({ "exit_code": exit_code }),
        );

        // Settle run.yaml.
        if let Some(mut run) = run {
            run.transition(terminal);
            run.usage = Some(usage.clone());
            if let Err(e) = records::write_run(&ws, &run) {
                tracing::error!(run_id = %run.run_id, error = %e, "run.yaml settle failed");
            }
        }

        let mut relpaths = vec![
            format!("work/projects/{}/runs/{}/outputs/stdout.txt", spec.project_id, spec.run_id),
            format!("work/projects/{}/runs/{}/outputs/stderr.txt", spec.project_id, spec.run_id),
        ];
        if collector.as_ref().and_then(|c| c.final_text()).is_some() {
            relpaths.push(format!(
                "work/projects/{}/runs/{}/outputs/last_message.md",
                spec.project_id, spec.run_id
            ));
        }

        {
            let mut state = handle.state.lock();
            state.status = terminal;
            state.exit_code = exit_code;
        }
        *handle.usage.lock() = Some(usage);
        *handle.output_relpaths.lock() = relpaths;

        tracing::info!(
            run_id = %spec.run_id,
            status = %terminal,
            exit_code = ?exit_code,
            "session settled"
        );

        // Wake collectors.
        let _ = done_tx.send(true);
    }
}

fn build_command(spec: &LaunchSpec) -> tokio::process::Command {
    let program = spec.argv.first().cloned().unwrap_or_default();
    let mut command = tokio::process::Command::new(program);
    command.args(spec.argv.iter().skip(1));
    for (key, value) in &spec.env {
        command.env(key, value);
    }
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }
    command.stdin(if spec.stdin_text.is_some() {
        std::process::Stdio::piped()
    } else {
        std::process::Stdio::null()
    });
    command.stdout(std::process::Stdio::piped());
    command.stderr(std::process::Stdio::piped());
    command.kill_on_drop(true);
    // New process group so stop reaches descendants too.
    command.process_group(0);
    command
}

fn spawn_reader<R>(stream: &'static str, mut reader: R, tx: mpsc::Sender<(&'static str, Vec<u8>)>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_BUF];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send((stream, buf[..n].to_vec())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });
}

fn open_append(path: &std::path::Path) -> Option<std::fs::File> {
    std::fs::OpenOptions::new().create(true).append(true).open(path).ok()
}

/// Split text into pieces of at most `max` bytes on char boundaries.
fn split_chunks(text: &str, max: usize) -> Vec<String> {
    if text.len() <= max {
        return vec![text.to_string()];
    }
    let mut out = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if current.len() + ch.len_utf8() > max {
            out.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Mask argv elements that look like credentials.
fn redact_argv(argv: &[String]) -> Vec<String> {
    argv.iter()
        .map(|arg| {
            let looks_secret = arg.starts_with("sk-")
                || arg.to_ascii_lowercase().contains("api_key=")
                || arg.to_ascii_lowercase().contains("token=");
            if looks_secret {
                "***".to_string()
            } else {
                arg.clone()
            }
        })
        .collect()
}

fn signal_group(pid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;
    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::warn!(pid, error = %e, "process group signal failed");
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
