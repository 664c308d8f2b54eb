// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server lifecycle and transport loops.
//!
//! `start_server` builds the process singletons — event log, session
//! runtime, launch lane, index sync worker, heartbeat service,
//! subscription registry — and `close` tears them down. Transports are
//! stdio by default or a Unix socket; each connection gets a reader loop
//! plus an outbound writer task fed by responses and subscription
//! notifications.

use crate::router::dispatch;
use crate::subs::{SubscriptionRegistry, SUBSCRIPTION_QUEUE};
use guild_engine::{LaunchLane, SessionRuntime};
use guild_heartbeat::{HeartbeatService, JobLauncher};
use guild_index::SyncWorker;
use guild_store::{EventLog, SharedClock};
use guild_wire::{read_message, write_message, ProtocolError, Request, Response, RpcError};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Everything the method handlers can reach.
pub struct ServerContext {
    pub clock: Arc<dyn SharedClock>,
    pub log: EventLog,
    pub runtime: SessionRuntime,
    pub lane: LaunchLane,
    pub sync_worker: Arc<SyncWorker>,
    pub heartbeat: Arc<HeartbeatService>,
    pub subs: SubscriptionRegistry,
    pub start_time: Instant,
    shutdown: CancellationToken,
}

impl ServerContext {
    /// Any method carrying a workspace_dir triggers observation: the
    /// heartbeat starts watching and the index gets a sync nudge.
    pub fn observe_workspace(&self, workspace_dir: &Path) {
        self.heartbeat.observe_workspace(workspace_dir);
        if let Err(e) = self.sync_worker.notify(workspace_dir) {
            tracing::debug!(error = %e, "sync notify after close ignored");
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Tear down the singletons. Idempotent.
    pub fn close(&self) {
        self.shutdown.cancel();
        self.heartbeat.close();
        self.sync_worker.close();
    }
}

/// A started server: context plus the bus fanout task.
pub struct Server {
    pub ctx: Arc<ServerContext>,
}

/// Heartbeat `launch_job` actions re-enter the session runtime through a
/// fresh run record; prompt execution itself is left to the launched
/// provider session submitted over RPC.
struct LaneJobLauncher;

impl JobLauncher for LaneJobLauncher {
    fn launch(
        &self,
        ws: &guild_store::Workspace,
        action: &guild_core::HeartbeatAction,
        worker_agent_id: &str,
    ) -> Result<guild_core::RunId, String> {
        let guild_core::HeartbeatActionKind::LaunchJob { project_id, task_id, .. } = &action.kind
        else {
            return Err("not a launch_job action".to_string());
        };
        let run = guild_core::Run {
            run_id: guild_core::RunId::generate(),
            project_id: *project_id,
            agent_id: guild_core::AgentId::from_string(worker_agent_id),
            provider: guild_core::Provider::Claude,
            model: None,
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            status: guild_core::RunStatus::Running,
            spec: guild_core::RunSpec {
                kind: guild_core::RunSpecKind::Heartbeat,
                task_id: *task_id,
                ..Default::default()
            },
            usage: None,
        };
        guild_store::records::create_run(ws, &run).map_err(|e| e.to_string())?;
        Ok(run.run_id)
    }
}

/// Build the singletons and start the bus fanout.
pub fn start_server() -> Server {
    let clock: Arc<dyn SharedClock> = Arc::new(guild_core::SystemClock);
    let log = EventLog::new(Arc::clone(&clock));
    let runtime = SessionRuntime::new(log.clone());
    let heartbeat = HeartbeatService::new(Arc::clone(&clock), Arc::new(LaneJobLauncher));
    let sync_worker =
        SyncWorker::new(crate::env::sync_debounce_ms(), crate::env::sync_min_interval_ms());

    let ctx = Arc::new(ServerContext {
        clock,
        log: log.clone(),
        runtime,
        lane: LaunchLane::new(),
        sync_worker,
        heartbeat,
        subs: SubscriptionRegistry::new(),
        start_time: Instant::now(),
        shutdown: CancellationToken::new(),
    });

    // Bus fanout: every append reaches matching subscriptions, and the
    // index hears about the workspace.
    let fanout_ctx = Arc::clone(&ctx);
    let mut bus_rx = log.bus().subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = fanout_ctx.shutdown.cancelled() => return,
                received = bus_rx.recv() => match received {
                    Ok(event) => {
                        fanout_ctx.subs.fanout(&event);
                        if let Some(ws) = workspace_of(&event.events_file_path) {
                            let _ = fanout_ctx.sync_worker.notify(&ws);
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "bus fanout lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                },
            }
        }
    });

    tracing::info!("server started");
    Server { ctx }
}

/// Walk up from `.../work/projects/...` to the workspace root.
fn workspace_of(events_file_path: &Path) -> Option<std::path::PathBuf> {
    let mut current = events_file_path;
    while let Some(parent) = current.parent() {
        if current.file_name().and_then(|n| n.to_str()) == Some("work") {
            return Some(parent.to_path_buf());
        }
        current = parent;
    }
    None
}

impl Server {
    /// Serve one duplex byte stream (stdio in production).
    pub async fn serve_stream<R, W>(&self, reader: R, writer: W)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        handle_connection(Arc::clone(&self.ctx), reader, writer).await;
    }

    /// Accept connections on a Unix socket until shutdown.
    pub async fn serve_unix(&self, socket_path: &Path) -> std::io::Result<()> {
        let _ = std::fs::remove_file(socket_path);
        let listener = tokio::net::UnixListener::bind(socket_path)?;
        tracing::info!(path = %socket_path.display(), "listening");
        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (stream, _addr) = accepted?;
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        handle_connection(ctx, reader, writer).await;
                    });
                }
            }
        }
    }

    pub fn close(&self) {
        self.ctx.close();
    }
}

/// One connection: a reader loop and an outbound writer task sharing a
/// queue, cancelled together when the client goes away or the server
/// shuts down.
async fn handle_connection<R, W>(ctx: Arc<ServerContext>, reader: R, mut writer: W)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, mut out_rx) = mpsc::channel::<Response>(SUBSCRIPTION_QUEUE);
    let shutdown = ctx.shutdown.clone();

    let writer_task = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            if let Err(e) = write_message(&mut writer, &message).await {
                tracing::debug!(error = %e, "write failed; closing connection");
                return;
            }
        }
    });

    let mut reader = BufReader::new(reader);
    loop {
        let request = tokio::select! {
            _ = shutdown.cancelled() => break,
            request = read_message(&mut reader) => request,
        };
        match request {
            Ok(request) => {
                let responded = process_request(&ctx, &out_tx, request).await;
                if !responded {
                    break;
                }
            }
            Err(ProtocolError::ConnectionClosed) => break,
            Err(ProtocolError::Parse(message)) => {
                let error = Response::error(
                    serde_json::Value::Null,
                    RpcError::new(guild_wire::PARSE_ERROR, message),
                );
                if out_tx.send(error).await.is_err() {
                    break;
                }
            }
            Err(ProtocolError::Io(e)) => {
                tracing::debug!(error = %e, "connection io error");
                break;
            }
        }
    }

    // Dropping the sender ends the writer; dead subscriptions get pruned.
    drop(out_tx);
    let _ = writer_task.await;
    ctx.subs.prune_closed();
}

/// Route one request; returns false when the connection should close.
async fn process_request(
    ctx: &Arc<ServerContext>,
    out_tx: &mpsc::Sender<Response>,
    request: Request,
) -> bool {
    if !request.is_valid_version() {
        let id = request.id.clone().unwrap_or(serde_json::Value::Null);
        let error = Response::error(
            id,
            RpcError::new(guild_wire::INVALID_REQUEST, "jsonrpc must be \"2.0\""),
        );
        return out_tx.send(error).await.is_ok();
    }

    let is_notification = request.is_notification();
    let response = dispatch(ctx, out_tx, request).await;
    if is_notification {
        return true;
    }
    match response {
        Some(response) => out_tx.send(response).await.is_ok(),
        None => true,
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
