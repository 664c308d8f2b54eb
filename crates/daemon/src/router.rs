// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The method table.
//!
//! One `"module.verb"` string per handler. Params are schema-validated
//! into typed structs; a validation failure answers `-32602`, an unknown
//! method `-32601`, and every subsystem error maps through the handlers'
//! error converters. Any method carrying a `workspace_dir` (including a
//! nested `job.workspace_dir`) triggers workspace observation first.

use crate::handlers::{self, governance, heartbeat, runs, workspace};
use crate::server::ServerContext;
use crate::snapshots;
use crate::subs::SubscriptionFilter;
use guild_store::Workspace;
use guild_wire::{
    EventsAckParams, EventsSubscribeParams, EventsUnsubscribeParams, Request, Response, RpcError,
    WorkspaceParams,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Route one request. Returns `None` for notifications.
pub async fn dispatch(
    ctx: &Arc<ServerContext>,
    out_tx: &mpsc::Sender<Response>,
    request: Request,
) -> Option<Response> {
    let id = request.id.clone().unwrap_or(serde_json::Value::Null);
    let is_notification = request.is_notification();

    observe_if_workspace_scoped(ctx, &request.params);

    let result = route(ctx, out_tx, &request).await;
    if is_notification {
        if let Err(e) = result {
            tracing::debug!(method = request.method, error = e.message, "notification failed");
        }
        return None;
    }
    Some(match result {
        Ok(value) => Response::success(id, value),
        Err(error) => Response::error(id, error),
    })
}

/// Side effect of any workspace-scoped call: heartbeat observation and
/// an index-sync nudge.
fn observe_if_workspace_scoped(ctx: &ServerContext, params: &serde_json::Value) {
    let direct = params.get("workspace_dir").and_then(|v| v.as_str());
    let nested = params.pointer("/job/workspace_dir").and_then(|v| v.as_str());
    if let Some(dir) = direct.or(nested) {
        ctx.observe_workspace(&PathBuf::from(dir));
    }
}

async fn route(
    ctx: &Arc<ServerContext>,
    out_tx: &mpsc::Sender<Response>,
    request: &Request,
) -> Result<serde_json::Value, RpcError> {
    let p = &request.params;
    match request.method.as_str() {
        // -- daemon --
        "daemon.status" => heartbeat::daemon_status(ctx),
        "daemon.shutdown" => heartbeat::daemon_shutdown(ctx),

        // -- workspace --
        "workspace.init" => workspace::workspace_init(ctx, handlers::params(p)?),
        "workspace.project.create_with_defaults" => {
            workspace::project_create(ctx, handlers::params(p)?)
        }
        "workspace.recover" => workspace::workspace_recover(ctx, handlers::params(p)?),
        "workspace.migrate_events" => workspace::migrate_events(ctx, handlers::params(p)?),

        // -- runs & sessions --
        "run.create" => runs::run_create(ctx, handlers::params(p)?),
        "session.launch" => runs::session_launch(ctx, handlers::params(p)?).await,
        "session.launch_provider" => {
            runs::session_launch_provider(ctx, handlers::params(p)?).await
        }
        "session.poll" => runs::session_poll(ctx, handlers::params(p)?),
        "session.collect" => runs::session_collect(ctx, handlers::params(p)?).await,
        "session.stop" => runs::session_stop(ctx, handlers::params(p)?),

        // -- events --
        "events.subscribe" => events_subscribe(ctx, out_tx, handlers::params(p)?).await,
        "events.unsubscribe" => {
            let params: EventsUnsubscribeParams = handlers::params(p)?;
            let removed = ctx.subs.unsubscribe(&params.subscription_id);
            handlers::ok(json!({ "removed": removed }))
        }
        "events.ack" => {
            let params: EventsAckParams = handlers::params(p)?;
            let acked = ctx.subs.ack(&params.subscription_id, params.cursor);
            handlers::ok(json!({ "acked": acked }))
        }
        "events.verify" => workspace::events_verify(ctx, handlers::params(p)?),

        // -- governance --
        "memory.propose_delta" => governance::memory_propose(ctx, handlers::params(p)?),
        "memory.approve_delta" => governance::memory_approve(ctx, handlers::params(p)?),
        "milestone.approve" => governance::milestone_approve(ctx, handlers::params(p)?),
        "inbox.resolve" => governance::inbox_resolve(ctx, handlers::params(p)?),
        "artifact.read" => governance::artifact_read(ctx, handlers::params(p)?),
        "pm.apply_allocations" => governance::apply_allocations(ctx, handlers::params(p)?),

        // -- index --
        "index.rebuild" => workspace::index_rebuild(handlers::params(p)?).await,
        "index.sync" => workspace::index_sync(handlers::params(p)?).await,
        "index.sync_worker_flush" => workspace::sync_worker_flush(ctx),
        "index.sync_worker_status" => workspace::sync_worker_status(ctx),

        // -- heartbeat & lane --
        "heartbeat.tick" => heartbeat::heartbeat_tick(ctx, handlers::params(p)?),
        "heartbeat.set_config" => heartbeat::heartbeat_set_config(ctx, handlers::params(p)?),
        "heartbeat.get_status" => heartbeat::heartbeat_get_status(ctx),
        "heartbeat.report" => heartbeat::heartbeat_report(ctx, handlers::params(p)?),
        "lane.stats" => heartbeat::lane_stats(ctx, handlers::params(p)?),

        // -- snapshots --
        "snapshot.run_monitor" => {
            let params: WorkspaceParams = handlers::params(p)?;
            let ws = Workspace::new(&params.workspace_dir);
            let mut rows =
                snapshots::run_monitor_snapshot(&ws).map_err(handlers::index_error)?;
            for row in &mut rows {
                let run_id = guild_core::RunId::from_string(&row.run_id);
                row.live_status =
                    ctx.runtime.status_for_run(&run_id).map(|s| s.status.as_str().to_string());
            }
            handlers::ok(rows)
        }
        "snapshot.review_inbox" => {
            let params: WorkspaceParams = handlers::params(p)?;
            let ws = Workspace::new(&params.workspace_dir);
            handlers::ok(
                snapshots::review_inbox_snapshot(&ws).map_err(handlers::index_error)?,
            )
        }
        "snapshot.pm" => {
            #[derive(serde::Deserialize)]
            struct PmParams {
                workspace_dir: PathBuf,
                #[serde(default)]
                project_id: Option<String>,
            }
            let params: PmParams = handlers::params(p)?;
            let ws = Workspace::new(&params.workspace_dir);
            handlers::ok(
                snapshots::pm_snapshot(&ws, params.project_id.as_deref())
                    .map_err(handlers::index_error)?,
            )
        }
        "snapshot.colleagues" => {
            let params: WorkspaceParams = handlers::params(p)?;
            let ws = Workspace::new(&params.workspace_dir);
            handlers::ok(snapshots::colleagues_snapshot(&ws).map_err(handlers::index_error)?)
        }
        "snapshot.resources" => {
            let params: WorkspaceParams = handlers::params(p)?;
            let ws = Workspace::new(&params.workspace_dir);
            handlers::ok(snapshots::resources_snapshot(&ws).map_err(handlers::store_error)?)
        }
        "snapshot.reconciliation" => {
            let params: WorkspaceParams = handlers::params(p)?;
            let ws = Workspace::new(&params.workspace_dir);
            handlers::ok(
                snapshots::reconciliation_snapshot(&ws).map_err(handlers::store_error)?,
            )
        }

        method => Err(RpcError::method_not_found(method)),
    }
}

/// `events.subscribe` with optional indexed backfill before live fanout.
async fn events_subscribe(
    ctx: &Arc<ServerContext>,
    out_tx: &mpsc::Sender<Response>,
    p: EventsSubscribeParams,
) -> Result<serde_json::Value, RpcError> {
    let filter = SubscriptionFilter {
        workspace_dir: p.workspace_dir.clone(),
        project_id: p.project_id,
        run_id: p.run_id,
        event_types: p.event_types.clone(),
    };

    // Backfill first: sync the index, then replay matching rows in
    // monotonic order, so the live stream continues from known history.
    let mut backfill: Vec<(String, serde_json::Value)> = Vec::new();
    if let (Some(workspace_dir), Some(limit)) = (&p.workspace_dir, p.backfill_limit) {
        let ws = Workspace::new(workspace_dir);
        let ws_sync = ws.clone();
        tokio::task::spawn_blocking(move || guild_index::sync_sqlite_index(&ws_sync))
            .await
            .map_err(|e| RpcError::new(guild_wire::APP_ERROR, e.to_string()))?
            .map_err(handlers::index_error)?;

        let runs = guild_index::queries::list_runs(&ws).map_err(handlers::index_error)?;
        let mut rows = Vec::new();
        for run in runs {
            if let Some(project_id) = &p.project_id {
                if run.project_id != project_id.as_str() {
                    continue;
                }
            }
            if let Some(run_id) = &p.run_id {
                if run.run_id != run_id.as_str() {
                    continue;
                }
            }
            let events = guild_index::queries::events_for_run(
                &ws,
                &run.project_id,
                &run.run_id,
                0,
                limit,
                true,
            )
            .map_err(handlers::index_error)?;
            for event in events {
                if let Some(types) = &p.event_types {
                    if !event
                        .event_type
                        .as_ref()
                        .map(|t| types.contains(t))
                        .unwrap_or(false)
                    {
                        continue;
                    }
                }
                let payload: serde_json::Value = event
                    .payload
                    .as_deref()
                    .and_then(|p| serde_json::from_str(p).ok())
                    .unwrap_or(serde_json::Value::Null);
                rows.push((
                    event.ts_monotonic_ms.unwrap_or(0),
                    event.project_id.clone(),
                    json!({
                        "event_id": event.event_id,
                        "ts_wallclock": event.ts_wallclock,
                        "ts_monotonic_ms": event.ts_monotonic_ms,
                        "run_id": event.run_id,
                        "type": event.event_type,
                        "actor": event.actor,
                        "visibility": event.visibility,
                        "payload": payload,
                        "seq": event.seq,
                    }),
                ));
            }
        }
        rows.sort_by_key(|(ts, _, _)| *ts);
        backfill =
            rows.into_iter().take(limit as usize).map(|(_, pid, event)| (pid, event)).collect();
    }

    let subscription_id = ctx.subs.subscribe(p.subscription_id, filter, out_tx.clone());
    for (project_id, event) in backfill {
        ctx.subs.send_backfill(&subscription_id, &project_id, event).await;
    }

    handlers::ok(json!({ "subscription_id": subscription_id.as_str() }))
}
