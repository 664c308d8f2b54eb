// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat, launch-lane, and daemon-status methods.

use super::{heartbeat_error, ok};
use crate::server::ServerContext;
use guild_core::HeartbeatConfig;
use guild_wire::{HeartbeatReportParams, HeartbeatTickParams, RpcError, WorkspaceParams};
use serde_json::json;

pub fn heartbeat_tick(
    ctx: &ServerContext,
    p: HeartbeatTickParams,
) -> Result<serde_json::Value, RpcError> {
    let outcome = ctx
        .heartbeat
        .tick_workspace(&p.workspace_dir, p.dry_run, p.reason.as_deref().unwrap_or("rpc"))
        .map_err(heartbeat_error)?;
    ok(outcome)
}

#[derive(serde::Deserialize)]
pub struct SetConfigParams {
    pub workspace_dir: std::path::PathBuf,
    pub config: HeartbeatConfig,
}

pub fn heartbeat_set_config(
    ctx: &ServerContext,
    p: SetConfigParams,
) -> Result<serde_json::Value, RpcError> {
    ctx.heartbeat.set_config(&p.workspace_dir, &p.config).map_err(heartbeat_error)?;
    ok(json!({ "saved": true }))
}

pub fn heartbeat_get_status(ctx: &ServerContext) -> Result<serde_json::Value, RpcError> {
    ok(ctx.heartbeat.get_status())
}

pub fn heartbeat_report(
    ctx: &ServerContext,
    p: HeartbeatReportParams,
) -> Result<serde_json::Value, RpcError> {
    let outcome =
        ctx.heartbeat.handle_report(&p.workspace_dir, &p.report).map_err(heartbeat_error)?;
    ok(outcome)
}

pub fn lane_stats(ctx: &ServerContext, p: WorkspaceParams) -> Result<serde_json::Value, RpcError> {
    ok(ctx.lane.stats_for_workspace(&p.workspace_dir))
}

pub fn daemon_status(ctx: &ServerContext) -> Result<serde_json::Value, RpcError> {
    ok(json!({
        "uptime_secs": ctx.start_time.elapsed().as_secs(),
        "subscriptions": ctx.subs.len(),
        "sync_worker": ctx.sync_worker.status(),
        "heartbeat": ctx.heartbeat.get_status(),
    }))
}

pub fn daemon_shutdown(ctx: &ServerContext) -> Result<serde_json::Value, RpcError> {
    ctx.close();
    ok(json!({ "stopping": true }))
}
