// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace bootstrap, recovery, migration, and index methods.

use super::{index_error, ok, runtime_error, store_error};
use crate::server::ServerContext;
use guild_core::{CompanyRecord, ProjectId, ProjectRecord};
use guild_store::{records, replay_run, ReplayMode, Workspace};
use guild_wire::{EventsVerifyParams, ProjectCreateParams, RpcError, WorkspaceParams};
use serde_json::json;

#[derive(serde::Deserialize)]
pub struct WorkspaceInitParams {
    pub workspace_dir: std::path::PathBuf,
    pub company_name: String,
}

pub fn workspace_init(
    ctx: &ServerContext,
    p: WorkspaceInitParams,
) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let company = CompanyRecord {
        id: p.company_name.to_lowercase().replace(' ', "-"),
        name: p.company_name,
        created_at: ctx.clock.iso_now(),
        schema_version: 1,
    };
    records::init_workspace(&ws, &company).map_err(store_error)?;
    ok(json!({ "company_id": company.id }))
}

pub fn project_create(
    ctx: &ServerContext,
    p: ProjectCreateParams,
) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let project = ProjectRecord {
        id: p.project_id.unwrap_or_else(ProjectId::generate),
        name: p.name,
        created_at: ctx.clock.iso_now(),
        team_id: p.team_id,
        budget: None,
    };
    records::create_project_with_defaults(&ws, &project).map_err(store_error)?;
    ok(json!({ "project_id": project.id.as_str() }))
}

/// `workspace.recover`: sweep crashed runs to failed.
pub fn workspace_recover(
    ctx: &ServerContext,
    p: WorkspaceParams,
) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let live = ctx.runtime.known_run_ids();
    let swept = guild_engine::sweep_crashed_runs(&ws, &ctx.log, &live).map_err(runtime_error)?;
    ok(json!({ "swept": swept.iter().map(|r| r.as_str().to_string()).collect::<Vec<_>>() }))
}

#[derive(serde::Deserialize)]
pub struct MigrateParams {
    pub workspace_dir: std::path::PathBuf,
    #[serde(default)]
    pub force: bool,
}

pub fn migrate_events(ctx: &ServerContext, p: MigrateParams) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let outcome = guild_store::backfill_event_envelopes(&ws, &ctx.clock.iso_now(), p.force)
        .map_err(store_error)?;
    ok(outcome)
}

/// `events.verify`: replay one run log under the requested mode.
pub fn events_verify(ctx: &ServerContext, p: EventsVerifyParams) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let mode = match p.mode.as_deref() {
        None | Some("verified") => ReplayMode::Verified,
        Some("raw") => ReplayMode::Raw,
        Some("deterministic") => ReplayMode::Deterministic,
        Some("live") => ReplayMode::Live,
        Some(other) => return Err(RpcError::invalid_params(format!("unknown mode: {other}"))),
    };
    let mut report =
        replay_run(&ws.events_jsonl(&p.project_id, &p.run_id), mode).map_err(store_error)?;
    if mode == ReplayMode::Live {
        report.live_status = ctx.runtime.status_for_run(&p.run_id).map(|s| s.status);
    }
    ok(report)
}

pub async fn index_rebuild(p: WorkspaceParams) -> Result<serde_json::Value, RpcError> {
    let outcome = tokio::task::spawn_blocking(move || {
        guild_index::rebuild_sqlite_index(&Workspace::new(&p.workspace_dir))
    })
    .await
    .map_err(|e| RpcError::new(guild_wire::APP_ERROR, e.to_string()))?
    .map_err(index_error)?;
    ok(outcome)
}

pub async fn index_sync(p: WorkspaceParams) -> Result<serde_json::Value, RpcError> {
    let outcome = tokio::task::spawn_blocking(move || {
        guild_index::sync_sqlite_index(&Workspace::new(&p.workspace_dir))
    })
    .await
    .map_err(|e| RpcError::new(guild_wire::APP_ERROR, e.to_string()))?
    .map_err(index_error)?;
    ok(outcome)
}

pub fn sync_worker_flush(ctx: &ServerContext) -> Result<serde_json::Value, RpcError> {
    ctx.sync_worker.flush();
    ok(json!({ "flushed": true }))
}

pub fn sync_worker_status(ctx: &ServerContext) -> Result<serde_json::Value, RpcError> {
    ok(ctx.sync_worker.status())
}
