// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run and session methods.

use super::{ok, runtime_error, store_error};
use crate::server::ServerContext;
use guild_core::{Run, RunId, RunStatus};
use guild_engine::{LaunchPriority, LaunchSpec};
use guild_store::{records, Workspace};
use guild_wire::{
    RpcError, RunCreateParams, SessionCollectParams, SessionLaunchParams, SessionStopParams,
};
use serde_json::json;
use std::sync::Arc;

/// `run.create`: atomically create the run record and its directories.
pub fn run_create(ctx: &ServerContext, p: RunCreateParams) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let run = Run {
        run_id: RunId::generate(),
        project_id: p.project_id,
        agent_id: guild_core::AgentId::from_string(&p.agent_id),
        provider: p.provider,
        model: p.model,
        created_at: ctx.clock.iso_now(),
        status: RunStatus::Running,
        spec: p.spec,
        usage: None,
    };
    records::create_run(&ws, &run).map_err(store_error)?;
    ok(json!({ "run_id": run.run_id.as_str() }))
}

/// `session.launch`: worktree preparation for coding milestones,
/// admission through the launch lane, then spawn.
pub async fn session_launch(
    ctx: &Arc<ServerContext>,
    p: SessionLaunchParams,
) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let mut run = records::read_run(&ws, &p.project_id, &p.run_id).map_err(store_error)?;
    let provider = run.provider;

    let cwd = prepare_worktree_if_coding(ctx, &ws, &mut run)?;

    let spec = LaunchSpec {
        workspace_dir: p.workspace_dir.clone(),
        project_id: p.project_id,
        run_id: p.run_id,
        argv: p.argv,
        env: p.env,
        stdin_text: p.stdin_text,
        final_text_file_abs: p.final_text_file_abs,
        parser: p.parser,
        cwd,
        deadline: p.deadline_ms.map(std::time::Duration::from_millis),
        actor: run.agent_id.to_string(),
    };

    let priority = if p.high_priority { LaunchPriority::High } else { LaunchPriority::Normal };
    let limits = crate::env::lane_limits();
    let runtime = ctx.runtime.clone();
    let session_ref = ctx
        .lane
        .with_launch_lane(&p.workspace_dir, Some(provider), priority, limits, async move {
            runtime.launch_session(spec).await
        })
        .await
        .map_err(runtime_error)?;

    ok(json!({ "session_ref": session_ref }))
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProviderLaunchParams {
    pub workspace_dir: std::path::PathBuf,
    pub project_id: guild_core::ProjectId,
    pub run_id: RunId,
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub deadline_ms: Option<u64>,
    #[serde(default)]
    pub high_priority: bool,
}

/// `session.launch_provider`: resolve the binary from machine config,
/// run the subscription execution guard, build the provider command, and
/// launch it through the normal session path.
pub async fn session_launch_provider(
    ctx: &Arc<ServerContext>,
    p: ProviderLaunchParams,
) -> Result<serde_json::Value, RpcError> {
    let ws = Workspace::new(&p.workspace_dir);
    let run = records::read_run(&ws, &p.project_id, &p.run_id).map_err(store_error)?;
    let machine = records::read_machine_config(&ws).map_err(store_error)?;

    let bin = guild_adapters::resolve_provider_bin(run.provider, &machine)
        .map_err(guard_rejection)?;
    let env: std::collections::BTreeMap<String, String> = std::env::vars().collect();
    let outcome =
        guild_adapters::check_execution_policy(run.provider, &bin, &env, &guild_adapters::CliLoginProbe);
    if !outcome.ok {
        return Err(guard_rejection(outcome));
    }

    let built = guild_adapters::build_command(
        run.provider,
        &guild_adapters::BuildCommandInput {
            bin,
            prompt: p.prompt,
            model: p.model.or(run.model.clone()),
            outputs_dir_abs: ws.run_outputs_dir(&p.project_id, &p.run_id),
        },
    );

    session_launch(
        ctx,
        SessionLaunchParams {
            workspace_dir: p.workspace_dir,
            project_id: p.project_id,
            run_id: p.run_id,
            argv: built.argv,
            env: built.env.into_iter().collect(),
            stdin_text: built.stdin_text,
            final_text_file_abs: built.final_text_file_abs,
            parser: built.final_text_parser,
            deadline_ms: p.deadline_ms,
            high_priority: p.high_priority,
        },
    )
    .await
}

fn guard_rejection(outcome: guild_adapters::GuardOutcome) -> RpcError {
    let detail = outcome.detail.unwrap_or_else(|| "execution policy rejected launch".to_string());
    RpcError::with_reason(
        guild_wire::APP_ERROR,
        detail,
        guild_core::reason::SUBSCRIPTION_REQUIRED,
    )
}

/// Coding-milestone runs with a mapped repo get a fresh git worktree
/// under the run directory; the session's cwd points there and
/// `worktree.prepared` is appended.
fn prepare_worktree_if_coding(
    ctx: &ServerContext,
    ws: &Workspace,
    run: &mut Run,
) -> Result<Option<std::path::PathBuf>, RpcError> {
    let Some(task_id) = run.spec.task_id else {
        return Ok(None);
    };
    let Some(repo_id) = run.spec.repo_id.clone() else {
        return Ok(None);
    };
    let Ok((task, _body)) = records::read_task(ws, &run.project_id, &task_id) else {
        return Ok(None);
    };
    let has_open_coding_milestone = task.milestones.iter().any(|m| {
        m.kind == guild_core::MilestoneKind::Coding
            && m.status != guild_core::MilestoneStatus::Done
    });
    if !has_open_coding_milestone {
        return Ok(None);
    }

    let machine = records::read_machine_config(ws).map_err(store_error)?;
    let Some(repo_root) = machine.repo_roots.get(&repo_id).cloned() else {
        return Ok(None);
    };

    let worktree_dir = ws.run_worktree_dir(&run.project_id, &run.run_id);
    let prepared =
        guild_engine::prepare_worktree(&repo_root, &worktree_dir, run.run_id.as_str())
            .map_err(runtime_error)?;

    ctx.log
        .append(
            &ws.events_jsonl(&run.project_id, &run.run_id),
            guild_core::EventEnvelope::new(
                run.run_id,
                "",
                run.agent_id.to_string(),
                guild_core::event_types::WORKTREE_PREPARED,
                json!({
                    "repo_id": repo_id,
                    "branch": prepared.branch,
                    "worktree_relpath": ws.rel_of(&prepared.worktree_dir).ok(),
                }),
            ),
        )
        .map_err(store_error)?;

    run.spec.worktree_relpath = ws.rel_of(&prepared.worktree_dir).ok();
    run.spec.worktree_branch = Some(prepared.branch.clone());
    records::write_run(ws, run).map_err(store_error)?;

    Ok(Some(prepared.worktree_dir))
}

pub fn session_poll(ctx: &ServerContext, p: SessionCollectParams) -> Result<serde_json::Value, RpcError> {
    let status = ctx.runtime.poll_session(&p.session_ref).map_err(runtime_error)?;
    ok(status)
}

pub async fn session_collect(
    ctx: &ServerContext,
    p: SessionCollectParams,
) -> Result<serde_json::Value, RpcError> {
    let outcome = ctx.runtime.collect_session(&p.session_ref).await.map_err(runtime_error)?;
    ok(outcome)
}

pub fn session_stop(ctx: &ServerContext, p: SessionStopParams) -> Result<serde_json::Value, RpcError> {
    ctx.runtime.stop_session(&p.session_ref).map_err(runtime_error)?;
    ok(json!({ "stopping": true }))
}
