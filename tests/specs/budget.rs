// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Budget enforcement: a run whose cost exceeds the project's hard
//! limit fails and the monitor row shows the breach.

use super::support::seeded_workspace;
use guild_core::test_support::sample_run;
use guild_core::{Budget, ProjectId, Provider, ProviderPricing, RunStatus};
use guild_engine::{LaunchSpec, SessionRuntime};
use guild_store::records;
use tempfile::tempdir;

#[tokio::test]
async fn hard_budget_breach_fails_run_and_shows_on_monitor() {
    let dir = tempdir().unwrap();
    let ws = seeded_workspace(dir.path());
    let pid = ProjectId::from_string("prj-1");

    // Project with a one-cent hard budget.
    let mut project = records::read_project(&ws, &pid).unwrap();
    project.budget = Some(Budget { soft_cost_usd: None, hard_cost_usd: Some(0.01) });
    records::write_yaml(&ws.project_yaml(&pid), &project).unwrap();

    // Pricing that makes one run blow past it.
    let mut machine = guild_core::MachineConfig::default();
    machine.provider_pricing_usd_per_1k_tokens.insert(
        Provider::Claude,
        ProviderPricing { input: 5.0, cached_input: None, output: 5.0, reasoning_output: None },
    );
    records::write_yaml(&ws.machine_yaml(), &machine).unwrap();

    records::create_run(&ws, &sample_run("run-1", "prj-1")).unwrap();
    let runtime = SessionRuntime::new(guild_store::EventLog::system());
    let spec = LaunchSpec {
        workspace_dir: ws.root().to_path_buf(),
        project_id: pid,
        run_id: guild_core::RunId::from_string("run-1"),
        argv: vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            r#"echo '{"usage":{"prompt_tokens":2000,"completion_tokens":2000}}'"#.to_string(),
        ],
        env: Default::default(),
        stdin_text: None,
        final_text_file_abs: None,
        parser: None,
        cwd: None,
        deadline: None,
        actor: "agt-fixture".to_string(),
    };

    let session_ref = runtime.launch_session(spec).await.unwrap();
    let outcome = runtime.collect_session(&session_ref).await.unwrap();
    assert_eq!(outcome.status, RunStatus::Failed);

    guild_index::sync_sqlite_index(&ws).unwrap();
    let rows = guild_daemon::snapshots::run_monitor_snapshot(&ws).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].run_status, "failed");
    assert!(rows[0].budget_exceeded_count > 0);
    assert!(rows[0].budget_decision_count > 0);
}
