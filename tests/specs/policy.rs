// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-team read denial leaves its trace on the reader's run.

use super::support::{event_types, seeded_workspace};
use guild_core::test_support::sample_artifact;
use guild_core::{
    ActorRole, ArtifactKind, PolicyAction, PolicyRequest, PolicyResource, ProjectId, RunId,
    TeamId, Visibility,
};
use guild_store::records;
use tempfile::tempdir;

#[tokio::test]
async fn cross_team_artifact_read_is_denied_with_events() {
    let dir = tempdir().unwrap();
    let ws = seeded_workspace(dir.path());
    let pid = ProjectId::from_string("prj-1");
    let log = guild_store::EventLog::system();

    // Producer in team A writes a team-scoped artifact.
    let mut artifact = sample_artifact(ArtifactKind::Proposal, "art-1", "prj-1");
    artifact.visibility = Visibility::Team;
    records::write_artifact(&ws, &artifact, "team-only findings\n").unwrap();

    // Reader in team B, with a run in scope.
    let request = PolicyRequest {
        actor_id: "agt-reader".to_string(),
        actor_role: ActorRole::Worker,
        actor_team_id: Some(TeamId::from_string("team-b")),
        action: PolicyAction::Read,
        resource: PolicyResource {
            resource_id: "art-1".to_string(),
            visibility: artifact.visibility,
            kind: "proposal".to_string(),
            team_id: Some(TeamId::from_string("team-a")),
            sensitivity: None,
            produced_by: Some(artifact.produced_by.to_string()),
        },
        run_id: Some(RunId::from_string("run-reader")),
    };

    let decision = guild_governance::enforce_policy(&ws, &log, &pid, &request).unwrap();
    assert!(!decision.allowed);

    let types = event_types(&ws, "prj-1", "run-reader");
    assert_eq!(types, vec!["policy.denied".to_string(), "policy.decision".to_string()]);

    // The decision event records allowed=false.
    let report = guild_store::replay_run(
        &ws.events_jsonl(&pid, &RunId::from_string("run-reader")),
        guild_store::ReplayMode::Raw,
    )
    .unwrap();
    assert_eq!(report.events[1]["payload"]["allowed"], false);

    // And nothing about the artifact changed.
    let (unchanged, _) = records::read_artifact(&ws, &pid, &artifact.id).unwrap();
    assert_eq!(unchanged, artifact);
}
