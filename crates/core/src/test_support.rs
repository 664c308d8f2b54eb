// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixture builders shared by other crates' tests.

use crate::actor::Visibility;
use crate::artifact::{ArtifactHeader, ArtifactKind};
use crate::id::{AgentId, ArtifactId, ProjectId, RunId, TaskId};
use crate::run::{Run, RunSpec, RunStatus};
use crate::task::{Milestone, MilestoneKind, MilestoneStatus, Schedule, Task, TaskStatus};

/// A minimal running run record.
pub fn sample_run(run_id: &str, project_id: &str) -> Run {
    Run {
        run_id: RunId::from_string(run_id),
        project_id: ProjectId::from_string(project_id),
        agent_id: AgentId::from_string("agt-fixture"),
        provider: crate::provider::Provider::Claude,
        model: None,
        created_at: "2026-01-05T10:00:00Z".to_string(),
        status: RunStatus::Running,
        spec: RunSpec::default(),
        usage: None,
    }
}

/// A ready task with one coding milestone.
pub fn sample_task(task_id: &str, project_id: &str) -> Task {
    Task {
        id: TaskId::from_string(task_id),
        project_id: ProjectId::from_string(project_id),
        title: "Fixture task".to_string(),
        status: TaskStatus::Ready,
        visibility: Visibility::Team,
        team_id: None,
        assignee_agent_id: None,
        milestones: vec![Milestone {
            id: "m1".to_string(),
            title: "Implement".to_string(),
            kind: MilestoneKind::Coding,
            status: MilestoneStatus::Pending,
            acceptance_criteria: vec!["compiles".to_string()],
            evidence: None,
        }],
        schedule: Schedule::default(),
        deliverables: vec!["code".to_string()],
        acceptance_criteria: vec!["reviewed".to_string()],
        execution_plan: None,
        budget: None,
    }
}

/// A minimal artifact header of the given kind.
pub fn sample_artifact(kind: ArtifactKind, artifact_id: &str, project_id: &str) -> ArtifactHeader {
    let mut header = ArtifactHeader::new(
        kind,
        ArtifactId::from_string(artifact_id),
        "Fixture artifact",
        ProjectId::from_string(project_id),
        AgentId::from_string("agt-fixture"),
        RunId::from_string("run-fixture"),
    );
    header.created_at = "2026-01-05T10:00:00Z".to_string();
    header
}
