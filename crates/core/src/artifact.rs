// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact frontmatter.
//!
//! Artifacts are governed markdown files under
//! `work/projects/<pid>/artifacts/`. The frontmatter block is strict YAML;
//! type-specific keys are optional fields here, and keys this build does
//! not know about round-trip through `extra`.

use crate::actor::{Sensitivity, Visibility};
use crate::id::{AgentId, ArtifactId, ProjectId, RunId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Discriminator for governed artifact flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Proposal,
    MemoryDelta,
    MilestoneReport,
    HeartbeatActionProposal,
    /// Forward-compatible: unknown types are carried, not rejected.
    #[serde(untagged)]
    Other(String),
}

impl ArtifactKind {
    pub fn as_str(&self) -> &str {
        match self {
            ArtifactKind::Proposal => "proposal",
            ArtifactKind::MemoryDelta => "memory_delta",
            ArtifactKind::MilestoneReport => "milestone_report",
            ArtifactKind::HeartbeatActionProposal => "heartbeat_action_proposal",
            ArtifactKind::Other(s) => s,
        }
    }
}

/// Which curated file a memory delta targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryScope {
    /// `work/projects/<pid>/memory.md`
    ProjectMemory,
    /// `org/agents/<ref>/AGENTS.md`
    AgentGuidance,
}

/// Frontmatter of an artifact markdown file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactHeader {
    pub schema_version: u32,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub id: ArtifactId,
    pub title: String,
    pub created_at: String,
    pub visibility: Visibility,
    pub produced_by: AgentId,
    pub run_id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_pack_id: Option<String>,
    pub project_id: ProjectId,

    // -- memory_delta --
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_kind: Option<MemoryScope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<Sensitivity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,

    // -- milestone_report --
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence_artifacts: Vec<ArtifactId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests_artifacts: Vec<ArtifactId>,

    // -- heartbeat_action_proposal --
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<serde_json::Value>,

    /// Unknown frontmatter keys, preserved on rewrite.
    #[serde(default, flatten, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ArtifactHeader {
    pub fn new(
        kind: ArtifactKind,
        id: ArtifactId,
        title: impl Into<String>,
        project_id: ProjectId,
        produced_by: AgentId,
        run_id: RunId,
    ) -> Self {
        Self {
            schema_version: 1,
            kind,
            id,
            title: title.into(),
            created_at: String::new(),
            visibility: Visibility::Team,
            produced_by,
            run_id,
            context_pack_id: None,
            project_id,
            target_file: None,
            patch_file: None,
            scope_kind: None,
            scope_ref: None,
            sensitivity: None,
            rationale: None,
            evidence: Vec::new(),
            task_id: None,
            milestone_id: None,
            evidence_artifacts: Vec::new(),
            tests_artifacts: Vec::new(),
            action: None,
            extra: BTreeMap::new(),
        }
    }

    /// Structural invariant shared by all artifact kinds: restricted
    /// content may not be org-visible.
    pub fn validate_visibility(&self) -> Result<(), String> {
        if self.sensitivity == Some(Sensitivity::Restricted) && self.visibility == Visibility::Org {
            return Err(format!(
                "artifact {}: sensitivity=restricted forbids visibility=org",
                self.id
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
