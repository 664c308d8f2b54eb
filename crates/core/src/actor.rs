// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Actor roles, visibility scopes, and sensitivity levels.
//!
//! These three enums are the vocabulary of every policy decision: who is
//! asking (`ActorRole`), who may see the resource (`Visibility`), and how
//! carefully its content must be handled (`Sensitivity`).

use serde::{Deserialize, Serialize};

/// Role of the actor performing an operation, from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Worker,
    Manager,
    Director,
    Ceo,
    /// A human operator; always at least director-equivalent.
    Human,
}

impl ActorRole {
    /// Numeric rank for ≥ comparisons in policy rules.
    pub fn rank(self) -> u8 {
        match self {
            ActorRole::Worker => 0,
            ActorRole::Manager => 1,
            ActorRole::Director => 2,
            ActorRole::Ceo => 3,
            ActorRole::Human => 4,
        }
    }

    /// Managers and above can see `managers`-scoped resources.
    pub fn is_managerial(self) -> bool {
        self.rank() >= ActorRole::Manager.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::Worker => "worker",
            ActorRole::Manager => "manager",
            ActorRole::Director => "director",
            ActorRole::Ceo => "ceo",
            ActorRole::Human => "human",
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who may read a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Only the producing agent (and humans).
    PrivateAgent,
    /// The resource's team, plus managers and above.
    Team,
    /// Managers, directors, the CEO, and humans.
    Managers,
    /// Everyone in the org.
    Org,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::PrivateAgent => "private_agent",
            Visibility::Team => "team",
            Visibility::Managers => "managers",
            Visibility::Org => "org",
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content sensitivity of an artifact.
///
/// `Restricted` forbids `org` visibility and gates reads behind
/// director-or-above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Public,
    #[default]
    Internal,
    Restricted,
}

impl Sensitivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Sensitivity::Public => "public",
            Sensitivity::Internal => "internal",
            Sensitivity::Restricted => "restricted",
        }
    }
}

#[cfg(test)]
#[path = "actor_tests.rs"]
mod tests;
