// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Method handlers, grouped by domain.
//!
//! Every handler returns `Result<serde_json::Value, RpcError>`; the
//! router turns that into a response line. Error mapping lives here so
//! the taxonomy is applied uniformly: validation → -32602, everything
//! else → -32000 with a reason code where one exists.

pub mod governance;
pub mod heartbeat;
pub mod runs;
pub mod workspace;

use guild_core::reason;
use guild_governance::GovernanceError;
use guild_wire::{ErrorData, RpcError, APP_ERROR};

/// Parse typed params or answer -32602.
pub fn params<T: serde::de::DeserializeOwned>(value: &serde_json::Value) -> Result<T, RpcError> {
    serde_json::from_value(value.clone()).map_err(|e| RpcError::invalid_params(e.to_string()))
}

pub fn store_error(e: guild_store::StoreError) -> RpcError {
    match e {
        guild_store::StoreError::NotFound(m) => {
            RpcError::with_reason(APP_ERROR, m, reason::NOT_FOUND)
        }
        guild_store::StoreError::Conflict(m) => {
            RpcError::with_reason(APP_ERROR, m, reason::CONFLICT)
        }
        other => RpcError::new(APP_ERROR, other.to_string()),
    }
}

pub fn governance_error(e: GovernanceError) -> RpcError {
    match e {
        GovernanceError::SecretDetected { label, report } => RpcError {
            code: APP_ERROR,
            message: format!("secret detected in {label}"),
            data: Some(ErrorData {
                reason_code: Some(reason::SECRET_DETECTED.to_string()),
                total_matches: Some(report.total_matches),
                matches_by_kind: Some(report.matches_by_kind),
                issues: None,
            }),
        },
        GovernanceError::PolicyDenied(decision) => RpcError {
            code: APP_ERROR,
            message: decision.reason.clone().unwrap_or_else(|| "policy denied".to_string()),
            data: Some(ErrorData {
                reason_code: Some(reason::POLICY_DENIED.to_string()),
                issues: serde_json::to_value(&decision).ok(),
                ..Default::default()
            }),
        },
        GovernanceError::NotFound(m) => RpcError::with_reason(APP_ERROR, m, reason::NOT_FOUND),
        GovernanceError::Conflict(m) => RpcError::with_reason(APP_ERROR, m, reason::CONFLICT),
        GovernanceError::Invalid(m) => RpcError::invalid_params(m),
        GovernanceError::Store(e) => store_error(e),
    }
}

pub fn runtime_error(e: guild_engine::RuntimeError) -> RpcError {
    match e {
        guild_engine::RuntimeError::NotFound(m) => {
            RpcError::with_reason(APP_ERROR, format!("session not found: {m}"), reason::NOT_FOUND)
        }
        guild_engine::RuntimeError::Conflict(m) => {
            RpcError::with_reason(APP_ERROR, m, reason::CONFLICT)
        }
        guild_engine::RuntimeError::Guard(m) => {
            RpcError::with_reason(APP_ERROR, m, reason::SUBSCRIPTION_REQUIRED)
        }
        guild_engine::RuntimeError::Store(e) => store_error(e),
        other => RpcError::new(APP_ERROR, other.to_string()),
    }
}

pub fn index_error(e: guild_index::IndexError) -> RpcError {
    match e {
        guild_index::IndexError::Store(e) => store_error(e),
        other => RpcError::new(APP_ERROR, other.to_string()),
    }
}

pub fn heartbeat_error(e: guild_heartbeat::HeartbeatError) -> RpcError {
    match e {
        guild_heartbeat::HeartbeatError::Store(e) => store_error(e),
        guild_heartbeat::HeartbeatError::Governance(e) => governance_error(e),
        guild_heartbeat::HeartbeatError::Invalid(m) => RpcError::invalid_params(m),
    }
}

/// Serialize a handler result, which is infallible for our types.
pub fn ok<T: serde::Serialize>(value: T) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::new(APP_ERROR, e.to_string()))
}
