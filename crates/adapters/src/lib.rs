// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! guild-adapters: the provider-CLI boundary.
//!
//! Each provider contributes a pure command builder and a capabilities
//! record; the execution guard decides whether a resolved binary may be
//! launched at all. Nothing here spawns a process — that is the session
//! runtime's job.

pub mod capabilities;
pub mod command;
pub mod guard;

pub use capabilities::{provider_capabilities, Capabilities, WorktreeSupport};
pub use command::{build_command, BuildCommandInput, BuiltCommand, CLAUDE_STREAM_JSON};
pub use guard::{
    check_execution_policy, resolve_provider_bin, CliLoginProbe, GuardOutcome, GuardReason,
    LoginProbe, SubscriptionProbe,
};
