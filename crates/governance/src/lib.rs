// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! guild-governance: the write path of every governed mutation.
//!
//! Policy evaluation gates reads and approvals; the redaction gate sits
//! in front of every outgoing governed write; the memory-delta and
//! milestone flows turn proposals into reviewed changes; inbox
//! resolution dispatches pending artifacts to their flow.

pub mod error;
pub mod inbox;
pub mod memory;
pub mod milestone;
pub mod policy;
pub mod redact;

pub use error::GovernanceError;
pub use inbox::{resolve_inbox_item, ActionExecutor, InboxResolution};
pub use memory::{approve_memory_delta, propose_memory_delta, MemoryDeltaProposal};
pub use milestone::approve_milestone;
pub use policy::{enforce_policy, evaluate_policy};
pub use redact::{
    assert_no_sensitive_text, detect, redact_json_value, redact_sensitive_text, SecretMatch,
    SecretReport,
};
