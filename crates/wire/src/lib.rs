// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-delimited JSON-RPC 2.0 protocol for control-plane clients.
//!
//! Wire format: one UTF-8 JSON object per newline-terminated line. Each
//! inbound line is a Request or Notification; each outbound line is a
//! Response, Error, or Notification.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod framing;
mod message;
mod params;

pub use framing::{read_message, write_message, ProtocolError};
pub use message::{ErrorData, Request, Response, RpcError, JSONRPC_VERSION};
pub use message::{APP_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
pub use params::{
    ApplyAllocationsParams, ApprovalActor, ArtifactReadParams, EventsAckParams,
    EventsSubscribeParams, EventsUnsubscribeParams, EventsVerifyParams, HeartbeatReportParams,
    HeartbeatTickParams, InboxResolveParams, MemoryApproveParams, MemoryProposeParams,
    MilestoneApproveParams, ProjectCreateParams, RunCreateParams, SessionCollectParams,
    SessionLaunchParams, SessionStopParams, SubscribeResult, TaskAllocation, WorkspaceParams,
};
