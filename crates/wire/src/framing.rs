// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Newline framing over any async byte stream.

use crate::message::{Request, Response};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Read the next line and parse it as a Request.
///
/// Returns `ConnectionClosed` on EOF and `Parse` on malformed JSON — the
/// caller answers the latter with a `-32700` error line.
pub async fn read_message<R>(
    reader: &mut BufReader<R>,
) -> Result<Request, ProtocolError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }
        if line.trim().is_empty() {
            continue;
        }
        return serde_json::from_str(line.trim_end())
            .map_err(|e| ProtocolError::Parse(e.to_string()));
    }
}

/// Write one outbound message as a single newline-terminated line.
pub async fn write_message<W>(writer: &mut W, message: &Response) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(message)
        .map_err(|e| ProtocolError::Parse(e.to_string()))?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "framing_tests.rs"]
mod tests;
