// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! guildd: the Guild control-plane server.
//!
//! Serves line-delimited JSON-RPC on stdio by default, or on a Unix
//! socket with `--socket <path>`. Logs go to stderr (stdout is the
//! protocol channel) under `GUILD_LOG` filtering.

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env("GUILD_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // Keep the guard alive for the process lifetime when file logging is
    // on; stdout stays reserved for the protocol either way.
    let _appender_guard = match std::env::var("GUILD_LOG_DIR") {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "guildd.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    };

    let mut socket_path: Option<std::path::PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--socket" => socket_path = args.next().map(Into::into),
            "--version" => {
                println!("guildd {}", env!("CARGO_PKG_VERSION"));
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    let server = guild_daemon::start_server();

    match socket_path {
        Some(path) => {
            if let Err(e) = server.serve_unix(&path).await {
                tracing::error!(error = %e, "socket serve failed");
                std::process::exit(1);
            }
        }
        None => {
            server.serve_stream(tokio::io::stdin(), tokio::io::stdout()).await;
        }
    }

    server.close();
}
