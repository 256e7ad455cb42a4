//! JSON-lines stdio transport.
//!
//! One request object per input line, one response object per output
//! line. Payload bytes travel as base64 inside the JSON. A malformed
//! line produces a failure response rather than terminating the loop;
//! EOF or a shutdown signal drains and closes the pool.

use crate::dispatch::RequestDispatcher;
use crate::error::{EngineError, EngineResult};
use crate::types::{Request, Response};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::info;

pub struct StdioTransport {
    dispatcher: Arc<RequestDispatcher>,
}

impl StdioTransport {
    pub fn new(dispatcher: Arc<RequestDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Serve requests from stdin until EOF or a shutdown signal, then
    /// close the pool.
    pub async fn run(&self) -> EngineResult<()> {
        info!("Serving requests on stdio");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let response = self.respond(&line).await;
                        write_response(&mut stdout, &response).await?;
                    }
                    Ok(None) => {
                        info!("stdin closed");
                        break;
                    }
                    Err(e) => {
                        self.dispatcher.close().await;
                        return Err(EngineError::connection(format!("stdin read failed: {e}")));
                    }
                },
                _ = wait_for_signal() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!("Closing store connections");
        self.dispatcher.close().await;
        Ok(())
    }

    async fn respond(&self, line: &str) -> Response {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.dispatcher.handle(&request).await,
            Err(e) => Response::from_error(&EngineError::validation(format!(
                "malformed request: {e}"
            ))),
        }
    }
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &Response,
) -> EngineResult<()> {
    let mut encoded = serde_json::to_vec(response)
        .map_err(|e| EngineError::connection(format!("response encoding failed: {e}")))?;
    encoded.push(b'\n');
    stdout
        .write_all(&encoded)
        .await
        .map_err(|e| EngineError::connection(format!("stdout write failed: {e}")))?;
    stdout
        .flush()
        .await
        .map_err(|e| EngineError::connection(format!("stdout flush failed: {e}")))
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
