//! Unix socket front end.
//!
//! Reads newline-delimited JSON requests, dispatches experiments on the
//! blocking pool, and writes back one JSON response per line.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::catalog::ExperimentModels;
use crate::dispatcher::Dispatcher;
use crate::protocol::{ExecContext, ExperimentDescription, Intent, Request, Response};

/// Shared, read-only state behind every connection.
pub struct ServerState {
    pub dispatcher: Dispatcher,
    pub catalog: ExperimentModels,
}

/// Serve one connection until the peer closes it.
pub async fn handle_connection<R, W>(
    reader: R,
    mut writer: W,
    state: Arc<ServerState>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(req) => handle_request(req, state.clone()).await,
            Err(e) => Response::error(format!("invalid request: {e}")),
        };

        let mut out = serde_json::to_string(&response).unwrap_or_default();
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
    }

    Ok(())
}

/// Answer a single request.
pub async fn handle_request(request: Request, state: Arc<ServerState>) -> Response {
    match request {
        Request::Health => Response::success("ok".to_string()),
        Request::Catalog => match serde_json::to_value(&state.catalog) {
            Ok(data) => Response::success_with_data("ok".to_string(), data),
            Err(e) => Response::error(format!("serialize catalog failed: {e}")),
        },
        Request::Dispatch {
            request_id,
            uid,
            action,
            flags,
            destroy,
            timeout_ms,
        } => {
            let experiment = ExperimentDescription { action, flags };
            let mut ctx = ExecContext::new(uid, Intent::from_destroy(destroy));
            if let Some(ms) = timeout_ms {
                ctx = ctx.with_deadline(Duration::from_millis(ms));
            }
            tracing::info!(
                request_id = %request_id,
                uid = %ctx.uid,
                action = %experiment.action,
                intent = ?ctx.intent,
                "dispatching experiment"
            );

            let outcome = tokio::task::spawn_blocking(move || {
                state.dispatcher.dispatch(&experiment, &ctx)
            })
            .await;

            match outcome {
                Ok(Ok(agent_response)) => match serde_json::to_value(&agent_response) {
                    Ok(data) => Response::success_with_data("ok".to_string(), data),
                    Err(e) => Response::error(format!("serialize agent response failed: {e}")),
                },
                Ok(Err(err)) => Response::dispatch_error(&err),
                Err(e) => Response::error(format!("dispatch task failed: {e}")),
            }
        }
    }
}
