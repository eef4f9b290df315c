//! HTTP and WebSocket handlers
//!
//! Handlers only translate requests into client events; all canvas logic
//! happens in the controller.

use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::error::ApiError;
use super::WebState;
use crate::color::Color;

const DEFAULT_FILE_NAME: &str = "untitled.json";

const INDEX_PAGE: &str = r##"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>hatdraw</title></head>
<body>
<h1>hatdraw</h1>
<p>Shared pixel canvas. Connect a WebSocket to <code>/api/canvas/register</code>
to receive changes, and POST JSON to:</p>
<ul>
<li><code>/api/canvas/color</code> <code>{"color": "#rrggbb"}</code></li>
<li><code>/api/canvas/tool</code> <code>{"toolName": "pen"}</code> (pen, eraser, bucket)</li>
<li><code>/api/canvas/reset</code> <code>{"reset": true}</code></li>
<li><code>/api/canvas/undo</code> <code>{"undo": true}</code></li>
</ul>
<p><a href="/api/canvas/download">Download the canvas</a></p>
</body>
</html>
"##;

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SetColorRequest {
    pub color: Color,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetToolRequest {
    pub tool_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub reset: bool,
}

#[derive(Debug, Deserialize)]
pub struct UndoRequest {
    pub undo: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadQuery {
    pub file_name: Option<String>,
}

/// Every body problem is a 400, including well-formed JSON with bad values
fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
pub async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// POST /api/canvas/color
pub async fn set_color(
    State(state): State<WebState>,
    body: Result<Json<SetColorRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let request = parse_body(body)?;
    tracing::debug!("Got set color request, color = {}", request.color);

    state.client.set_color(request.color).await?;
    Ok(StatusCode::OK)
}

/// POST /api/canvas/tool
pub async fn set_tool(
    State(state): State<WebState>,
    body: Result<Json<SetToolRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let request = parse_body(body)?;
    tracing::debug!("Got set tool request, tool = {}", request.tool_name);

    // Unknown names are the controller's call; it logs and ignores them
    state.client.set_tool(request.tool_name).await?;
    Ok(StatusCode::OK)
}

/// POST /api/canvas/reset
pub async fn reset(
    State(state): State<WebState>,
    body: Result<Json<ResetRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let request = parse_body(body)?;
    if request.reset {
        tracing::debug!("Got reset request");
    }

    state.client.reset(request.reset).await?;
    Ok(StatusCode::OK)
}

/// POST /api/canvas/undo
pub async fn undo(
    State(state): State<WebState>,
    body: Result<Json<UndoRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let request = parse_body(body)?;
    if request.undo {
        tracing::debug!("Got undo request");
    }

    state.client.undo(request.undo).await?;
    Ok(StatusCode::OK)
}

/// GET /api/canvas/download?fileName=..
pub async fn download(
    State(state): State<WebState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let file_name = query
        .file_name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string());
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        file_name.replace('"', "_")
    ))
    .map_err(|_| ApiError::BadRequest(format!("Invalid file name: {:?}", file_name)))?;

    let canvas = state.client.download().await?;
    let body = serde_json::to_vec(&canvas)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize canvas: {}", e)))?;

    tracing::info!(
        "Downloading {} ({}x{})",
        file_name,
        canvas.width(),
        canvas.height()
    );

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/json")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// GET /api/canvas/register (WebSocket upgrade)
pub async fn register(State(state): State<WebState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, state))
}

/// Forward notifier payloads to one WebSocket until either side goes away
async fn client_session(socket: WebSocket, state: WebState) {
    let (tx, mut rx) = mpsc::channel(state.subscriber_buffer);
    let id = match state.client.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Client registration failed: {}", e);
            return;
        }
    };
    tracing::debug!("{} client(s) connected", state.notifier.len());

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            payload = rx.recv() => {
                // None: the notifier dropped us (slow client) or is closing
                let Some(payload) = payload else { break };
                let text = String::from_utf8_lossy(&payload).into_owned();
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::debug!("Client {} write failed: {}", id, e);
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!("Client {} read failed: {}", id, e);
                    break;
                }
                // Clients only listen on this socket
                Some(Ok(_)) => {}
            },
        }
    }

    state.notifier.unsubscribe(id);
    let _ = sink.close().await;
}
