//! UDS JSON-RPC server: newline-delimited JSON-RPC 2.0.
//! A connection may carry any number of requests, one per line.

use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;

use paneshare_core::{ControlMode, SessionError, SessionId, SessionRecord, SplitOrientation};
use paneshare_manager::SessionManager;

/// Run the UDS JSON-RPC server until `shutdown` resolves.
pub async fn run_server(
    socket_path: &str,
    manager: Arc<SessionManager>,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    // Create socket directory with mode 0700
    let socket_dir = std::path::Path::new(socket_path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path"))?;

    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    // Check for stale socket
    if std::path::Path::new(socket_path).exists() {
        if tokio::net::UnixStream::connect(socket_path).await.is_err() {
            std::fs::remove_file(socket_path)?;
            tracing::info!("removed stale socket at {socket_path}");
        } else {
            anyhow::bail!("another paneshare server is already running at {socket_path}");
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!("UDS server listening on {socket_path}");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let manager = Arc::clone(&manager);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, manager).await {
                            tracing::debug!(error = %e, "connection finished with error");
                        }
                    });
                }
                Err(e) => tracing::error!(error = %e, "accept failed"),
            },
            () = &mut shutdown => break,
        }
    }

    if let Err(e) = std::fs::remove_file(socket_path) {
        tracing::warn!("failed to remove socket {socket_path}: {e}");
    }
    tracing::info!("UDS server stopped");
    Ok(())
}

async fn handle_connection(
    stream: tokio::net::UnixStream,
    manager: Arc<SessionManager>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&manager, &line).await;
        let mut resp = serde_json::to_string(&response)?;
        resp.push('\n');
        writer.write_all(resp.as_bytes()).await?;
    }
    Ok(())
}

/// Answer one request line.
pub(crate) async fn handle_line(manager: &SessionManager, line: &str) -> serde_json::Value {
    let request: serde_json::Value = match serde_json::from_str(line.trim()) {
        Ok(request) => request,
        Err(e) => return error_response(serde_json::Value::Null, &RpcError::Parse(e.to_string())),
    };
    let id = request["id"].clone();
    let Some(method) = request["method"].as_str() else {
        return error_response(id, &RpcError::InvalidRequest("missing method".into()));
    };
    let params = match request.get("params") {
        None | Some(serde_json::Value::Null) => serde_json::json!({}),
        Some(params) => params.clone(),
    };

    match dispatch(manager, method, params).await {
        Ok(result) => serde_json::json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": id,
        }),
        Err(e) => {
            if let RpcError::Session(ref err) = e {
                tracing::debug!(method, kind = err.kind(), "request failed: {err}");
            }
            error_response(id, &e)
        }
    }
}

// ─── Errors ───────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub(crate) enum RpcError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl RpcError {
    fn code(&self) -> i64 {
        match self {
            Self::Parse(_) => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Internal(_) => -32603,
            Self::Session(_) => -32000,
        }
    }
}

fn error_response(id: serde_json::Value, error: &RpcError) -> serde_json::Value {
    let mut body = serde_json::json!({
        "code": error.code(),
        "message": error.to_string(),
    });
    if let RpcError::Session(err) = error {
        body["data"] = serde_json::json!({ "kind": err.kind() });
    }
    serde_json::json!({
        "jsonrpc": "2.0",
        "error": body,
        "id": id,
    })
}

// ─── Params ───────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateParams {
    command: Option<String>,
    #[serde(alias = "persistent_session")]
    tmux_session: Option<String>,
    profile: Option<String>,
}

#[derive(Deserialize)]
struct NamedParams {
    #[serde(alias = "persistent_session")]
    tmux_session: String,
    command: Option<String>,
}

#[derive(Deserialize)]
struct SessionParams {
    session_id: String,
}

#[derive(Deserialize)]
struct SendParams {
    session_id: String,
    text: String,
}

#[derive(Deserialize)]
struct SubmitParams {
    session_id: String,
    text: String,
    #[serde(default = "default_verify")]
    verify: bool,
}

fn default_verify() -> bool {
    true
}

#[derive(Deserialize)]
struct ReadParams {
    session_id: String,
    #[serde(default)]
    offset: i64,
    length: Option<usize>,
}

#[derive(Deserialize)]
struct ModeParams {
    session_id: String,
    mode: String,
}

#[derive(Deserialize)]
struct SplitParams {
    session_id: String,
    command: Option<String>,
    position: Option<String>,
}

#[derive(Deserialize)]
struct AppendParams {
    session_id: String,
    lines: Vec<String>,
}

fn parse<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

fn session_id(raw: &str) -> Result<SessionId, RpcError> {
    Ok(raw.parse::<SessionId>()?)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Internal(e.to_string()))
}

/// Client-facing view of a record. The output buffer is read through
/// `read_session_output` instead.
fn record_json(rec: &SessionRecord) -> serde_json::Value {
    serde_json::json!({
        "session_id": rec.id,
        "persistent_session": rec.persistent_handle,
        "command": rec.command,
        "control_mode": rec.control_mode,
        "created_at": rec.created_at,
        "window_id": rec.window_id,
        "parent_id": rec.parent_id,
        "pane_position": rec.pane_position,
    })
}

// ─── Dispatch ─────────────────────────────────────────────────────

async fn dispatch(
    manager: &SessionManager,
    method: &str,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let result = match method {
        "create_session" => {
            let p: CreateParams = parse(params)?;
            let rec = manager
                .create_session(
                    p.command.as_deref(),
                    p.tmux_session.as_deref(),
                    p.profile.as_deref(),
                )
                .await?;
            record_json(&rec)
        }
        "create_shared_session" => {
            let p: NamedParams = parse(params)?;
            let rec = manager
                .create_shared_session(&p.tmux_session, p.command.as_deref())
                .await?;
            record_json(&rec)
        }
        "create_detached_session" => {
            let p: NamedParams = parse(params)?;
            let rec = manager
                .create_detached_session(&p.tmux_session, p.command.as_deref())
                .await?;
            record_json(&rec)
        }
        "send_to_session" => {
            let p: SendParams = parse(params)?;
            let outcome = manager.send_to_session(&session_id(&p.session_id)?, &p.text).await?;
            to_json(&outcome)?
        }
        "send_and_submit" => {
            let p: SubmitParams = parse(params)?;
            let outcome = manager
                .send_and_submit(&session_id(&p.session_id)?, &p.text, p.verify)
                .await?;
            to_json(&outcome)?
        }
        "read_session_output" => {
            let p: ReadParams = parse(params)?;
            let page = manager
                .read_session_output(&session_id(&p.session_id)?, p.offset, p.length)
                .await?;
            let mut value = to_json(&page)?;
            value["output"] = serde_json::Value::String(page.text());
            value
        }
        "append_output" => {
            let p: AppendParams = parse(params)?;
            let id = session_id(&p.session_id)?;
            let appended = p.lines.len();
            manager.append_output(&id, p.lines)?;
            serde_json::json!({ "session_id": id, "appended": appended })
        }
        "list_sessions" => {
            let sessions = manager.list_sessions();
            serde_json::json!({ "count": sessions.len(), "sessions": to_json(&sessions)? })
        }
        "terminate_session" => {
            let p: SessionParams = parse(params)?;
            let id = session_id(&p.session_id)?;
            manager.terminate_session(&id).await?;
            serde_json::json!({ "session_id": id, "terminated": true })
        }
        "close_pane" => {
            let p: SessionParams = parse(params)?;
            let id = session_id(&p.session_id)?;
            manager.close_pane(&id).await?;
            serde_json::json!({ "session_id": id, "closed": true })
        }
        "set_control_mode" => {
            let p: ModeParams = parse(params)?;
            let id = session_id(&p.session_id)?;
            let mode: ControlMode = p.mode.parse()?;
            manager.set_control_mode(&id, mode)?;
            serde_json::json!({ "session_id": id, "control_mode": mode })
        }
        "attach_user_to_session" => {
            let p: SessionParams = parse(params)?;
            let info = manager.prepare_attach(&session_id(&p.session_id)?)?;
            to_json(&info)?
        }
        "split_pane_horizontal" | "split_pane_vertical" => {
            let orientation = if method == "split_pane_vertical" {
                SplitOrientation::Vertical
            } else {
                SplitOrientation::Horizontal
            };
            let p: SplitParams = parse(params)?;
            let rec = manager
                .split_session(
                    &session_id(&p.session_id)?,
                    orientation,
                    p.command.as_deref(),
                    p.position.as_deref(),
                )
                .await?;
            record_json(&rec)
        }
        "focus_pane" => {
            let p: SessionParams = parse(params)?;
            let id = session_id(&p.session_id)?;
            manager.focus_session(&id).await?;
            serde_json::json!({ "session_id": id, "focused": true })
        }
        "get_session_state" => {
            let p: SessionParams = parse(params)?;
            let view = manager.session_state(&session_id(&p.session_id)?).await?;
            to_json(&view)?
        }
        other => return Err(RpcError::MethodNotFound(other.to_string())),
    };
    Ok(result)
}
