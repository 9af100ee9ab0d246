use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::app_state::AppState;
use crate::commands::account_history::ActionContext;
use crate::commands::json_response::JsonResponse;
use crate::commands::request::ActionRequest;
use crate::data::fs::atomic_write::write_atomic;
use crate::data::storage_paths::StoragePaths;
use crate::error::{ErrorCodeString, Result};
use crate::types::UserData;

const MAX_FRAME_LEN: usize = 1024 * 1024; // 1MB
const BRIDGE_INFO_VERSION: u8 = 1;

/// Published next to the config so local clients can find the bridge.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BridgeInfo {
    pub schema_version: u8,
    pub port: u16,
    pub token: String,
    pub created_at_ms: u128,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub id: String,
    pub token: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BridgeError {
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BridgeResponse {
    pub id: String,
    pub ok: bool,
    pub result: Option<Value>,
    pub error: Option<BridgeError>,
}

#[derive(Debug, Deserialize)]
struct SessionOpenPayload {
    user: UserData,
}

#[derive(Debug, Deserialize)]
struct SessionClosePayload {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ActionPayload {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(default)]
    id: Option<i64>,
    #[serde(default)]
    params: ActionRequest,
}

/// Handle returned once the bridge is listening.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    pub port: u16,
    pub token: String,
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

fn publish_bridge_info(sp: &StoragePaths, info: &BridgeInfo) -> Result<()> {
    let serialized = serde_json::to_vec_pretty(info)
        .map_err(|_| ErrorCodeString::new("IPC_INFO_WRITE_FAILED"))?;
    write_atomic(&sp.bridge_info_path(), &serialized).map_err(|err| {
        log::error!("[IPC] bridge info write failed: {err}");
        ErrorCodeString::new("IPC_INFO_WRITE_FAILED")
    })
}

/// Reads what a running bridge published; `None` when absent or from an
/// unknown schema.
pub fn read_bridge_info(sp: &StoragePaths) -> Option<BridgeInfo> {
    let content = std::fs::read(sp.bridge_info_path()).ok()?;
    let info: BridgeInfo = serde_json::from_slice(&content).ok()?;
    (info.schema_version == BRIDGE_INFO_VERSION).then_some(info)
}

pub fn read_frame<R: Read>(mut r: R) -> Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    match r.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(_) => return Err(ErrorCodeString::new("IPC_STREAM_READ_FAILED")),
    }

    let len = u32::from_ne_bytes(len_bytes) as usize;
    if len == 0 || len > MAX_FRAME_LEN {
        return Err(ErrorCodeString::new("IPC_FRAME_INVALID"));
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)
        .map_err(|_| ErrorCodeString::new("IPC_STREAM_READ_FAILED"))?;
    Ok(Some(buf))
}

pub fn write_frame<W: Write>(mut w: W, bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() || bytes.len() > MAX_FRAME_LEN {
        return Err(ErrorCodeString::new("IPC_FRAME_INVALID"));
    }
    let len = bytes.len() as u32;
    w.write_all(&len.to_ne_bytes())
        .map_err(|_| ErrorCodeString::new("IPC_STREAM_WRITE_FAILED"))?;
    w.write_all(bytes)
        .map_err(|_| ErrorCodeString::new("IPC_STREAM_WRITE_FAILED"))?;
    w.flush().ok();
    Ok(())
}

fn error_response(id: String, code: &str) -> BridgeResponse {
    BridgeResponse {
        id,
        ok: false,
        result: None,
        error: Some(BridgeError {
            code: code.to_string(),
        }),
    }
}

fn ok_response(id: String, value: Value) -> BridgeResponse {
    BridgeResponse {
        id,
        ok: true,
        result: Some(value),
        error: None,
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|_| ErrorCodeString::new("IPC_SERIALIZE_FAILED"))
}

fn parse_payload<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|_| ErrorCodeString::new("IPC_BAD_PAYLOAD"))
}

fn run_action(
    state: &AppState,
    payload: Value,
    action: impl FnOnce(&ActionContext, Option<i64>) -> JsonResponse,
) -> Result<Value> {
    let payload: ActionPayload = parse_payload(payload)?;
    let ctx = ActionContext {
        session: state.sessions.begin_request(&payload.session_id)?,
        request: payload.params,
    };
    to_json(&action(&ctx, payload.id))
}

pub fn handle_request(state: &AppState, shared_token: &str, req: BridgeRequest) -> BridgeResponse {
    if req.token != shared_token {
        return error_response(req.id, "UNAUTHORIZED");
    }

    let manager = &state.account_history;
    let result: Result<Value> = match req.kind.as_str() {
        "ping" => Ok(serde_json::json!({"ok": true})),
        "session_open" => parse_payload::<SessionOpenPayload>(req.payload)
            .and_then(|p| state.sessions.open(p.user))
            .and_then(|opened| to_json(&opened)),
        "session_close" => parse_payload::<SessionClosePayload>(req.payload)
            .and_then(|p| state.sessions.close(&p.session_id))
            .map(|closed| serde_json::json!({ "closed": closed })),
        "account_history_search" => {
            run_action(state, req.payload, |ctx, _| manager.search(ctx))
        }
        "account_history_delete" => {
            run_action(state, req.payload, |ctx, id| manager.delete(ctx, id))
        }
        "account_history_restore" => {
            run_action(state, req.payload, |ctx, id| manager.restore(ctx, id))
        }
        _ => Err(ErrorCodeString::new("IPC_UNKNOWN_REQUEST")),
    };

    match result {
        Ok(val) => ok_response(req.id, val),
        Err(err) => error_response(req.id, &err.code),
    }
}

fn handle_client(stream: TcpStream, state: Arc<AppState>, token: String) {
    loop {
        let frame = match read_frame(&stream) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => break,
            Err(err) => {
                log::warn!("[IPC] dropping client: {}", err.code);
                break;
            }
        };
        let req: BridgeRequest = match serde_json::from_slice(&frame) {
            Ok(v) => v,
            Err(_) => {
                log::warn!("[IPC] undecodable request frame, closing connection");
                break;
            }
        };

        let resp = handle_request(&state, &token, req);
        match serde_json::to_vec(&resp) {
            Ok(bytes) => {
                if write_frame(&stream, &bytes).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    }
}

pub fn start_native_bridge(state: Arc<AppState>) -> Result<BridgeHandle> {
    let listener =
        TcpListener::bind(("127.0.0.1", 0)).map_err(|_| ErrorCodeString::new("IPC_BIND_FAILED"))?;
    let port = listener
        .local_addr()
        .map_err(|_| ErrorCodeString::new("IPC_BIND_FAILED"))?
        .port();

    let token = Uuid::new_v4().to_string();

    publish_bridge_info(
        &state.storage_paths,
        &BridgeInfo {
            schema_version: BRIDGE_INFO_VERSION,
            port,
            token: token.clone(),
            created_at_ms: now_ms(),
        },
    )?;
    log::info!(
        "[IPC] bridge info published: {}",
        state.storage_paths.bridge_info_path().display()
    );

    let handle = BridgeHandle {
        port,
        token: token.clone(),
    };

    thread::spawn(move || {
        for incoming in listener.incoming() {
            match incoming {
                Ok(stream) => {
                    let st = state.clone();
                    let t = token.clone();
                    thread::spawn(move || handle_client(stream, st, t));
                }
                Err(err) => {
                    log::error!("[IPC] accept failed: {err}");
                    break;
                }
            }
        }
    });

    Ok(handle)
}
