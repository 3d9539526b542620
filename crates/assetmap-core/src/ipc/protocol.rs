//! Wire format for the backend command surface.
//!
//! Every frame is a 4-byte big-endian length prefix followed by a UTF-8
//! JSON-RPC 2.0 payload.
//!
//! ```text
//! [u32 BE: len][UTF-8 JSON bytes of len]
//! ```
//!
//! The core only ever sends requests. It receives two kinds of frames: replies
//! matched to a request by numeric id, and notifications (a `method` with no
//! `id`) through which the backend pushes progress events.

use crate::config::IpcConfig;
use crate::{AssetMapError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Outbound JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl IpcRequest {
    pub fn call(method: impl Into<String>, params: Value, id: u64) -> Self {
        Self {
            jsonrpc: IpcConfig::JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: Some(id),
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Any frame the backend may send, before classification.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<IpcError>,
}

/// A decoded frame received from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Answer to a request. `id` is `None` when the backend could not read
    /// the request's id.
    Reply {
        id: Option<u64>,
        outcome: std::result::Result<Value, IpcError>,
    },
    Notification { method: String, params: Value },
}

/// Classify a frame payload as a reply or a notification.
pub fn decode_incoming(payload: &[u8]) -> Result<Incoming> {
    let envelope: Envelope = serde_json::from_slice(payload).map_err(|e| AssetMapError::Json {
        message: format!("Failed to parse IPC frame: {}", e),
        source: Some(e),
    })?;

    let id = envelope.id.filter(|id| !id.is_null());
    if let (Some(method), None) = (envelope.method, &id) {
        return Ok(Incoming::Notification {
            method,
            params: envelope.params.unwrap_or(Value::Null),
        });
    }

    let outcome = match envelope.error {
        Some(error) => Err(error),
        None => Ok(envelope.result.unwrap_or(Value::Null)),
    };
    Ok(Incoming::Reply {
        id: id.as_ref().and_then(Value::as_u64),
        outcome,
    })
}

pub(crate) fn check_frame_len(len: usize) -> Result<()> {
    if len > IpcConfig::MAX_MESSAGE_SIZE {
        return Err(AssetMapError::Validation {
            field: "ipc_frame".to_string(),
            message: format!(
                "frame of {} bytes exceeds the {} byte limit",
                len,
                IpcConfig::MAX_MESSAGE_SIZE
            ),
        });
    }
    Ok(())
}

/// Read one frame. `None` means the peer closed the connection between frames.
///
/// After an error the stream position is undefined and the connection must
/// not be read again.
pub async fn read_frame<R: AsyncReadExt + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    check_frame_len(len)?;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Write one frame and flush.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(writer: &mut W, payload: &[u8]) -> Result<()> {
    check_frame_len(payload.len())?;
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_serializes_version_and_numeric_id() {
        let req = IpcRequest::call("search_assets", json!({"page": 1}), 7);
        let wire = serde_json::to_value(&req).unwrap();
        assert_eq!(
            wire,
            json!({"jsonrpc": "2.0", "method": "search_assets", "params": {"page": 1}, "id": 7})
        );
    }

    #[test]
    fn test_decode_notification_without_id() {
        let frame = json!({
            "jsonrpc": "2.0",
            "method": "export-progress",
            "params": {"taskId": "export_1", "percent": 10.0, "status": "running"}
        });
        match decode_incoming(frame.to_string().as_bytes()).unwrap() {
            Incoming::Notification { method, params } => {
                assert_eq!(method, "export-progress");
                assert_eq!(params["taskId"], "export_1");
            }
            other => panic!("Expected notification, got: {:?}", other),
        }
    }

    #[test]
    fn test_null_id_with_method_is_notification() {
        let frame = json!({"jsonrpc": "2.0", "method": "ping", "id": null});
        assert!(matches!(
            decode_incoming(frame.to_string().as_bytes()).unwrap(),
            Incoming::Notification { ref method, params: Value::Null } if method == "ping"
        ));
    }

    #[test]
    fn test_decode_success_and_error_replies() {
        let ok = json!({"jsonrpc": "2.0", "id": 3, "result": "/tmp/out.xlsx"});
        assert_eq!(
            decode_incoming(ok.to_string().as_bytes()).unwrap(),
            Incoming::Reply {
                id: Some(3),
                outcome: Ok(json!("/tmp/out.xlsx")),
            }
        );

        let err = json!({
            "jsonrpc": "2.0",
            "id": 4,
            "error": {"code": -32603, "message": "quota exhausted"}
        });
        match decode_incoming(err.to_string().as_bytes()).unwrap() {
            Incoming::Reply { id, outcome: Err(error) } => {
                assert_eq!(id, Some(4));
                assert_eq!(error.code, -32603);
                assert_eq!(error.message, "quota exhausted");
            }
            other => panic!("Expected error reply, got: {:?}", other),
        }
    }

    #[test]
    fn test_reply_without_result_is_null() {
        let frame = json!({"jsonrpc": "2.0", "id": 9});
        assert_eq!(
            decode_incoming(frame.to_string().as_bytes()).unwrap(),
            Incoming::Reply {
                id: Some(9),
                outcome: Ok(Value::Null),
            }
        );
    }

    #[test]
    fn test_decode_garbage_is_json_error() {
        let err = decode_incoming(b"not json").unwrap_err();
        assert!(matches!(err, AssetMapError::Json { .. }));
    }

    #[tokio::test]
    async fn test_frame_has_big_endian_length_prefix() {
        let payload = b"{\"jsonrpc\":\"2.0\"}";
        let mut buf = Vec::new();
        write_frame(&mut buf, payload).await.unwrap();
        assert_eq!(&buf[..4], &(payload.len() as u32).to_be_bytes());
        assert_eq!(&buf[4..], payload);

        let mut cursor = std::io::Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).await.unwrap(), Some(payload.to_vec()));
        assert_eq!(read_frame(&mut cursor).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&((IpcConfig::MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes());
        buf.extend_from_slice(&[0u8; 8]);

        let mut cursor = std::io::Cursor::new(buf);
        let result = read_frame(&mut cursor).await;
        assert!(matches!(result, Err(AssetMapError::Validation { .. })));
    }
}
