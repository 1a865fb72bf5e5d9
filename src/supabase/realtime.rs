// SPDX-License-Identifier: MPL-2.0

//! Live change feed over the backend's Phoenix-style websocket channel.
//!
//! The channel is joined with a `postgres_changes` configuration filtered to
//! inserts on one table; every delivered row is forwarded into an mpsc
//! channel. Delivery is best-effort: there is no reconnect and no replay, and
//! an insert landing between the caller's history fetch and the join may be
//! missed or duplicated.

use crate::config::BackendConfig;
use crate::supabase::types::Message as ChatMessage;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("invalid backend url: {0}")]
    Url(String),
    #[error("websocket connect failed: {0}")]
    Connect(String),
    #[error("channel join failed: {0}")]
    Join(String),
}

/// Frame sent to the realtime server.
#[derive(Serialize)]
struct Outbound<'a> {
    topic: &'a str,
    event: &'a str,
    payload: serde_json::Value,
    #[serde(rename = "ref")]
    reference: String,
}

/// Frame received from the realtime server. Fields we never read are left
/// out; serde ignores them.
#[derive(Deserialize)]
struct Inbound {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Live handle for one channel subscription.
///
/// Dropping the handle releases the feed: the task sends `phx_leave` and
/// closes the socket on its way out, so every exit path tears the
/// subscription down.
pub struct Subscription {
    shutdown: oneshot::Sender<()>,
}

impl Subscription {
    /// Explicitly release the feed. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {
        let _ = self.shutdown.send(());
    }
}

/// Join the change feed for insert events on `table`, forwarding every
/// delivered row into `tx`.
pub async fn subscribe_inserts(
    config: &BackendConfig,
    table: &str,
    tx: mpsc::UnboundedSender<ChatMessage>,
) -> Result<Subscription, RealtimeError> {
    let url = websocket_url(config)?;

    let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| RealtimeError::Connect(e.to_string()))?;

    let topic = format!("realtime:{table}-changes");
    let join = Outbound {
        topic: &topic,
        event: "phx_join",
        payload: serde_json::json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "INSERT", "schema": "public", "table": table }
                ]
            }
        }),
        reference: "1".to_string(),
    };
    let frame = serde_json::to_string(&join).map_err(|e| RealtimeError::Join(e.to_string()))?;
    ws.send(WsMessage::Text(frame))
        .await
        .map_err(|e| RealtimeError::Join(e.to_string()))?;

    let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await; // first tick is immediate
        let mut next_ref: u64 = 2;

        loop {
            tokio::select! {
                // Resolves on explicit unsubscribe and when the handle is
                // dropped; either way we leave cleanly.
                _ = &mut shutdown_rx => break,

                _ = heartbeat.tick() => {
                    let beat = Outbound {
                        topic: "phoenix",
                        event: "heartbeat",
                        payload: serde_json::json!({}),
                        reference: next_ref.to_string(),
                    };
                    next_ref += 1;
                    let Ok(frame) = serde_json::to_string(&beat) else { break };
                    if ws.send(WsMessage::Text(frame)).await.is_err() {
                        tracing::warn!("realtime feed: heartbeat send failed");
                        break;
                    }
                }

                incoming = ws.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            let Ok(frame) = serde_json::from_str::<Inbound>(&text) else {
                                tracing::debug!("realtime feed: unreadable frame: {text}");
                                continue;
                            };
                            match frame.event.as_str() {
                                "postgres_changes" => {
                                    let Some(row) = decode_insert(&frame.payload) else {
                                        tracing::debug!("realtime feed: undecodable change payload");
                                        continue;
                                    };
                                    if tx.send(row).is_err() {
                                        // Receiver is gone; nobody is listening.
                                        break;
                                    }
                                }
                                "phx_reply" | "system" | "presence_state" => {
                                    tracing::debug!("realtime feed: {} frame", frame.event);
                                }
                                other => {
                                    tracing::debug!("realtime feed: ignoring {other} frame");
                                }
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            tracing::warn!("realtime feed closed by server");
                            break;
                        }
                        Some(Ok(_)) => {} // binary/ping/pong
                        Some(Err(e)) => {
                            tracing::warn!("realtime feed error: {e}");
                            break;
                        }
                    }
                }
            }
        }

        let leave = Outbound {
            topic: &topic,
            event: "phx_leave",
            payload: serde_json::json!({}),
            reference: next_ref.to_string(),
        };
        if let Ok(frame) = serde_json::to_string(&leave) {
            let _ = ws.send(WsMessage::Text(frame)).await;
        }
        let _ = ws.close(None).await;
    });

    Ok(Subscription { shutdown })
}

fn websocket_url(config: &BackendConfig) -> Result<Url, RealtimeError> {
    let mut url = Url::parse(&config.url).map_err(|e| RealtimeError::Url(e.to_string()))?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(RealtimeError::Url(format!("unsupported scheme {other}"))),
    };
    url.set_scheme(scheme)
        .map_err(|_| RealtimeError::Url("unsupported scheme".into()))?;

    url.set_path("/realtime/v1/websocket");
    url.query_pairs_mut()
        .append_pair("apikey", &config.anon_key)
        .append_pair("vsn", "1.0.0");

    Ok(url)
}

/// Pull the inserted row out of a `postgres_changes` payload. Server
/// versions differ in field names: newer ones send `type`/`record`, older
/// ones `eventType`/`new`.
fn decode_insert(payload: &serde_json::Value) -> Option<ChatMessage> {
    let data = payload.get("data")?;

    let kind = data
        .get("type")
        .or_else(|| data.get("eventType"))
        .and_then(|v| v.as_str())?;
    if kind != "INSERT" {
        return None;
    }

    let record = data.get("record").or_else(|| data.get("new"))?;
    serde_json::from_value(record.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_record() -> serde_json::Value {
        serde_json::json!({
            "id": 42,
            "nickname": "Aria",
            "avatar": "🦊",
            "contents": "anyone here?",
            "created_at": "2024-05-01T12:00:00+00:00"
        })
    }

    #[test]
    fn decodes_current_server_payload() {
        let payload = serde_json::json!({
            "ids": [42],
            "data": {
                "schema": "public",
                "table": "chatlog",
                "commit_timestamp": "2024-05-01T12:00:00Z",
                "type": "INSERT",
                "record": sample_record(),
                "old_record": null
            }
        });
        let row = decode_insert(&payload).unwrap();
        assert_eq!(row.id, 42);
        assert_eq!(row.contents, "anyone here?");
    }

    #[test]
    fn decodes_legacy_server_payload() {
        let payload = serde_json::json!({
            "data": {
                "eventType": "INSERT",
                "new": sample_record(),
                "old": {}
            }
        });
        assert!(decode_insert(&payload).is_some());
    }

    #[test]
    fn ignores_non_insert_events() {
        let payload = serde_json::json!({
            "data": {
                "type": "UPDATE",
                "record": sample_record()
            }
        });
        assert!(decode_insert(&payload).is_none());
    }

    #[test]
    fn websocket_url_swaps_scheme_and_keeps_key() {
        let url = websocket_url(&BackendConfig {
            url: "https://example.supabase.co".into(),
            anon_key: "anon-key".into(),
        })
        .unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/realtime/v1/websocket");
        assert!(url.query().unwrap().contains("apikey=anon-key"));
    }
}
