//! Push channel that tells open app pages about new builds.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use arsim_build::BuildReport;

use crate::session::Session;

const CLIENT_SCRIPT: &str = include_str!("../assets/livereload.js");

/// Server to client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum LiveReloadEvent {
    #[serde(rename = "build.starting")]
    BuildStarting,
    #[serde(rename = "build.new")]
    BuildNew { data: BuildReport },
}

/// Client to server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "action")]
pub enum ClientMessage {
    #[serde(rename = "build.get")]
    BuildGet,
}

/// The `<script>` block appended to every served build.
pub fn client_script(port: u16, build_timestamp: i64) -> String {
    let body = CLIENT_SCRIPT
        .replace("__LIVE_RELOAD_PORT__", &port.to_string())
        .replace("__BUILD_TIMESTAMP__", &build_timestamp.to_string());
    format!("<script>\n{body}</script>\n")
}

pub fn router(session: Arc<Session>) -> Router {
    Router::new()
        .route("/", get(upgrade))
        .with_state(session)
}

async fn upgrade(ws: WebSocketUpgrade, State(session): State<Arc<Session>>) -> Response {
    ws.on_upgrade(move |socket| connection(socket, session))
}

async fn connection(socket: WebSocket, session: Arc<Session>) {
    let (mut sink, mut stream) = socket.split();
    let mut events = session.subscribe();
    debug!("live-reload client connected");

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "live-reload client lagged, sending latest build");
                        match latest(&session) {
                            Some(event) => event,
                            None => continue,
                        }
                    }
                    Err(RecvError::Closed) => break,
                };
                if send(&mut sink, &event).await.is_err() {
                    break;
                }
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::BuildGet) => {
                        if let Some(event) = latest(&session) {
                            if send(&mut sink, &event).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => debug!(error = %e, "ignoring unrecognized live-reload message"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "live-reload connection error");
                    break;
                }
            }
        }
    }
    debug!("live-reload client disconnected");
}

fn latest(session: &Session) -> Option<LiveReloadEvent> {
    session.current_build().map(|build| LiveReloadEvent::BuildNew {
        data: build.report.clone(),
    })
}

async fn send(sink: &mut SplitSink<WebSocket, Message>, event: &LiveReloadEvent) -> Result<(), ()> {
    let text = serde_json::to_string(event).map_err(|e| warn!(error = %e, "unencodable event"))?;
    sink.send(Message::Text(text)).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::build;
    use serde_json::json;

    #[test]
    fn events_use_action_tag() {
        let event = LiveReloadEvent::BuildNew {
            data: build(42, "<p></p>").report,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["action"], "build.new");
        assert_eq!(value["data"]["timestamp"], 42);
        assert_eq!(value["data"]["entry"]["name"], "index.html");

        let value = serde_json::to_value(LiveReloadEvent::BuildStarting).unwrap();
        assert_eq!(value, json!({"action": "build.starting"}));
    }

    #[test]
    fn client_request_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"action":"build.get"}"#).unwrap();
        assert_eq!(msg, ClientMessage::BuildGet);
        assert!(serde_json::from_str::<ClientMessage>(r#"{"action":"build.delete"}"#).is_err());
    }

    #[test]
    fn script_is_parameterized() {
        let script = client_script(4321, 99);
        assert!(script.starts_with("<script>"));
        assert!(script.contains("ws://localhost:4321"));
        assert!(script.contains("99"));
        assert!(!script.contains("__LIVE_RELOAD_PORT__"));
    }
}
