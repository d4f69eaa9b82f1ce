//! WebSocket upgrade + message loop. Each connection owns one session for its
//! lifetime. Every client frame is parsed as a `ClientAction` and answered
//! with the resulting snapshot. Generation actions answer twice: a loading
//! snapshot right away and the resolved one when the call finishes.
//!
//! Calls run on their own tasks and the reader keeps going meanwhile, so a
//! `navigate` or `logout` sent during loading is applied first and the late
//! reply is discarded by the controller. All outgoing frames go through one
//! writer task.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use crate::logic::{apply, finish, Step};
use crate::protocol::{ClientAction, ServerWsMessage};
use crate::state::{AppState, SessionScope};

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "careersim_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

fn encode(msg: &ServerWsMessage) -> Message {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  Message::Text(out)
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
  let (mut sink, mut stream) = socket.split();

  let (session_id, session) = match state.create_session(SessionScope::Connection).await {
    Ok(created) => created,
    Err(e) => {
      warn!(target: "careersim_backend", error = %e, "WebSocket refused");
      let _ = sink.send(encode(&ServerWsMessage::Error { message: e.to_string() })).await;
      let _ = sink.close().await;
      return;
    }
  };
  info!(target: "careersim_backend", %session_id, "WebSocket connected");

  let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
  let writer = tokio::spawn(async move {
    while let Some(msg) = rx.recv().await {
      if let Err(e) = sink.send(msg).await {
        error!(target: "careersim_backend", error = %e, "WS send error");
        break;
      }
    }
  });
  let reply = |msg: &ServerWsMessage| tx.send(encode(msg)).is_ok();

  let hello = ServerWsMessage::Session { session: session.lock().await.snapshot() };
  let mut open = reply(&hello);

  while open {
    let Some(Ok(msg)) = stream.next().await else { break };
    match msg {
      Message::Text(txt) => {
        let action = match serde_json::from_str::<ClientAction>(&txt) {
          Ok(action) => action,
          Err(e) => {
            open = reply(&ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) });
            continue;
          }
        };
        debug!(target: "careersim_backend", %session_id, "WS received: {:?}", &action);

        if matches!(action, ClientAction::Ping) {
          open = reply(&ServerWsMessage::Pong);
          continue;
        }

        open = match apply(&session, action).await {
          Step::Done(snapshot) => reply(&ServerWsMessage::Session { session: snapshot }),
          Step::Pending(call, interim) => {
            let sent = reply(&ServerWsMessage::Session { session: interim });
            let (state, session, tx) = (state.clone(), session.clone(), tx.clone());
            tokio::spawn(async move {
              let snapshot = finish(&state, &session, call).await;
              let _ = tx.send(encode(&ServerWsMessage::Session { session: snapshot }));
            });
            sent
          }
        };
      }
      Message::Ping(payload) => open = tx.send(Message::Pong(payload)).is_ok(),
      Message::Close(_) => break,
      _ => {}
    }
  }

  state.remove_session(&session_id).await;
  writer.abort();
  info!(target: "careersim_backend", %session_id, "WebSocket disconnected");
}
