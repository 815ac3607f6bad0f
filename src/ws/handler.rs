//! Axum WebSocket upgrade handler.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::StreamExt;

use super::hub::Hub;
use super::transport::WebSocketTransport;
use crate::app_state::AppState;

/// `GET /ws` — Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| run_connection(socket, hub))
}

/// Registers the socket with the hub and watches for disconnect.
///
/// Outbound traffic is written by the connection's delivery task; this
/// loop only reads, and client messages carry no meaning.
async fn run_connection(socket: WebSocket, hub: Hub) {
    let (sink, mut stream) = socket.split();
    let conn_id = match hub.accept(WebSocketTransport::new(sink)).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting ws client");
            return;
        }
    };

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "ws read failed");
                break;
            }
        }
    }

    let _ = hub.unregister(conn_id).await;
    tracing::debug!(%conn_id, "ws client disconnected");
}
