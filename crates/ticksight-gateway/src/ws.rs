//! `WebSocket` handler carrying the request/response/push protocol.
//!
//! Clients connect to `GET /ws`. Before the upgrade the handler runs
//! the per-address admission check; a refused attempt gets HTTP 429
//! and no socket. After the upgrade each connection runs one task that
//! both drains the session's outbound queue and reads inbound frames,
//! so everything queued for a session reaches the wire in FIFO order.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatch::Dispatcher;

/// Upgrade an HTTP request to a `WebSocket` connection, subject to the
/// admission rate limit.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(dispatcher): State<Arc<Dispatcher>>,
) -> Response {
    if !dispatcher.sessions().try_admit(peer.ip()) {
        warn!(%peer, "connection refused by rate limit");
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }
    debug!(%peer, "gateway client connecting");
    ws.on_upgrade(move |socket| handle_socket(socket, peer, dispatcher))
        .into_response()
}

/// Run one connection's lifecycle: register the session, pump frames
/// both ways, deregister on exit.
async fn handle_socket(mut socket: WebSocket, peer: SocketAddr, dispatcher: Arc<Dispatcher>) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let session = dispatcher.sessions().register(peer, outbound_tx);

    loop {
        tokio::select! {
            // Drain the session's outbound queue onto the wire.
            queued = outbound_rx.recv() => {
                match queued {
                    Some(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            debug!(%peer, "gateway client disconnected (send failed)");
                            break;
                        }
                    }
                    // All senders dropped; nothing more will be queued.
                    None => break,
                }
            }
            // Read the next inbound frame.
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        dispatcher.handle_message(&session, text.as_str()).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%peer, "gateway client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%peer, "gateway client disconnected");
                        break;
                    }
                    Some(Err(error)) => {
                        debug!(%peer, %error, "websocket error");
                        break;
                    }
                    _ => {
                        // Binary and pong frames are ignored.
                    }
                }
            }
        }
    }

    dispatcher.sessions().remove(session.id());
}
