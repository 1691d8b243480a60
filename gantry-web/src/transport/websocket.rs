//! WebSocket adapter: `GET /ws`
//!
//! Every text frame goes through [`SocketChannel::handle_frame`]. Replies
//! from concurrent calls funnel into one mpsc queue drained by a single
//! writer task, so frames on the socket never interleave.

use super::cookie_header;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use gantry_services::SocketChannel;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Upgrade handler; the handshake's cookie seeds the channel's session
pub async fn socket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let cookie = cookie_header(&headers);
    ws.on_upgrade(move |socket| handle_socket(socket, state, cookie))
}

async fn handle_socket(socket: WebSocket, state: AppState, cookie: Option<String>) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut queue) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(text) = queue.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                debug!("Socket closed while writing");
                break;
            }
        }
    });

    let mut channel = SocketChannel::new(cookie, outbound);
    let events = state.dispatcher().register_socket_events(&mut channel);
    info!(events, "WebSocket connection established");

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => channel.handle_frame(state.dispatcher(), text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        }
    }

    // In-flight calls still hold queue senders; the writer drains them and stops.
    drop(channel);
    if writer.await.is_err() {
        warn!("WebSocket writer task failed");
    }
    info!("WebSocket connection closed");
}
