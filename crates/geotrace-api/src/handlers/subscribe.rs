//! Live subscriber endpoint.
//!
//! Each WebSocket connection registers with the hub and receives one text
//! frame per enriched event. Nothing is expected from the client; any
//! inbound frame is ignored, and Close or a read error ends the session.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::sink::SinkExt;
use futures::stream::StreamExt;

use geotrace_services::{BroadcastHub, Subscription};

use super::ApiState;

pub async fn handle_subscribe(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(move |socket| subscriber_session(socket, state.hub))
}

async fn subscriber_session(socket: WebSocket, hub: BroadcastHub) {
    let Subscription { id, mut frames } = hub.register();
    let (mut sink, mut stream) = socket.split();

    // Writer: drains the hub queue. Ends when the hub drops us or a send fails.
    let mut writer = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            if let Err(e) = sink.send(Message::Text(frame.to_string().into())).await {
                tracing::debug!(subscriber = id, error = %e, "send failed");
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Reader: only watches for the client going away.
    let mut reader = tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    hub.unregister(id);
    tracing::debug!(subscriber = id, "subscriber session ended");
}
