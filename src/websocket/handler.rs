use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::server::AppState;

use super::{ConnectionLifecycle, OutboundMessage};

/// WebSocket upgrade handler for operator dashboards
#[tracing::instrument(name = "ws.upgrade", skip(ws, state))]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    tracing::debug!("WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection outbound channel. A zero buffer is raised to one.
fn outbound_channel(
    buffer: usize,
) -> (mpsc::Sender<OutboundMessage>, mpsc::Receiver<OutboundMessage>) {
    mpsc::channel(buffer.max(1))
}

/// Drain the outbound channel into the socket until either side goes away.
///
/// The sink is closed once every sender has been dropped.
fn spawn_writer<S>(mut sink: S, mut rx: mpsc::Receiver<OutboundMessage>) -> JoinHandle<()>
where
    S: Sink<Message> + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink
                .send(Message::Text(msg.as_str().to_owned().into()))
                .await
                .is_err()
            {
                return;
            }
        }
        let _ = sink.close().await;
    })
}

/// Drive one established WebSocket through its lifecycle
async fn handle_socket(socket: WebSocket, state: AppState) {
    let ws_config = &state.settings.websocket;
    let (tx, rx) = outbound_channel(ws_config.channel_buffer_size);
    let (ws_sender, mut ws_receiver) = socket.split();

    // The writer must be draining before the connection becomes visible to broadcasters
    let mut send_task = spawn_writer(ws_sender, rx);

    let mut lifecycle = ConnectionLifecycle::accept(state.registry.clone(), state.dispatcher.clone());
    let connection_id = lifecycle.id();

    let welcome = OutboundMessage::text(ws_config.welcome_message.as_str());
    if let Err(e) = lifecycle.on_connect(tx, welcome).await {
        // The rejected sender is gone, so the writer closes the socket and exits
        tracing::warn!(connection_id = %connection_id, error = %e, "Connection rejected");
        let _ = send_task.await;
        return;
    }

    tracing::info!(connection_id = %connection_id, "Dashboard connection established");

    let mut writer_done = false;

    loop {
        tokio::select! {
            _ = &mut send_task => {
                tracing::debug!(connection_id = %connection_id, "Writer finished");
                writer_done = true;
                break;
            }
            frame = ws_receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        lifecycle.on_message(text.as_str()).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        tracing::debug!(connection_id = %connection_id, "Ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        lifecycle.touch();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection_id = %connection_id, "Peer closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(connection_id = %connection_id, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    // Stop the writer before leaving the registry so nothing is written afterwards
    if !writer_done {
        send_task.abort();
        let _ = send_task.await;
    }
    lifecycle.on_close();
}
