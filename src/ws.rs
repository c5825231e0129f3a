//! WebSocket entry point. Grounded on the teacher's `ws.rs`: read the first
//! frame to determine how the connection joins, spawn a writer task that
//! relays a per-connection channel to the socket sink, then loop reading
//! frames and forwarding them to the session actor until the socket closes.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};

use crate::codec::{decode_client_message, encode_server_message, ClientMessage, CodecError, ServerMessage};
use crate::connection::Role;
use crate::session::{JoinAck, JoinError, JoinKind, SessionEvent};
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();

    let Some(Ok(Message::Text(first_raw))) = stream.next().await else {
        return;
    };
    let first_msg = match decode_client_message(&first_raw) {
        Ok(msg) => msg,
        Err(CodecError::Oversized) => {
            send_error(&mut sink, "frame too large").await;
            return;
        },
        Err(CodecError::Malformed | CodecError::InvalidPin) => return,
    };
    let (pin, kind) = match first_msg {
        ClientMessage::HostJoin { pin } => (pin, JoinKind::Host),
        ClientMessage::PlayerJoin { pin, name } => (pin, JoinKind::Player(name)),
        _ => {
            send_error(&mut sink, "first message must be host_join or player_join").await;
            return;
        },
    };

    let Some(handle) = state.directory.read().await.lookup(&pin) else {
        send_error(&mut sink, "no session with that pin").await;
        return;
    };

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<std::sync::Arc<str>>();
    let (reply_tx, reply_rx) = oneshot::channel();
    if handle
        .sender()
        .send(SessionEvent::Join { kind, outbound: out_tx.clone(), reply: reply_tx })
        .is_err()
    {
        send_error(&mut sink, "session is no longer available").await;
        return;
    }

    let role = match reply_rx.await {
        Ok(Ok(JoinAck { role })) => role,
        Ok(Err(err)) => {
            send_error(&mut sink, join_error_message(err)).await;
            return;
        },
        Err(_) => {
            send_error(&mut sink, "session is no longer available").await;
            return;
        },
    };

    let mut writer_task = tokio::spawn(async move {
        while let Some(payload) = out_rx.recv().await {
            if sink.send(Message::Text(payload.to_string().into())).await.is_err() {
                break;
            }
        }
    });

    let session_tx = handle.sender();
    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match decode_client_message(&text) {
                            Ok(client_msg) => {
                                let _ = session_tx.send(SessionEvent::Inbound { role: role.clone(), msg: client_msg });
                            },
                            Err(CodecError::Oversized) => send_error_to(&out_tx, "frame too large"),
                            Err(CodecError::Malformed | CodecError::InvalidPin) => {},
                        }
                    },
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    _ => {},
                }
            },
            _ = &mut writer_task => break,
        }
    }

    let _ = session_tx.send(SessionEvent::ConnectionClosed { role });
    writer_task.abort();
}

async fn send_error(sink: &mut SplitSink<WebSocket, Message>, message: &str) {
    if let Ok(json) = encode_server_message(&ServerMessage::Error { message: message.to_string() }) {
        let _ = sink.send(Message::Text(json.into())).await;
    }
}

/// Send an error reply over a joined connection's outbound channel, used
/// once the socket sink itself has been handed off to the writer task.
fn send_error_to(out_tx: &mpsc::UnboundedSender<std::sync::Arc<str>>, message: &str) {
    if let Ok(json) = encode_server_message(&ServerMessage::Error { message: message.to_string() }) {
        let _ = out_tx.send(std::sync::Arc::from(json));
    }
}

fn join_error_message(err: JoinError) -> &'static str {
    match err {
        JoinError::SessionAlreadyStarted => "session has already started",
        JoinError::SessionFull => "session is full",
        JoinError::DuplicateName => "name already taken",
        JoinError::InvalidName => "invalid name",
    }
}
