//! Per-connection handler: WebSocket upgrade, room join, and frame routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Upgrade to WebSocket, mint a session id
//!   2. Join the room (or send an Error frame and close)
//!   3. Send Welcome
//!   4. Loop: client frames → room, room publications → client

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use orchard_protocol::{ClientFrame, Codec, ServerFrame, SessionId};
use orchard_room::{RoomHandle, RoomOutbound};
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::OrchardError;
use crate::server::ServerState;

const SESSION_ID_LEN: usize = 9;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Drop guard that removes the session from the room when the handler exits.
///
/// `Drop` is synchronous, so the leave is a fire-and-forget task. It runs
/// on panic too.
struct SessionGuard {
    session_id: SessionId,
    room: RoomHandle,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let session_id = self.session_id.clone();
        let room = self.room.clone();
        tokio::spawn(async move {
            if let Err(e) = room.leave(session_id.clone()).await {
                tracing::debug!(session = %session_id, error = %e, "leave after disconnect failed");
            }
        });
    }
}

/// Random alphanumeric session id, unique per connection.
fn new_session_id() -> SessionId {
    let id: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect();
    SessionId::new(id)
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState<C>>,
) -> Result<(), OrchardError> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut incoming) = ws.split();
    let session_id = new_session_id();
    tracing::debug!(%addr, session = %session_id, "websocket accepted");

    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    if let Err(e) = state.room.join(session_id.clone(), out_tx).await {
        tracing::info!(%addr, error = %e, "join refused");
        let refusal: ServerFrame = ServerFrame::Error {
            code: e.code(),
            message: e.to_string(),
        };
        send_frame(&mut sink, &state.codec, &refusal).await?;
        sink.close().await?;
        return Ok(());
    }
    let _guard = SessionGuard {
        session_id: session_id.clone(),
        room: state.room.clone(),
    };
    tracing::info!(%addr, session = %session_id, "session joined");

    let welcome: ServerFrame = ServerFrame::Welcome {
        session_id: session_id.clone(),
    };
    send_frame(&mut sink, &state.codec, &welcome).await?;

    loop {
        tokio::select! {
            msg = incoming.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    route_frame(&mut sink, &state, &session_id, text.as_bytes()).await?;
                }
                Some(Ok(Message::Binary(data))) => {
                    route_frame(&mut sink, &state, &session_id, &data).await?;
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!(session = %session_id, "connection closed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(session = %session_id, error = %e, "recv error");
                    break;
                }
            },
            outbound = out_rx.recv() => match outbound {
                Some(RoomOutbound::State(snapshot)) => {
                    let frame = ServerFrame::State { state: &*snapshot };
                    send_frame(&mut sink, &state.codec, &frame).await?;
                }
                Some(RoomOutbound::Rejected { code, message }) => {
                    let frame: ServerFrame = ServerFrame::Error { code, message };
                    send_frame(&mut sink, &state.codec, &frame).await?;
                }
                None => {
                    tracing::debug!(session = %session_id, "room closed the session channel");
                    break;
                }
            },
        }
    }

    // _guard drops here → leave fires.
    Ok(())
}

/// Decodes a client frame and forwards it to the room. Undecodable frames
/// get an Error frame; the connection stays open.
async fn route_frame<C: Codec>(
    sink: &mut WsSink,
    state: &ServerState<C>,
    session_id: &SessionId,
    data: &[u8],
) -> Result<(), OrchardError> {
    let frame: ClientFrame = match state.codec.decode(data) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::debug!(session = %session_id, error = %e, "failed to decode frame");
            let reply: ServerFrame = ServerFrame::Error {
                code: e.code(),
                message: e.to_string(),
            };
            return send_frame(sink, &state.codec, &reply).await;
        }
    };

    state
        .room
        .send_message(session_id.clone(), frame.tag, frame.data)
        .await?;
    Ok(())
}

async fn send_frame<S: Serialize>(
    sink: &mut WsSink,
    codec: &impl Codec,
    frame: &ServerFrame<S>,
) -> Result<(), OrchardError> {
    let bytes = codec.encode(frame)?;
    sink.send(Message::Binary(bytes.into())).await?;
    Ok(())
}
