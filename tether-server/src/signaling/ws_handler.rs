use crate::AppState;
use crate::relay::RelayError;
use crate::signaling::identity::Handshake;
use axum::Router;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{ConnectInfo, Query, State, WebSocketUpgrade};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tether_core::{ClientMessage, ConnectionId, RejectReason, RequestId, ServerMessage, UserId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Route of the signaling WebSocket endpoint.
pub const HUB_PATH: &str = "/hub/transfer";

pub fn signaling_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(HUB_PATH, get(ws_handler))
        .with_state(state)
}

/// HTTP-хендлер для апгрейда до WebSocket.
/// Соединение без identity отклоняется с 401.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<HashMap<String, String>>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let remote_addr = state.gateway.resolve_remote_addr(peer_addr, &headers);
    let handshake = Handshake {
        query,
        headers,
        remote_addr,
    };

    let Some(identity) = state.identity.resolve_identity(&handshake).await else {
        let err = RelayError::IdentityMissing;
        warn!(remote = %remote_addr, "Connection refused: {}", err);
        return (StatusCode::UNAUTHORIZED, err.to_string()).into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, identity, remote_addr, state))
}

async fn handle_socket(
    socket: WebSocket,
    identity: UserId,
    remote_addr: SocketAddr,
    state: Arc<AppState>,
) {
    let connection = ConnectionId::new();
    info!(user = %identity, connection = %connection, remote = %remote_addr, "New WebSocket connection");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let superseded = state
        .signaling
        .add_connection(connection, identity.clone(), tx);
    state
        .relay
        .on_connect(identity.clone(), connection, Some(remote_addr))
        .await;
    // Closed only once the registry points here, so its teardown is stale.
    if let Some(old) = superseded {
        state.signaling.close_connection(old);
    }
    reply(
        &state,
        connection,
        &ServerMessage::Welcome {
            user_id: identity.clone(),
            connection_id: connection,
        },
    );

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if sender.send(msg).await.is_err() || closing {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let state = state.clone();
        let identity = identity.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(request) => dispatch(&state, &identity, connection, request).await,
                        Err(e) => {
                            warn!(user = %identity, "Invalid ClientMessage: {}", e);
                            reply(
                                &state,
                                connection,
                                &ServerMessage::Rejected {
                                    request_id: None,
                                    reason: RejectReason::InvalidMessage,
                                    message: e.to_string(),
                                },
                            );
                        }
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    state.relay.on_disconnect(&identity, connection).await;
    state.signaling.remove_connection(&connection);
    info!(user = %identity, connection = %connection, "WebSocket disconnected");
}

/// Requests run in arrival order, except `Connect`: its round trip is spawned
/// so that a pending answer never stalls this connection's inbound stream.
async fn dispatch(
    state: &Arc<AppState>,
    identity: &UserId,
    connection: ConnectionId,
    request: ClientMessage,
) {
    let request_id = request.request_id();
    debug!(user = %identity, ?request_id, "Client request");

    let outcome = match request {
        ClientMessage::JoinRoom { room, password, .. } => state
            .relay
            .join_room(identity, &room, password.as_deref())
            .await
            .map(|_| true),
        ClientMessage::LeaveRoom { room, .. } => {
            state.relay.leave_room(identity, &room).await.map(|_| true)
        }
        ClientMessage::AddPassword { room, password, .. } => state
            .relay
            .set_room_password(&room, &password)
            .await
            .map(|_| true),
        ClientMessage::IceCandidate {
            target, candidate, ..
        } => state
            .relay
            .relay_ice_candidate(identity, &target, candidate)
            .await
            .map(|_| false),
        ClientMessage::Connect { target, offer, .. } => {
            let state = state.clone();
            let identity = identity.clone();
            tokio::spawn(async move {
                let response = match state.relay.relay_connect(&identity, &target, offer).await {
                    Ok(answer) => ServerMessage::Answer { request_id, answer },
                    Err(e) => rejection(request_id, &e),
                };
                reply(&state, connection, &response);
            });
            return;
        }
        ClientMessage::ConnectReply {
            invocation_id,
            answer,
        } => {
            state
                .signaling
                .complete_answer(connection, invocation_id, answer);
            return;
        }
    };

    match outcome {
        Ok(true) => reply(state, connection, &ServerMessage::Ack { request_id }),
        Ok(false) => {}
        Err(e) => {
            warn!(user = %identity, ?request_id, "Request rejected: {}", e);
            reply(state, connection, &rejection(request_id, &e));
        }
    }
}

fn rejection(request_id: Option<RequestId>, err: &RelayError) -> ServerMessage {
    ServerMessage::Rejected {
        request_id,
        reason: err.reason(),
        message: err.to_string(),
    }
}

fn reply(state: &AppState, connection: ConnectionId, msg: &ServerMessage) {
    if let Err(e) = state.signaling.send_message(connection, msg) {
        debug!(connection = %connection, "Reply dropped: {}", e);
    }
}
