use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{
    ActionResultDto, ClientMessage, ServerMessage, StateDeltaDto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::rand_id;
use crate::use_cases::actions::{self, RejectReason};
use crate::use_cases::{
    SessionError, SessionEvent, SessionHandle, SessionRegistry, SessionStatus, StateDelta, now_ms,
};

use axum::{
    Error, Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::watch::Receiver;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    DeltasClosed,
    StatusClosed,
    JoinRequired,
    JoinTimeout,
    #[allow(dead_code)]
    JoinRejected(SessionError),
    InvalidIdentity,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct SessionQuery {
    // The session id the client wants to attach to.
    session_id: String,
}

pub async fn delta_serializer(
    mut delta_rx: broadcast::Receiver<StateDelta>,
    delta_bytes_tx: broadcast::Sender<Utf8Bytes>,
    delta_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each delta once and broadcast the shared bytes.
    loop {
        match delta_rx.recv().await {
            Ok(delta) => {
                let msg = ServerMessage::Delta(StateDeltaDto::from(delta));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize state delta");
                        continue;
                    }
                };

                // Convert once and broadcast shared UTF-8 bytes to all clients.
                let bytes = Utf8Bytes::from(txt);
                // Store the latest bytes for lag recovery; each delta is a
                // full projection, so the latest one alone resyncs a client.
                let _ = delta_latest_tx.send(bytes.clone());
                let _ = delta_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "delta serializer lagged; skipping to latest");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("delta channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_delta_serializer(session: &SessionHandle) {
    // Spawn a task that serializes state deltas for this session.
    tokio::spawn(delta_serializer(
        session.delta_tx.subscribe(),
        session.delta_bytes_tx.clone(),
        session.delta_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> impl IntoResponse {
    let session = match state.session_registry.get_session(&query.session_id).await {
        Some(session) => session,
        None => {
            // Keep not-found responses consistent with the JSON error schema.
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "session not found".to_string(),
                }),
            )
                .into_response();
        }
    };

    let registry = state.session_registry.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, session, registry))
}

async fn handle_socket(
    mut socket: WebSocket,
    session: SessionHandle,
    registry: Arc<SessionRegistry>,
) {
    // Separate connection id for correlating logs before/after a player_id exists.
    let conn_id = rand_id();
    let span = info_span!("conn", conn_id, player_id = tracing::field::Empty);
    let _enter = span.enter();

    let mut ctx = match bootstrap_connection(&mut socket, &session, registry).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    span.record("player_id", ctx.player_id.as_str());
    info!(player_id = %ctx.player_id, session_id = %ctx.session_id, "client connected");

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    // Serialize message safely; log JSON errors instead of panicking
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: String,
    // Session id this connection is attached to.
    pub session_id: Arc<str>,
    // Registry access for disconnect bookkeeping and host migration.
    pub registry: Arc<SessionRegistry>,
    pub input_tx: mpsc::Sender<SessionEvent>,
    pub delta_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub delta_latest_rx: watch::Receiver<Utf8Bytes>,
    pub status_rx: watch::Receiver<SessionStatus>,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_queue_full_log: Instant,
    pub last_delta_lag_log: Instant,
    pub last_invalid_msg_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

struct JoinHandshake {
    player_id: String,
    display_name: String,
    bytes_in: u64,
    msgs_in: u64,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_PLAYER_ID_LEN: usize = 64;
const MAX_DISPLAY_NAME_LEN: usize = 32;
const DEFAULT_DISPLAY_NAME: &str = "Engineer";
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

async fn bootstrap_connection(
    socket: &mut WebSocket,
    session: &SessionHandle,
    registry: Arc<SessionRegistry>,
) -> Result<ConnCtx, NetError> {
    // Subscribe to updates *before* doing anything else (awaits) to not miss packets.
    let delta_bytes_rx = session.delta_bytes_tx.subscribe();
    let delta_latest_rx = session.delta_latest_tx.subscribe();
    let status_rx = session.status_tx.subscribe();

    // The first meaningful client message must be the join handshake.
    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };
    let player_id = join.player_id;
    let display_name = join.display_name;

    // Register membership; a known player id re-attaches without a roster change.
    if let Err(e) = registry
        .join_session(&session.session_id, player_id.clone(), display_name.clone())
        .await
    {
        let _ = send_close_with_reason(socket, close_code::POLICY, e.as_str()).await;
        return Err(NetError::JoinRejected(e));
    }

    // Send Identity Packet
    // Tell the client "this is who you are in this session".
    let identity_msg = ServerMessage::Identity {
        player_id: player_id.clone(),
        session_id: session.session_id.to_string(),
    };
    if let Err(err) = send_message(socket, &identity_msg).await {
        let _ = registry
            .remove_player(&session.session_id, &player_id)
            .await;
        return Err(err);
    }

    // Notify World Task
    // Join happens before the initial status so the first delta the client
    // sees can already include anything the join triggered.
    if let Err(err) = session
        .input_tx
        .send(SessionEvent::Join {
            player_id: player_id.clone(),
            display_name,
        })
        .await
        .map_err(|_| NetError::InputClosed)
    {
        let _ = registry
            .remove_player(&session.session_id, &player_id)
            .await;
        return Err(err);
    }

    // Send Initial State
    // Clone out of the watch borrow immediately; never hold it across an await.
    let initial_status = *status_rx.borrow();
    let status_msg = ServerMessage::SessionState(initial_status.into());
    if let Err(e) = send_message(socket, &status_msg).await {
        let _ = session
            .input_tx
            .send(SessionEvent::Leave {
                player_id: player_id.clone(),
            })
            .await;
        let _ = registry
            .remove_player(&session.session_id, &player_id)
            .await;
        return Err(e);
    }

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        session_id: session.session_id.clone(),
        registry,
        input_tx: session.input_tx.clone(),
        delta_bytes_rx,
        delta_latest_rx,
        status_rx,
        lag_recovery_count: 0,

        msgs_in: join.msgs_in,
        msgs_out: 0,
        bytes_in: join.bytes_in,
        bytes_out: 0,

        invalid_json: 0,

        last_queue_full_log: now,
        last_delta_lag_log: now,
        last_invalid_msg_log: now,

        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                let bytes_in = text.len() as u64;
                let payload = match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(payload)) => payload,
                    Ok(ClientMessage::Action(_)) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                };

                let player_id = payload.player_id.trim();
                if player_id.is_empty() || player_id.len() > MAX_PLAYER_ID_LEN {
                    let _ =
                        send_close_with_reason(socket, close_code::POLICY, "invalid player id")
                            .await;
                    return Err(NetError::InvalidIdentity);
                }

                let mut display_name = payload.display_name.trim();
                if display_name.is_empty() || display_name.len() > MAX_DISPLAY_NAME_LEN {
                    display_name = DEFAULT_DISPLAY_NAME;
                }

                return Ok(JoinHandshake {
                    player_id: player_id.to_string(),
                    display_name: display_name.to_string(),
                    bytes_in,
                    msgs_in: 1,
                });
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id.clone();

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        session_id,
        registry,
        input_tx,
        delta_bytes_rx,
        delta_latest_rx,
        status_rx,
        lag_recovery_count,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        last_queue_full_log,
        last_delta_lag_log,
        last_invalid_msg_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    socket,
                    incoming,
                    &player_id,
                    input_tx,
                    msgs_in,
                    bytes_in,
                    msgs_out,
                    bytes_out,
                    invalid_json,
                    last_queue_full_log,
                    last_invalid_msg_log,
                    close_frame,
                ).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing State Delta
            delta_msg = delta_bytes_rx.recv() => {
                match delta_msg {
                    Ok(bytes) => match forward_delta_bytes(bytes, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(last_delta_lag_log) {
                            warn!(missed = n, "state deltas lagged; sending latest projection");
                        }

                        // Resync strategy: the latest delta is a full
                        // projection, so it alone brings the client current.
                        let latest = delta_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            if should_log(last_delta_lag_log) {
                                warn!("latest delta unavailable during lag recovery");
                            }
                            false
                        } else {
                            let bytes_len = latest.len();
                            // Track how often we need to recover from lag.
                            *lag_recovery_count += 1;
                            let outcome =
                                forward_delta_bytes(latest, socket, msgs_out, bytes_out).await;

                            if should_log(last_delta_lag_log) {
                                debug!(
                                    player_id,
                                    bytes = bytes_len,
                                    count = *lag_recovery_count,
                                    "sent lag recovery delta"
                                );
                            }

                            match outcome {
                                LoopControl::Continue => false,
                                LoopControl::Disconnect => true,
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::DeltasClosed);
                        true
                    }
                }
            }

            // Outgoing Session Status
            changed_status = status_rx.changed() => {
                match changed_status {
                    Ok(()) => match forward_status(status_rx, socket, msgs_out, bytes_out).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    Err(_) => {
                        warn!(player_id, "session status channel closed; disconnecting");
                        fatal = Some(NetError::StatusClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(
        &player_id,
        session_id,
        registry,
        input_tx,
        *msgs_in,
        *msgs_out,
        *bytes_in,
        *bytes_out,
        *invalid_json,
        *lag_recovery_count,
    )
    .await
    {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    player_id: &str,
    input_tx: &mpsc::Sender<SessionEvent>,
    msgs_in: &mut u64,
    bytes_in: &mut u64,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
    invalid_json: &mut u32,
    last_queue_full_log: &mut Instant,
    last_invalid_msg_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;
                *bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join(_)) => {
                        // Ignore repeated Join packets after bootstrap to keep the session stable.
                        if should_log(last_invalid_msg_log) {
                            warn!(player_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Action(dto)) => {
                        let action_id = dto.id.clone();
                        let action = dto.into_network_action(player_id);

                        // Structural validation happens here so the sender
                        // always gets a synchronous receipt; the queue keeps
                        // its own guard for the authoritative boundary.
                        let result = match actions::validate(&action, now_ms()) {
                            Err(reason) => ActionResultDto::rejected(action_id, reason),
                            Ok(()) => match input_tx.try_send(SessionEvent::Action(action)) {
                                Ok(()) => ActionResultDto::accepted(action_id),
                                Err(mpsc::error::TrySendError::Full(_evt)) => {
                                    if should_log(last_queue_full_log) {
                                        warn!(player_id, "action channel full; rejecting action");
                                    }
                                    ActionResultDto::rejected(action_id, RejectReason::QueueFull)
                                }
                                Err(mpsc::error::TrySendError::Closed(_evt)) => {
                                    return Err(NetError::InputClosed);
                                }
                            },
                        };

                        let sent = send_message(socket, &ServerMessage::ActionResult(result)).await?;
                        *msgs_out += 1;
                        *bytes_out += sent as u64;
                        Ok(LoopControl::Continue)
                    }
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_msg_log) {
                            warn!(
                                player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_delta_bytes(
    delta_msg: Utf8Bytes,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let bytes_len = delta_msg.len();
    match socket
        .send(Message::Text(delta_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            *msgs_out += 1;
            *bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send state delta");
            LoopControl::Disconnect
        }
    }
}

async fn forward_status(
    status_rx: &Receiver<SessionStatus>,
    socket: &mut WebSocket,
    msgs_out: &mut u64,
    bytes_out: &mut u64,
) -> LoopControl {
    let status = *status_rx.borrow();
    let msg = ServerMessage::SessionState(status.into());
    match send_message(socket, &msg).await {
        Ok(bytes) => {
            *msgs_out += 1;
            *bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send session status");
            LoopControl::Disconnect
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn disconnect_cleanup(
    player_id: &str,
    session_id: &Arc<str>,
    registry: &Arc<SessionRegistry>,
    input_tx: &mpsc::Sender<SessionEvent>,
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_json: u32,
    lag_recovery_count: u64,
) -> Result<(), NetError> {
    // Tell the world task first so the departure lands in the next delta.
    let _ = input_tx
        .send(SessionEvent::Leave {
            player_id: player_id.to_string(),
        })
        .await;

    // Roster bookkeeping: host migration or session teardown happens here.
    if let Some(outcome) = registry.remove_player(session_id, player_id).await {
        if outcome.session_ended {
            info!(player_id, session_id = %session_id, "session ended after disconnect");
        } else if let Some(new_host_id) = &outcome.new_host_id {
            info!(player_id, new_host_id, "host authority migrated");
        }
    }

    debug!(
        player_id,
        msgs_in,
        msgs_out,
        bytes_in,
        bytes_out,
        invalid_json,
        lag_recovery_count,
        "connection stats"
    );
    info!(player_id, "client disconnected");
    Ok(())
}
