use crate::errors::CoordinatorError;
use crate::room::RoomManager;
use crate::signaling::{SignalingOutput, SignalingService, report_error};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use huddle_core::{
    ClientMessage, ErrorCode, MediaProfile, ParticipantId, ServerMessage, SignalEnvelope,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct AppState {
    pub signaling: SignalingService,
    pub rooms: RoomManager,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let participant_id = ParticipantId::new();
    info!("New WebSocket connection: {}", participant_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    state.signaling.add_peer(participant_id.clone(), tx);
    greet(&state.signaling, &participant_id);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let state = state.clone();
        let participant_id = participant_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_msg) => dispatch(&state, &participant_id, client_msg).await,
                        Err(e) => {
                            warn!("Invalid ClientMessage from {}: {}", participant_id, e);
                            let _ = state.signaling.send(
                                &participant_id,
                                ServerMessage::Error {
                                    code: ErrorCode::BadRequest,
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

    state.signaling.remove_peer(&participant_id);
    match state.rooms.leave(&participant_id).await {
        Ok(_) | Err(CoordinatorError::NotFound(_)) => {}
        Err(e) => warn!("Cleanup of {} failed: {}", participant_id, e),
    }
    info!("WebSocket disconnected: {}", participant_id);
}

fn greet(signaling: &SignalingService, participant_id: &ParticipantId) {
    let greeting = [
        ServerMessage::IceConfig {
            ice_servers: signaling.ice_servers(),
        },
        ServerMessage::Welcome {
            participant_id: participant_id.clone(),
        },
    ];
    for msg in greeting {
        if let Err(e) = signaling.send(participant_id, msg) {
            warn!("Failed to greet {}: {}", participant_id, e);
        }
    }
}

async fn dispatch(state: &AppState, participant_id: &ParticipantId, msg: ClientMessage) {
    let rooms = &state.rooms;
    let result = match msg {
        ClientMessage::Join {
            display_name,
            room_id,
            audio,
            video,
        } => rooms
            .join(
                participant_id.clone(),
                display_name,
                room_id,
                MediaProfile { audio, video },
            )
            .await
            .map(|_| ()),
        ClientMessage::Leave => rooms.leave(participant_id).await.map(|_| ()),
        ClientMessage::Signal { target_id, payload } => {
            let envelope = SignalEnvelope::new(participant_id.clone(), target_id, payload);
            rooms.signal(envelope).await
        }
        ClientMessage::TrackReceived { source_id } => {
            rooms.track_received(participant_id, source_id).await
        }
        ClientMessage::ConnectionFailed { remote_id } => {
            rooms.connection_failed(participant_id, remote_id).await
        }
        ClientMessage::Control { command } => rooms.control(participant_id, command).await,
    };

    if let Err(e) = result {
        report_error(&state.signaling, participant_id, &e);
    }
}
