// ============================
// doge-lib/src/ws_router.rs
// ============================
//! The `/doge` real-time endpoint: WebSocket upgrade plus a long-poll
//! fallback transport for clients that cannot upgrade. Both transports feed
//! the same frame-processing path and share broker state.
use crate::broker::{Broker, ClientId};
use crate::error::AppError;
use crate::metrics as keys;
use crate::storage::DocumentStore;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use doge_common::{ClientFrame, ServerFrame};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use serde_json::json;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// How long a fallback poll waits before returning an empty batch
const POLL_WAIT: Duration = Duration::from_secs(25);

/// Outbound channel depth per connection
const CHANNEL_DEPTH: usize = 32;

/// A fallback session that misses two consecutive poll windows is abandoned
const SESSION_IDLE: Duration = Duration::from_secs(60);

/// How often the reaper sweeps the session registry
const REAP_PERIOD: Duration = Duration::from_secs(30);

/// One long-poll emulation session
struct FallbackSession {
    client_id: ClientId,
    tx: mpsc::Sender<ServerFrame>,
    rx: Mutex<mpsc::Receiver<ServerFrame>>,
    last_seen: StdMutex<Instant>,
}

impl FallbackSession {
    fn touch(&self) {
        if let Ok(mut last_seen) = self.last_seen.lock() {
            *last_seen = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        // a poisoned lock counts as just-touched, never reaped
        self.last_seen
            .lock()
            .map_or(Duration::ZERO, |last_seen| last_seen.elapsed())
    }
}

/// Registry of live fallback sessions
#[derive(Default)]
pub struct FallbackSessions {
    sessions: DashMap<Uuid, Arc<FallbackSession>>,
}

impl FallbackSessions {
    pub fn new() -> Self {
        Self::default()
    }

    fn create(&self) -> Uuid {
        let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
        let session_id = Uuid::new_v4();
        self.sessions.insert(
            session_id,
            Arc::new(FallbackSession {
                client_id: Uuid::new_v4(),
                tx,
                rx: Mutex::new(rx),
                last_seen: StdMutex::new(Instant::now()),
            }),
        );
        session_id
    }

    fn get(&self, session_id: &Uuid) -> Result<Arc<FallbackSession>, AppError> {
        let session = self
            .sessions
            .get(session_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(AppError::SessionNotFound)?;
        session.touch();
        Ok(session)
    }

    /// Drop every session idle for at least `idle_after`, releasing its
    /// broker subscriptions with it.
    pub(crate) fn reap_idle(&self, idle_after: Duration, broker: &Broker) {
        self.sessions.retain(|session_id, session| {
            if session.idle_for() < idle_after {
                return true;
            }
            tracing::debug!(session = %session_id, "reaping idle fallback session");
            broker.unsubscribe_all(session.client_id);
            false
        });
    }
}

/// Spawn the background task that reclaims abandoned fallback sessions
pub fn start_session_reaper(
    sessions: Arc<FallbackSessions>,
    broker: Arc<Broker>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REAP_PERIOD);
        loop {
            ticker.tick().await;
            sessions.reap_idle(SESSION_IDLE, &broker);
        }
    })
}

/// Create the real-time endpoint router
pub fn create_router<S: DocumentStore + 'static>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/doge", get(ws_handler))
        .route("/doge/poll", post(create_poll_session))
        .route(
            "/doge/poll/{session}",
            get(poll_frames).post(send_frames),
        )
        .with_state(state)
}

/// Handler for WebSocket upgrade requests
pub async fn ws_handler<S: DocumentStore + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    counter!(keys::WS_CONNECTION).increment(1);

    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection<S: DocumentStore + 'static>(
    socket: WebSocket,
    state: Arc<AppState<S>>,
) {
    // the active gauge counts established connections only
    gauge!(keys::WS_ACTIVE).increment(1.0);

    let (mut sink, mut stream) = socket.split();
    let client_id = Uuid::new_v4();

    // Outbound channel: broker fan-out and direct replies both land here
    let (tx, mut rx) = mpsc::channel::<ServerFrame>(CHANNEL_DEPTH);

    // Forward ServerFrames to the socket as JSON text
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(err) => {
                    tracing::error!(error = %err, "failed to serialize frame");
                    continue;
                },
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Main loop: parse and process inbound frames
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => {
                    if let Err(err) = process_frame(&state, client_id, &tx, frame).await {
                        let reply = ServerFrame::Error {
                            code: err.error_code().to_string(),
                            message: err.to_string(),
                        };
                        if tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                },
                Err(err) => {
                    let reply = ServerFrame::Error {
                        code: "JSON_001".to_string(),
                        message: err.to_string(),
                    };
                    if tx.send(reply).await.is_err() {
                        break;
                    }
                },
            },
            Message::Close(_) => break,
            _ => {},
        }
    }

    // Cleanup: drop every subscription this connection held
    state.broker.unsubscribe_all(client_id);

    gauge!(keys::WS_ACTIVE).decrement(1.0);
    send_task.abort();
}

/// Process one client frame; shared by both transports.
pub async fn process_frame<S: DocumentStore>(
    state: &AppState<S>,
    client_id: ClientId,
    tx: &mpsc::Sender<ServerFrame>,
    frame: ClientFrame,
) -> Result<(), AppError> {
    match frame {
        ClientFrame::Subscribe { destination } => {
            state.broker.subscribe(&destination, client_id, tx.clone())?;
            tx.send(ServerFrame::Receipt { destination }).await?;
            Ok(())
        },
        ClientFrame::Unsubscribe { destination } => {
            state.broker.unsubscribe(&destination, client_id);
            Ok(())
        },
        ClientFrame::Send { destination, body } => {
            use crate::broker::DestinationKind;
            match state.broker.classify(&destination) {
                DestinationKind::Application => {
                    state.app_routes.dispatch(&destination, body, &state.broker).await
                },
                DestinationKind::Broker => state.broker.publish(&destination, body).await,
                DestinationKind::Unknown => {
                    Err(AppError::InvalidDestination(destination))
                },
            }
        },
    }
}

/// `POST /doge/poll` — open a fallback session
async fn create_poll_session<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    counter!(keys::POLL_SESSION).increment(1);
    let session_id = state.fallback.create();
    Json(json!({ "session": session_id }))
}

/// `POST /doge/poll/{session}` — submit a batch of client frames
async fn send_frames<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(session_id): Path<Uuid>,
    Json(frames): Json<Vec<ClientFrame>>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.fallback.get(&session_id)?;
    for frame in frames {
        if let Err(err) =
            process_frame(&state, session.client_id, &session.tx, frame).await
        {
            let reply = ServerFrame::Error {
                code: err.error_code().to_string(),
                message: err.to_string(),
            };
            let _ = session.tx.send(reply).await;
        }
    }
    Ok(Json(json!({ "accepted": true })))
}

/// `GET /doge/poll/{session}` — long-poll for queued server frames
async fn poll_frames<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.fallback.get(&session_id)?;
    let mut rx = session.rx.lock().await;

    let mut frames = Vec::new();
    match tokio::time::timeout(POLL_WAIT, rx.recv()).await {
        Ok(Some(frame)) => {
            frames.push(frame);
            // drain whatever else is already queued
            while let Ok(frame) = rx.try_recv() {
                frames.push(frame);
            }
        },
        Ok(None) | Err(_) => {},
    }
    Ok(Json(frames))
}
