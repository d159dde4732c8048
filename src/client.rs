//! Async client for FlagDash multiplayer rooms.
//!
//! [`FlagDashClient`] is a thin handle that communicates with a background
//! session loop task via an unbounded MPSC channel. The loop owns the
//! transport and the [`GameSession`] state machine; events are emitted on a
//! bounded channel ([`tokio::sync::mpsc::Receiver<FlagDashEvent>`]) returned
//! from [`FlagDashClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let room = fetch_room_details("AB12").await; // HTTP, outside this crate
//! let transport = WebSocketTransport::connect("ws://localhost:8080/ws").await?;
//! let config = FlagDashConfig::new("alice", room);
//! let (client, mut events) = FlagDashClient::start(transport, config)?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         FlagDashEvent::QuestionLoaded { .. } => client.submit_answer("France")?,
//!         FlagDashEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::dispatch;
use crate::error::{FlagDashError, Result};
use crate::event::FlagDashEvent;
use crate::protocol::RoomDetails;
use crate::session::{Command, Effect, GameSession};
use crate::transport::Transport;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Username length bounds enforced by the room service.
const USERNAME_MIN_CHARS: usize = 4;
const USERNAME_MAX_CHARS: usize = 10;

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`FlagDashClient`] connection.
///
/// Must be supplied to [`FlagDashClient::start`]. The required inputs are the
/// player's username and the [`RoomDetails`] obtained from the room service;
/// everything else has sensible defaults.
///
/// # Example
///
/// ```
/// use flagdash_client::client::FlagDashConfig;
/// use flagdash_client::protocol::{GameMode, RoomDetails};
///
/// let room = RoomDetails {
///     code: "AB12".to_string(),
///     host: "alice".to_string(),
///     gamemode: GameMode::Mcq,
///     num_questions: 10,
///     time_limit_minutes: 5,
///     players: Vec::new(),
/// };
/// let config = FlagDashConfig::new("alice", room);
/// assert_eq!(config.username, "alice");
/// ```
///
/// # Tuning
///
/// ```
/// # use flagdash_client::client::FlagDashConfig;
/// # use flagdash_client::protocol::{GameMode, RoomDetails};
/// use std::time::Duration;
///
/// # let room = RoomDetails {
/// #     code: "AB12".to_string(),
/// #     host: "alice".to_string(),
/// #     gamemode: GameMode::Mcq,
/// #     num_questions: 10,
/// #     time_limit_minutes: 5,
/// #     players: Vec::new(),
/// # };
/// let config = FlagDashConfig::new("alice", room)
///     .with_event_channel_capacity(512)
///     .with_shutdown_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct FlagDashConfig {
    /// Display name for this player. Must be 4 to 10 characters after
    /// trimming surrounding whitespace; validated by
    /// [`FlagDashClient::start`] before anything touches the network.
    pub username: String,
    /// Room metadata from the room service (create, join, or get).
    pub room: RoomDetails,
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up with incoming server events, events
    /// are dropped (with a warning logged) to avoid blocking the session
    /// loop. The `Disconnected` event is always delivered regardless of
    /// capacity.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Timeout for the graceful shutdown.
    ///
    /// When [`FlagDashClient::shutdown`] is called, the background session
    /// loop is given this much time to close the transport and emit a final
    /// `Disconnected` event. If the timeout expires the task is aborted.
    ///
    /// Defaults to **1 second**. A zero timeout aborts the session loop
    /// immediately without waiting for graceful shutdown.
    pub shutdown_timeout: Duration,
}

impl FlagDashConfig {
    /// Create a new configuration with the given username and room details.
    pub fn new(username: impl Into<String>, room: RoomDetails) -> Self {
        Self {
            username: username.into(),
            room,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set the capacity of the bounded event channel.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful shutdown.
    ///
    /// Defaults to **1 second**. A zero timeout aborts the session loop
    /// immediately without waiting for graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

// ── Shared state ────────────────────────────────────────────────────

/// Internal shared state between the client handle and the session loop.
struct ClientState {
    connected: AtomicBool,
    player_id: Mutex<Option<String>>,
}

impl ClientState {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            player_id: Mutex::new(None),
        }
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Async client handle for one FlagDash room session.
///
/// Created via [`FlagDashClient::start`], which spawns a background session
/// loop and returns this handle together with an event receiver.
///
/// All public methods queue a [`Command`] for the session loop over an
/// unbounded channel and return immediately once it is queued (no round-trip
/// await). The session decides whether the command is valid in the current
/// phase; invalid commands are logged and dropped, never fatal.
pub struct FlagDashClient {
    /// Sender half of the command channel to the session loop.
    cmd_tx: mpsc::UnboundedSender<Command>,
    /// Shared state updated by the session loop.
    state: Arc<ClientState>,
    /// Handle to the background session loop task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Oneshot sender to signal the session loop to shut down gracefully.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    /// Timeout for the graceful shutdown.
    shutdown_timeout: Duration,
    room_code: String,
    is_host: bool,
}

impl FlagDashClient {
    /// Start the session loop and return a handle plus event receiver.
    ///
    /// The loop immediately sends the `joinRoom` announcement built from the
    /// configured username and room code, then emits
    /// [`Connected`](FlagDashEvent::Connected).
    ///
    /// # Arguments
    ///
    /// * `transport` — A connected [`Transport`] implementation.
    /// * `config` — Player username plus the room details to join.
    ///
    /// # Errors
    ///
    /// Returns [`FlagDashError::InvalidUsername`] or
    /// [`FlagDashError::InvalidRoom`] when the configuration fails local
    /// validation. Nothing is sent and no task is spawned in that case.
    pub fn start(
        transport: impl Transport,
        config: FlagDashConfig,
    ) -> Result<(Self, mpsc::Receiver<FlagDashEvent>)> {
        let username = config.username.trim().to_owned();
        let length = username.chars().count();
        if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&length) {
            return Err(FlagDashError::InvalidUsername { length });
        }
        if config.room.code.trim().is_empty() {
            return Err(FlagDashError::InvalidRoom);
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<FlagDashEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let state = Arc::new(ClientState::new());
        let loop_state = Arc::clone(&state);

        let is_host = username == config.room.host;
        let room_code = config.room.code.clone();
        let session = GameSession::new(username, &config.room);

        let task = tokio::spawn(session_loop(
            transport,
            cmd_rx,
            event_tx,
            loop_state,
            shutdown_rx,
            session,
        ));

        let client = Self {
            cmd_tx,
            state,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
            room_code,
            is_host,
        };

        Ok((client, event_rx))
    }

    // ── Public API methods ──────────────────────────────────────────

    /// Ask the server to start the game for everyone in the room.
    ///
    /// # Errors
    ///
    /// Returns [`FlagDashError::NotHost`] if this client did not create the
    /// room, or [`FlagDashError::NotConnected`] if the session has ended.
    pub fn start_game(&self) -> Result<()> {
        if !self.is_host {
            return Err(FlagDashError::NotHost);
        }
        self.send(Command::StartGame)
    }

    /// Submit an answer for the question currently on screen.
    ///
    /// Only the first submission per question is sent; the session drops
    /// later ones.
    ///
    /// # Errors
    ///
    /// Returns [`FlagDashError::NotConnected`] if the session has ended.
    pub fn submit_answer(&self, answer: impl Into<String>) -> Result<()> {
        self.send(Command::SubmitAnswer(answer.into()))
    }

    /// Leave the room. The server is told first, then the transport closes
    /// and a final [`Disconnected`](FlagDashEvent::Disconnected) event is
    /// emitted.
    ///
    /// # Errors
    ///
    /// Returns [`FlagDashError::NotConnected`] if the session has ended.
    pub fn leave(&self) -> Result<()> {
        self.send(Command::Leave)
    }

    /// Shut down the client, closing the transport and stopping the
    /// background task.
    ///
    /// After calling this method, the event receiver will yield `None` once
    /// the session loop exits.
    pub async fn shutdown(&mut self) {
        debug!("FlagDashClient: shutdown requested");

        // Signal the session loop to shut down gracefully.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        // Await the session loop with a timeout. If it doesn't exit in time,
        // abort it so the task cannot detach and run indefinitely.
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session loop aborted: {join_err}");
                    }
                }
            }
        }

        self.state.connected.store(false, Ordering::Release);
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Returns `true` if the transport is believed to be connected.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// Returns `true` if this client created the room and may start the game.
    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// The join code of the room this client belongs to.
    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    /// Returns this client's server-assigned id, once the server has echoed
    /// the join announcement.
    pub async fn current_player_id(&self) -> Option<String> {
        self.state.player_id.lock().await.clone()
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Queue a [`Command`] for the session loop.
    fn send(&self, command: Command) -> Result<()> {
        if !self.state.connected.load(Ordering::Acquire) {
            return Err(FlagDashError::NotConnected);
        }
        self.cmd_tx
            .send(command)
            .map_err(|_| FlagDashError::NotConnected)
    }
}

impl std::fmt::Debug for FlagDashClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagDashClient")
            .field("room_code", &self.room_code)
            .field("is_host", &self.is_host)
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for FlagDashClient {
    fn drop(&mut self) {
        // `Drop` is synchronous so we cannot await a graceful shutdown.
        // The only safe action is to abort the spawned task, which causes
        // the session loop future to be dropped immediately.  The
        // `shutdown_tx` oneshot is intentionally *not* sent here: sending
        // it would trigger a graceful path that calls async `transport.close()`,
        // but there is no executor context to drive it inside `Drop`.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// Background loop that multiplexes commands, incoming frames and the
/// advance timer via `tokio::select!`, feeding all of them through the
/// [`GameSession`] and performing the effects it returns.
///
/// Exits when:
/// - The command channel closes (client handle dropped or shutdown called)
/// - The transport returns `None` (server closed connection)
/// - A transport error occurs
/// - The session asks for an orderly close (leave)
async fn session_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::Sender<FlagDashEvent>,
    state: Arc<ClientState>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    mut session: GameSession,
) {
    debug!("session loop started");

    // Announce ourselves before anything else; the server ignores every
    // other message until it has seen the join.
    let join = session.join_message();
    match serde_json::to_string(&join) {
        Ok(json) => {
            if let Err(e) = transport.send(json).await {
                error!("transport send error: {e}");
                emit_disconnected(&event_tx, &state, Some(format!("transport send error: {e}")))
                    .await;
                return;
            }
        }
        Err(e) => {
            error!("failed to serialize join announcement: {e}");
            emit_disconnected(&event_tx, &state, Some("failed to serialize join".into())).await;
            return;
        }
    }
    emit_event(&event_tx, FlagDashEvent::Connected).await;

    // The single reveal-advance deadline. Armed by `ScheduleAdvance`,
    // disarmed by `CancelAdvance` or by firing.
    let mut advance_deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            // Branch 1: command from the client handle
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(command) => {
                        debug!("handling command: {:?}", std::mem::discriminant(&command));
                        let effects = session.handle_command(command);
                        if !apply_effects(&mut transport, &mut advance_deadline, &event_tx, &state, effects).await {
                            break;
                        }
                    }
                    // Command channel closed — client handle dropped.
                    None => {
                        debug!("command channel closed, shutting down session loop");
                        let _ = transport.close().await;
                        emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            // Branch 2: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                emit_disconnected(&event_tx, &state, Some("client shut down".into())).await;
                break;
            }

            // Branch 3: incoming frame from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        let effects = dispatch::route(&mut session, &text);
                        if !apply_effects(&mut transport, &mut advance_deadline, &event_tx, &state, effects).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        emit_disconnected(
                            &event_tx,
                            &state,
                            Some(format!("transport receive error: {e}")),
                        ).await;
                        break;
                    }
                    // Transport closed cleanly.
                    None => {
                        debug!("transport closed by server");
                        emit_disconnected(&event_tx, &state, None).await;
                        break;
                    }
                }
            }

            // Branch 4: the reveal-advance timer
            _ = advance_timer(advance_deadline), if advance_deadline.is_some() => {
                advance_deadline = None;
                let effects = session.advance_due();
                if !apply_effects(&mut transport, &mut advance_deadline, &event_tx, &state, effects).await {
                    break;
                }
            }
        }
    }

    debug!("session loop exited");
}

/// Sleeps until the advance deadline.
///
/// The select! branch is guarded by `is_some`, but guards do not stop the
/// branch expression from being evaluated, so the `None` case must still
/// produce a valid (never-ready) future.
async fn advance_timer(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Perform one batch of session effects in order.
///
/// Returns `false` when the session loop must exit (transport failure or an
/// orderly close).
async fn apply_effects(
    transport: &mut impl Transport,
    advance_deadline: &mut Option<Instant>,
    event_tx: &mpsc::Sender<FlagDashEvent>,
    state: &ClientState,
    effects: Vec<Effect>,
) -> bool {
    for effect in effects {
        match effect {
            Effect::Send(msg) => {
                debug!("sending client message: {:?}", std::mem::discriminant(&msg));
                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if let Err(e) = transport.send(json).await {
                            error!("transport send error: {e}");
                            emit_disconnected(
                                event_tx,
                                state,
                                Some(format!("transport send error: {e}")),
                            )
                            .await;
                            return false;
                        }
                    }
                    Err(e) => {
                        error!("failed to serialize ClientMessage: {e}");
                        // Serialization errors are programming bugs; don't kill the loop.
                    }
                }
            }
            Effect::Emit(event) => {
                update_state(state, &event).await;
                emit_event(event_tx, event).await;
            }
            Effect::ScheduleAdvance(delay) => {
                *advance_deadline = Some(Instant::now() + delay);
            }
            Effect::CancelAdvance => {
                *advance_deadline = None;
            }
            Effect::Close { reason } => {
                debug!(?reason, "session requested close");
                let _ = transport.close().await;
                emit_disconnected(event_tx, state, reason).await;
                return false;
            }
        }
    }
    true
}

/// Update shared [`ClientState`] based on an outgoing [`FlagDashEvent`].
async fn update_state(state: &ClientState, event: &FlagDashEvent) {
    if let FlagDashEvent::PlayerIdAssigned { player_id } = event {
        *state.player_id.lock().await = Some(player_id.clone());
        debug!(%player_id, "state: player id assigned");
    }
}

/// Emit an event to the event channel. If the channel is full, log a warning
/// and drop the event to avoid blocking the session loop.
async fn emit_event(event_tx: &mpsc::Sender<FlagDashEvent>, event: FlagDashEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit a [`Disconnected`](FlagDashEvent::Disconnected) event and update state.
///
/// Uses `send().await` (blocking) instead of `try_send` because `Disconnected`
/// is always the last event on the channel and must never be silently dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<FlagDashEvent>,
    state: &ClientState,
    reason: Option<String>,
) {
    state.connected.store(false, Ordering::Release);
    let event = FlagDashEvent::Disconnected { reason };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::{GameMode, RoomPlayer};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// Scriptable in-memory transport.
    ///
    /// `incoming` is drained one entry per `recv` call; a `None` entry
    /// simulates a clean server close. When the script runs out, `recv`
    /// pends forever, like an idle socket.
    struct MockTransport {
        incoming: VecDeque<Option<std::result::Result<String, FlagDashError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl MockTransport {
        fn new(
            incoming: Vec<Option<std::result::Result<String, FlagDashError>>>,
        ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                incoming: incoming.into(),
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            };
            (transport, sent, closed)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), FlagDashError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, FlagDashError>> {
            match self.incoming.pop_front() {
                Some(Some(result)) => Some(result),
                Some(None) => None,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> std::result::Result<(), FlagDashError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Transport whose `close` never completes, to exercise the abort path.
    struct HangingCloseTransport;

    #[async_trait]
    impl Transport for HangingCloseTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), FlagDashError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, FlagDashError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), FlagDashError> {
            std::future::pending().await
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn room_details() -> RoomDetails {
        RoomDetails {
            code: "AB12".to_string(),
            host: "alice".to_string(),
            gamemode: GameMode::Mcq,
            num_questions: 10,
            time_limit_minutes: 5,
            players: vec![RoomPlayer {
                username: "alice".to_string(),
                score: 0,
            }],
        }
    }

    fn start_client(
        username: &str,
        incoming: Vec<Option<std::result::Result<String, FlagDashError>>>,
    ) -> (
        FlagDashClient,
        mpsc::Receiver<FlagDashEvent>,
        Arc<StdMutex<Vec<String>>>,
        Arc<AtomicBool>,
    ) {
        let (transport, sent, closed) = MockTransport::new(incoming);
        let config = FlagDashConfig::new(username, room_details());
        let (client, events) = FlagDashClient::start(transport, config).unwrap();
        (client, events, sent, closed)
    }

    fn player_joined(id: &str, username: &str) -> String {
        format!(r#"{{"event":"playerJoined","data":{{"id":"{id}","username":"{username}","score":0}}}}"#)
    }

    // ── Configuration tests ─────────────────────────────────────────

    #[test]
    fn config_defaults() {
        let config = FlagDashConfig::new("alice", room_details());
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn config_clamps_zero_capacity() {
        let config = FlagDashConfig::new("alice", room_details()).with_event_channel_capacity(0);
        assert_eq!(config.event_channel_capacity, 1);
    }

    // ── Validation tests ────────────────────────────────────────────

    #[tokio::test]
    async fn short_username_is_rejected_before_any_send() {
        let (transport, sent, _) = MockTransport::new(vec![]);
        let config = FlagDashConfig::new("abc", room_details());
        let err = FlagDashClient::start(transport, config).unwrap_err();
        assert!(matches!(err, FlagDashError::InvalidUsername { length: 3 }));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn long_username_is_rejected_before_any_send() {
        let (transport, sent, _) = MockTransport::new(vec![]);
        let config = FlagDashConfig::new("abcdefghijk", room_details());
        let err = FlagDashClient::start(transport, config).unwrap_err();
        assert!(matches!(err, FlagDashError::InvalidUsername { length: 11 }));
        assert!(sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn username_is_trimmed_before_validation() {
        let (transport, sent, _) = MockTransport::new(vec![]);
        let config = FlagDashConfig::new("  alice  ", room_details());
        let (_client, _events) = FlagDashClient::start(transport, config).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let messages = sent.lock().unwrap();
        assert!(messages[0].contains(r#""username":"alice""#));
    }

    #[tokio::test]
    async fn empty_room_code_is_rejected() {
        let (transport, _, _) = MockTransport::new(vec![]);
        let mut details = room_details();
        details.code = "  ".to_string();
        let config = FlagDashConfig::new("alice", details);
        let err = FlagDashClient::start(transport, config).unwrap_err();
        assert!(matches!(err, FlagDashError::InvalidRoom));
    }

    // ── Startup tests ───────────────────────────────────────────────

    #[tokio::test]
    async fn start_sends_join_and_emits_connected() {
        let (_client, mut events, sent, _) = start_client("alice", vec![]);

        let event = events.recv().await.unwrap();
        assert!(matches!(event, FlagDashEvent::Connected));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let messages = sent.lock().unwrap();
        assert_eq!(messages.len(), 1);
        let value: serde_json::Value = serde_json::from_str(&messages[0]).unwrap();
        assert_eq!(value["event"], "joinRoom");
        assert_eq!(value["username"], "alice");
        assert_eq!(value["roomID"], "AB12");
    }

    #[tokio::test]
    async fn own_echo_sets_player_id() {
        let (client, mut events, _, _) =
            start_client("alice", vec![Some(Ok(player_joined("p1", "alice")))]);

        let mut saw_assignment = false;
        for _ in 0..3 {
            match events.recv().await.unwrap() {
                FlagDashEvent::PlayerIdAssigned { player_id } => {
                    assert_eq!(player_id, "p1");
                    saw_assignment = true;
                    break;
                }
                _ => continue,
            }
        }
        assert!(saw_assignment);
        assert_eq!(client.current_player_id().await, Some("p1".to_string()));
    }

    // ── Disconnect tests ────────────────────────────────────────────

    #[tokio::test]
    async fn server_close_emits_disconnected() {
        let (client, mut events, _, _) = start_client("alice", vec![None]);

        let first = events.recv().await.unwrap();
        assert!(matches!(first, FlagDashEvent::Connected));

        let second = events.recv().await.unwrap();
        assert!(matches!(second, FlagDashEvent::Disconnected { reason: None }));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn transport_error_emits_disconnected_with_reason() {
        let (_client, mut events, _, _) = start_client(
            "alice",
            vec![Some(Err(FlagDashError::TransportReceive(
                "connection reset".to_string(),
            )))],
        );

        loop {
            match events.recv().await.unwrap() {
                FlagDashEvent::Disconnected { reason } => {
                    let reason = reason.unwrap();
                    assert!(reason.contains("connection reset"));
                    break;
                }
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn commands_fail_after_disconnect() {
        let (client, mut events, _, _) = start_client("alice", vec![None]);

        loop {
            if let FlagDashEvent::Disconnected { .. } = events.recv().await.unwrap() {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = client.submit_answer("France").unwrap_err();
        assert!(matches!(err, FlagDashError::NotConnected));
    }

    // ── Shutdown tests ──────────────────────────────────────────────

    #[tokio::test]
    async fn shutdown_closes_transport_and_emits_disconnected() {
        let (mut client, mut events, _, closed) = start_client("alice", vec![]);

        let first = events.recv().await.unwrap();
        assert!(matches!(first, FlagDashEvent::Connected));

        client.shutdown().await;

        let second = events.recv().await.unwrap();
        assert!(matches!(second, FlagDashEvent::Disconnected { .. }));
        assert!(events.recv().await.is_none());
        assert!(closed.load(Ordering::SeqCst));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let (mut client, _events, _, _) = start_client("alice", vec![]);
        client.shutdown().await;
        client.shutdown().await;
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn shutdown_aborts_a_hanging_transport() {
        let config = FlagDashConfig::new("alice", room_details())
            .with_shutdown_timeout(Duration::from_millis(100));
        let (mut client, _events) =
            FlagDashClient::start(HangingCloseTransport, config).unwrap();

        // Must return despite close() never completing.
        client.shutdown().await;
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_loop() {
        let (client, mut events, _, _) = start_client("alice", vec![]);

        let first = events.recv().await.unwrap();
        assert!(matches!(first, FlagDashEvent::Connected));

        drop(client);

        // The loop is aborted (or sees the closed command channel); either
        // way the event channel ends.
        loop {
            match events.recv().await {
                Some(FlagDashEvent::Disconnected { .. }) | None => break,
                Some(_) => continue,
            }
        }
    }

    // ── Host gating tests ───────────────────────────────────────────

    #[tokio::test]
    async fn non_host_cannot_start_the_game() {
        let (transport, sent, _) = MockTransport::new(vec![]);
        let config = FlagDashConfig::new("bobby", room_details());
        let (client, _events) = FlagDashClient::start(transport, config).unwrap();

        let err = client.start_game().unwrap_err();
        assert!(matches!(err, FlagDashError::NotHost));

        tokio::time::sleep(Duration::from_millis(50)).await;
        // Only the join announcement went out.
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn host_start_sends_loadgame() {
        let (client, _events, sent, _) = start_client("alice", vec![]);
        assert!(client.is_host());

        client.start_game().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let messages = sent.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], r#"{"event":"loadgame"}"#);
    }

    // ── Backpressure tests ──────────────────────────────────────────

    #[tokio::test]
    async fn full_event_channel_drops_events_but_delivers_disconnected() {
        let mut incoming: Vec<Option<std::result::Result<String, FlagDashError>>> = Vec::new();
        for i in 0..20 {
            incoming.push(Some(Ok(player_joined(&format!("p{i}"), &format!("user{i:02}")))));
        }
        incoming.push(None);

        let (transport, _, _) = MockTransport::new(incoming);
        let config =
            FlagDashConfig::new("alice", room_details()).with_event_channel_capacity(1);
        let (_client, mut events) = FlagDashClient::start(transport, config).unwrap();

        // Let the loop flood the size-1 channel before we start reading.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut saw_disconnected = false;
        while let Some(event) = events.recv().await {
            if matches!(event, FlagDashEvent::Disconnected { .. }) {
                saw_disconnected = true;
            }
        }
        assert!(saw_disconnected);
    }

    // ── Misc ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn debug_impl_reports_room_and_state() {
        let (client, _events, _, _) = start_client("alice", vec![]);
        let output = format!("{client:?}");
        assert!(output.contains("AB12"));
        assert!(output.contains("is_host: true"));
    }

    #[test]
    fn client_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<FlagDashClient>();
    }
}
