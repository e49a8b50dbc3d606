//! WebSocket Game Server
//!
//! Async WebSocket gateway. Every connection becomes a player in the single
//! arena; the arena task owns the simulation and ticks it at a fixed rate.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, error, info, instrument, warn};

use crate::game::input::InputFrame;
use crate::game::state::PlayerId;
use crate::game::tick::ArenaConfig;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::network::session::{ArenaSession, GatewayCommand, SessionConfig};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Tick rate for game simulation (Hz).
    pub tick_rate: u32,
    /// Snapshot rate (Hz). Must divide the tick rate.
    pub send_rate: u32,
    /// Capacity of the gateway -> arena command queue.
    pub command_queue_capacity: usize,
    /// Capacity of each client's outbound queue.
    pub outbound_queue_capacity: usize,
    /// Arena seed; drawn from the clock when unset.
    pub seed: Option<u64>,
    /// Simulation settings.
    pub arena: ArenaConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 64,
            tick_rate: crate::TICK_RATE,
            send_rate: crate::SEND_RATE,
            command_queue_capacity: 1024,
            outbound_queue_capacity: 64,
            seed: None,
            arena: ArenaConfig::default(),
            version: crate::VERSION.to_string(),
        }
    }
}

impl ServerConfig {
    /// Check the rates and capacities.
    pub fn validate(&self) -> Result<(), GameServerError> {
        if self.tick_rate == 0 || self.send_rate == 0 {
            return Err(GameServerError::InvalidConfig(
                "tick_rate and send_rate must be nonzero".to_string(),
            ));
        }
        if self.send_rate > self.tick_rate || self.tick_rate % self.send_rate != 0 {
            return Err(GameServerError::InvalidConfig(format!(
                "send_rate {} must divide tick_rate {}",
                self.send_rate, self.tick_rate
            )));
        }
        if self.max_connections == 0 {
            return Err(GameServerError::InvalidConfig(
                "max_connections must be nonzero".to_string(),
            ));
        }
        if self.command_queue_capacity == 0 || self.outbound_queue_capacity == 0 {
            return Err(GameServerError::InvalidConfig(
                "queue capacities must be nonzero".to_string(),
            ));
        }
        Ok(())
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            tick_rate: self.tick_rate,
            send_rate: self.send_rate,
            server_version: self.version.clone(),
        }
    }
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Configuration rejected by `validate`.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The arena task ended while the server was still accepting.
    #[error("Arena loop stopped unexpectedly")]
    ArenaStopped,
}

/// Seed from the wall clock.
pub fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Decrements the live connection count when a connection task ends.
struct ConnectionSlot(Arc<AtomicUsize>);

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// Live connections.
    connections: Arc<AtomicUsize>,
    /// Next player id to hand out.
    next_player_id: Arc<AtomicU32>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            connections: Arc::new(AtomicUsize::new(0)),
            next_player_id: Arc::new(AtomicU32::new(1)),
            shutdown_tx,
        }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        self.config.validate()?;
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown.
    #[instrument(skip_all)]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), GameServerError> {
        self.config.validate()?;
        let addr = listener.local_addr()?;
        info!("Game server listening on {}", addr);

        let seed = self.config.seed.unwrap_or_else(seed_from_clock);
        let session = ArenaSession::new(seed, self.config.arena.clone(), self.config.session_config());
        let (command_tx, command_rx) = mpsc::channel(self.config.command_queue_capacity);

        let mut arena_handle = tokio::spawn(Self::run_arena_loop(
            session,
            command_rx,
            self.config.tick_rate,
            self.shutdown_tx.subscribe(),
        ));

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let outcome = loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            if self.connections.load(Ordering::SeqCst) >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", peer);
                                tokio::spawn(Self::reject_connection(stream, peer));
                                continue;
                            }

                            self.connections.fetch_add(1, Ordering::SeqCst);
                            debug!("New connection from {}", peer);
                            self.handle_connection(stream, peer, command_tx.clone());
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = &mut arena_handle => {
                    error!("Arena loop stopped");
                    break Err(GameServerError::ArenaStopped);
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break Ok(());
                }
            }
        };

        if outcome.is_ok() {
            // Let the arena notify clients before returning
            let _ = arena_handle.await;
        }

        outcome
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        commands: mpsc::Sender<GatewayCommand>,
    ) {
        let slot = ConnectionSlot(self.connections.clone());
        let player_id = PlayerId::new(self.next_player_id.fetch_add(1, Ordering::SeqCst));
        let outbound_capacity = self.config.outbound_queue_capacity;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let _slot = slot;

            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {}: {}", peer, e);
                    return;
                }
            };

            let (ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, msg_rx) = mpsc::channel::<ServerMessage>(outbound_capacity);
            let (input_tx, input_rx) = watch::channel(InputFrame::new());

            let join = GatewayCommand::Join {
                player_id,
                sender: msg_tx.clone(),
                input: input_rx,
            };
            if commands.send(join).await.is_err() {
                return;
            }
            info!(%player_id, %peer, "Client connected");

            let mut writer = tokio::spawn(Self::write_loop(ws_sender, msg_rx));

            loop {
                tokio::select! {
                    frame = ws_receiver.next() => {
                        let parsed = match frame {
                            Some(Ok(Message::Text(text))) => ClientMessage::from_json(&text)
                                .map_err(|e| e.to_string()),
                            Some(Ok(Message::Binary(data))) => ClientMessage::from_bytes(&data)
                                .map_err(|e| e.to_string()),
                            Some(Ok(Message::Close(_))) | None => {
                                debug!(%player_id, "Client closed connection");
                                break;
                            }
                            Some(Err(e)) => {
                                debug!(%player_id, "WebSocket error: {}", e);
                                break;
                            }
                            // Control frames are answered by tungstenite
                            Some(Ok(_)) => continue,
                        };

                        match parsed {
                            Ok(message) => {
                                if !Self::forward(&commands, &input_tx, player_id, message) {
                                    break;
                                }
                            }
                            Err(e) => {
                                debug!(%player_id, "Invalid message: {}", e);
                                // A garbled frame releases every held key
                                input_tx.send_replace(InputFrame::new());
                                let _ = msg_tx.try_send(ServerMessage::error(
                                    ErrorCode::InvalidInput,
                                    "Invalid message format",
                                ));
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            let _ = commands.send(GatewayCommand::Leave { player_id }).await;
            drop(msg_tx);

            // Give queued messages (e.g. shutdown) a moment to flush
            if tokio::time::timeout(Duration::from_secs(1), &mut writer).await.is_err() {
                writer.abort();
            }

            info!(%player_id, %peer, "Client disconnected");
        });
    }

    /// Hand a client message to the arena. Held keys overwrite the player's
    /// input slot; everything else is queued. Returns false once the arena is
    /// gone.
    fn forward(
        commands: &mpsc::Sender<GatewayCommand>,
        input: &watch::Sender<InputFrame>,
        player_id: PlayerId,
        message: ClientMessage,
    ) -> bool {
        let command = match message {
            ClientMessage::Input(snapshot) => {
                input.send_replace(snapshot.to_input_frame());
                return !commands.is_closed();
            }
            ClientMessage::Equip { slot } => GatewayCommand::Equip { player_id, slot },
            ClientMessage::Ping { timestamp } => GatewayCommand::Ping { player_id, timestamp },
        };

        match commands.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(command)) => {
                warn!(%player_id, ?command, "Command queue full, dropping");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Drain a client's outbound queue onto its socket.
    async fn write_loop(mut ws_sender: WsSink, mut outbound: mpsc::Receiver<ServerMessage>) {
        while let Some(msg) = outbound.recv().await {
            let text = match msg.to_json() {
                Ok(t) => t,
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    }

    /// Tell an over-limit client the server is full, then hang up.
    async fn reject_connection(stream: TcpStream, peer: SocketAddr) {
        let mut ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                debug!("WebSocket handshake failed for {}: {}", peer, e);
                return;
            }
        };

        let message = ServerMessage::error(ErrorCode::ServerFull, "Server is full");
        if let Ok(text) = message.to_json() {
            let _ = ws_stream.send(Message::Text(text)).await;
        }
        let _ = ws_stream.close(None).await;
    }

    /// Fixed-rate arena loop: drain commands, tick, publish.
    async fn run_arena_loop(
        mut session: ArenaSession,
        mut commands: mpsc::Receiver<GatewayCommand>,
        tick_rate: u32,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) {
        let tick_duration = Duration::from_micros(1_000_000 / tick_rate.max(1) as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    session.drain_commands(&mut commands);
                    session.run_tick();
                }
                _ = shutdown_rx.recv() => {
                    break;
                }
            }
        }

        info!(tick = session.current_tick(), players = session.player_count(), "Arena stopping");
        session.shutdown("Server shutting down");
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_tungstenite::connect_async;

    type ClientStream = WebSocketStream<tokio_tungstenite::MaybeTlsStream<TcpStream>>;

    async fn start_server(config: ServerConfig) -> (Arc<GameServer>, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Arc::new(GameServer::new(config));

        let running = server.clone();
        tokio::spawn(async move {
            running.serve(listener).await.unwrap();
        });

        (server, addr)
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            seed: Some(7),
            ..ServerConfig::default()
        }
    }

    async fn next_message(client: &mut ClientStream) -> ServerMessage {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .expect("timed out waiting for frame")
                .expect("stream ended")
                .expect("websocket error");
            if let Message::Text(text) = frame {
                return ServerMessage::from_json(&text).unwrap();
            }
        }
    }

    async fn wait_for<F>(client: &mut ClientStream, mut predicate: F) -> ServerMessage
    where
        F: FnMut(&ServerMessage) -> bool,
    {
        loop {
            let message = next_message(client).await;
            if predicate(&message) {
                return message;
            }
        }
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.send_rate, 30);
        assert_eq!(config.outbound_queue_capacity, 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let bad_rate = ServerConfig {
            send_rate: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(bad_rate.validate(), Err(GameServerError::InvalidConfig(_))));

        let not_divisor = ServerConfig {
            send_rate: 25,
            ..ServerConfig::default()
        };
        assert!(not_divisor.validate().is_err());

        let faster_snapshots = ServerConfig {
            send_rate: 120,
            ..ServerConfig::default()
        };
        assert!(faster_snapshots.validate().is_err());

        let no_queue = ServerConfig {
            command_queue_capacity: 0,
            ..ServerConfig::default()
        };
        assert!(no_queue.validate().is_err());
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_config() {
        let server = GameServer::new(ServerConfig {
            tick_rate: 0,
            ..ServerConfig::default()
        });
        assert!(matches!(server.run().await, Err(GameServerError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_client_session_lifecycle() {
        let (server, addr) = start_server(test_config()).await;
        let (mut client, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        let ServerMessage::Welcome { player_id, tick_rate, .. } = next_message(&mut client).await else {
            panic!("expected welcome first");
        };
        assert_eq!(player_id, 1);
        assert_eq!(tick_rate, 60);
        assert!(matches!(next_message(&mut client).await, ServerMessage::Map(_)));

        // Snapshots flow
        let snapshot = wait_for(&mut client, |m| matches!(m, ServerMessage::State(_))).await;
        let ServerMessage::State(snapshot) = snapshot else {
            unreachable!()
        };
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].id, 1);

        // Malformed frame gets an error, the connection stays up
        client.send(Message::Text("{\"type\":\"dance\"}".to_string())).await.unwrap();
        let error = wait_for(&mut client, |m| matches!(m, ServerMessage::Error(_))).await;
        let ServerMessage::Error(error) = error else {
            unreachable!()
        };
        assert_eq!(error.code, ErrorCode::InvalidInput);

        client
            .send(Message::Text("{\"type\":\"ping\",\"timestamp\":5}".to_string()))
            .await
            .unwrap();
        let pong = wait_for(&mut client, |m| matches!(m, ServerMessage::Pong { .. })).await;
        assert!(matches!(pong, ServerMessage::Pong { timestamp: 5, .. }));

        assert_eq!(server.connection_count(), 1);

        server.shutdown();
        let shutdown = wait_for(&mut client, |m| matches!(m, ServerMessage::Shutdown { .. })).await;
        assert!(matches!(shutdown, ServerMessage::Shutdown { .. }));
    }

    #[tokio::test]
    async fn test_malformed_frame_releases_held_keys() {
        let mut config = test_config();
        config.arena.pickups.spawn_chance = 0.0;
        let (server, addr) = start_server(config).await;
        let (mut client, _) = connect_async(format!("ws://{}", addr)).await.unwrap();

        let released = tokio::time::timeout(Duration::from_secs(10), async {
            client
                .send(Message::Text("{\"type\":\"input\",\"fire\":true}".to_string()))
                .await
                .unwrap();
            wait_for(&mut client, |m| {
                matches!(m, ServerMessage::State(s) if !s.projectiles.is_empty())
            })
            .await;

            client.send(Message::Text("garbage".to_string())).await.unwrap();
            wait_for(&mut client, |m| matches!(m, ServerMessage::Error(_))).await;

            // Held fire never lets the reload timer rest at zero
            wait_for(&mut client, |m| {
                matches!(m, ServerMessage::State(s) if s.players[0].reload_ticks == 0)
            })
            .await
        })
        .await;

        assert!(released.is_ok(), "fire was still held after a malformed frame");
        server.shutdown();
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let (server, addr) = start_server(ServerConfig {
            max_connections: 1,
            ..test_config()
        })
        .await;

        let (mut first, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        assert!(matches!(next_message(&mut first).await, ServerMessage::Welcome { .. }));

        let (mut second, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
        let ServerMessage::Error(error) = next_message(&mut second).await else {
            panic!("expected error");
        };
        assert_eq!(error.code, ErrorCode::ServerFull);

        server.shutdown();
    }
}
