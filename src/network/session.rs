//! Arena Session
//!
//! The single owner of the arena simulation. Connection tasks talk to it only
//! through [`GatewayCommand`]s; it drains them at the start of each tick, runs
//! the tick and fans the results out to each client's outbound queue.
//!
//! Held keys bypass the command queue: each player has a [`watch`] slot that
//! the connection overwrites and the arena reads once per tick, so the newest
//! snapshot always wins and one busy client cannot crowd out another.

use std::collections::BTreeMap;

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::game::events::GameEvent;
use crate::game::input::InputFrame;
use crate::game::pickup::equip_slot;
use crate::game::state::{ArenaState, PlayerId};
use crate::game::tick::{tick, ArenaConfig, TickResult};
use crate::network::protocol::{MapInfo, ServerMessage, StateSnapshot};

/// Commands sent from connection tasks to the arena task.
#[derive(Debug)]
pub enum GatewayCommand {
    /// A client connected.
    Join {
        /// Id assigned by the gateway
        player_id: PlayerId,
        /// The client's outbound queue
        sender: mpsc::Sender<ServerMessage>,
        /// Latest held keys, overwritten by the connection
        input: watch::Receiver<InputFrame>,
    },
    /// A client disconnected.
    Leave {
        /// Departing player
        player_id: PlayerId,
    },
    /// Activate an inventory slot.
    Equip {
        /// Requesting player
        player_id: PlayerId,
        /// Inventory slot, 0-based
        slot: u8,
    },
    /// Latency probe.
    Ping {
        /// Requesting player
        player_id: PlayerId,
        /// Client timestamp to echo
        timestamp: u64,
    },
}

/// Configuration for the arena session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Snapshots per second.
    pub send_rate: u32,
    /// Version reported in `welcome`.
    pub server_version: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate: crate::TICK_RATE,
            send_rate: crate::SEND_RATE,
            server_version: crate::VERSION.to_string(),
        }
    }
}

impl SessionConfig {
    /// Ticks between snapshots.
    pub fn snapshot_interval(&self) -> u64 {
        (self.tick_rate / self.send_rate.max(1)).max(1) as u64
    }
}

/// The arena session.
pub struct ArenaSession {
    /// Session configuration.
    pub config: SessionConfig,
    /// Simulation configuration.
    arena_config: ArenaConfig,
    /// Authoritative state.
    state: ArenaState,
    /// Outbound queue per connected player.
    connections: BTreeMap<PlayerId, mpsc::Sender<ServerMessage>>,
    /// Latest-input slot per connected player.
    inputs: BTreeMap<PlayerId, watch::Receiver<InputFrame>>,
}

impl ArenaSession {
    /// Create a session with a freshly generated map.
    pub fn new(seed: u64, arena_config: ArenaConfig, config: SessionConfig) -> Self {
        let state = ArenaState::new(seed, &arena_config.map);
        info!(seed, cols = state.map.cols(), rows = state.map.rows(), "Arena created");
        Self::with_state(state, arena_config, config)
    }

    /// Create a session around an existing state.
    pub fn with_state(state: ArenaState, arena_config: ArenaConfig, config: SessionConfig) -> Self {
        Self {
            config,
            arena_config,
            state,
            connections: BTreeMap::new(),
            inputs: BTreeMap::new(),
        }
    }

    /// Authoritative state.
    pub fn state(&self) -> &ArenaState {
        &self.state
    }

    /// Number of connected players.
    pub fn player_count(&self) -> usize {
        self.connections.len()
    }

    /// Current tick.
    pub fn current_tick(&self) -> u64 {
        self.state.tick
    }

    /// Place a new player and send them `welcome` then `map`.
    pub fn add_player(
        &mut self,
        player_id: PlayerId,
        sender: mpsc::Sender<ServerMessage>,
        input: watch::Receiver<InputFrame>,
    ) {
        if self.connections.contains_key(&player_id) {
            warn!(%player_id, "Duplicate join ignored");
            return;
        }

        let position = self
            .state
            .add_player(player_id, self.arena_config.join_spawn_attempts);
        info!(%player_id, %position, players = self.connections.len() + 1, "Player joined");

        let welcome = ServerMessage::Welcome {
            player_id: player_id.get(),
            tick_rate: self.config.tick_rate,
            send_rate: self.config.send_rate,
            server_version: self.config.server_version.clone(),
        };
        let map = ServerMessage::Map(MapInfo::from_map(&self.state.map));
        for message in [welcome, map] {
            if sender.try_send(message).is_err() {
                warn!(%player_id, "Could not queue join messages");
                break;
            }
        }

        self.connections.insert(player_id, sender);
        self.inputs.insert(player_id, input);
    }

    /// Remove a player immediately.
    pub fn remove_player(&mut self, player_id: PlayerId) -> bool {
        self.inputs.remove(&player_id);
        let connected = self.connections.remove(&player_id).is_some();
        if self.state.remove_player(player_id).is_some() {
            info!(%player_id, players = self.connections.len(), "Player left");
            true
        } else {
            connected
        }
    }

    /// Apply one gateway command.
    pub fn handle_command(&mut self, command: GatewayCommand) {
        match command {
            GatewayCommand::Join { player_id, sender, input } => {
                self.add_player(player_id, sender, input)
            }
            GatewayCommand::Leave { player_id } => {
                self.remove_player(player_id);
            }
            GatewayCommand::Equip { player_id, slot } => {
                equip_slot(&mut self.state, player_id, slot as usize);
            }
            GatewayCommand::Ping { player_id, timestamp } => {
                let pong = ServerMessage::Pong {
                    timestamp,
                    server_tick: self.state.tick,
                };
                self.send_to(player_id, pong);
            }
        }
    }

    /// Drain every queued command without waiting. Returns how many were applied.
    pub fn drain_commands(&mut self, commands: &mut mpsc::Receiver<GatewayCommand>) -> usize {
        let mut applied = 0;
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    self.handle_command(command);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// Inputs written since the previous tick. Unchanged slots are left
    /// out so the stored input carries over.
    fn collect_inputs(&mut self) -> BTreeMap<PlayerId, InputFrame> {
        let mut changed = BTreeMap::new();
        for (player_id, slot) in self.inputs.iter_mut() {
            if matches!(slot.has_changed(), Ok(true)) {
                changed.insert(*player_id, *slot.borrow_and_update());
            }
        }
        changed
    }

    /// Run a single tick and publish its results.
    pub fn run_tick(&mut self) -> TickResult {
        let inputs = self.collect_inputs();
        let result = tick(&mut self.state, &inputs, &self.arena_config);

        if result.idle {
            return result;
        }

        #[cfg(feature = "debug-tracing")]
        trace!(
            tick = self.state.tick,
            hash = %crate::core::hash::to_hex(&self.state.compute_hash()),
            "Tick complete"
        );

        self.publish_events(&result.events);

        if self.state.tick % self.config.snapshot_interval() == 0 {
            let snapshot = ServerMessage::State(StateSnapshot::from_state(&self.state));
            self.broadcast(&snapshot);
        }

        result
    }

    fn publish_events(&self, events: &[GameEvent]) {
        for event in events {
            if !event.is_presentation() {
                debug!(tick = event.tick, event = ?event.data, "Game event");
                continue;
            }
            if let Some(message) = ServerMessage::from_event(event) {
                self.broadcast(&message);
            }
        }
    }

    /// Offer a message to every client; full queues drop it.
    pub fn broadcast(&self, message: &ServerMessage) {
        for (player_id, sender) in &self.connections {
            offer(*player_id, sender, message.clone());
        }
    }

    /// Offer a message to one client.
    pub fn send_to(&self, player_id: PlayerId, message: ServerMessage) {
        if let Some(sender) = self.connections.get(&player_id) {
            offer(player_id, sender, message);
        }
    }

    /// Tell every client the server is going away.
    pub fn shutdown(&mut self, reason: &str) {
        self.broadcast(&ServerMessage::Shutdown {
            reason: reason.to_string(),
        });
        self.connections.clear();
    }
}

fn offer(player_id: PlayerId, sender: &mpsc::Sender<ServerMessage>, message: ServerMessage) {
    match sender.try_send(message) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => trace!(%player_id, "Outbound queue full, message dropped"),
        Err(TrySendError::Closed(_)) => trace!(%player_id, "Outbound queue closed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::Vec2;
    use crate::game::map::{MapConfig, TileMap};
    use crate::game::pickup::PickupSpawnConfig;
    use crate::game::state::PowerUp;

    fn quiet_config() -> ArenaConfig {
        ArenaConfig {
            pickups: PickupSpawnConfig {
                spawn_chance: 0.0,
                ..PickupSpawnConfig::default()
            },
            ..ArenaConfig::default()
        }
    }

    fn create_test_session() -> ArenaSession {
        let state = ArenaState::with_map(42, TileMap::open(&MapConfig::default()));
        ArenaSession::with_state(state, quiet_config(), SessionConfig::default())
    }

    /// Join `id` with an outbound queue of `capacity`.
    fn connect(
        session: &mut ArenaSession,
        id: u32,
        capacity: usize,
    ) -> (mpsc::Receiver<ServerMessage>, watch::Sender<InputFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        let (input_tx, input_rx) = watch::channel(InputFrame::new());
        session.add_player(PlayerId::new(id), tx, input_rx);
        (rx, input_tx)
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn test_join_sends_welcome_then_map() {
        let mut session = create_test_session();
        let (tx, mut rx) = mpsc::channel(64);
        let (_input_tx, input_rx) = watch::channel(InputFrame::new());

        session.handle_command(GatewayCommand::Join {
            player_id: PlayerId::new(1),
            sender: tx,
            input: input_rx,
        });

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            messages[0],
            ServerMessage::Welcome { player_id: 1, tick_rate: 60, send_rate: 30, .. }
        ));
        let ServerMessage::Map(map) = &messages[1] else {
            panic!("expected map");
        };
        assert_eq!(map.cols, 32);
        assert_eq!(session.player_count(), 1);
        assert!(session.state().get_player(PlayerId::new(1)).is_some());
    }

    #[tokio::test]
    async fn test_leave_removes_player() {
        let mut session = create_test_session();
        let id = PlayerId::new(1);
        let (_rx, _input) = connect(&mut session, 1, 64);

        assert!(session.remove_player(id));
        assert_eq!(session.player_count(), 0);
        assert!(session.state().get_player(id).is_none());
        assert!(!session.remove_player(id));
    }

    #[tokio::test]
    async fn test_drain_commands_applies_queue() {
        let mut session = create_test_session();
        let (cmd_tx, mut cmd_rx) = mpsc::channel(16);
        let (tx, _rx) = mpsc::channel(64);
        let (_input_tx, input_rx) = watch::channel(InputFrame::new());
        let id = PlayerId::new(1);

        cmd_tx
            .send(GatewayCommand::Join { player_id: id, sender: tx, input: input_rx })
            .await
            .unwrap();
        cmd_tx.send(GatewayCommand::Equip { player_id: id, slot: 0 }).await.unwrap();

        assert_eq!(session.drain_commands(&mut cmd_rx), 2);
        assert_eq!(session.drain_commands(&mut cmd_rx), 0);
        assert_eq!(session.player_count(), 1);
    }

    #[tokio::test]
    async fn test_latest_input_wins() {
        let mut session = create_test_session();
        let id = PlayerId::new(1);
        let (_rx, input) = connect(&mut session, 1, 64);
        session.state.get_player_mut(id).unwrap().position = Vec2::new(400.0, 300.0);

        input.send_replace(InputFrame::new().with(InputFrame::FLAG_FORWARD));
        input.send_replace(InputFrame::new().with(InputFrame::FLAG_STRAFE_RIGHT));
        session.run_tick();

        // Strafe right, no forward
        assert_eq!(session.state().get_player(id).unwrap().position, Vec2::new(403.0, 300.0));

        // No new write: the held keys carry over
        session.run_tick();
        assert_eq!(session.state().get_player(id).unwrap().position, Vec2::new(406.0, 300.0));
    }

    #[tokio::test]
    async fn test_released_keys_stop_fire() {
        let mut session = create_test_session();
        let id = PlayerId::new(1);
        let (_rx, input) = connect(&mut session, 1, 64);

        input.send_replace(InputFrame::new().with(InputFrame::FLAG_FIRE));
        session.run_tick();
        assert_eq!(session.state().projectiles.len(), 1);

        input.send_replace(InputFrame::new());
        for _ in 0..60 {
            session.run_tick();
        }

        let player = session.state().get_player(id).unwrap();
        assert!(!player.input.fire());
        assert_eq!(player.reload_ticks, 0);
    }

    #[tokio::test]
    async fn test_empty_session_is_idle() {
        let mut session = create_test_session();

        let result = session.run_tick();
        assert!(result.idle);
        assert_eq!(session.current_tick(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_cadence() {
        let mut session = create_test_session();
        let (mut rx, _input) = connect(&mut session, 1, 64);
        drain(&mut rx);

        let mut snapshot_ticks = Vec::new();
        for _ in 0..6 {
            session.run_tick();
            for message in drain(&mut rx) {
                if let ServerMessage::State(snapshot) = message {
                    snapshot_ticks.push(snapshot.tick);
                }
            }
        }

        assert_eq!(snapshot_ticks, vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn test_full_queue_does_not_block_tick() {
        let mut session = create_test_session();
        let (mut rx, _input) = connect(&mut session, 1, 2);

        for _ in 0..20 {
            session.run_tick();
        }

        assert_eq!(session.current_tick(), 20);
        // Only the join messages fit
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[tokio::test]
    async fn test_equip_command() {
        let mut session = create_test_session();
        let id = PlayerId::new(1);
        let (_rx, _input) = connect(&mut session, 1, 64);
        session.state.get_player_mut(id).unwrap().inventory[0] = Some(PowerUp::Laser);

        session.handle_command(GatewayCommand::Equip { player_id: id, slot: 0 });

        let player = session.state().get_player(id).unwrap();
        assert_eq!(player.active, Some(PowerUp::Laser));
        assert_eq!(player.inventory[0], None);

        // Out of range is a no-op
        session.handle_command(GatewayCommand::Equip { player_id: id, slot: 7 });
        assert_eq!(session.state().get_player(id).unwrap().active, Some(PowerUp::Laser));
    }

    #[tokio::test]
    async fn test_ping_answered_with_tick() {
        let mut session = create_test_session();
        let id = PlayerId::new(1);
        let (mut rx, _input) = connect(&mut session, 1, 64);
        session.run_tick();
        drain(&mut rx);

        session.handle_command(GatewayCommand::Ping { player_id: id, timestamp: 99 });

        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::Pong { timestamp: 99, server_tick: 1 }]
        );
    }

    #[tokio::test]
    async fn test_laser_effect_published_immediately() {
        let mut session = create_test_session();
        let id = PlayerId::new(1);
        let (mut rx, input) = connect(&mut session, 1, 64);
        session.state.get_player_mut(id).unwrap().activate(PowerUp::Laser);
        drain(&mut rx);

        input.send_replace(InputFrame::new().with(InputFrame::FLAG_FIRE));
        // Tick 1 is off-cadence, so only the effect arrives
        session.run_tick();

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], ServerMessage::Laser { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_notifies_clients() {
        let mut session = create_test_session();
        let (mut rx, _input) = connect(&mut session, 1, 64);
        drain(&mut rx);

        session.shutdown("maintenance");

        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::Shutdown { reason: "maintenance".to_string() }]
        );
    }

    #[test]
    fn test_snapshot_interval() {
        let config = SessionConfig {
            tick_rate: 60,
            send_rate: 20,
            ..SessionConfig::default()
        };
        assert_eq!(config.snapshot_interval(), 3);
        assert_eq!(SessionConfig::default().snapshot_interval(), 2);
    }
}
