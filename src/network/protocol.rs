//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Text frames carry JSON tagged by `type`; a binary frame carries a single
//! bincode-encoded [`InputFrame`] as a compact alternative to `input`.

use serde::{Serialize, Deserialize};

use crate::core::hash::to_hex;
use crate::core::vec2::Vec2;
use crate::core::constants::INVENTORY_SLOTS;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::input::InputFrame;
use crate::game::map::TileMap;
use crate::game::state::{ArenaState, Pickup, Player, PowerUp, Projectile, ProjectileKind};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Held keys; replaces the stored input wholesale.
    Input(InputSnapshot),

    /// Activate an inventory slot.
    Equip {
        /// Inventory slot, 0-based
        slot: u8,
    },

    /// Ping for latency measurement.
    Ping {
        /// Client clock, echoed back
        timestamp: u64,
    },
}

/// Held-key snapshot as sent in JSON. Missing keys are not pressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSnapshot {
    /// Move up the screen
    pub forward: bool,
    /// Move down the screen
    pub back: bool,
    /// Move left
    pub strafe_left: bool,
    /// Move right
    pub strafe_right: bool,
    /// Rotate counter-clockwise
    pub turn_left: bool,
    /// Rotate clockwise
    pub turn_right: bool,
    /// Trigger held
    pub fire: bool,
}

impl InputSnapshot {
    /// Pack into the simulation's flag byte.
    pub fn to_input_frame(&self) -> InputFrame {
        let mut frame = InputFrame::new();
        frame.set(InputFrame::FLAG_FORWARD, self.forward);
        frame.set(InputFrame::FLAG_BACK, self.back);
        frame.set(InputFrame::FLAG_STRAFE_LEFT, self.strafe_left);
        frame.set(InputFrame::FLAG_STRAFE_RIGHT, self.strafe_right);
        frame.set(InputFrame::FLAG_TURN_LEFT, self.turn_left);
        frame.set(InputFrame::FLAG_TURN_RIGHT, self.turn_right);
        frame.set(InputFrame::FLAG_FIRE, self.fire);
        frame
    }
}

impl From<InputFrame> for InputSnapshot {
    fn from(frame: InputFrame) -> Self {
        Self {
            forward: frame.forward(),
            back: frame.back(),
            strafe_left: frame.strafe_left(),
            strafe_right: frame.strafe_right(),
            turn_left: frame.turn_left(),
            turn_right: frame.turn_right(),
            fire: frame.fire(),
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once after the connection is accepted.
    Welcome {
        /// Id of the receiving player
        player_id: u32,
        /// Simulation ticks per second
        tick_rate: u32,
        /// Snapshots per second
        send_rate: u32,
        /// Server build version
        server_version: String,
    },

    /// Tile grid, sent once after `welcome`.
    Map(MapInfo),

    /// Periodic full snapshot.
    State(StateSnapshot),

    /// One-shot laser beam effect.
    Laser {
        /// Muzzle position
        start: Vec2,
        /// End of the first segment
        first_end: Vec2,
        /// End of the rebound, if the beam hit a wall
        #[serde(default, skip_serializing_if = "Option::is_none")]
        second_end: Option<Vec2>,
    },

    /// One-shot explosion effect.
    Explosion {
        /// Blast centre x
        x: f32,
        /// Blast centre y
        y: f32,
    },

    /// Reply to ping.
    Pong {
        /// Echo of the client timestamp
        timestamp: u64,
        /// Arena tick when the ping was answered
        server_tick: u64,
    },

    /// Error message.
    Error(ServerError),

    /// Server is going away.
    Shutdown {
        /// Human-readable reason
        reason: String,
    },
}

/// Tile grid as rows of 0 (floor) and 1 (wall).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapInfo {
    /// Columns
    pub cols: u32,
    /// Rows
    pub rows: u32,
    /// Tile edge in world units
    pub tile_size: f32,
    /// `rows` rows of `cols` cells
    pub grid: Vec<Vec<u8>>,
}

impl MapInfo {
    /// Describe a tile map.
    pub fn from_map(map: &TileMap) -> Self {
        Self {
            cols: map.cols(),
            rows: map.rows(),
            tile_size: map.tile_size(),
            grid: map.grid(),
        }
    }
}

/// Full arena snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Arena tick
    pub tick: u64,
    /// All players, dead ones included
    pub players: Vec<PlayerView>,
    /// Live projectiles
    pub projectiles: Vec<ProjectileView>,
    /// Pickups on the ground
    pub pickups: Vec<PickupView>,
    /// Hex-encoded state hash
    pub state_hash: String,
}

impl StateSnapshot {
    /// Capture the current arena.
    pub fn from_state(state: &ArenaState) -> Self {
        Self {
            tick: state.tick,
            players: state.players.values().map(PlayerView::from).collect(),
            projectiles: state.projectiles.iter().map(ProjectileView::from).collect(),
            pickups: state.pickups.iter().map(PickupView::from).collect(),
            state_hash: to_hex(&state.compute_hash()),
        }
    }
}

/// Per-player state in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    /// Player id
    pub id: u32,
    /// Position x
    pub x: f32,
    /// Position y
    pub y: f32,
    /// Facing, radians
    pub angle: f32,
    /// CSS colour string
    pub color: String,
    /// Waiting to respawn
    pub dead: bool,
    /// Hit points
    pub health: u32,
    /// Kills
    pub score: u32,
    /// Ticks until respawn while dead
    pub respawn_ticks: u32,
    /// Stored power-ups
    pub inventory: [Option<PowerUp>; INVENTORY_SLOTS],
    /// Power-up in effect
    pub active: Option<PowerUp>,
    /// Ticks left on a timed power-up
    pub buff_ticks: u32,
    /// Ticks until the next shot
    pub reload_ticks: u32,
    /// Ticks of spawn protection left
    pub invulnerable_ticks: u32,
    /// Hidden by stealth
    pub invisible: bool,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            id: player.id.get(),
            x: player.position.x,
            y: player.position.y,
            angle: player.angle,
            color: player.color.clone(),
            dead: player.dead,
            health: player.health,
            score: player.score,
            respawn_ticks: player.respawn_ticks,
            inventory: player.inventory,
            active: player.active,
            buff_ticks: player.buff_ticks,
            reload_ticks: player.reload_ticks,
            invulnerable_ticks: player.invulnerable_ticks,
            invisible: player.invisible,
        }
    }
}

/// Projectile in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    /// Projectile id
    pub id: u32,
    /// Position x
    pub x: f32,
    /// Position y
    pub y: f32,
    /// Velocity x, units per tick
    pub vx: f32,
    /// Velocity y, units per tick
    pub vy: f32,
    /// Behaviour on impact
    pub kind: ProjectileKind,
    /// Wall bounces left
    pub bounces: i32,
    /// Shooter id
    pub owner: u32,
}

impl From<&Projectile> for ProjectileView {
    fn from(projectile: &Projectile) -> Self {
        Self {
            id: projectile.id,
            x: projectile.position.x,
            y: projectile.position.y,
            vx: projectile.velocity.x,
            vy: projectile.velocity.y,
            kind: projectile.kind,
            bounces: projectile.bounces,
            owner: projectile.owner.get(),
        }
    }
}

/// Pickup in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupView {
    /// Pickup id
    pub id: u32,
    /// Position x
    pub x: f32,
    /// Position y
    pub y: f32,
    /// Power-up granted
    pub kind: PowerUp,
}

impl From<&Pickup> for PickupView {
    fn from(pickup: &Pickup) -> Self {
        Self {
            id: pickup.id,
            x: pickup.position.x,
            y: pickup.position.y,
            kind: pickup.kind,
        }
    }
}

/// Error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Frame could not be parsed.
    InvalidInput,
    /// Connection limit reached.
    ServerFull,
    /// Internal error.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Decode a binary frame: one bincode-encoded input frame.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        let frame: InputFrame = bincode::deserialize(data)?;
        Ok(ClientMessage::Input(InputSnapshot::from(frame)))
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Build an error message.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::Error(ServerError {
            code,
            message: message.into(),
        })
    }

    /// Client-facing effect for a presentation event, if it has one.
    pub fn from_event(event: &GameEvent) -> Option<Self> {
        match &event.data {
            GameEventData::LaserFired { start, first_end, second_end, .. } => {
                Some(ServerMessage::Laser {
                    start: *start,
                    first_end: *first_end,
                    second_end: *second_end,
                })
            }
            GameEventData::Explosion { position, .. } => Some(ServerMessage::Explosion {
                x: position.x,
                y: position.y,
            }),
            _ => None,
        }
    }
}
