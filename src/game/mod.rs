//! Game Logic Module
//!
//! All arena simulation code. Deterministic for a given seed and input
//! sequence.
//!
//! ## Module Structure
//!
//! - `map`: Tile grid generation and wall lookup
//! - `collision`: Tank-vs-terrain checks and spawn search
//! - `state`: Arena state, players, projectiles, pickups
//! - `input`: Held-key input snapshot
//! - `movement`: Timers, movement and the fire trigger
//! - `combat`: Firing, lasers, projectiles, explosions, rush
//! - `pickup`: Pickup spawning, collection and equipping
//! - `events`: Events produced by a tick
//! - `tick`: Authoritative simulation loop

pub mod map;
pub mod collision;
pub mod state;
pub mod input;
pub mod movement;
pub mod combat;
pub mod pickup;
pub mod events;
pub mod tick;

// Re-export key types
pub use input::InputFrame;
pub use state::{ArenaState, Player, PlayerId, PowerUp, Projectile, ProjectileKind, Pickup};
pub use tick::{tick, ArenaConfig, TickResult};
pub use events::{GameEvent, GameEventData};
