//! # Tank Arena Server
//!
//! Authoritative real-time server for a top-down multiplayer tank arena.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TANK ARENA SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── constants.rs- Gameplay tuning                           │
//! │  ├── vec2.rs     - 2D vector                                 │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing                             │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── map.rs      - Tile grid                                 │
//! │  ├── collision.rs- Tank vs terrain, spawn search             │
//! │  ├── state.rs    - Arena, players, projectiles, pickups      │
//! │  ├── movement.rs - Timers, movement, fire trigger            │
//! │  ├── combat.rs   - Projectiles, lasers, explosions, rush     │
//! │  ├── pickup.rs   - Pickup spawning and collection            │
//! │  └── tick.rs     - Authoritative simulation loop             │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket gateway                         │
//! │  ├── protocol.rs - Message types                             │
//! │  └── session.rs  - Arena task, command queue, broadcast      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! The `core/` and `game/` modules are deterministic:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time dependencies
//! - All randomness from one seeded Xorshift128+ owned by the arena
//!
//! Given the same seed and the same inputs on the same build, the
//! simulation produces the same state hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::vec2::Vec2;
pub use core::rng::DeterministicRng;
pub use game::input::InputFrame;
pub use game::state::{ArenaState, Player, PlayerId};
pub use game::tick::{tick, ArenaConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Snapshot rate (Hz)
pub const SEND_RATE: u32 = 30;
