//! Core deterministic primitives.
//!
//! Everything random or hashed in the arena flows through these types, so a
//! seed and an input sequence reproduce a match bit-for-bit on one platform.

pub mod constants;
pub mod vec2;
pub mod rng;
pub mod hash;

// Re-export core types
pub use vec2::Vec2;
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash};
