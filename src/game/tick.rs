//! Authoritative Simulation Tick
//!
//! The fixed-rate loop body. Given the same starting state and the same
//! inputs it always produces the same result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::constants::{JOIN_SPAWN_ATTEMPTS, RESPAWN_SPAWN_ATTEMPTS};
use crate::game::combat::{advance_projectiles, resolve_projectile_hits, resolve_rush};
use crate::game::events::GameEvent;
use crate::game::input::InputFrame;
use crate::game::map::MapConfig;
use crate::game::movement::resolve_players;
use crate::game::pickup::{collect_pickups, maybe_spawn_pickup, PickupSpawnConfig};
use crate::game::state::{ArenaState, PlayerId};

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick (including any queued by commands)
    pub events: Vec<GameEvent>,
    /// The arena was empty and nothing was simulated
    pub idle: bool,
}

/// Configuration for arena simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Map generation
    pub map: MapConfig,
    /// Pickup spawning
    pub pickups: PickupSpawnConfig,
    /// Spawn search attempts when a player joins
    pub join_spawn_attempts: u32,
    /// Spawn search attempts when a player respawns
    pub respawn_spawn_attempts: u32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            map: MapConfig::default(),
            pickups: PickupSpawnConfig::default(),
            join_spawn_attempts: JOIN_SPAWN_ATTEMPTS,
            respawn_spawn_attempts: RESPAWN_SPAWN_ATTEMPTS,
        }
    }
}

/// Run one simulation tick.
///
/// # Arguments
///
/// * `state` - The arena state (will be mutated)
/// * `inputs` - Input snapshots received since the last tick (BTreeMap for
///   deterministic order!). Players not listed keep their previous input.
/// * `config` - Arena configuration
///
/// # Phase order
///
/// inputs → movement (+fire) → projectile motion → projectile vs tank →
/// rush → pickup collection → pickup spawning.
///
/// An arena with no players, projectiles or pickups is idle: nothing
/// changes, not even the tick counter.
pub fn tick(
    state: &mut ArenaState,
    inputs: &BTreeMap<PlayerId, InputFrame>,
    config: &ArenaConfig,
) -> TickResult {
    let mut result = TickResult::default();

    if state.is_idle() {
        result.idle = true;
        return result;
    }

    // 0. Advance tick counter
    state.tick += 1;

    // 1. Apply player inputs
    for (player_id, frame) in inputs {
        state.set_input(*player_id, *frame);
    }

    // 2. Timers, movement, firing
    resolve_players(state, config.respawn_spawn_attempts);

    // 3. Projectile motion and terrain
    advance_projectiles(state);

    // 4. Projectile vs tank
    resolve_projectile_hits(state);

    // 5. Rush contact
    resolve_rush(state);

    // 6. Pickups
    collect_pickups(state);

    // 7. Spawn new pickups
    maybe_spawn_pickup(state, &config.pickups);

    result.events = state.take_events();
    result
}

/// Replay recorded inputs for `tick_count` ticks.
///
/// Frame `t` of each player's recording is applied on tick `t`; players
/// whose recording is shorter keep their last frame.
pub fn replay(
    state: &mut ArenaState,
    recorded: &BTreeMap<PlayerId, Vec<InputFrame>>,
    tick_count: usize,
    config: &ArenaConfig,
) -> Vec<GameEvent> {
    let mut all_events = Vec::new();

    for t in 0..tick_count {
        let tick_inputs: BTreeMap<PlayerId, InputFrame> = recorded
            .iter()
            .filter_map(|(player_id, frames)| frames.get(t).map(|frame| (*player_id, *frame)))
            .collect();

        let result = tick(state, &tick_inputs, config);
        all_events.extend(result.events);
    }

    all_events
}
