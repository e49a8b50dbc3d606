//! Pickup Spawning, Collection and Equipping
//!
//! Deterministic pickup spawning based on RNG.

use serde::{Deserialize, Serialize};

use crate::core::constants::{INVENTORY_SLOTS, PICKUP_RADIUS};
use crate::game::collision::{is_safe_spawn, spawn_bounds};
use crate::game::events::GameEvent;
use crate::game::state::{ArenaState, PlayerId, PowerUp};

/// Configuration for pickup spawning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickupSpawnConfig {
    /// Chance per tick of attempting a spawn
    pub spawn_chance: f32,
    /// Maximum pickups on the ground at once
    pub max_pickups: usize,
    /// Minimum distance between pickups
    pub min_spacing: f32,
}

impl Default for PickupSpawnConfig {
    fn default() -> Self {
        Self {
            spawn_chance: 0.01,
            max_pickups: 5,
            min_spacing: 30.0,
        }
    }
}

/// Maybe place one pickup of a random kind.
///
/// Below the cap, rolls the spawn chance, samples a point in the spawn
/// margin and keeps it only if it is a safe spawn and not crowding an
/// existing pickup. Returns the new pickup id.
pub fn maybe_spawn_pickup(state: &mut ArenaState, config: &PickupSpawnConfig) -> Option<u32> {
    if state.pickups.len() >= config.max_pickups {
        return None;
    }

    if !state.rng.next_bool(config.spawn_chance) {
        return None;
    }

    let (min, max) = spawn_bounds(&state.map);
    let position = state.rng.random_point_in(min, max);
    if !is_safe_spawn(&state.map, position) {
        return None;
    }

    let crowded = state
        .pickups
        .iter()
        .any(|pickup| pickup.position.within(position, config.min_spacing));
    if crowded {
        return None;
    }

    let kind = *state.rng.choose(&PowerUp::ALL)?;
    Some(state.spawn_pickup(position, kind))
}

/// Hand pickups to live players in range.
///
/// Pickups are checked newest-first; for each, the first player in
/// ascending id that can take it does: it becomes their active power-up if
/// they have none, otherwise it goes to the first free inventory slot. A
/// player with both full is skipped and the pickup stays for someone else.
pub fn collect_pickups(state: &mut ArenaState) {
    for i in (0..state.pickups.len()).rev() {
        let pickup = state.pickups[i];
        let mut taken_by = None;

        for player in state.players.values_mut() {
            if !player.is_alive() || !player.position.within(pickup.position, PICKUP_RADIUS) {
                continue;
            }

            if player.active.is_none() {
                player.activate(pickup.kind);
                taken_by = Some((player.id, false));
                break;
            }
            if player.store_in_inventory(pickup.kind) {
                taken_by = Some((player.id, true));
                break;
            }
        }

        if let Some((player_id, stored)) = taken_by {
            state.pickups.remove(i);
            state.push_event(GameEvent::pickup_collected(
                state.tick,
                player_id,
                pickup.id,
                pickup.kind,
                stored,
            ));
        }
    }
}

/// Activate the power-up in inventory `slot`.
///
/// The slot is vacated; rush starts its timer, stealth turns the player
/// invisible (any other kind makes them visible) and the reload is reset.
/// Returns false without changes when the player is missing or dead, or
/// the slot is out of range or empty.
pub fn equip_slot(state: &mut ArenaState, player_id: PlayerId, slot: usize) -> bool {
    if slot >= INVENTORY_SLOTS {
        return false;
    }

    let Some(player) = state.players.get_mut(&player_id) else {
        return false;
    };

    if !player.is_alive() {
        return false;
    }

    let Some(kind) = player.inventory[slot].take() else {
        return false;
    };

    player.activate(kind);
    player.reload_ticks = 0;

    state.push_event(GameEvent::power_up_equipped(state.tick, player_id, slot as u8, kind));
    true
}
