//! Game Events
//!
//! Events generated during a tick. Laser beams and explosions are forwarded to
//! clients as one-shot effects; the rest are bookkeeping for logs and tests.

use serde::{Deserialize, Serialize};

use crate::core::vec2::Vec2;
use crate::game::state::{PlayerId, PowerUp};

/// Game event data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A laser was fired
    LaserFired {
        /// Who fired
        shooter: PlayerId,
        /// Muzzle position
        start: Vec2,
        /// End of the first segment
        first_end: Vec2,
        /// End of the rebound, if any
        second_end: Option<Vec2>,
    },

    /// An explosive projectile detonated
    Explosion {
        /// Who fired the projectile
        owner: PlayerId,
        /// Where it happened
        position: Vec2,
    },

    /// A player died
    PlayerKilled {
        /// Who died
        victim: PlayerId,
        /// Who gets the credit
        killer: PlayerId,
        /// Whether the killer's score went up
        credited: bool,
    },

    /// A dead player came back
    PlayerRespawned {
        /// Player involved
        player_id: PlayerId,
        /// Where it happened
        position: Vec2,
        /// False when the spawn search fell back to an unsafe point
        safe: bool,
    },

    /// A pickup appeared
    PickupSpawned {
        /// Pickup id
        pickup_id: u32,
        /// Power-up kind
        kind: PowerUp,
        /// Where it happened
        position: Vec2,
    },

    /// A pickup was taken
    PickupCollected {
        /// Player involved
        player_id: PlayerId,
        /// Pickup id
        pickup_id: u32,
        /// Power-up kind
        kind: PowerUp,
        /// True if it went to the inventory rather than becoming active
        stored: bool,
    },

    /// An inventory slot was equipped
    PowerUpEquipped {
        /// Player involved
        player_id: PlayerId,
        /// Inventory slot
        slot: u8,
        /// Power-up kind
        kind: PowerUp,
    },

    /// A shield absorbed damage
    ShieldConsumed {
        /// Player involved
        player_id: PlayerId,
    },

    /// A parry reflected a projectile (or a laser when `projectile_id` is None)
    Parried {
        /// Player involved
        player_id: PlayerId,
        /// Reflected projectile
        projectile_id: Option<u32>,
    },
}

/// A game event with timing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick when event occurred
    pub tick: u64,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u64, data: GameEventData) -> Self {
        Self { tick, data }
    }

    /// Laser and explosion events are shown to clients; everything else is
    /// internal.
    pub fn is_presentation(&self) -> bool {
        matches!(
            self.data,
            GameEventData::LaserFired { .. } | GameEventData::Explosion { .. }
        )
    }

    /// Create laser event.
    pub fn laser_fired(
        tick: u64,
        shooter: PlayerId,
        start: Vec2,
        first_end: Vec2,
        second_end: Option<Vec2>,
    ) -> Self {
        Self::new(
            tick,
            GameEventData::LaserFired {
                shooter,
                start,
                first_end,
                second_end,
            },
        )
    }

    /// Create explosion event.
    pub fn explosion(tick: u64, owner: PlayerId, position: Vec2) -> Self {
        Self::new(tick, GameEventData::Explosion { owner, position })
    }

    /// Create kill event.
    pub fn player_killed(tick: u64, victim: PlayerId, killer: PlayerId, credited: bool) -> Self {
        Self::new(
            tick,
            GameEventData::PlayerKilled {
                victim,
                killer,
                credited,
            },
        )
    }

    /// Create respawn event.
    pub fn player_respawned(tick: u64, player_id: PlayerId, position: Vec2, safe: bool) -> Self {
        Self::new(
            tick,
            GameEventData::PlayerRespawned {
                player_id,
                position,
                safe,
            },
        )
    }

    /// Create pickup spawn event.
    pub fn pickup_spawned(tick: u64, pickup_id: u32, kind: PowerUp, position: Vec2) -> Self {
        Self::new(
            tick,
            GameEventData::PickupSpawned {
                pickup_id,
                kind,
                position,
            },
        )
    }

    /// Create pickup collection event.
    pub fn pickup_collected(
        tick: u64,
        player_id: PlayerId,
        pickup_id: u32,
        kind: PowerUp,
        stored: bool,
    ) -> Self {
        Self::new(
            tick,
            GameEventData::PickupCollected {
                player_id,
                pickup_id,
                kind,
                stored,
            },
        )
    }

    /// Create equip event.
    pub fn power_up_equipped(tick: u64, player_id: PlayerId, slot: u8, kind: PowerUp) -> Self {
        Self::new(
            tick,
            GameEventData::PowerUpEquipped {
                player_id,
                slot,
                kind,
            },
        )
    }

    /// Create shield event.
    pub fn shield_consumed(tick: u64, player_id: PlayerId) -> Self {
        Self::new(tick, GameEventData::ShieldConsumed { player_id })
    }

    /// Create parry event.
    pub fn parried(tick: u64, player_id: PlayerId, projectile_id: Option<u32>) -> Self {
        Self::new(
            tick,
            GameEventData::Parried {
                player_id,
                projectile_id,
            },
        )
    }
}
