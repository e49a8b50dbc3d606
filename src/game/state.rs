//! Arena State Definitions
//!
//! All state types for the arena simulation.
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::constants::{
    INVENTORY_SLOTS, MAX_HEALTH, RESPAWN_INVULNERABLE_TICKS, RESPAWN_TICKS, RUSH_DURATION_TICKS,
};
use crate::core::hash::{compute_state_hash, StateHash, StateHasher};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::collision::find_spawn_point;
use crate::game::events::GameEvent;
use crate::game::input::InputFrame;
use crate::game::map::{MapConfig, TileMap};

// =============================================================================
// PLAYER ID
// =============================================================================

/// Unique player identifier, assigned in join order.
///
/// Implements Ord for deterministic BTreeMap ordering: iterating players
/// visits them in join order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl PlayerId {
    /// Create from a raw id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw id.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// POWER-UPS
// =============================================================================

/// Power-up kinds. A player holds at most one active and three in inventory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PowerUp {
    /// 1.5x movement and projectile speed
    Speed = 0,
    /// Absorbs one explosion or projectile
    Shield = 1,
    /// Projectiles bounce three times
    Bounce = 2,
    /// Timed 2x speed; touching tanks die, firing disabled
    Rush = 3,
    /// Halved reload
    Autofire = 4,
    /// Invisible until firing or being hit
    Stealth = 5,
    /// Reflects one projectile or laser
    Parry = 6,
    /// Hitscan beam with one bounce
    Laser = 7,
    /// Projectiles detonate on contact
    Explosion = 8,
}

impl PowerUp {
    /// Every kind, in spawn-table order.
    pub const ALL: [PowerUp; 9] = [
        PowerUp::Speed,
        PowerUp::Shield,
        PowerUp::Bounce,
        PowerUp::Rush,
        PowerUp::Autofire,
        PowerUp::Stealth,
        PowerUp::Parry,
        PowerUp::Laser,
        PowerUp::Explosion,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            PowerUp::Speed => "speed",
            PowerUp::Shield => "shield",
            PowerUp::Bounce => "bounce",
            PowerUp::Rush => "rush",
            PowerUp::Autofire => "autofire",
            PowerUp::Stealth => "stealth",
            PowerUp::Parry => "parry",
            PowerUp::Laser => "laser",
            PowerUp::Explosion => "explosion",
        }
    }
}

impl fmt::Display for PowerUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// State of a single tank.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    /// Unique player ID
    pub id: PlayerId,

    /// Centre position in world units
    pub position: Vec2,

    /// Facing angle in radians (0 = +X)
    pub angle: f32,

    /// Display color, `#rrggbb`
    pub color: String,

    /// Waiting to respawn
    pub dead: bool,

    /// 1 while alive, 0 while dead
    pub health: u32,

    /// Kill count
    pub score: u32,

    /// Ticks until respawn (only meaningful while dead)
    pub respawn_ticks: u32,

    /// Stored power-ups
    pub inventory: [Option<PowerUp>; INVENTORY_SLOTS],

    /// Currently active power-up
    pub active: Option<PowerUp>,

    /// Ticks until the active power-up expires (0 = no expiry)
    pub buff_ticks: u32,

    /// Ticks until the next shot
    pub reload_ticks: u32,

    /// Ticks of damage immunity left
    pub invulnerable_ticks: u32,

    /// Hidden from other clients
    pub invisible: bool,

    /// Last input snapshot
    #[serde(skip)]
    pub input: InputFrame,
}

impl Player {
    /// Create a new live player.
    pub fn new(id: PlayerId, position: Vec2, color: String) -> Self {
        Self {
            id,
            position,
            angle: 0.0,
            color,
            dead: false,
            health: MAX_HEALTH,
            score: 0,
            respawn_ticks: 0,
            inventory: [None; INVENTORY_SLOTS],
            active: None,
            buff_ticks: 0,
            reload_ticks: 0,
            invulnerable_ticks: 0,
            invisible: false,
            input: InputFrame::new(),
        }
    }

    /// Not dead.
    #[inline]
    pub fn is_alive(&self) -> bool {
        !self.dead
    }

    /// Immune to all damage this tick.
    #[inline]
    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_ticks > 0
    }

    /// Check the active power-up.
    #[inline]
    pub fn has_active(&self, kind: PowerUp) -> bool {
        self.active == Some(kind)
    }

    /// Make `kind` the active power-up, replacing any current one.
    ///
    /// Rush starts its timer; every other kind is permanent until consumed or
    /// replaced. Stealth sets invisibility, anything else clears it.
    pub fn activate(&mut self, kind: PowerUp) {
        self.active = Some(kind);
        // A nonzero countdown expires whatever is active, so a rush being
        // replaced must not leave one behind.
        self.buff_ticks = if kind == PowerUp::Rush { RUSH_DURATION_TICKS } else { 0 };
        self.invisible = kind == PowerUp::Stealth;
    }

    /// Put `kind` in the first empty inventory slot. Returns false when full.
    pub fn store_in_inventory(&mut self, kind: PowerUp) -> bool {
        match self.inventory.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(kind);
                true
            }
            None => false,
        }
    }

    /// Clear the active power-up if it is `kind`. Returns whether it was.
    pub fn consume_active(&mut self, kind: PowerUp) -> bool {
        if self.has_active(kind) {
            self.active = None;
            true
        } else {
            false
        }
    }

    /// Drop stealth (and the stealth power-up with it).
    pub fn break_stealth(&mut self) {
        if self.invisible {
            self.invisible = false;
            self.active = None;
        }
    }

    /// Absorb a hit with the shield, if active.
    pub fn absorb_with_shield(&mut self, invulnerable_ticks: u32) -> bool {
        if self.consume_active(PowerUp::Shield) {
            self.invulnerable_ticks = invulnerable_ticks;
            true
        } else {
            false
        }
    }

    /// Hash this player's state for verification.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.id.0);
        hasher.update_vec2(self.position);
        hasher.update_f32(self.angle);
        hasher.update_bytes(self.color.as_bytes());
        hasher.update_bool(self.dead);
        hasher.update_u32(self.health);
        hasher.update_u32(self.score);
        hasher.update_u32(self.respawn_ticks);
        for slot in &self.inventory {
            hash_power_up(hasher, *slot);
        }
        hash_power_up(hasher, self.active);
        hasher.update_u32(self.buff_ticks);
        hasher.update_u32(self.reload_ticks);
        hasher.update_u32(self.invulnerable_ticks);
        hasher.update_bool(self.invisible);
        hasher.update_u8(self.input.flags);
    }
}

fn hash_power_up(hasher: &mut StateHasher, kind: Option<PowerUp>) {
    match kind {
        Some(kind) => hasher.update_u8(kind as u8 + 1),
        None => hasher.update_u8(0),
    }
}

// =============================================================================
// PROJECTILES & PICKUPS
// =============================================================================

/// Projectile behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ProjectileKind {
    /// Plain shot, one bounce
    Normal = 0,
    /// Fired under `bounce`
    Bouncing = 1,
    /// Detonates on walls and tanks
    Explosive = 2,
}

/// A live projectile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unique projectile ID
    pub id: u32,
    /// Current position
    pub position: Vec2,
    /// Displacement per tick
    pub velocity: Vec2,
    /// Behaviour
    pub kind: ProjectileKind,
    /// Wall bounces left; removed once negative
    pub bounces: i32,
    /// Player credited with kills
    pub owner: PlayerId,
}

/// A power-up lying on the ground.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    /// Unique pickup ID
    pub id: u32,
    /// Position
    pub position: Vec2,
    /// Granted power-up
    pub kind: PowerUp,
}

// =============================================================================
// ARENA STATE
// =============================================================================

/// Complete state of the arena.
///
/// Players live in a BTreeMap (ascending id). Projectiles and pickups are
/// kept in creation order and resolved newest-first.
#[derive(Clone, Debug)]
pub struct ArenaState {
    /// Ticks simulated so far
    pub tick: u64,

    /// RNG seed the arena was created with
    pub seed: u64,

    /// Deterministic RNG for every random decision
    pub rng: DeterministicRng,

    /// Terrain
    pub map: TileMap,

    /// All players (BTreeMap for deterministic iteration)
    pub players: BTreeMap<PlayerId, Player>,

    /// Live projectiles, oldest first
    pub projectiles: Vec<Projectile>,

    /// Pickups on the ground, oldest first
    pub pickups: Vec<Pickup>,

    /// Next projectile ID (monotonic counter)
    pub next_projectile_id: u32,

    /// Next pickup ID (monotonic counter)
    pub next_pickup_id: u32,

    /// Events generated this tick (cleared each tick)
    pub pending_events: Vec<GameEvent>,
}

impl ArenaState {
    /// Create an arena, generating the map from the seeded RNG.
    pub fn new(seed: u64, map_config: &MapConfig) -> Self {
        let mut rng = DeterministicRng::new(seed);
        let map = TileMap::generate(map_config, &mut rng);
        Self::from_parts(seed, rng, map)
    }

    /// Create an arena on a prebuilt map.
    pub fn with_map(seed: u64, map: TileMap) -> Self {
        Self::from_parts(seed, DeterministicRng::new(seed), map)
    }

    fn from_parts(seed: u64, rng: DeterministicRng, map: TileMap) -> Self {
        Self {
            tick: 0,
            seed,
            rng,
            map,
            players: BTreeMap::new(),
            projectiles: Vec::new(),
            pickups: Vec::new(),
            next_projectile_id: 0,
            next_pickup_id: 0,
            pending_events: Vec::new(),
        }
    }

    /// Add a player at a random safe spawn point.
    ///
    /// Returns the spawn position. If the id is already present the existing
    /// player is left untouched.
    pub fn add_player(&mut self, id: PlayerId, spawn_attempts: u32) -> Vec2 {
        if let Some(existing) = self.players.get(&id) {
            return existing.position;
        }

        let (position, safe) = find_spawn_point(&self.map, &mut self.rng, spawn_attempts);
        if !safe {
            warn!(player = %id, ?position, "no safe join spawn found, using last candidate");
        }

        self.add_player_at(id, position);
        position
    }

    /// Add a player at an exact position.
    pub fn add_player_at(&mut self, id: PlayerId, position: Vec2) {
        let color = format!("#{:06x}", self.rng.next_u32() & 0x00FF_FFFF);
        self.players.insert(id, Player::new(id, position, color));
    }

    /// Remove a player. Their projectiles stay in flight.
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Get a player by ID.
    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Get a player mutably by ID.
    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    /// Player ids in ascending order.
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    /// Replace a player's input snapshot wholesale.
    pub fn set_input(&mut self, id: PlayerId, input: InputFrame) {
        if let Some(player) = self.players.get_mut(&id) {
            player.input = input;
        }
    }

    /// Kill a player.
    ///
    /// No-op if the victim is missing or already dead. The killer scores only
    /// if it still exists and is not the victim. Returns whether a kill
    /// happened.
    pub fn kill_player(&mut self, victim_id: PlayerId, killer_id: PlayerId) -> bool {
        match self.players.get_mut(&victim_id) {
            Some(victim) if victim.is_alive() => {
                victim.dead = true;
                victim.health = 0;
                victim.respawn_ticks = RESPAWN_TICKS;
            }
            _ => return false,
        }

        // Credit kill to killer (separate borrow)
        let mut credited = false;
        if killer_id != victim_id {
            if let Some(killer) = self.players.get_mut(&killer_id) {
                killer.score += 1;
                credited = true;
            }
        }

        debug!(victim = %victim_id, killer = %killer_id, credited, "player killed");
        self.push_event(GameEvent::player_killed(self.tick, victim_id, killer_id, credited));
        true
    }

    /// Bring a dead player back at a random safe spawn point.
    pub fn respawn_player(&mut self, id: PlayerId, spawn_attempts: u32) {
        if !self.players.contains_key(&id) {
            return;
        }

        let (position, safe) = find_spawn_point(&self.map, &mut self.rng, spawn_attempts);
        if !safe {
            warn!(player = %id, ?position, "no safe respawn found, using last candidate");
        }

        if let Some(player) = self.players.get_mut(&id) {
            player.dead = false;
            player.health = MAX_HEALTH;
            player.invisible = false;
            player.active = None;
            player.buff_ticks = 0;
            player.respawn_ticks = 0;
            player.invulnerable_ticks = RESPAWN_INVULNERABLE_TICKS;
            player.position = position;
        }

        self.push_event(GameEvent::player_respawned(self.tick, id, position, safe));
    }

    /// Spawn a new projectile.
    pub fn spawn_projectile(
        &mut self,
        position: Vec2,
        velocity: Vec2,
        kind: ProjectileKind,
        bounces: i32,
        owner: PlayerId,
    ) -> u32 {
        let id = self.next_projectile_id;
        self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
        self.projectiles.push(Projectile {
            id,
            position,
            velocity,
            kind,
            bounces,
            owner,
        });
        id
    }

    /// Spawn a new pickup.
    pub fn spawn_pickup(&mut self, position: Vec2, kind: PowerUp) -> u32 {
        let id = self.next_pickup_id;
        self.next_pickup_id = self.next_pickup_id.wrapping_add(1);
        self.pickups.push(Pickup { id, position, kind });
        self.push_event(GameEvent::pickup_spawned(self.tick, id, kind, position));
        id
    }

    /// Nothing to simulate: no players and nothing left on the field.
    ///
    /// Projectiles keep flying and pickups keep spawning after the last
    /// player leaves; only a completely empty arena pauses.
    pub fn is_idle(&self) -> bool {
        self.players.is_empty() && self.projectiles.is_empty() && self.pickups.is_empty()
    }

    /// Compute hash of current state for verification.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng.state(), |hasher| {
            // Hash all players in sorted order (BTreeMap guarantees this)
            for player in self.players.values() {
                player.hash_into(hasher);
            }

            for projectile in &self.projectiles {
                hasher.update_u32(projectile.id);
                hasher.update_vec2(projectile.position);
                hasher.update_vec2(projectile.velocity);
                hasher.update_u8(projectile.kind as u8);
                hasher.update_i32(projectile.bounces);
                hasher.update_u32(projectile.owner.0);
            }

            for pickup in &self.pickups {
                hasher.update_u32(pickup.id);
                hasher.update_vec2(pickup.position);
                hasher.update_u8(pickup.kind as u8);
            }

            hasher.update_u32(self.next_projectile_id);
            hasher.update_u32(self.next_pickup_id);
        })
    }

    /// Take pending events (consumes them).
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Push a game event.
    pub fn push_event(&mut self, event: GameEvent) {
        self.pending_events.push(event);
    }
}

// =============================================================================
// TESTS
// =============================================================================
