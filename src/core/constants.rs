//! Gameplay Constants
//!
//! Fixed tuning values shared by every simulation phase. Distances are in
//! world units, durations in ticks (60 ticks = 1 second).

// =============================================================================
// TANKS
// =============================================================================

/// Tank collider radius.
pub const TANK_RADIUS: f32 = 10.0;

/// Inward padding applied to the leading corners of the tank collider.
pub const WALL_PADDING: f32 = 4.0;

/// Base movement speed per tick.
pub const MOVE_SPEED: f32 = 3.0;

/// Speed multiplier while the `speed` ability is active.
pub const SPEED_MULTIPLIER: f32 = 1.5;

/// Speed multiplier while the `rush` ability is active.
pub const RUSH_MULTIPLIER: f32 = 2.0;

/// Turn rate in radians per tick.
pub const ROTATION_SPEED: f32 = 0.1;

/// Distance kept between a tank and the arena edge.
pub const EDGE_INSET: f32 = 20.0;

/// Health of a living tank.
pub const MAX_HEALTH: u32 = 1;

// =============================================================================
// WEAPONS
// =============================================================================

/// Projectile speed per tick.
pub const BULLET_SPEED: f32 = 7.0;

/// Projectile collider radius.
pub const BULLET_RADIUS: f32 = 4.0;

/// Distance ahead of the tank where projectiles appear.
pub const MUZZLE_OFFSET: f32 = 20.0;

/// Default reload in ticks.
pub const RELOAD_TICKS: u32 = 30;

/// Reload under `autofire`.
pub const AUTOFIRE_RELOAD_TICKS: u32 = 15;

/// Reload after a laser shot.
pub const LASER_RELOAD_TICKS: u32 = 60;

/// Default bounce budget.
pub const DEFAULT_BOUNCES: i32 = 1;

/// Bounce budget under `bounce`.
pub const BOUNCE_ABILITY_BOUNCES: i32 = 3;

/// Bounce budget given to a parried projectile.
pub const PARRY_BOUNCES: i32 = 2;

/// Velocity multiples a parried projectile is pushed along its new heading.
pub const PARRY_NUDGE: f32 = 2.0;

/// Ray-march step for lasers.
pub const LASER_STEP: f32 = 5.0;

/// Maximum length of a single laser segment.
pub const LASER_RANGE: f32 = 1000.0;

/// Distance at which a laser segment strikes a tank.
pub const LASER_HIT_RADIUS: f32 = 15.0;

/// Explosion blast radius.
pub const EXPLOSION_RADIUS: f32 = 60.0;

// =============================================================================
// INTERACTION RADII
// =============================================================================

/// Projectile-vs-tank hit distance.
pub const HIT_RADIUS: f32 = TANK_RADIUS + BULLET_RADIUS;

/// Tank-vs-pickup collection distance.
pub const PICKUP_RADIUS: f32 = 20.0;

/// Tank-vs-tank proximity for rush kills.
pub const RUSH_RADIUS: f32 = 30.0;

// =============================================================================
// TIMERS
// =============================================================================

/// Ticks a dead tank waits before respawning.
pub const RESPAWN_TICKS: u32 = 180;

/// Invulnerability granted on respawn.
pub const RESPAWN_INVULNERABLE_TICKS: u32 = 120;

/// Invulnerability granted when a shield absorbs an explosion.
pub const EXPLOSION_SHIELD_TICKS: u32 = 60;

/// Invulnerability granted when a shield absorbs a projectile.
pub const BULLET_SHIELD_TICKS: u32 = 90;

/// Duration of the `rush` ability.
pub const RUSH_DURATION_TICKS: u32 = 600;

// =============================================================================
// SPAWNING
// =============================================================================

/// Diagonal clearance checked around a spawn point.
pub const SAFE_SPAWN_RADIUS: f32 = 10.0;

/// Spawn search attempts on join.
pub const JOIN_SPAWN_ATTEMPTS: u32 = 100;

/// Spawn search attempts on respawn.
pub const RESPAWN_SPAWN_ATTEMPTS: u32 = 50;

/// Inventory capacity.
pub const INVENTORY_SLOTS: usize = 3;
