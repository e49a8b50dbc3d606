//! Combat Resolution
//!
//! Firing, laser ray-marching, projectile motion and every damage rule:
//! explosions, projectile hits, parries, shields and rush contact kills.
//!
//! Ordering rules:
//! - Projectiles are resolved newest-first (reverse creation order), which
//!   also makes in-place removal safe.
//! - Players are always visited in ascending id.
//! - A projectile has exactly one outcome per tick.

use std::collections::BTreeMap;
use std::f32::consts::PI;

use crate::core::constants::{
    AUTOFIRE_RELOAD_TICKS, BOUNCE_ABILITY_BOUNCES, BULLET_SHIELD_TICKS, BULLET_SPEED,
    DEFAULT_BOUNCES, EXPLOSION_RADIUS, EXPLOSION_SHIELD_TICKS, HIT_RADIUS, LASER_HIT_RADIUS,
    LASER_RANGE, LASER_RELOAD_TICKS, LASER_STEP, MUZZLE_OFFSET, PARRY_BOUNCES, PARRY_NUDGE,
    RELOAD_TICKS, RUSH_RADIUS, SPEED_MULTIPLIER,
};
use crate::core::vec2::Vec2;
use crate::game::events::GameEvent;
use crate::game::map::TileMap;
use crate::game::state::{ArenaState, Player, PlayerId, PowerUp, ProjectileKind};

// =============================================================================
// FIRING
// =============================================================================

/// Fire for `shooter_id`. The caller has already checked the trigger and
/// the reload timer.
pub fn handle_fire(state: &mut ArenaState, shooter_id: PlayerId) {
    let Some(shooter) = state.players.get_mut(&shooter_id) else {
        return;
    };

    if !shooter.is_alive() || shooter.has_active(PowerUp::Rush) {
        return;
    }

    shooter.break_stealth();
    shooter.reload_ticks = RELOAD_TICKS;

    let origin = shooter.position;
    let angle = shooter.angle;

    if shooter.has_active(PowerUp::Laser) {
        shooter.reload_ticks = LASER_RELOAD_TICKS;
        fire_laser(state, shooter_id, origin, angle);
        return;
    }

    if shooter.has_active(PowerUp::Autofire) {
        shooter.reload_ticks = AUTOFIRE_RELOAD_TICKS;
    }

    let speed = if shooter.has_active(PowerUp::Speed) {
        BULLET_SPEED * SPEED_MULTIPLIER
    } else {
        BULLET_SPEED
    };

    let (kind, bounces) = match shooter.active {
        Some(PowerUp::Bounce) => (ProjectileKind::Bouncing, BOUNCE_ABILITY_BOUNCES),
        Some(PowerUp::Explosion) => (ProjectileKind::Explosive, 0),
        _ => (ProjectileKind::Normal, DEFAULT_BOUNCES),
    };

    let facing = Vec2::from_angle(angle);
    state.spawn_projectile(
        origin + facing.scale(MUZZLE_OFFSET),
        facing.scale(speed),
        kind,
        bounces,
        shooter_id,
    );
}

// =============================================================================
// LASER
// =============================================================================

/// What a laser segment stopped on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RayTarget {
    /// A wall cell (or the edge of the world)
    Wall,
    /// A live tank other than the shooter
    Player(PlayerId),
    /// Ran out of range
    Nothing,
}

/// End of a laser segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Where the segment stopped
    pub end: Vec2,
    /// What it stopped on
    pub target: RayTarget,
}

/// March a ray from `origin` along `angle`, stopping at the first wall or the
/// first live tank (ascending id) other than `shooter` within the laser hit
/// radius.
pub fn cast_ray(
    map: &TileMap,
    players: &BTreeMap<PlayerId, Player>,
    origin: Vec2,
    angle: f32,
    shooter: PlayerId,
) -> RayHit {
    let step = Vec2::from_angle(angle).scale(LASER_STEP);
    let mut point = origin;
    let mut travelled = 0.0;

    while travelled < LASER_RANGE {
        point = point + step;
        travelled += LASER_STEP;

        if map.is_blocked_at(point) {
            return RayHit { end: point, target: RayTarget::Wall };
        }

        let struck = players
            .values()
            .find(|p| p.id != shooter && p.is_alive() && p.position.within(point, LASER_HIT_RADIUS));

        if let Some(victim) = struck {
            return RayHit { end: point, target: RayTarget::Player(victim.id) };
        }
    }

    RayHit { end: point, target: RayTarget::Nothing }
}

/// Reflected angle for a laser that hit a wall at `end` travelling along
/// `angle`.
///
/// Steps back along X only: if that point is still inside a wall the beam
/// came in through a horizontal face, so the Y component flips; otherwise it
/// struck a vertical face and the X component flips.
pub fn laser_bounce_angle(map: &TileMap, end: Vec2, angle: f32) -> f32 {
    let test_x = end.x - angle.cos() * LASER_STEP;
    if map.is_blocked(test_x, end.y) {
        -angle
    } else {
        PI - angle
    }
}

fn fire_laser(state: &mut ArenaState, shooter: PlayerId, origin: Vec2, angle: f32) {
    let first = cast_ray(&state.map, &state.players, origin, angle, shooter);
    if let RayTarget::Player(victim) = first.target {
        handle_laser_hit(state, victim, shooter);
    }

    let mut second_end = None;
    if first.target == RayTarget::Wall {
        let bounce = laser_bounce_angle(&state.map, first.end, angle);
        let second = cast_ray(&state.map, &state.players, first.end, bounce, shooter);
        if let RayTarget::Player(victim) = second.target {
            handle_laser_hit(state, victim, shooter);
        }
        second_end = Some(second.end);
    }

    state.push_event(GameEvent::laser_fired(state.tick, shooter, origin, first.end, second_end));
}

/// Laser-hit rule: invulnerable victims are unaffected, a parrying victim
/// kills the shooter, anyone else dies.
pub fn handle_laser_hit(state: &mut ArenaState, victim_id: PlayerId, shooter_id: PlayerId) {
    let Some(victim) = state.players.get_mut(&victim_id) else {
        return;
    };

    if !victim.is_alive() || victim.is_invulnerable() {
        return;
    }

    if victim.consume_active(PowerUp::Parry) {
        state.push_event(GameEvent::parried(state.tick, victim_id, None));
        state.kill_player(shooter_id, victim_id);
    } else {
        state.kill_player(victim_id, shooter_id);
    }
}

// =============================================================================
// PROJECTILES
// =============================================================================

/// Move every projectile one tick, bouncing off walls per axis.
///
/// Explosive projectiles detonate on their first wall contact. Projectiles
/// that leave the world or run out of bounces are removed.
pub fn advance_projectiles(state: &mut ArenaState) {
    let width = state.map.width();
    let height = state.map.height();

    for i in (0..state.projectiles.len()).rev() {
        let mut projectile = state.projectiles[i];

        // X axis
        projectile.position.x += projectile.velocity.x;
        if state.map.is_blocked_at(projectile.position) {
            if projectile.kind == ProjectileKind::Explosive {
                state.projectiles.remove(i);
                explode(state, projectile.position, projectile.owner);
                continue;
            }
            projectile.position.x -= projectile.velocity.x;
            projectile.velocity.x = -projectile.velocity.x;
            projectile.bounces -= 1;
        }

        // Y axis
        projectile.position.y += projectile.velocity.y;
        if state.map.is_blocked_at(projectile.position) {
            if projectile.kind == ProjectileKind::Explosive {
                state.projectiles.remove(i);
                explode(state, projectile.position, projectile.owner);
                continue;
            }
            projectile.position.y -= projectile.velocity.y;
            projectile.velocity.y = -projectile.velocity.y;
            projectile.bounces -= 1;
        }

        let p = projectile.position;
        if projectile.bounces < 0 || p.x < 0.0 || p.x > width || p.y < 0.0 || p.y > height {
            state.projectiles.remove(i);
        } else {
            state.projectiles[i] = projectile;
        }
    }
}

/// Detonate at `position`, crediting kills to `owner`.
///
/// Every live tank within the blast radius is hit once: invulnerable tanks
/// are skipped, a shield is consumed in exchange for brief invulnerability,
/// anyone else dies. The owner is not exempt.
pub fn explode(state: &mut ArenaState, position: Vec2, owner: PlayerId) {
    state.push_event(GameEvent::explosion(state.tick, owner, position));

    for id in state.player_ids() {
        let Some(player) = state.players.get_mut(&id) else {
            continue;
        };

        if !player.is_alive() || !player.position.within(position, EXPLOSION_RADIUS) {
            continue;
        }
        if player.is_invulnerable() {
            continue;
        }

        if player.absorb_with_shield(EXPLOSION_SHIELD_TICKS) {
            state.push_event(GameEvent::shield_consumed(state.tick, id));
        } else {
            state.kill_player(id, owner);
        }
    }
}

/// Resolve projectile-vs-tank contacts.
///
/// Each projectile takes the first eligible tank (live, not the owner,
/// within hit radius) in ascending id and applies exactly one outcome:
/// detonate, parry, shield, absorb on invulnerability, or kill.
pub fn resolve_projectile_hits(state: &mut ArenaState) {
    for i in (0..state.projectiles.len()).rev() {
        let projectile = state.projectiles[i];

        let target = state
            .players
            .values()
            .find(|p| {
                p.is_alive()
                    && p.id != projectile.owner
                    && p.position.within(projectile.position, HIT_RADIUS)
            })
            .map(|p| p.id);

        let Some(victim_id) = target else {
            continue;
        };

        if projectile.kind == ProjectileKind::Explosive {
            state.projectiles.remove(i);
            explode(state, projectile.position, projectile.owner);
            continue;
        }

        let Some(victim) = state.players.get_mut(&victim_id) else {
            continue;
        };

        if victim.consume_active(PowerUp::Parry) {
            let reflected = &mut state.projectiles[i];
            reflected.velocity = -reflected.velocity;
            reflected.owner = victim_id;
            reflected.bounces = PARRY_BOUNCES;
            reflected.position = reflected.position + reflected.velocity.scale(PARRY_NUDGE);
            state.push_event(GameEvent::parried(state.tick, victim_id, Some(projectile.id)));
            continue;
        }

        if victim.absorb_with_shield(BULLET_SHIELD_TICKS) {
            state.projectiles.remove(i);
            state.push_event(GameEvent::shield_consumed(state.tick, victim_id));
            continue;
        }

        if victim.is_invulnerable() {
            state.projectiles.remove(i);
            continue;
        }

        victim.break_stealth();
        state.projectiles.remove(i);
        state.kill_player(victim_id, projectile.owner);
    }
}

// =============================================================================
// RUSH
// =============================================================================

/// Rush contact kills between every unordered pair of live tanks in range.
///
/// A rushing tank kills a non-rushing, non-invulnerable one. Two rushing
/// tanks cancel out.
pub fn resolve_rush(state: &mut ArenaState) {
    let ids = state.player_ids();

    for (i, &a_id) in ids.iter().enumerate() {
        for &b_id in &ids[i + 1..] {
            let (Some(a), Some(b)) = (state.players.get(&a_id), state.players.get(&b_id)) else {
                continue;
            };

            if !a.is_alive() || !b.is_alive() || !a.position.within(b.position, RUSH_RADIUS) {
                continue;
            }

            let a_rush = a.has_active(PowerUp::Rush);
            let b_rush = b.has_active(PowerUp::Rush);

            if a_rush && !b_rush {
                if !b.is_invulnerable() {
                    state.kill_player(b_id, a_id);
                }
            } else if b_rush && !a_rush && !a.is_invulnerable() {
                state.kill_player(a_id, b_id);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
