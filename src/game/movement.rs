//! Movement & Input Resolution
//!
//! Per-player timers, held-key movement with wall sliding, rotation and the
//! fire trigger. Dead players only count down to their respawn.

use crate::core::constants::{
    EDGE_INSET, MOVE_SPEED, ROTATION_SPEED, RUSH_MULTIPLIER, SPEED_MULTIPLIER,
};
use crate::core::vec2::Vec2;
use crate::game::collision::{can_advance, Axis};
use crate::game::combat::handle_fire;
use crate::game::state::{ArenaState, Player, PlayerId, PowerUp};

/// Movement speed for a player this tick.
#[inline]
pub fn effective_speed(player: &Player) -> f32 {
    match player.active {
        Some(PowerUp::Speed) => MOVE_SPEED * SPEED_MULTIPLIER,
        Some(PowerUp::Rush) => MOVE_SPEED * RUSH_MULTIPLIER,
        _ => MOVE_SPEED,
    }
}

/// Run the movement phase for every player in ascending id.
pub fn resolve_players(state: &mut ArenaState, respawn_attempts: u32) {
    for id in state.player_ids() {
        resolve_player(state, id, respawn_attempts);
    }
}

fn resolve_player(state: &mut ArenaState, id: PlayerId, respawn_attempts: u32) {
    let width = state.map.width();
    let height = state.map.height();
    let map = &state.map;

    let Some(player) = state.players.get_mut(&id) else {
        return;
    };

    if player.dead {
        player.respawn_ticks = player.respawn_ticks.saturating_sub(1);
        if player.respawn_ticks == 0 {
            state.respawn_player(id, respawn_attempts);
        }
        return;
    }

    // Timers
    player.invulnerable_ticks = player.invulnerable_ticks.saturating_sub(1);
    player.reload_ticks = player.reload_ticks.saturating_sub(1);
    if player.buff_ticks > 0 {
        player.buff_ticks -= 1;
        if player.buff_ticks == 0 {
            player.active = None;
        }
    }

    let speed = effective_speed(player);
    let input = player.input;
    let old = player.position;

    let mut target = old;
    if input.forward() {
        target.y -= speed;
    }
    if input.back() {
        target.y += speed;
    }
    if input.strafe_left() {
        target.x -= speed;
    }
    if input.strafe_right() {
        target.x += speed;
    }

    // Each axis independently so tanks slide along walls
    if can_advance(map, Axis::X, target.x, old.x, old.y) {
        player.position.x = target.x;
    }
    if can_advance(map, Axis::Y, target.y, old.y, player.position.x) {
        player.position.y = target.y;
    }

    if input.turn_left() {
        player.angle -= ROTATION_SPEED;
    }
    if input.turn_right() {
        player.angle += ROTATION_SPEED;
    }

    player.position = player.position.clamp(
        Vec2::new(EDGE_INSET, EDGE_INSET),
        Vec2::new(width - EDGE_INSET, height - EDGE_INSET),
    );

    if input.fire() && player.reload_ticks == 0 {
        handle_fire(state, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::input::InputFrame;
    use crate::game::map::{MapConfig, Tile, TileMap};

    fn arena_with_player(x: f32, y: f32) -> (ArenaState, PlayerId) {
        let mut arena = ArenaState::with_map(3, TileMap::open(&MapConfig::default()));
        let id = PlayerId::new(1);
        arena.add_player_at(id, Vec2::new(x, y));
        (arena, id)
    }

    fn hold(arena: &mut ArenaState, id: PlayerId, flags: u8) {
        arena.set_input(id, InputFrame::from_flags(flags));
    }

    #[test]
    fn test_screen_aligned_movement() {
        let (mut arena, id) = arena_with_player(400.0, 300.0);

        hold(&mut arena, id, InputFrame::FLAG_FORWARD);
        resolve_players(&mut arena, 50);
        assert_eq!(arena.get_player(id).unwrap().position, Vec2::new(400.0, 297.0));

        hold(&mut arena, id, InputFrame::FLAG_STRAFE_RIGHT | InputFrame::FLAG_BACK);
        resolve_players(&mut arena, 50);
        assert_eq!(arena.get_player(id).unwrap().position, Vec2::new(403.0, 300.0));

        hold(&mut arena, id, InputFrame::FLAG_STRAFE_LEFT);
        resolve_players(&mut arena, 50);
        assert_eq!(arena.get_player(id).unwrap().position, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn test_speed_multipliers() {
        let (mut arena, id) = arena_with_player(400.0, 300.0);
        hold(&mut arena, id, InputFrame::FLAG_STRAFE_RIGHT);

        arena.get_player_mut(id).unwrap().activate(PowerUp::Speed);
        resolve_players(&mut arena, 50);
        assert_eq!(arena.get_player(id).unwrap().position.x, 404.5);

        arena.get_player_mut(id).unwrap().activate(PowerUp::Rush);
        resolve_players(&mut arena, 50);
        assert_eq!(arena.get_player(id).unwrap().position.x, 410.5);
    }

    #[test]
    fn test_wall_slide() {
        let (mut arena, id) = arena_with_player(87.0, 150.0);
        // Wall column 4 spans x in [100, 125)
        for row in 1..23 {
            arena.map.set_tile(4, row, Tile::Wall);
        }

        hold(&mut arena, id, InputFrame::FLAG_STRAFE_RIGHT | InputFrame::FLAG_BACK);
        resolve_players(&mut arena, 50);

        // X blocked (leading edge 100), Y still advances
        let position = arena.get_player(id).unwrap().position;
        assert_eq!(position, Vec2::new(87.0, 153.0));
    }

    #[test]
    fn test_rotation() {
        let (mut arena, id) = arena_with_player(400.0, 300.0);

        hold(&mut arena, id, InputFrame::FLAG_TURN_RIGHT);
        resolve_players(&mut arena, 50);
        assert!((arena.get_player(id).unwrap().angle - 0.1).abs() < 1e-6);

        hold(&mut arena, id, InputFrame::FLAG_TURN_LEFT | InputFrame::FLAG_TURN_RIGHT);
        resolve_players(&mut arena, 50);
        assert!((arena.get_player(id).unwrap().angle - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_timers_decrement_once() {
        let (mut arena, id) = arena_with_player(400.0, 300.0);
        {
            let player = arena.get_player_mut(id).unwrap();
            player.invulnerable_ticks = 5;
            player.reload_ticks = 5;
        }

        resolve_players(&mut arena, 50);

        let player = arena.get_player(id).unwrap();
        assert_eq!(player.invulnerable_ticks, 4);
        assert_eq!(player.reload_ticks, 4);
    }

    #[test]
    fn test_rush_expires_after_duration() {
        let (mut arena, id) = arena_with_player(400.0, 300.0);
        arena.get_player_mut(id).unwrap().activate(PowerUp::Rush);

        for _ in 0..599 {
            resolve_players(&mut arena, 50);
        }
        assert_eq!(arena.get_player(id).unwrap().active, Some(PowerUp::Rush));

        resolve_players(&mut arena, 50);
        let player = arena.get_player(id).unwrap();
        assert_eq!(player.active, None);
        assert_eq!(player.buff_ticks, 0);
    }

    #[test]
    fn test_fire_respects_reload() {
        let (mut arena, id) = arena_with_player(400.0, 300.0);
        hold(&mut arena, id, InputFrame::FLAG_FIRE);

        resolve_players(&mut arena, 50);
        assert_eq!(arena.projectiles.len(), 1);
        assert_eq!(arena.get_player(id).unwrap().reload_ticks, 30);

        // Reload counts down 30 -> 1 over the next 29 ticks
        for _ in 0..29 {
            resolve_players(&mut arena, 50);
        }
        assert_eq!(arena.projectiles.len(), 1);

        resolve_players(&mut arena, 50);
        assert_eq!(arena.projectiles.len(), 2);
    }

    #[test]
    fn test_dead_player_frozen_then_respawns() {
        let (mut arena, id) = arena_with_player(400.0, 300.0);
        hold(&mut arena, id, InputFrame::FLAG_FORWARD | InputFrame::FLAG_FIRE);
        arena.kill_player(id, PlayerId::new(2));

        for _ in 0..179 {
            resolve_players(&mut arena, 50);
        }
        let player = arena.get_player(id).unwrap();
        assert!(player.dead);
        assert_eq!(player.position, Vec2::new(400.0, 300.0));
        assert!(arena.projectiles.is_empty());

        resolve_players(&mut arena, 50);
        let player = arena.get_player(id).unwrap();
        assert!(!player.dead);
        assert_eq!(player.invulnerable_ticks, 120);
        assert!(crate::game::collision::is_safe_spawn(&arena.map, player.position));
    }
}
