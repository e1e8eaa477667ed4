/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Manual restart (aborts the rest of the tick)
///   2. Timed tasks: tick, apply completions (collapse → hole)
///   3. Movement resolution (at most one move per tick)
///   4. Effect commands, in the order the effects emitted them
///
/// A reset command restarts the level immediately and drops every
/// command after it. Completions started before that reset are stale
/// (older scheduler epoch) and are ignored.

use tracing::{debug, info};

use crate::domain::effect::{AnimKind, EffectCommand, EffectContext, ResetReason};
use crate::domain::entity::{FrameInput, MoveDir};
use crate::domain::resolve::{resolve_move, Resolution};
use crate::domain::tile::TileType;
use super::event::GameEvent;
use super::level::{instantiate, load_level};
use super::world::{Phase, WorldState};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Flow {
    Continue,
    Reset,
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }

    if input.restart {
        restart_level(world, None);
        events.push(GameEvent::LevelRestarted);
        return events;
    }

    if resolve_timers(world, &mut events) == Flow::Reset { return events; }
    resolve_player_movement(world, input.movement, &mut events);

    events
}

// ══════════════════════════════════════════════════════════════
// Timed tasks
// ══════════════════════════════════════════════════════════════

fn resolve_timers(world: &mut WorldState, events: &mut Vec<GameEvent>) -> Flow {
    let mut flow = Flow::Continue;

    for done in world.scheduler.tick() {
        if !world.scheduler.is_current(&done) {
            debug!(kind = ?done.kind, x = done.pos.x, y = done.pos.y, "dropping stale task completion");
            continue;
        }
        if done.kind != AnimKind::Collapse { continue; }

        let Some(level) = world.level.as_mut() else { break };
        level.grid.set_tile(done.pos, TileType::Hole);
        info!(x = done.pos.x, y = done.pos.y, "floor collapsed");
        events.push(GameEvent::FloorCollapsed { pos: done.pos });

        if level.player.pos != done.pos { continue; }

        // Floor gave way underfoot: the hole's entry effect applies.
        let hole = level.registry.effect(TileType::Hole);
        let mut fx = EffectContext::new(&level.grid, level.registry.state_mut(), level.player.caps);
        hole.on_enter(done.pos, &mut fx);
        let commands = fx.into_commands();
        if apply_commands(world, commands, events) == Flow::Reset {
            flow = Flow::Reset;
        }
    }

    flow
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

fn resolve_player_movement(world: &mut WorldState, movement: Option<MoveDir>, events: &mut Vec<GameEvent>) {
    let Some(dir) = movement else { return };
    let Some(level) = world.level.as_mut() else { return };

    let origin = level.player.pos;
    let resolution = resolve_move(&level.grid, &mut level.registry, level.player.caps, origin, dir);

    match resolution {
        Resolution::Rejected(reason) => {
            let target = level.grid.get_tile(origin.step(dir)).map_or("off map", TileType::name);
            debug!(?reason, ?dir, x = origin.x, y = origin.y, target, "move rejected");
            events.push(GameEvent::MoveBlocked);
        }
        Resolution::Moved { from, to, slid, commands } => {
            if !ends_in_reset(&commands) {
                level.player.move_to(to, dir);
                world.moves += 1;
                events.push(if slid {
                    GameEvent::PlayerSlid { from, to }
                } else {
                    GameEvent::PlayerMoved { from, to }
                });
            }
            apply_commands(world, commands, events);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Effect commands
// ══════════════════════════════════════════════════════════════

/// A move whose commands reset the level is never committed: the player
/// is not shown on the tile that killed them. Water and holes already
/// fail the walkability gate, so this only matters for a tile that is
/// enterable and resets on entry.
fn ends_in_reset(commands: &[EffectCommand]) -> bool {
    commands.iter().any(|c| matches!(c, EffectCommand::Reset(_)))
}

fn apply_commands(world: &mut WorldState, commands: Vec<EffectCommand>, events: &mut Vec<GameEvent>) -> Flow {
    for cmd in commands {
        match cmd {
            EffectCommand::Schedule { kind, pos } => {
                // Leaving a cracked floor twice must not start a second collapse.
                if kind == AnimKind::Collapse && world.scheduler.is_pending(kind, pos) {
                    continue;
                }
                let ticks = match kind {
                    AnimKind::Collapse => world.speed.collapse_ticks,
                    AnimKind::Press => world.speed.press_ticks,
                    AnimKind::Unlock => world.speed.unlock_ticks,
                };
                let handle = world.scheduler.start(kind, pos, ticks);
                debug!(id = handle.id, epoch = handle.epoch, ?kind, x = pos.x, y = pos.y, ticks, "task started");
                events.push(match kind {
                    AnimKind::Collapse => GameEvent::FloorCracking { pos },
                    AnimKind::Press => GameEvent::ButtonPressed { pos },
                    AnimKind::Unlock => GameEvent::DoorUnlocked { pos },
                });
            }
            EffectCommand::Reset(reason) => {
                events.push(match reason {
                    ResetReason::Drowned => GameEvent::PlayerDrowned,
                    ResetReason::Fell => GameEvent::PlayerFell,
                });
                restart_level(world, Some(reason));
                return Flow::Reset;
            }
            EffectCommand::CompleteLevel => {
                if world.phase == Phase::Playing {
                    complete_level(world, events);
                }
            }
        }
    }

    Flow::Continue
}

fn complete_level(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    info!(level = world.current_level, moves = world.moves, resets = world.resets, "level complete");
    world.phase = Phase::LevelComplete;
    world.set_message("Level Complete! Press ENTER for next level.", 0);
    events.push(GameEvent::LevelCompleted { level: world.current_level });
}

// ══════════════════════════════════════════════════════════════
// Level control
// ══════════════════════════════════════════════════════════════

/// Rebuild the current level from its definition: fresh grid, fresh
/// effect state, player back on the start, every task cancelled.
/// `None` is a manual restart.
pub fn restart_level(world: &mut WorldState, reason: Option<ResetReason>) {
    let cancelled = world.scheduler.active_count();
    world.scheduler.cancel_all();

    let idx = world.current_level;
    let Some(def) = world.levels.get(idx) else {
        load_level(world, idx);
        return;
    };
    match instantiate(idx, def, world.caps) {
        Ok(level) => world.level = Some(level),
        Err(_) => {
            load_level(world, idx + 1);
            return;
        }
    }

    world.resets += 1;
    let msg = match reason {
        Some(r) => r.message(),
        None => "Level restarted",
    };
    info!(level = idx, reason = msg, cancelled, epoch = world.scheduler.epoch(), "level reset");
    world.set_message(msg, world.speed.message_ticks);
    world.center_camera();
}

/// Move on from a completed level.
pub fn advance_level(world: &mut WorldState) {
    let next = world.current_level + 1;
    load_level(world, next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::Position;
    use crate::sim::level::{start_level, LevelDef};

    fn world_with(rows: &[&str]) -> WorldState {
        let config = GameConfig::default();
        let def = LevelDef {
            name: "test".into(),
            rows: rows.iter().map(|s| s.to_string()).collect(),
        };
        let mut world = WorldState::new(&config, vec![def]);
        load_level(&mut world, 0);
        start_level(&mut world);
        world
    }

    fn go(world: &mut WorldState, dir: MoveDir) -> Vec<GameEvent> {
        step(world, FrameInput { movement: Some(dir), restart: false })
    }

    fn idle(world: &mut WorldState, ticks: u32) -> Vec<GameEvent> {
        let mut all = vec![];
        for _ in 0..ticks {
            all.extend(step(world, FrameInput::default()));
        }
        all
    }

    fn player(world: &WorldState) -> Position {
        world.level.as_ref().unwrap().player.pos
    }

    fn tile(world: &WorldState, x: i32, y: i32) -> Option<TileType> {
        world.level.as_ref().unwrap().grid.get_tile(Position::new(x, y))
    }

    #[test]
    fn load_waits_for_confirm_on_spawn() {
        let def = LevelDef { name: "Dry Feet".into(), rows: vec!["0S0".into()] };
        let mut world = WorldState::new(&GameConfig::default(), vec![def]);
        load_level(&mut world, 0);
        assert_eq!(world.phase, Phase::Ready);
        assert_eq!(world.message, "Dry Feet: Press ENTER to start.");
        assert!(go(&mut world, MoveDir::Right).is_empty());
        assert_eq!(player(&world), Position::new(1, 0));

        start_level(&mut world);
        assert_eq!(world.phase, Phase::Playing);
        assert!(world.message.is_empty());
        assert_eq!(go(&mut world, MoveDir::Right).len(), 1);
    }

    #[test]
    fn start_only_leaves_the_prompt() {
        let mut world = world_with(&["SE"]);
        go(&mut world, MoveDir::Right);
        start_level(&mut world);
        assert_eq!(world.phase, Phase::LevelComplete);
    }

    #[test]
    fn no_levels_phase_when_list_is_empty() {
        let mut world = WorldState::new(&GameConfig::default(), vec![]);
        load_level(&mut world, 0);
        assert_eq!(world.phase, Phase::NoLevels);
        assert!(world.level.is_none());
    }

    #[test]
    fn blocked_move_has_no_side_effects() {
        let mut world = world_with(&["SW"]);
        let ev = go(&mut world, MoveDir::Right);
        assert_eq!(ev, vec![GameEvent::MoveBlocked]);
        assert_eq!(player(&world), Position::new(0, 0));
        assert_eq!(world.moves, 0);
        assert_eq!(world.scheduler.active_count(), 0);
    }

    #[test]
    fn ice_slide_is_one_move() {
        let mut world = world_with(&["SIII0"]);
        go(&mut world, MoveDir::Right);
        let ev = go(&mut world, MoveDir::Right);
        assert_eq!(ev, vec![GameEvent::PlayerSlid { from: Position::new(1, 0), to: Position::new(4, 0) }]);
        assert_eq!(world.moves, 2);
    }

    #[test]
    fn reaching_the_end_completes_once() {
        let mut world = world_with(&["SE"]);
        let ev = go(&mut world, MoveDir::Right);
        assert!(ev.contains(&GameEvent::LevelCompleted { level: 0 }));
        assert_eq!(world.phase, Phase::LevelComplete);
        // Further input is ignored until the level advances.
        assert!(go(&mut world, MoveDir::Left).is_empty());
    }

    #[test]
    fn advancing_past_the_last_level_completes_the_game() {
        let mut world = world_with(&["SE"]);
        go(&mut world, MoveDir::Right);
        advance_level(&mut world);
        assert_eq!(world.phase, Phase::GameComplete);
    }

    #[test]
    fn cracked_floor_becomes_hole_after_delay() {
        let mut world = world_with(&["SC00"]);
        let collapse = world.speed.collapse_ticks;
        go(&mut world, MoveDir::Right);
        let ev = go(&mut world, MoveDir::Right);
        assert!(ev.contains(&GameEvent::FloorCracking { pos: Position::new(1, 0) }));
        assert_eq!(tile(&world, 1, 0), Some(TileType::CrackedFloor));

        // Scheduled after this tick's timers ran, so the countdown starts next tick.
        let ev = idle(&mut world, collapse);
        assert!(ev.contains(&GameEvent::FloorCollapsed { pos: Position::new(1, 0) }));
        assert_eq!(tile(&world, 1, 0), Some(TileType::Hole));

        // Hole is not enterable.
        let ev = go(&mut world, MoveDir::Left);
        assert_eq!(ev, vec![GameEvent::MoveBlocked]);
    }

    #[test]
    fn collapse_is_scheduled_once_per_cell() {
        let mut world = world_with(&["SC0"]);
        go(&mut world, MoveDir::Right);
        go(&mut world, MoveDir::Right);
        go(&mut world, MoveDir::Left);
        let ev = go(&mut world, MoveDir::Right);
        assert!(!ev.iter().any(|e| matches!(e, GameEvent::FloorCracking { .. })));
        assert_eq!(world.scheduler.active_count(), 1);
    }

    #[test]
    fn collapse_underfoot_resets_the_level() {
        let mut world = world_with(&["SC0"]);
        let collapse = world.speed.collapse_ticks;
        go(&mut world, MoveDir::Right);
        go(&mut world, MoveDir::Right);
        go(&mut world, MoveDir::Left); // back onto the cracking cell

        let ev = idle(&mut world, collapse);
        assert!(ev.contains(&GameEvent::FloorCollapsed { pos: Position::new(1, 0) }));
        assert!(ev.contains(&GameEvent::PlayerFell));

        // Fresh attempt: spawn, intact floor, nothing pending.
        assert_eq!(player(&world), Position::new(0, 0));
        assert_eq!(tile(&world, 1, 0), Some(TileType::CrackedFloor));
        assert_eq!(world.scheduler.active_count(), 0);
        assert_eq!(world.resets, 1);
        assert_eq!(world.message, "You fell into a hole!");
        assert_eq!(world.phase, Phase::Playing);
    }

    #[test]
    fn completions_after_a_reset_in_the_same_tick_are_dropped() {
        // Two collapses finish on the same tick; the first one is underfoot.
        let mut world = world_with(&["SCC0"]);
        world.scheduler.start(AnimKind::Collapse, Position::new(0, 0), 1);
        world.scheduler.start(AnimKind::Collapse, Position::new(2, 0), 1);

        let ev = idle(&mut world, 1);
        assert!(ev.contains(&GameEvent::FloorCollapsed { pos: Position::new(0, 0) }));
        assert!(ev.contains(&GameEvent::PlayerFell));
        assert!(!ev.contains(&GameEvent::FloorCollapsed { pos: Position::new(2, 0) }));

        assert_eq!(tile(&world, 0, 0), Some(TileType::Start));
        assert_eq!(tile(&world, 2, 0), Some(TileType::CrackedFloor));
    }

    #[test]
    fn button_unlocks_and_restart_relocks() {
        let mut world = world_with(&["SBD0"]);
        let ev = go(&mut world, MoveDir::Right);
        assert!(ev.contains(&GameEvent::ButtonPressed { pos: Position::new(1, 0) }));
        assert!(ev.contains(&GameEvent::DoorUnlocked { pos: Position::new(2, 0) }));

        let ev = go(&mut world, MoveDir::Right);
        assert_eq!(ev, vec![GameEvent::PlayerMoved { from: Position::new(1, 0), to: Position::new(2, 0) }]);

        let ev = step(&mut world, FrameInput { movement: None, restart: true });
        assert_eq!(ev, vec![GameEvent::LevelRestarted]);
        assert_eq!(world.message, "Level restarted");
        let level = world.level.as_ref().unwrap();
        assert!(!level.registry.state().doors_unlocked);
        assert!(!level.registry.state().button_pressed);
        assert_eq!(player(&world), Position::new(0, 0));
    }

    #[test]
    fn door_stays_shut_without_button() {
        let mut world = world_with(&["SD0"]);
        assert_eq!(go(&mut world, MoveDir::Right), vec![GameEvent::MoveBlocked]);
    }

    #[test]
    fn second_button_press_is_silent() {
        let mut world = world_with(&["SB0", "0B0"]);
        let ev = go(&mut world, MoveDir::Right);
        assert!(ev.contains(&GameEvent::ButtonPressed { pos: Position::new(1, 0) }));
        let ev = go(&mut world, MoveDir::Down);
        assert_eq!(ev, vec![GameEvent::PlayerMoved { from: Position::new(1, 0), to: Position::new(1, 1) }]);
    }

    #[test]
    fn swimmer_crosses_water() {
        let mut config = GameConfig::default();
        config.player.can_swim = true;
        let def = LevelDef { name: "swim".into(), rows: vec!["S1E".into()] };
        let mut world = WorldState::new(&config, vec![def]);
        load_level(&mut world, 0);
        start_level(&mut world);
        go(&mut world, MoveDir::Right);
        let ev = go(&mut world, MoveDir::Right);
        assert!(ev.contains(&GameEvent::LevelCompleted { level: 0 }));
    }

    #[test]
    fn water_blocks_non_swimmer() {
        let mut world = world_with(&["S1E"]);
        assert_eq!(go(&mut world, MoveDir::Right), vec![GameEvent::MoveBlocked]);
        assert_eq!(world.resets, 0);
    }

    #[test]
    fn next_level_starts_fresh() {
        let config = GameConfig::default();
        let defs = vec![
            LevelDef { name: "one".into(), rows: vec!["SCE".into()] },
            LevelDef { name: "two".into(), rows: vec!["SC0".into()] },
        ];
        let mut world = WorldState::new(&config, defs);
        load_level(&mut world, 0);
        start_level(&mut world);
        go(&mut world, MoveDir::Right);
        go(&mut world, MoveDir::Right); // pending collapse at (1,0)
        assert_eq!(world.phase, Phase::LevelComplete);

        advance_level(&mut world);
        assert_eq!(world.phase, Phase::Ready);
        assert_eq!(world.scheduler.active_count(), 0);
        assert_eq!(world.moves, 0);
        start_level(&mut world);
        let collapse = world.speed.collapse_ticks;
        idle(&mut world, collapse + 1);
        assert_eq!(tile(&world, 1, 0), Some(TileType::CrackedFloor));
    }

    #[test]
    fn only_reset_commands_hold_back_the_move() {
        let pos = Position::new(1, 0);
        assert!(!ends_in_reset(&[]));
        assert!(!ends_in_reset(&[
            EffectCommand::Schedule { kind: AnimKind::Press, pos },
            EffectCommand::CompleteLevel,
        ]));
        assert!(ends_in_reset(&[
            EffectCommand::Schedule { kind: AnimKind::Collapse, pos },
            EffectCommand::Reset(ResetReason::Drowned),
        ]));
    }
}
