/// WorldState: the complete snapshot of a running game.
///
/// ## Level lifetime
///
/// Everything a level can change (grid, effect registry and its state,
/// player) lives in one `Level` value. Loading or restarting replaces the
/// whole value, so a restart can never leak a collapsed floor or an open
/// door into the next attempt. The definitions in `levels` are never
/// mutated.
///
/// ## Camera / Viewport
///
/// World coordinates and screen coordinates are separate:
///   - `camera` — viewport into the world (top-left corner + size)
///   - Renderer maps: `screen(sx, sy) = world(camera.x + sx, camera.y + sy)`
///   - Camera follows the player with a dead-zone approach
///   - Maps smaller than the viewport are centered

use crate::config::{GameConfig, SpeedConfig};
use crate::domain::entity::{Capabilities, Player, Position};
use crate::domain::grid::Grid;
use crate::domain::registry::EffectRegistry;
use crate::sim::anim::Scheduler;
use crate::sim::level::LevelDef;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    /// Level loaded, player hidden until confirm.
    Ready,
    Playing,
    LevelComplete,
    GameComplete,
    NoLevels,
}

/// Camera: a viewport into the world.
///
/// `(x, y)` is the world coordinate of the top-left visible cell.
/// `(view_w, view_h)` is how many world cells fit in the viewport.
/// These are computed from terminal size and set during `render()`.
#[derive(Clone, Debug, Default)]
pub struct Camera {
    /// World X of the top-left visible cell (can be negative for centering)
    pub x: i32,
    /// World Y of the top-left visible cell
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera::default()
    }

    /// Follow `target` with a dead zone: only scroll when the target
    /// gets within 20% of a viewport edge.
    pub fn follow(&mut self, target: Position, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, target.x, self.view_w, world_w);
        self.y = follow_axis(self.y, target.y, self.view_h, world_h);
    }

    /// Snap camera directly to center on a position (no dead zone).
    /// Used on level load / restart.
    pub fn center_on(&mut self, target: Position, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = center_axis(target.x, self.view_w, world_w);
        self.y = center_axis(target.y, self.view_h, world_h);
    }

    /// Convert world coordinate to viewport coordinate.
    /// Returns None if outside the visible area.
    pub fn world_to_view(&self, pos: Position) -> Option<(usize, usize)> {
        let vx = pos.x - self.x;
        let vy = pos.y - self.y;
        if vx >= 0 && vx < self.view_w as i32 && vy >= 0 && vy < self.view_h as i32 {
            Some((vx as usize, vy as usize))
        } else {
            None
        }
    }

    /// Viewport cell back to world coordinate (may be off the map).
    pub fn view_to_world(&self, vx: usize, vy: usize) -> Position {
        Position::new(self.x + vx as i32, self.y + vy as i32)
    }
}

fn follow_axis(cam: i32, target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    let margin = (view as i32) / 5;
    let low = cam + margin;
    let high = cam + view as i32 - margin - 1;
    let cam = if target < low {
        target - margin
    } else if target > high {
        target - view as i32 + margin + 1
    } else {
        cam
    };
    cam.clamp(0, (world as i32 - view as i32).max(0))
}

fn center_axis(target: i32, view: usize, world: usize) -> i32 {
    if world <= view {
        return -((view as i32 - world as i32) / 2);
    }
    (target - view as i32 / 2).clamp(0, (world as i32 - view as i32).max(0))
}

/// One loaded attempt at a level.
#[derive(Clone, Debug)]
pub struct Level {
    pub index: usize,
    pub name: String,
    pub grid: Grid,
    pub registry: EffectRegistry,
    pub player: Player,
}

pub struct WorldState {
    pub levels: Vec<LevelDef>,
    pub level: Option<Level>,
    pub scheduler: Scheduler,

    pub speed: SpeedConfig,
    /// Capabilities every fresh player starts with.
    pub caps: Capabilities,

    // ── Meta ──
    pub phase: Phase,
    pub current_level: usize,
    pub moves: u32,
    pub resets: u32,
    pub tick: u64,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,
    pub camera: Camera,
}

impl WorldState {
    pub fn new(config: &GameConfig, levels: Vec<LevelDef>) -> Self {
        WorldState {
            levels,
            level: None,
            scheduler: Scheduler::new(),
            speed: config.speed.clone(),
            caps: Capabilities { swim: config.player.can_swim },
            phase: Phase::Title,
            current_level: 0,
            moves: 0,
            resets: 0,
            tick: 0,
            message: String::new(),
            message_timer: 0,
            camera: Camera::new(),
        }
    }

    /// Show `msg`. A duration of 0 keeps it until replaced.
    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    pub fn clear_message(&mut self) {
        self.message.clear();
        self.message_timer = 0;
    }

    pub fn total_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn center_camera(&mut self) {
        if let Some(level) = &self.level {
            self.camera.center_on(level.player.pos, level.grid.width(), level.grid.height());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam(view_w: usize, view_h: usize) -> Camera {
        Camera { x: 0, y: 0, view_w, view_h }
    }

    #[test]
    fn small_map_is_centered() {
        let mut c = cam(20, 10);
        c.center_on(Position::new(1, 1), 10, 4);
        assert_eq!((c.x, c.y), (-5, -3));
        assert_eq!(c.world_to_view(Position::new(0, 0)), Some((5, 3)));
    }

    #[test]
    fn follow_only_scrolls_near_the_edge() {
        let mut c = cam(10, 10);
        c.follow(Position::new(5, 5), 40, 40);
        assert_eq!((c.x, c.y), (0, 0));
        c.follow(Position::new(8, 5), 40, 40);
        assert_eq!(c.x, 1);
        c.follow(Position::new(39, 39), 40, 40);
        assert_eq!((c.x, c.y), (30, 30));
    }

    #[test]
    fn view_round_trips_inside_viewport() {
        let c = Camera { x: 3, y: -2, view_w: 8, view_h: 8 };
        let p = c.view_to_world(4, 5);
        assert_eq!(p, Position::new(7, 3));
        assert_eq!(c.world_to_view(p), Some((4, 5)));
        assert_eq!(c.world_to_view(Position::new(0, 0)), None);
    }
}
