/// Tile effects: the behaviour bound to each tile type.
///
/// Every tile type has exactly one `TileEffect` variant. A variant answers
/// four questions for the movement resolver:
///
/// ┌──────────────┬───────────────┬─────────────────────┬────────────────┬───────────────────────┐
/// │ Effect       │ is_enterable  │ destination         │ on_exit        │ on_enter              │
/// ├──────────────┼───────────────┼─────────────────────┼────────────────┼───────────────────────┤
/// │ Grass, Start │ yes           │ origin + dir        │ —              │ —                     │
/// │ End          │ yes           │ origin + dir        │ —              │ complete level        │
/// │ Wall         │ no            │ —                   │ —              │ —                     │
/// │ Water        │ swim only     │ origin + dir        │ —              │ reset unless swimming │
/// │ Ice          │ yes           │ slide until blocked │ —              │ —                     │
/// │ Hole         │ no            │ —                   │ —              │ reset (fell)          │
/// │ CrackedFloor │ yes           │ origin + dir        │ start collapse │ —                     │
/// │ Button       │ yes           │ origin + dir        │ —              │ unlock doors, once    │
/// │ LockedDoor   │ once unlocked │ origin + dir        │ —              │ —                     │
/// └──────────────┴───────────────┴─────────────────────┴────────────────┴───────────────────────┘
///
/// Variants carry no data. The mutable bits (button pressed, doors
/// unlocked) live in `EffectState`, owned by the level's registry and
/// rebuilt on every level load.
///
/// Side effects are not performed here. `on_exit` / `on_enter` append
/// `EffectCommand`s which the session applies in order.

use super::entity::{Capabilities, MoveDir, Position};
use super::grid::Grid;
use super::registry::EffectRegistry;
use super::tile::TileType;

/// Level-scoped effect state. A fresh value means "nothing pressed, nothing open".
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct EffectState {
    pub button_pressed: bool,
    pub doors_unlocked: bool,
}

/// Timed visual tasks an effect may start.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AnimKind {
    /// Cracked floor crumbling; turns the cell into a hole when it finishes.
    Collapse,
    /// Button sinking in. Cosmetic.
    Press,
    /// Door sliding open. Cosmetic; the door is already passable.
    Unlock,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ResetReason {
    Drowned,
    Fell,
}

impl ResetReason {
    pub fn message(self) -> &'static str {
        match self {
            ResetReason::Drowned => "You drowned!",
            ResetReason::Fell => "You fell into a hole!",
        }
    }
}

/// A request from an effect to the surrounding level.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EffectCommand {
    Schedule { kind: AnimKind, pos: Position },
    Reset(ResetReason),
    CompleteLevel,
}

/// Read-only view used for enterability and destination queries.
pub struct MoveContext<'a> {
    pub grid: &'a Grid,
    pub registry: &'a EffectRegistry,
    pub caps: Capabilities,
}

impl<'a> MoveContext<'a> {
    /// In bounds AND the bound effect admits the mover.
    pub fn is_walkable(&self, pos: Position) -> bool {
        match self.grid.get_tile(pos) {
            Some(tile) => self.registry.effect(tile).is_enterable(self),
            None => false,
        }
    }
}

/// Mutable view handed to `on_exit` / `on_enter`.
pub struct EffectContext<'a> {
    pub grid: &'a Grid,
    pub state: &'a mut EffectState,
    pub caps: Capabilities,
    commands: Vec<EffectCommand>,
}

impl<'a> EffectContext<'a> {
    pub fn new(grid: &'a Grid, state: &'a mut EffectState, caps: Capabilities) -> Self {
        EffectContext { grid, state, caps, commands: Vec::new() }
    }

    pub fn schedule(&mut self, kind: AnimKind, pos: Position) {
        self.commands.push(EffectCommand::Schedule { kind, pos });
    }

    pub fn reset_level(&mut self, reason: ResetReason) {
        self.commands.push(EffectCommand::Reset(reason));
    }

    pub fn complete_level(&mut self) {
        self.commands.push(EffectCommand::CompleteLevel);
    }

    pub fn into_commands(self) -> Vec<EffectCommand> {
        self.commands
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TileEffect {
    Grass,
    Start,
    End,
    Wall,
    Water,
    Ice,
    Hole,
    CrackedFloor,
    Button,
    LockedDoor,
}

impl TileEffect {
    /// The effect bound to `tile`. Exhaustive: a new tile type will not compile without one.
    pub fn bound_to(tile: TileType) -> TileEffect {
        match tile {
            TileType::Empty => TileEffect::Grass,
            TileType::Water => TileEffect::Water,
            TileType::Start => TileEffect::Start,
            TileType::End => TileEffect::End,
            TileType::Wall => TileEffect::Wall,
            TileType::CrackedFloor => TileEffect::CrackedFloor,
            TileType::Ice => TileEffect::Ice,
            TileType::Hole => TileEffect::Hole,
            TileType::Button => TileEffect::Button,
            TileType::LockedDoor => TileEffect::LockedDoor,
        }
    }

    pub fn tile(self) -> TileType {
        match self {
            TileEffect::Grass => TileType::Empty,
            TileEffect::Water => TileType::Water,
            TileEffect::Start => TileType::Start,
            TileEffect::End => TileType::End,
            TileEffect::Wall => TileType::Wall,
            TileEffect::CrackedFloor => TileType::CrackedFloor,
            TileEffect::Ice => TileType::Ice,
            TileEffect::Hole => TileType::Hole,
            TileEffect::Button => TileType::Button,
            TileEffect::LockedDoor => TileType::LockedDoor,
        }
    }

    pub fn is_enterable(self, ctx: &MoveContext) -> bool {
        match self {
            TileEffect::Wall | TileEffect::Hole => false,
            TileEffect::Water => ctx.caps.swim,
            TileEffect::LockedDoor => ctx.registry.state().doors_unlocked,
            _ => true,
        }
    }

    /// Does this effect choose its own destination (and check it)?
    /// The resolver pre-checks the adjacent cell only for effects that don't.
    pub fn redirects(self) -> bool {
        matches!(self, TileEffect::Ice)
    }

    /// Where a move starting on this tile ends up.
    pub fn compute_destination(self, origin: Position, dir: MoveDir, ctx: &MoveContext) -> Position {
        match self {
            TileEffect::Ice => slide(origin, dir, ctx),
            _ => origin.step(dir),
        }
    }

    pub fn on_exit(self, pos: Position, ctx: &mut EffectContext) {
        if self == TileEffect::CrackedFloor {
            ctx.schedule(AnimKind::Collapse, pos);
        }
    }

    pub fn on_enter(self, pos: Position, ctx: &mut EffectContext) {
        match self {
            TileEffect::Water => {
                if !ctx.caps.swim {
                    ctx.reset_level(ResetReason::Drowned);
                }
            }
            TileEffect::Hole => ctx.reset_level(ResetReason::Fell),
            TileEffect::End => ctx.complete_level(),
            TileEffect::Button => {
                if ctx.state.button_pressed {
                    return;
                }
                ctx.state.button_pressed = true;
                ctx.state.doors_unlocked = true;
                ctx.schedule(AnimKind::Press, pos);
                for door in ctx.grid.find_positions(TileType::LockedDoor) {
                    ctx.schedule(AnimKind::Unlock, door);
                }
            }
            TileEffect::Grass
            | TileEffect::Start
            | TileEffect::Wall
            | TileEffect::Ice
            | TileEffect::CrackedFloor
            | TileEffect::LockedDoor => {}
        }
    }
}

/// Slide across the ice run in `dir`.
///
/// The first non-ice cell past the run (possibly off the map) is the
/// candidate. Land there if walkable, otherwise stop on the last ice cell.
/// `get_tile` is `None` off the map, so the loop ends within max(width, height) steps.
fn slide(origin: Position, dir: MoveDir, ctx: &MoveContext) -> Position {
    let mut candidate = origin.step(dir);
    while ctx.grid.get_tile(candidate) == Some(TileType::Ice) {
        candidate = candidate.step(dir);
    }
    if ctx.is_walkable(candidate) {
        candidate
    } else {
        candidate.back(dir)
    }
}
