/// Movement resolver: turns (position, direction) into a final position
/// plus the ordered side effects of leaving and arriving.
///
/// Resolution order:
///   1. Adjacent cell off the map → Rejected (no tile lookup at all)
///   2. Origin tile → origin effect
///   3. Non-redirecting origin and adjacent cell not walkable → Rejected
///   4. `compute_destination` on the origin effect (ice slides here)
///   5. Destination == origin → Rejected
///   6. Origin effect `on_exit(origin)`
///   7. Destination effect `on_enter(destination)`
///
/// The resolver does not commit the move. The caller applies the returned
/// commands and decides whether the player actually ends up at `to`.

use super::effect::{EffectCommand, EffectContext, MoveContext};
use super::entity::{Capabilities, MoveDir, Position};
use super::grid::Grid;
use super::registry::EffectRegistry;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RejectReason {
    OffMap,
    Blocked,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Resolution {
    Rejected(RejectReason),
    Moved {
        from: Position,
        to: Position,
        /// More than one cell travelled (ice).
        slid: bool,
        commands: Vec<EffectCommand>,
    },
}

impl Resolution {
    #[cfg(test)]
    pub fn destination(&self) -> Option<Position> {
        match self {
            Resolution::Moved { to, .. } => Some(*to),
            Resolution::Rejected(_) => None,
        }
    }
}

pub fn resolve_move(
    grid: &Grid,
    registry: &mut EffectRegistry,
    caps: Capabilities,
    origin: Position,
    dir: MoveDir,
) -> Resolution {
    if !grid.is_in_bounds(origin.step(dir)) {
        return Resolution::Rejected(RejectReason::OffMap);
    }
    let origin_effect = match registry.effect_at(grid, origin) {
        Some(e) => e,
        None => return Resolution::Rejected(RejectReason::OffMap),
    };

    let to = {
        let ctx = MoveContext { grid, registry, caps };
        if !origin_effect.redirects() && !ctx.is_walkable(origin.step(dir)) {
            return Resolution::Rejected(RejectReason::Blocked);
        }
        origin_effect.compute_destination(origin, dir, &ctx)
    };
    if to == origin {
        return Resolution::Rejected(RejectReason::Blocked);
    }
    let dest_effect = match registry.effect_at(grid, to) {
        Some(e) => e,
        None => return Resolution::Rejected(RejectReason::OffMap),
    };

    let mut fx = EffectContext::new(grid, registry.state_mut(), caps);
    origin_effect.on_exit(origin, &mut fx);
    dest_effect.on_enter(to, &mut fx);

    Resolution::Moved {
        from: origin,
        to,
        slid: origin.distance(to) > 1,
        commands: fx.into_commands(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::effect::{AnimKind, ResetReason};
    use crate::domain::tile::TileType;
    use proptest::prelude::*;

    const DRY: Capabilities = Capabilities { swim: false };

    fn run(rows: &[&str], from: (i32, i32), dir: MoveDir) -> Resolution {
        let grid = Grid::from_diagram(rows);
        let mut reg = EffectRegistry::for_level();
        resolve_move(&grid, &mut reg, DRY, Position::new(from.0, from.1), dir)
    }

    #[test]
    fn plain_step() {
        let r = run(&["S0"], (0, 0), MoveDir::Right);
        assert_eq!(r, Resolution::Moved {
            from: Position::new(0, 0),
            to: Position::new(1, 0),
            slid: false,
            commands: vec![],
        });
    }

    #[test]
    fn off_map_rejected_before_lookup() {
        assert_eq!(run(&["S0"], (0, 0), MoveDir::Left), Resolution::Rejected(RejectReason::OffMap));
        assert_eq!(run(&["S0"], (0, 0), MoveDir::Up), Resolution::Rejected(RejectReason::OffMap));
    }

    #[test]
    fn blockers_rejected() {
        for row in ["SW", "SH", "S1", "SD"] {
            assert_eq!(
                run(&[row], (0, 0), MoveDir::Right),
                Resolution::Rejected(RejectReason::Blocked),
                "{row}",
            );
        }
    }

    #[test]
    fn ice_slides_in_one_event() {
        let r = run(&["III0"], (0, 0), MoveDir::Right);
        assert_eq!(r.destination(), Some(Position::new(3, 0)));
        assert!(matches!(r, Resolution::Moved { slid: true, .. }));
    }

    #[test]
    fn ice_stops_before_wall() {
        let r = run(&["IIW"], (0, 0), MoveDir::Right);
        assert_eq!(r.destination(), Some(Position::new(1, 0)));
    }

    #[test]
    fn ice_against_wall_is_rejected() {
        assert_eq!(run(&["IW"], (0, 0), MoveDir::Right), Resolution::Rejected(RejectReason::Blocked));
    }

    #[test]
    fn stepping_onto_ice_does_not_slide() {
        // Slides are decided by the tile you leave, not the one you enter.
        let r = run(&["0III0"], (0, 0), MoveDir::Right);
        assert_eq!(r.destination(), Some(Position::new(1, 0)));
    }

    #[test]
    fn exit_fires_before_enter() {
        let r = run(&["CE"], (0, 0), MoveDir::Right);
        match r {
            Resolution::Moved { commands, .. } => assert_eq!(commands, vec![
                EffectCommand::Schedule { kind: AnimKind::Collapse, pos: Position::new(0, 0) },
                EffectCommand::CompleteLevel,
            ]),
            other => panic!("expected move, got {other:?}"),
        }
    }

    #[test]
    fn slide_onto_end_completes() {
        let r = run(&["IIE"], (0, 0), MoveDir::Right);
        match r {
            Resolution::Moved { to, commands, .. } => {
                assert_eq!(to, Position::new(2, 0));
                assert_eq!(commands, vec![EffectCommand::CompleteLevel]);
            }
            other => panic!("expected move, got {other:?}"),
        }
    }

    #[test]
    fn button_opens_door_for_next_move() {
        let grid = Grid::from_diagram(&["SBD0"]);
        let mut reg = EffectRegistry::for_level();

        // Stepping onto the button presses it; the door opens for the next move.
        let r = resolve_move(&grid, &mut reg, DRY, Position::new(0, 0), MoveDir::Right);
        assert_eq!(r.destination(), Some(Position::new(1, 0)));
        assert!(reg.state().doors_unlocked);

        let r = resolve_move(&grid, &mut reg, DRY, Position::new(1, 0), MoveDir::Right);
        assert_eq!(r.destination(), Some(Position::new(2, 0)));
    }

    #[test]
    fn door_blocks_without_button() {
        let grid = Grid::from_diagram(&["SD0B"]);
        let mut reg = EffectRegistry::for_level();
        let r = resolve_move(&grid, &mut reg, DRY, Position::new(0, 0), MoveDir::Right);
        assert_eq!(r, Resolution::Rejected(RejectReason::Blocked));
        assert!(!reg.state().button_pressed);
    }

    #[test]
    fn swimmer_enters_water_without_reset() {
        let grid = Grid::from_diagram(&["S1"]);
        let mut reg = EffectRegistry::for_level();
        let r = resolve_move(&grid, &mut reg, Capabilities { swim: true }, Position::new(0, 0), MoveDir::Right);
        assert_eq!(r, Resolution::Moved {
            from: Position::new(0, 0),
            to: Position::new(1, 0),
            slid: false,
            commands: vec![],
        });
    }

    #[test]
    fn collapsed_cell_blocks_later_moves() {
        let mut grid = Grid::from_diagram(&["0C0"]);
        let mut reg = EffectRegistry::for_level();
        grid.set_tile(Position::new(1, 0), TileType::Hole);
        let r = resolve_move(&grid, &mut reg, DRY, Position::new(0, 0), MoveDir::Right);
        assert_eq!(r, Resolution::Rejected(RejectReason::Blocked));
        // Hole entry itself is a reset (reachable only when a floor collapses underfoot)
        let mut st = *reg.state();
        let mut fx = EffectContext::new(&grid, &mut st, DRY);
        reg.effect(TileType::Hole).on_enter(Position::new(1, 0), &mut fx);
        assert_eq!(fx.into_commands(), vec![EffectCommand::Reset(ResetReason::Fell)]);
    }

    fn tile_strategy() -> impl Strategy<Value = TileType> {
        prop::sample::select(TileType::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn resolution_stays_on_walkable_cells(
            cells in prop::collection::vec(tile_strategy(), 1..64),
            width in 1_usize..9,
            x in 0_i32..8,
            y in 0_i32..8,
            dir_idx in 0_usize..4,
            swim in any::<bool>(),
        ) {
            let rows: Vec<Vec<TileType>> = cells.chunks(width).map(|c| c.to_vec()).collect();
            let grid = Grid::from_rows(rows);
            let origin = Position::new(x % grid.width() as i32, y % grid.height() as i32);

            let caps = Capabilities { swim };
            let mut reg = EffectRegistry::for_level();
            let dir = MoveDir::ALL[dir_idx];
            match resolve_move(&grid, &mut reg, caps, origin, dir) {
                Resolution::Moved { to, .. } => {
                    prop_assert!(grid.is_in_bounds(to));
                    prop_assert_ne!(to, origin);
                    prop_assert!(origin.distance(to) as usize <= grid.span());
                    let ctx = MoveContext { grid: &grid, registry: &reg, caps };
                    // The button may have just unlocked doors, which only widens walkability.
                    prop_assert!(ctx.is_walkable(to));
                }
                Resolution::Rejected(_) => {}
            }
        }
    }
}
