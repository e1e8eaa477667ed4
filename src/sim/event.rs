/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and overlay text.

use crate::domain::entity::Position;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    PlayerMoved { from: Position, to: Position },
    /// A move that crossed ice and travelled more than one cell.
    PlayerSlid { from: Position, to: Position },
    MoveBlocked,
    FloorCracking { pos: Position },
    FloorCollapsed { pos: Position },
    ButtonPressed { pos: Position },
    DoorUnlocked { pos: Position },
    PlayerDrowned,
    PlayerFell,
    LevelCompleted { level: usize },
    LevelRestarted,
}
