/// Entities: the player, grid positions, and per-frame input.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

/// One of the four unit moves on the grid.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveDir {
    Left,
    Right,
    Up,
    Down,
}

impl MoveDir {
    pub const ALL: [MoveDir; 4] = [MoveDir::Left, MoveDir::Right, MoveDir::Up, MoveDir::Down];

    /// Unit vector (dx, dy); y grows downward.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Left => (-1, 0),
            MoveDir::Right => (1, 0),
            MoveDir::Up => (0, -1),
            MoveDir::Down => (0, 1),
        }
    }
}

/// Grid coordinate. Signed so a candidate may sit outside the map
/// until it is bounds-checked.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// One cell further in `dir`.
    #[inline]
    pub fn step(self, dir: MoveDir) -> Position {
        let (dx, dy) = dir.delta();
        Position { x: self.x + dx, y: self.y + dy }
    }

    /// One cell back against `dir`.
    #[inline]
    pub fn back(self, dir: MoveDir) -> Position {
        let (dx, dy) = dir.delta();
        Position { x: self.x - dx, y: self.y - dy }
    }

    /// Manhattan distance, used to tell a slide from a single step.
    pub fn distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// Player abilities that gate tile enterability.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Capabilities {
    pub swim: bool,
}

/// Frame input: at most one movement per tick, plus edge-triggered restart.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<MoveDir>,
    pub restart: bool,
}

#[derive(Clone, Debug)]
pub struct Player {
    pub pos: Position,
    pub facing: Facing,
    pub caps: Capabilities,
}

impl Player {
    pub fn new(pos: Position, caps: Capabilities) -> Self {
        Player {
            pos,
            facing: Facing::Right,
            caps,
        }
    }

    /// Commit a resolved move. Horizontal moves turn the player.
    pub fn move_to(&mut self, to: Position, dir: MoveDir) {
        match dir {
            MoveDir::Left => self.facing = Facing::Left,
            MoveDir::Right => self.facing = Facing::Right,
            MoveDir::Up | MoveDir::Down => {}
        }
        self.pos = to;
    }
}
