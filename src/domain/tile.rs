/// Tile types and their level-file symbols.
/// Behaviour lives in `effect.rs`; this module only names the kinds
/// and maps them to and from the one-character map alphabet.

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum TileType {
    #[default]
    Empty,        // '0' grass
    Water,        // '1' needs swim
    Start,        // 'S' player spawn
    End,          // 'E' level exit
    Wall,         // 'W'
    CrackedFloor, // 'C' collapses after being left
    Ice,          // 'I' slide until blocked
    Hole,         // 'H'
    Button,       // 'B' unlocks every door
    LockedDoor,   // 'D'
}

impl TileType {
    pub const COUNT: usize = 10;

    /// Every tile type in declaration order (matches `index()`).
    pub const ALL: [TileType; TileType::COUNT] = [
        TileType::Empty,
        TileType::Water,
        TileType::Start,
        TileType::End,
        TileType::Wall,
        TileType::CrackedFloor,
        TileType::Ice,
        TileType::Hole,
        TileType::Button,
        TileType::LockedDoor,
    ];

    /// Parse a map symbol. Unknown symbols return `None`; callers decide the fallback.
    pub fn from_symbol(c: char) -> Option<TileType> {
        match c {
            '0' => Some(TileType::Empty),
            '1' => Some(TileType::Water),
            'S' => Some(TileType::Start),
            'E' => Some(TileType::End),
            'W' => Some(TileType::Wall),
            'C' => Some(TileType::CrackedFloor),
            'I' => Some(TileType::Ice),
            'H' => Some(TileType::Hole),
            'B' => Some(TileType::Button),
            'D' => Some(TileType::LockedDoor),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            TileType::Empty => '0',
            TileType::Water => '1',
            TileType::Start => 'S',
            TileType::End => 'E',
            TileType::Wall => 'W',
            TileType::CrackedFloor => 'C',
            TileType::Ice => 'I',
            TileType::Hole => 'H',
            TileType::Button => 'B',
            TileType::LockedDoor => 'D',
        }
    }

    /// Dense index for dispatch tables.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            TileType::Empty => "grass",
            TileType::Water => "water",
            TileType::Start => "start",
            TileType::End => "end",
            TileType::Wall => "wall",
            TileType::CrackedFloor => "cracked floor",
            TileType::Ice => "ice",
            TileType::Hole => "hole",
            TileType::Button => "button",
            TileType::LockedDoor => "locked door",
        }
    }
}
