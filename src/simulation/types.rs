//! Core types for the limo simulation
//!
//! Coordinate spaces, compass directions and the typed ids used across the
//! simulation. None of this depends on the engine itself.

/// Side length of a tile in map units. The map-unit grid is where limos
/// actually move; one step advances one map unit along a movement curve.
pub const UNITS_PER_TILE: i32 = 24;

/// Side length of a collision cell in map units. Collision and occupancy
/// checks are done on quarter-tile cells, not exact map positions.
pub const UNITS_PER_CELL: i32 = UNITS_PER_TILE / 4;

/// Fastest a limo travels on a straight, in map units per tick.
pub const MAX_STRAIGHT_SPEED: i32 = 6;

/// Speed limit through a left or right turn.
pub const MAX_CURVE_SPEED: i32 = 3;

/// Speed limit through a U-turn.
pub const MAX_UTURN_SPEED: i32 = 1;

/// A unique identifier for a player (and their limo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerId(pub usize);

/// A unique identifier for a passenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassengerId(pub usize);

/// A unique identifier for a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompanyId(pub usize);

/// A compass direction of travel. The map uses screen coordinates: y grows
/// to the south.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit delta in map/tile coordinates (y grows south).
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// The direction after a right turn (clockwise on screen).
    pub fn right(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// The direction after a left turn.
    pub fn left(self) -> Direction {
        self.right().opposite()
    }

    pub fn is_north_south(self) -> bool {
        matches!(self, Direction::North | Direction::South)
    }

    fn bit(self) -> u8 {
        match self {
            Direction::North => 1,
            Direction::East => 2,
            Direction::South => 4,
            Direction::West => 8,
        }
    }
}

/// How an exit direction relates to an entry direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Straight,
    Right,
    Left,
    UTurn,
}

pub fn turn_kind(entry: Direction, exit: Direction) -> TurnKind {
    if exit == entry {
        TurnKind::Straight
    } else if exit == entry.right() {
        TurnKind::Right
    } else if exit == entry.left() {
        TurnKind::Left
    } else {
        TurnKind::UTurn
    }
}

/// A small set of compass directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionSet(u8);

impl DirectionSet {
    pub fn empty() -> Self {
        DirectionSet(0)
    }

    pub fn all() -> Self {
        DirectionSet(0xf)
    }

    pub fn insert(&mut self, dir: Direction) {
        self.0 |= dir.bit();
    }

    pub fn contains(self, dir: Direction) -> bool {
        self.0 & dir.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

/// A position on the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TilePoint {
    pub x: i32,
    pub y: i32,
}

impl TilePoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn neighbor(self, dir: Direction) -> TilePoint {
        let (dx, dy) = dir.delta();
        TilePoint::new(self.x + dx, self.y + dy)
    }

    /// Map-unit position of this tile's north-west corner.
    pub fn origin(self) -> MapPoint {
        MapPoint::new(self.x * UNITS_PER_TILE, self.y * UNITS_PER_TILE)
    }

    pub fn is_adjacent(self, other: TilePoint) -> bool {
        (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }
}

/// The direction from one tile to an adjacent tile, if they are adjacent.
pub fn direction_between(from: TilePoint, to: TilePoint) -> Option<Direction> {
    match (to.x - from.x, to.y - from.y) {
        (0, -1) => Some(Direction::North),
        (1, 0) => Some(Direction::East),
        (0, 1) => Some(Direction::South),
        (-1, 0) => Some(Direction::West),
        _ => None,
    }
}

/// A position in map units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MapPoint {
    pub x: i32,
    pub y: i32,
}

impl MapPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dir: Direction, units: i32) -> MapPoint {
        let (dx, dy) = dir.delta();
        MapPoint::new(self.x + dx * units, self.y + dy * units)
    }

    /// The tile this map position falls in.
    pub fn tile(self) -> TilePoint {
        TilePoint::new(
            self.x.div_euclid(UNITS_PER_TILE),
            self.y.div_euclid(UNITS_PER_TILE),
        )
    }

    /// The collision cell this map position falls in.
    pub fn cell(self) -> CellPoint {
        CellPoint::new(
            self.x.div_euclid(UNITS_PER_CELL),
            self.y.div_euclid(UNITS_PER_CELL),
        )
    }
}

/// A quarter-tile collision cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellPoint {
    pub x: i32,
    pub y: i32,
}

impl CellPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The tile this cell belongs to.
    pub fn tile(self) -> TilePoint {
        TilePoint::new(self.x.div_euclid(4), self.y.div_euclid(4))
    }
}
