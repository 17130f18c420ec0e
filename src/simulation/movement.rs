//! Movement curve table
//!
//! For every (entry direction, exit direction) pair there is one precomputed
//! curve: the ordered sequence of tile-local map-unit cells a limo passes
//! through when traversing a tile that way, plus the speed limit for that
//! traversal. The table is pure data; it is built once and shared.
//!
//! Traffic drives on the right. A limo heading north keeps to the x = 18
//! lane, south x = 6, east y = 18, west y = 6. Curves are built from
//! axis-aligned legs joined at the lane of the exit direction, so every
//! consecutive pair of cells is 4-adjacent and the final cell sits on the
//! tile edge one unit short of the neighboring tile's entry cell.

use std::sync::OnceLock;

use super::types::{turn_kind, Direction, TurnKind, MAX_CURVE_SPEED, MAX_STRAIGHT_SPEED,
    MAX_UTURN_SPEED, UNITS_PER_TILE};

/// One tile traversal: the cells passed through and the speed cap.
#[derive(Debug, Clone)]
pub struct Curve {
    pub entry: Direction,
    pub exit: Direction,
    /// Tile-local map-unit offsets, entry edge first, exit edge last.
    pub cells: Vec<(i32, i32)>,
    pub max_speed: i32,
}

impl Curve {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Tile-local cell at the given offset.
    pub fn local(&self, offset: usize) -> (i32, i32) {
        self.cells[offset]
    }

    /// Direction of travel at the given offset. At the last cell this is the
    /// exit direction (the next step crosses into the neighboring tile).
    pub fn heading_at(&self, offset: usize) -> Direction {
        if offset + 1 < self.cells.len() {
            let (x0, y0) = self.cells[offset];
            let (x1, y1) = self.cells[offset + 1];
            match (x1 - x0, y1 - y0) {
                (0, -1) => Direction::North,
                (1, 0) => Direction::East,
                (0, 1) => Direction::South,
                _ => Direction::West,
            }
        } else {
            self.exit
        }
    }

    /// The offset that counts as the middle of the tile, used for bus-stop
    /// triggering.
    pub fn center_offset(&self) -> usize {
        self.cells.len() / 2
    }
}

/// The lane coordinate a limo keeps to when heading in a direction: the x
/// coordinate for north/south travel, the y coordinate for east/west.
fn lane(dir: Direction) -> i32 {
    match dir {
        Direction::North | Direction::East => 3 * UNITS_PER_TILE / 4,
        Direction::South | Direction::West => UNITS_PER_TILE / 4,
    }
}

/// The tile-local cell where a limo heading `dir` enters a tile.
fn entry_cell(dir: Direction) -> (i32, i32) {
    let last = UNITS_PER_TILE - 1;
    match dir {
        Direction::North => (lane(Direction::North), last),
        Direction::South => (lane(Direction::South), 0),
        Direction::East => (0, lane(Direction::East)),
        Direction::West => (last, lane(Direction::West)),
    }
}

/// The tile-local cell where a limo heading `dir` leaves a tile.
fn exit_cell(dir: Direction) -> (i32, i32) {
    let last = UNITS_PER_TILE - 1;
    match dir {
        Direction::North => (lane(Direction::North), 0),
        Direction::South => (lane(Direction::South), last),
        Direction::East => (last, lane(Direction::East)),
        Direction::West => (0, lane(Direction::West)),
    }
}

fn step(cell: (i32, i32), dir: Direction) -> (i32, i32) {
    let (dx, dy) = dir.delta();
    (cell.0 + dx, cell.1 + dy)
}

/// The coordinate of a cell that changes when moving in `dir`.
fn moving_coord(cell: (i32, i32), dir: Direction) -> i32 {
    if dir.is_north_south() {
        cell.1
    } else {
        cell.0
    }
}

/// Extend `cells` along `dir` from `from` until the moving coordinate
/// reaches `target`. Returns the last cell of the leg.
fn walk_until(
    cells: &mut Vec<(i32, i32)>,
    from: (i32, i32),
    dir: Direction,
    target: i32,
) -> (i32, i32) {
    let mut cur = from;
    while moving_coord(cur, dir) != target {
        cur = step(cur, dir);
        cells.push(cur);
    }
    cur
}

fn build_curve(entry: Direction, exit: Direction) -> Curve {
    let start = entry_cell(entry);
    let mut cells = vec![start];
    let kind = turn_kind(entry, exit);
    match kind {
        TurnKind::Straight => {
            walk_until(&mut cells, start, entry, moving_coord(exit_cell(exit), entry));
        }
        TurnKind::Right | TurnKind::Left => {
            // One leg along the entry lane to where it crosses the exit
            // lane, then a leg out to the exit edge.
            let pivot = walk_until(&mut cells, start, entry, lane(exit));
            walk_until(&mut cells, pivot, exit, moving_coord(exit_cell(exit), exit));
        }
        TurnKind::UTurn => {
            // In, across, and back out the way we came.
            let deep = walk_until(&mut cells, start, entry, lane(entry.left()));
            let far = walk_until(&mut cells, deep, entry.left(), lane(entry.opposite()));
            walk_until(&mut cells, far, exit, moving_coord(exit_cell(exit), exit));
        }
    }
    let max_speed = match kind {
        TurnKind::Straight => MAX_STRAIGHT_SPEED,
        TurnKind::Right | TurnKind::Left => MAX_CURVE_SPEED,
        TurnKind::UTurn => MAX_UTURN_SPEED,
    };
    Curve {
        entry,
        exit,
        cells,
        max_speed,
    }
}

fn dir_index(dir: Direction) -> usize {
    match dir {
        Direction::North => 0,
        Direction::East => 1,
        Direction::South => 2,
        Direction::West => 3,
    }
}

fn table() -> &'static Vec<Curve> {
    static TABLE: OnceLock<Vec<Curve>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut curves = Vec::with_capacity(16);
        for entry in Direction::ALL {
            for exit in Direction::ALL {
                curves.push(build_curve(entry, exit));
            }
        }
        curves
    })
}

/// Look up the traversal curve for an (entry, exit) pair.
pub fn curve(entry: Direction, exit: Direction) -> &'static Curve {
    &table()[dir_index(entry) * 4 + dir_index(exit)]
}

/// Length of the longest curve in the table. Feeds the oncoming-traffic
/// safe-distance estimate.
pub fn max_tile_steps() -> usize {
    table().iter().map(Curve::len).max().unwrap_or(0)
}
