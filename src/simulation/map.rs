//! Tile grid and traffic-control overlay
//!
//! The static part of a square (kind, connectivity, start markers) comes from
//! the map; the mutable overlay (signal phase, stop signs, company at a bus
//! stop) belongs to the running simulation and is reset each round. Signal
//! phases are only ever flipped by movement-pass arbitration.
//!
//! Connectivity is a set of open sides. A straight road has two opposite
//! sides open, a curve two perpendicular ones, a tee three and a crossroads
//! four. A dead end has a single open side and is traversed with a U-turn.

use anyhow::{bail, Result};

use super::types::{CompanyId, Direction, DirectionSet, TilePoint};

/// What a tile fundamentally is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Grass,
    Road,
    BusStop,
}

impl TileKind {
    pub fn is_drivable(self) -> bool {
        matches!(self, TileKind::Road | TileKind::BusStop)
    }
}

/// Traffic-signal phase of a tile. `None` means the tile has no signal.
/// Yellow marks the axis that has requested green and gets it once the
/// intersection clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalPhase {
    None,
    NorthSouthGreen,
    EastWestGreen,
    NorthSouthYellow,
    EastWestYellow,
}

impl SignalPhase {
    pub fn is_green_for(self, dir: Direction) -> bool {
        match self {
            SignalPhase::NorthSouthGreen => dir.is_north_south(),
            SignalPhase::EastWestGreen => !dir.is_north_south(),
            _ => false,
        }
    }

    /// The green phase for the axis of travel.
    pub fn green_for(dir: Direction) -> SignalPhase {
        if dir.is_north_south() {
            SignalPhase::NorthSouthGreen
        } else {
            SignalPhase::EastWestGreen
        }
    }

    /// The yellow phase for the axis of travel.
    pub fn yellow_for(dir: Direction) -> SignalPhase {
        if dir.is_north_south() {
            SignalPhase::NorthSouthYellow
        } else {
            SignalPhase::EastWestYellow
        }
    }
}

/// One square of the map: static tile data plus the mutable overlay.
#[derive(Debug, Clone)]
pub struct MapSquare {
    pub kind: TileKind,
    /// Which sides of the tile connect to a drivable neighbor.
    pub open: DirectionSet,
    /// Approach directions governed by a stop sign.
    pub stop_signs: DirectionSet,
    pub signal: SignalPhase,
    /// Round start marker: limos may be placed here, heading this way.
    pub start_heading: Option<Direction>,
    /// The company whose lobby sits at this bus stop, assigned per round.
    pub company: Option<CompanyId>,
}

impl MapSquare {
    fn grass() -> Self {
        Self {
            kind: TileKind::Grass,
            open: DirectionSet::empty(),
            stop_signs: DirectionSet::empty(),
            signal: SignalPhase::None,
            start_heading: None,
            company: None,
        }
    }

    pub fn is_drivable(&self) -> bool {
        self.kind.is_drivable()
    }

    pub fn is_signal(&self) -> bool {
        self.signal != SignalPhase::None
    }

    pub fn has_stop_signs(&self) -> bool {
        !self.stop_signs.is_empty()
    }

    /// Tees and crossroads, where left turns must yield to oncoming traffic.
    pub fn is_intersection(&self) -> bool {
        self.open.len() >= 3
    }

    /// A single-entrance tile, left only by turning around.
    pub fn is_dead_end(&self) -> bool {
        self.open.len() == 1
    }

    /// Whether a limo entering this tile heading `dir` must stop right now:
    /// a stop sign on its approach, or a signal that is not green for its
    /// axis.
    pub fn is_stop(&self, dir: Direction) -> bool {
        if self.stop_signs.contains(dir) {
            return true;
        }
        self.is_signal() && !self.signal.is_green_for(dir)
    }

    /// Whether path prediction must halt at this tile: any stop sign on the
    /// approach, or any signal regardless of color. What happens at a
    /// controlled tile depends on the other limos and cannot be predicted.
    pub fn halts_prediction(&self, dir: Direction) -> bool {
        self.stop_signs.contains(dir) || self.is_signal()
    }

    /// Legal exits for a limo that entered heading `dir`, U-turn excluded.
    pub fn exits_no_uturn(&self, dir: Direction) -> Vec<Direction> {
        self.open
            .iter()
            .filter(|d| *d != dir.opposite())
            .collect()
    }

    /// The single "obvious" exit when no route guides the choice: straight
    /// ahead if the tile allows it, the only exit of a forced curve, or
    /// nothing when there is a genuine choice (entering the stem of a tee).
    pub fn straight_next(&self, dir: Direction) -> Option<Direction> {
        if self.open.contains(dir) {
            return Some(dir);
        }
        let exits = self.exits_no_uturn(dir);
        if exits.len() == 1 {
            return Some(exits[0]);
        }
        None
    }
}

/// The game map: a rectangle of squares, indexed by tile coordinates.
#[derive(Debug, Clone)]
pub struct GameMap {
    width: i32,
    height: i32,
    squares: Vec<MapSquare>,
}

impl GameMap {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn square(&self, tile: TilePoint) -> Option<&MapSquare> {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.width || tile.y >= self.height {
            return None;
        }
        self.squares.get((tile.y * self.width + tile.x) as usize)
    }

    pub fn square_mut(&mut self, tile: TilePoint) -> Option<&mut MapSquare> {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.width || tile.y >= self.height {
            return None;
        }
        self.squares
            .get_mut((tile.y * self.width + tile.x) as usize)
    }

    pub fn is_drivable(&self, tile: TilePoint) -> bool {
        self.square(tile).is_some_and(MapSquare::is_drivable)
    }

    pub fn tiles(&self) -> impl Iterator<Item = TilePoint> + '_ {
        let width = self.width;
        (0..self.height).flat_map(move |y| (0..width).map(move |x| TilePoint::new(x, y)))
    }

    /// All round start markers: (tile, heading).
    pub fn start_locations(&self) -> Vec<(TilePoint, Direction)> {
        self.tiles()
            .filter_map(|t| {
                self.square(t)
                    .and_then(|sq| sq.start_heading.map(|d| (t, d)))
            })
            .collect()
    }

    /// All bus-stop tiles.
    pub fn bus_stops(&self) -> Vec<TilePoint> {
        self.tiles()
            .filter(|t| {
                self.square(*t)
                    .is_some_and(|sq| sq.kind == TileKind::BusStop)
            })
            .collect()
    }

    /// Reset the mutable overlay for a new round: signals back to their
    /// initial phase, companies cleared from bus stops.
    pub fn reset_overlay(&mut self) {
        for sq in &mut self.squares {
            if sq.is_signal() {
                sq.signal = SignalPhase::EastWestGreen;
            }
            sq.company = None;
        }
    }

    /// Build a map from ASCII art. Rows must all be the same width.
    ///
    /// Legend:
    ///   `.`  grass
    ///   `#`  road
    ///   `B`  bus stop
    ///   `S`  road with a traffic signal
    ///   `x`  road with stop signs on every approach
    ///   `^` `>` `v` `<`  road carrying a round start marker with heading
    ///
    /// Connectivity is derived: a side is open when the neighbor that way is
    /// drivable.
    pub fn from_ascii(art: &str) -> Result<GameMap> {
        let rows: Vec<&str> = art
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .collect();
        if rows.is_empty() {
            bail!("map art is empty");
        }
        let width = rows[0].chars().count();
        let height = rows.len();
        let mut squares = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                bail!("map row {} has width {}, expected {}", y, row.chars().count(), width);
            }
            for ch in row.chars() {
                let mut sq = MapSquare::grass();
                match ch {
                    '.' => {}
                    '#' => sq.kind = TileKind::Road,
                    'B' => sq.kind = TileKind::BusStop,
                    'S' => {
                        sq.kind = TileKind::Road;
                        sq.signal = SignalPhase::EastWestGreen;
                    }
                    'x' => {
                        sq.kind = TileKind::Road;
                        sq.stop_signs = DirectionSet::all();
                    }
                    '^' | '>' | 'v' | '<' => {
                        sq.kind = TileKind::Road;
                        sq.start_heading = Some(match ch {
                            '^' => Direction::North,
                            '>' => Direction::East,
                            'v' => Direction::South,
                            _ => Direction::West,
                        });
                    }
                    other => bail!("unknown map character {:?}", other),
                }
                squares.push(sq);
            }
        }

        let mut map = GameMap {
            width: width as i32,
            height: height as i32,
            squares,
        };

        // Derive connectivity from drivable neighbors.
        let tiles: Vec<TilePoint> = map.tiles().collect();
        for tile in tiles {
            if !map.is_drivable(tile) {
                continue;
            }
            let mut open = DirectionSet::empty();
            for dir in Direction::ALL {
                if map.is_drivable(tile.neighbor(dir)) {
                    open.insert(dir);
                }
            }
            if open.is_empty() {
                bail!("drivable tile at {},{} has no drivable neighbor", tile.x, tile.y);
            }
            if let Some(sq) = map.square_mut(tile) {
                sq.open = open;
            }
        }

        Ok(map)
    }
}
