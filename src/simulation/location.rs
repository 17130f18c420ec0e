//! Board location: tile + sub-tile curve offset + facing
//!
//! A limo's position is a tile, the curve it is traversing through that tile
//! and how far along the curve it is. The type is `Copy` so the predictor can
//! walk a scratch copy forward without touching the real limo.

use super::movement::{curve, Curve};
use super::types::{Direction, MapPoint, TilePoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLocation {
    pub tile: TilePoint,
    entry: Direction,
    exit: Direction,
    offset: usize,
}

impl BoardLocation {
    /// A location at the given offset of the (entry, exit) curve of a tile.
    pub fn new(tile: TilePoint, entry: Direction, exit: Direction, offset: usize) -> Self {
        debug_assert!(offset < curve(entry, exit).len());
        Self {
            tile,
            entry,
            exit,
            offset,
        }
    }

    /// A location in the middle of a tile, driving straight through it.
    pub fn centered(tile: TilePoint, heading: Direction) -> Self {
        let c = curve(heading, heading);
        Self::new(tile, heading, heading, c.center_offset())
    }

    pub fn curve(&self) -> &'static Curve {
        curve(self.entry, self.exit)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Position in map units.
    pub fn map_position(&self) -> MapPoint {
        let (lx, ly) = self.curve().local(self.offset);
        let origin = self.tile.origin();
        MapPoint::new(origin.x + lx, origin.y + ly)
    }

    /// Direction of travel at the current offset.
    pub fn direction(&self) -> Direction {
        self.curve().heading_at(self.offset)
    }

    /// True when the next step stays within the current tile.
    pub fn is_move_inside_tile(&self) -> bool {
        self.offset + 1 < self.curve().len()
    }

    /// The map position one step ahead. At the end of the curve this is one
    /// unit across the tile boundary, which by construction is the entry
    /// cell of the neighboring tile.
    pub fn next_position(&self) -> MapPoint {
        if self.is_move_inside_tile() {
            let (lx, ly) = self.curve().local(self.offset + 1);
            let origin = self.tile.origin();
            MapPoint::new(origin.x + lx, origin.y + ly)
        } else {
            self.map_position().offset(self.exit, 1)
        }
    }

    /// Direction of travel after the next step.
    pub fn next_direction(&self) -> Direction {
        if self.is_move_inside_tile() {
            self.curve().heading_at(self.offset + 1)
        } else {
            self.exit
        }
    }

    /// The tile the next step lands in.
    pub fn next_tile_position(&self) -> TilePoint {
        self.next_position().tile()
    }

    /// The tile this curve leads into, regardless of how far along it we are.
    pub fn exit_tile(&self) -> TilePoint {
        self.tile.neighbor(self.exit)
    }

    /// Advance one step within the current tile.
    pub fn advance(&mut self) {
        debug_assert!(self.is_move_inside_tile());
        self.offset += 1;
    }

    /// Cross into the next tile, choosing the exit out of it. The entry
    /// direction of the new curve is the exit direction of the old one.
    pub fn cross_into(&mut self, dest: Direction) {
        debug_assert!(!self.is_move_inside_tile());
        let heading = self.exit;
        self.tile = self.tile.neighbor(heading);
        self.entry = heading;
        self.exit = dest;
        self.offset = 0;
    }
}
