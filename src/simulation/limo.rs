//! Limo state: kinematics, route, look-ahead buffer, trailing footprint
//!
//! The look-ahead buffer ("future") is rebuilt by the engine's predictor on
//! a fixed cadence; other limos scan it for conflicts. The tail is the set of
//! cells the vehicle body still covers behind its center, used for rear-end
//! checks. Both are kept in collision cells, run-length compressed for the
//! future so scans stay cheap.

use std::collections::VecDeque;

use super::location::BoardLocation;
use super::types::{CellPoint, Direction, MapPoint, TilePoint, MAX_STRAIGHT_SPEED};

/// How many map units of predicted movement a future buffer may hold.
pub const NUM_FUTURE: usize = 48;

/// How many map units of trailing footprint are kept.
pub const NUM_TAIL: usize = 12;

/// Consecutive stopped ticks before the gridlock override forces a move.
pub const MAX_TURNS_STOPPED: u32 = 30;

/// Speed gained per tick while free to accelerate.
pub const ACCELERATION: f32 = 0.5;

/// One run of predicted occupancy: a collision cell and how many steps the
/// prediction stays in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FutureStep {
    pub cell: CellPoint,
    pub steps: u32,
}

/// A player's limo.
#[derive(Debug, Clone)]
pub struct Limo {
    pub location: BoardLocation,
    /// Map units per tick, bounded by the current curve's speed limit.
    pub speed: f32,
    /// Fractional step credit carried between ticks.
    pub accrued_steps: f32,
    /// Whole steps still owed this tick.
    pub steps_remaining: i32,
    /// The strategic route: tile waypoints, possibly starting with the tile
    /// currently under the limo. Empty means free roam.
    pub route: Vec<TilePoint>,
    /// Predicted future occupancy, oldest first.
    pub future: Vec<FutureStep>,
    /// Recent map positions, newest first, covering the vehicle body.
    tail: VecDeque<MapPoint>,
    /// Set while halted at a stop sign or signal.
    pub stopped: bool,
    /// Ticks spent unable to move, feeding the gridlock override.
    pub turns_stopped: u32,
    /// Set for the duration of a forced (gridlock-override) move.
    pub force_move: bool,
}

impl Limo {
    pub fn new(location: BoardLocation) -> Self {
        let mut limo = Self {
            location,
            speed: 0.0,
            accrued_steps: 0.0,
            steps_remaining: 0,
            route: Vec::new(),
            future: Vec::new(),
            tail: VecDeque::with_capacity(NUM_TAIL + 1),
            stopped: false,
            turns_stopped: 0,
            force_move: false,
        };
        limo.tail.push_front(location.map_position());
        limo
    }

    /// Reset to a fresh start location for a new round.
    pub fn place(&mut self, location: BoardLocation) {
        *self = Limo::new(location);
    }

    pub fn accelerate(&mut self) {
        let cap = self
            .location
            .curve()
            .max_speed
            .min(MAX_STRAIGHT_SPEED) as f32;
        self.speed = (self.speed + ACCELERATION).min(cap);
    }

    /// Shed speed without fully stopping, for trailing a slower vehicle.
    pub fn decelerate(&mut self) {
        self.speed = (self.speed - 1.0).max(0.0);
    }

    /// Come to a halt at a stop sign, signal or yield.
    pub fn stop(&mut self) {
        self.speed = 0.0;
        self.stopped = true;
    }

    /// Released from a halt.
    pub fn go(&mut self) {
        self.stopped = false;
        self.turns_stopped = 0;
    }

    /// Record that the limo advanced one map unit: extends the tail and
    /// clears the halted state.
    pub fn record_step(&mut self) {
        self.tail.push_front(self.location.map_position());
        self.tail.truncate(NUM_TAIL);
        self.turns_stopped = 0;
        self.stopped = false;
    }

    /// Map position of the front bumper. Arbitration for entering a tile
    /// keys off the front, not the center.
    pub fn front(&self, half_len: i32) -> MapPoint {
        self.location
            .map_position()
            .offset(self.location.direction(), half_len)
    }

    /// Where the front bumper lands after the next step.
    pub fn front_next(&self, half_len: i32) -> MapPoint {
        self.location
            .next_position()
            .offset(self.location.next_direction(), half_len)
    }

    pub fn clear_future(&mut self) {
        self.future.clear();
    }

    /// Append a predicted map position, run-length compressing repeats of
    /// the same collision cell.
    pub fn push_future(&mut self, pos: MapPoint) {
        let cell = pos.cell();
        if let Some(last) = self.future.last_mut() {
            if last.cell == cell {
                last.steps += 1;
                return;
            }
        }
        self.future.push(FutureStep { cell, steps: 1 });
    }

    /// The future buffer from the limo's current cell onward. The buffer is
    /// rebuilt on a cadence, not every tick, so its head goes stale as the
    /// limo advances along it; conflict scans must not spend their distance
    /// budget on cells already behind us.
    pub fn future_from_now(&self) -> &[FutureStep] {
        let cell = self.location.map_position().cell();
        match self.future.iter().position(|s| s.cell == cell) {
            Some(i) => &self.future[i..],
            None => &self.future[..],
        }
    }

    /// The cells the vehicle body still covers.
    pub fn tail_cells(&self) -> impl Iterator<Item = CellPoint> + '_ {
        self.tail.iter().map(|p| p.cell())
    }

    pub fn tail_contains(&self, cell: CellPoint) -> bool {
        self.tail_cells().any(|c| c == cell)
    }

    /// The direction this limo is heading toward, judged from its future
    /// buffer: the first predicted tile that differs from the tile it is on.
    pub fn future_heading(&self) -> Option<(TilePoint, Direction)> {
        let here = self.location.tile;
        for step in &self.future {
            let tile = step.cell.tile();
            if tile != here {
                return super::types::direction_between(here, tile).map(|d| (tile, d));
            }
        }
        None
    }
}
