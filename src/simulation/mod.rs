//! Limo traffic simulation core
//!
//! The tick engine and its supporting actor, map and arbitration logic.
//! Everything here is plain data and a synchronous tick loop; AIs live
//! outside and talk to the engine through the order queue.

mod engine;
mod limo;
mod location;
mod map;
mod movement;
mod orders;
mod passenger;
mod player;
mod routing;
mod types;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use engine::{Engine, StatusEvent, StatusKind, Tuning};
#[allow(unused_imports)]
pub use limo::{FutureStep, Limo, ACCELERATION, MAX_TURNS_STOPPED, NUM_FUTURE, NUM_TAIL};
#[allow(unused_imports)]
pub use location::BoardLocation;
#[allow(unused_imports)]
pub use map::{GameMap, MapSquare, SignalPhase, TileKind};
#[allow(unused_imports)]
pub use movement::{curve, max_tile_steps, Curve};
#[allow(unused_imports)]
pub use orders::{order_channel, AiBrain, OrderQueue, OrderSender, Orders};
#[allow(unused_imports)]
pub use passenger::{generate_roster, Company, Passenger};
#[allow(unused_imports)]
pub use player::Player;
#[allow(unused_imports)]
pub use routing::RouteGraph;
#[allow(unused_imports)]
pub use types::{
    direction_between, turn_kind, CellPoint, CompanyId, Direction, DirectionSet, MapPoint,
    PassengerId, PlayerId, TilePoint, TurnKind, MAX_CURVE_SPEED, MAX_STRAIGHT_SPEED,
    MAX_UTURN_SPEED, UNITS_PER_CELL, UNITS_PER_TILE,
};
