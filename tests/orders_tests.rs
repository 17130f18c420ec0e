//! Route-reconciliation and order-queue tests
//!
//! Orders arrive through the queue and are merged into the pending route
//! without teleporting the limo: trim, replace (with a U-turn stepping
//! stone), splice, or reject with a NoPath status.

use limopolis::simulation::{
    BoardLocation, Direction, Engine, GameMap, PassengerId, StatusKind, TilePoint, Tuning,
};

const CORRIDOR: &str = "\
.......
.>####.
.......";

fn corridor_engine() -> Engine {
    let map = GameMap::from_ascii(CORRIDOR).expect("test map should parse");
    let mut engine = Engine::new(map, Tuning::default(), 1);
    engine.add_player("P1");
    // Mid-corridor, heading east: the limo's curve exits into (3,1).
    engine.players[0]
        .limo
        .place(BoardLocation::centered(TilePoint::new(2, 1), Direction::East));
    engine
}

fn t(x: i32, y: i32) -> TilePoint {
    TilePoint::new(x, y)
}

/// Resubmitting the remaining pending route is a no-op: same route, no
/// NoPath status.
#[test]
fn identical_resubmission_is_a_noop() {
    let mut engine = corridor_engine();
    engine.players[0].limo.route = vec![t(3, 1), t(4, 1)];

    let sender = engine.order_sender();
    sender.submit(engine.players[0].id, vec![t(3, 1), t(4, 1)], Vec::new());
    engine.process_all_order_messages();

    assert_eq!(engine.players[0].limo.route, vec![t(3, 1), t(4, 1)]);
    assert!(engine.drain_events().is_empty());
}

/// A route that shares nothing with the limo's position or pending route is
/// rejected: NoPath goes out and the old route stays.
#[test]
fn unconnected_route_is_rejected() {
    let mut engine = corridor_engine();
    engine.players[0].limo.route = vec![t(3, 1), t(4, 1)];

    let sender = engine.order_sender();
    sender.submit(engine.players[0].id, vec![t(1, 1)], Vec::new());
    engine.process_all_order_messages();

    assert_eq!(engine.players[0].limo.route, vec![t(3, 1), t(4, 1)]);
    let events = engine.drain_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, StatusKind::NoPath);
}

/// A route starting at the current tile replaces the pending one outright
/// when it continues the way the limo is already going.
#[test]
fn route_from_current_tile_replaces() {
    let mut engine = corridor_engine();
    engine.players[0].limo.route = vec![t(3, 1)];

    let sender = engine.order_sender();
    sender.submit(engine.players[0].id, vec![t(2, 1), t(3, 1), t(4, 1)], Vec::new());
    engine.process_all_order_messages();

    assert_eq!(engine.players[0].limo.route, vec![t(2, 1), t(3, 1), t(4, 1)]);
    assert!(engine.drain_events().is_empty());
}

/// Doubling back from the current tile gets the next tile inserted as a
/// stepping stone, so the limo exits cleanly and U-turns.
#[test]
fn doubling_back_inserts_stepping_stone() {
    let mut engine = corridor_engine();

    let sender = engine.order_sender();
    sender.submit(engine.players[0].id, vec![t(2, 1), t(1, 1)], Vec::new());
    engine.process_all_order_messages();

    // The limo's curve exits into (3,1); the new route doubles back west.
    assert_eq!(engine.players[0].limo.route, vec![t(3, 1), t(2, 1), t(1, 1)]);
}

/// A route for a point further along is spliced onto the pending route.
#[test]
fn later_route_is_spliced() {
    let mut engine = corridor_engine();
    engine.players[0].limo.route = vec![t(3, 1), t(4, 1)];

    let sender = engine.order_sender();
    sender.submit(engine.players[0].id, vec![t(4, 1), t(5, 1)], Vec::new());
    engine.process_all_order_messages();

    assert_eq!(engine.players[0].limo.route, vec![t(3, 1), t(4, 1), t(5, 1)]);
    assert!(engine.drain_events().is_empty());
}

/// A prefix already behind the limo is trimmed before reconciling.
#[test]
fn stale_prefix_is_trimmed() {
    let mut engine = corridor_engine();

    let sender = engine.order_sender();
    sender.submit(
        engine.players[0].id,
        vec![t(1, 1), t(2, 1), t(3, 1), t(4, 1)],
        Vec::new(),
    );
    engine.process_all_order_messages();

    assert_eq!(engine.players[0].limo.route, vec![t(2, 1), t(3, 1), t(4, 1)]);
}

/// Routes that are not chains of adjacent drivable tiles never reach the
/// limo.
#[test]
fn malformed_routes_are_rejected() {
    let mut engine = corridor_engine();
    let sender = engine.order_sender();

    // Non-adjacent hop.
    sender.submit(engine.players[0].id, vec![t(3, 1), t(5, 1)], Vec::new());
    engine.process_all_order_messages();
    assert!(engine.players[0].limo.route.is_empty());
    assert_eq!(engine.drain_events()[0].status, StatusKind::NoPath);

    // Off-road tile.
    sender.submit(engine.players[0].id, vec![t(3, 1), t(3, 0)], Vec::new());
    engine.process_all_order_messages();
    assert!(engine.players[0].limo.route.is_empty());
    assert_eq!(engine.drain_events()[0].status, StatusKind::NoPath);
}

/// A pickup update replaces the list wholesale, dropping passengers already
/// delivered; an empty update leaves the list alone.
#[test]
fn pickup_updates_filter_delivered() {
    let mut engine = corridor_engine();
    engine.players[0].delivered = vec![PassengerId(1)];

    let sender = engine.order_sender();
    sender.submit(
        engine.players[0].id,
        Vec::new(),
        vec![PassengerId(0), PassengerId(1), PassengerId(2)],
    );
    engine.process_all_order_messages();

    assert_eq!(
        engine.players[0].pickup,
        vec![PassengerId(0), PassengerId(2)]
    );

    // Empty pickup list means "no change".
    sender.submit(engine.players[0].id, Vec::new(), Vec::new());
    engine.process_all_order_messages();
    assert_eq!(
        engine.players[0].pickup,
        vec![PassengerId(0), PassengerId(2)]
    );
}
