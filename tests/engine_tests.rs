//! Tick-engine scenario tests
//!
//! These drive the public engine API on small maps and assert the arbitration
//! behavior: stop-sign release, signal locking and phase flips, left-turn
//! yielding, the gridlock override and the core safety properties.

use limopolis::simulation::{
    BoardLocation, Direction, Engine, GameMap, SignalPhase, TilePoint, Tuning, MAX_TURNS_STOPPED,
};

fn engine_on(art: &str, players: usize, seed: u64) -> Engine {
    let map = GameMap::from_ascii(art).expect("test map should parse");
    let mut engine = Engine::new(map, Tuning::default(), seed);
    for i in 0..players {
        engine.add_player(format!("P{}", i + 1));
    }
    engine
}

/// Step budgets come straight from speed: a limo whose speed works out to
/// 3 this tick advances exactly 3 sub-tile steps.
#[test]
fn step_budget_follows_speed() {
    let mut engine = engine_on(
        "\
......
.>###.
......",
        1,
        1,
    );
    let limo = &mut engine.players[0].limo;
    limo.place(BoardLocation::centered(TilePoint::new(2, 1), Direction::East));
    limo.speed = 2.5;
    let before = limo.location.offset();

    engine.tick();

    // Acceleration brings the speed to 3.0 before the budget is dealt.
    let limo = &engine.players[0].limo;
    assert_eq!(limo.location.offset(), before + 3);
    assert!((limo.speed - 3.0).abs() < f32::EPSILON);
    assert!((limo.accrued_steps - 0.0).abs() < f32::EPSILON);
}

/// An all-way stop with nobody else around: the limo is released and gets
/// across instead of deadlocking.
#[test]
fn lone_limo_clears_a_four_way_stop() {
    let mut engine = engine_on(
        "\
.....
..#..
.>x#.
..#..
.....",
        1,
        3,
    );
    let stop_tile = TilePoint::new(2, 2);
    let start_tile = TilePoint::new(1, 2);

    let mut crossed = false;
    for _ in 0..60 {
        engine.tick();
        let here = engine.players[0].limo.location.tile;
        if here != start_tile && here != stop_tile {
            crossed = true;
            break;
        }
    }
    assert!(crossed, "limo never made it through the all-way stop");
}

const SIGNAL_MAP: &str = "\
.......
...#...
.>#S##.
...#...
.......";

/// A limo facing a red signal while another limo occupies the intersection
/// defers, then stops on the last pass, and the signal goes yellow for its
/// axis. Once the intersection clears it flips green and the limo crosses.
#[test]
fn red_signal_with_occupied_intersection_goes_yellow_then_green() {
    let mut engine = engine_on(SIGNAL_MAP, 2, 5);
    let signal_tile = TilePoint::new(3, 2);

    // A is one step short of the decision point; B sits in the intersection.
    engine.players[0]
        .limo
        .place(BoardLocation::new(TilePoint::new(2, 2), Direction::East, Direction::East, 17));
    engine.players[0].limo.speed = 4.0;
    engine.players[1]
        .limo
        .place(BoardLocation::centered(signal_tile, Direction::North));
    engine.map.square_mut(signal_tile).unwrap().signal = SignalPhase::NorthSouthGreen;

    engine.tick();

    let a = &engine.players[0].limo;
    assert!(a.stopped, "A should stop at the occupied red signal");
    assert_eq!(a.location.tile, TilePoint::new(2, 2));
    assert_eq!(
        engine.map.square(signal_tile).unwrap().signal,
        SignalPhase::EastWestYellow,
        "the signal should go yellow for A's axis"
    );

    // Clear the intersection: B is moved behind A and forgets its forecast.
    engine.players[1]
        .limo
        .place(BoardLocation::centered(TilePoint::new(1, 2), Direction::East));

    let mut entered = false;
    for _ in 0..20 {
        engine.tick();
        if engine.players[0].limo.location.tile == signal_tile {
            entered = true;
            break;
        }
    }
    assert!(entered, "A never got its green");
    assert_eq!(
        engine.map.square(signal_tile).unwrap().signal,
        SignalPhase::EastWestGreen,
        "A's crossing should have flipped the signal green for its axis"
    );
}

/// Within one tick the first arrival locks the signal; a crossing limo from
/// the other axis cannot flip it back.
#[test]
fn signal_lock_is_idempotent_within_a_tick() {
    let mut engine = engine_on(SIGNAL_MAP, 2, 9);
    let signal_tile = TilePoint::new(3, 2);

    // A approaches on the green east-west axis, C on the red north-south
    // one; both reach the decision point this tick, A first.
    engine.players[0]
        .limo
        .place(BoardLocation::new(TilePoint::new(2, 2), Direction::East, Direction::East, 17));
    engine.players[0].limo.speed = 4.0;
    engine.players[1]
        .limo
        .place(BoardLocation::new(TilePoint::new(3, 1), Direction::South, Direction::South, 17));
    engine.players[1].limo.speed = 4.0;

    engine.tick();

    assert_eq!(
        engine.map.square(signal_tile).unwrap().signal,
        SignalPhase::EastWestGreen,
        "the locked signal must not flip a second time in the same tick"
    );
    assert!(engine.players[1].limo.stopped, "C must stop at the red");
    assert!(
        engine.players[0].limo.location.offset() > 17
            || engine.players[0].limo.location.tile != TilePoint::new(2, 2),
        "A had the green and should have advanced"
    );

    // C gets across once A's crossing clears.
    let mut crossed = false;
    for _ in 0..60 {
        engine.tick();
        if engine.players[1].limo.location.tile == signal_tile {
            crossed = true;
            break;
        }
    }
    assert!(crossed, "C never crossed after the intersection cleared");
}

const TURN_MAP: &str = "\
.......
...#...
.>####.
...#...
.......";

/// A left turn yields to an oncoming limo whose forecast reaches the
/// intersection, and completes after the oncoming limo has passed.
#[test]
fn left_turn_yields_to_oncoming_traffic() {
    let mut engine = engine_on(TURN_MAP, 2, 11);

    engine.players[0]
        .limo
        .place(BoardLocation::new(TilePoint::new(2, 2), Direction::East, Direction::East, 17));
    engine.players[0].limo.speed = 4.0;
    engine.players[0].limo.route = vec![TilePoint::new(3, 2), TilePoint::new(3, 1)];

    // B drives west toward the same intersection.
    engine.players[1]
        .limo
        .place(BoardLocation::centered(TilePoint::new(5, 2), Direction::West));
    engine.players[1].limo.speed = 4.0;

    engine.tick();
    assert!(
        engine.players[0].limo.stopped,
        "A must yield the left turn to oncoming traffic"
    );
    assert_eq!(engine.players[0].limo.location.tile, TilePoint::new(2, 2));

    let mut turned = false;
    for _ in 0..120 {
        engine.tick();
        if engine.players[0].limo.location.tile == TilePoint::new(3, 1) {
            turned = true;
            break;
        }
    }
    assert!(turned, "A never completed the left turn");
}

/// An oncoming limo that is already stopped and not aimed at the turn tile
/// does not block the left turn.
#[test]
fn left_turn_ignores_stopped_traffic_facing_elsewhere() {
    let mut engine = engine_on(TURN_MAP, 2, 13);

    engine.players[0]
        .limo
        .place(BoardLocation::new(TilePoint::new(2, 2), Direction::East, Direction::East, 17));
    engine.players[0].limo.speed = 4.0;
    engine.players[0].limo.route = vec![TilePoint::new(3, 2), TilePoint::new(3, 1)];

    // B faces the intersection but sits halted well short of it, its front
    // bumper still two tiles away. Its forecast reaches the turn tile, yet
    // it must be ignored.
    engine.players[1]
        .limo
        .place(BoardLocation::centered(TilePoint::new(5, 2), Direction::West));
    engine.players[1].limo.stop();

    engine.tick();
    assert!(
        !engine.players[0].limo.stopped,
        "a stopped limo facing elsewhere must not block the turn"
    );

    let mut turned = false;
    for _ in 0..40 {
        engine.tick();
        if engine.players[0].limo.location.tile == TilePoint::new(3, 1) {
            turned = true;
            break;
        }
    }
    assert!(turned, "A should have turned left without yielding");
}

/// A limo stuck past the threshold is granted a forced move that ignores
/// the rear-end deferral.
#[test]
fn gridlock_override_forces_a_move() {
    let mut engine = engine_on(
        "\
.......
.>####.
.......",
        2,
        17,
    );

    engine.players[0]
        .limo
        .place(BoardLocation::centered(TilePoint::new(2, 1), Direction::East));
    engine.players[0].limo.speed = 2.0;
    engine.players[0].limo.turns_stopped = MAX_TURNS_STOPPED;

    // B is parked dead ahead in the same lane.
    engine.players[1]
        .limo
        .place(BoardLocation::new(TilePoint::new(3, 1), Direction::East, Direction::East, 2));

    let before = engine.players[0].limo.location.offset();
    engine.tick();
    let a = &engine.players[0].limo;
    assert!(
        a.location.offset() > before || a.location.tile != TilePoint::new(2, 1),
        "the forced move must advance the stuck limo"
    );
}

/// The soak: four free-roaming limos on a ring with a signal, an all-way
/// stop and dead-end bus stops. Every tick terminates and no two limos
/// ever share a collision cell.
#[test]
fn soak_keeps_mutual_exclusion() {
    let mut engine = engine_on(
        "\
...............
.>####S#####v..
.#....#.....#..
B#....#.....#B.
.#....#.....#..
.#####x######..
.#....#.....#..
B#....#.....#B.
.#....#.....#..
.^##########<..
...............",
        4,
        23,
    );

    for tick in 0..250 {
        engine.tick();
        for i in 0..engine.players.len() {
            for j in (i + 1)..engine.players.len() {
                let a = engine.players[i].limo.location.map_position().cell();
                let b = engine.players[j].limo.location.map_position().cell();
                assert_ne!(
                    a, b,
                    "tick {}: {} and {} share a cell",
                    tick, engine.players[i].name, engine.players[j].name
                );
            }
        }
    }
}
