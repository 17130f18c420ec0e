//! Movement-curve and map geometry tests
//!
//! The curve table and board locations underpin every movement decision, so
//! their continuity invariants get checked directly.

use limopolis::simulation::{
    curve, max_tile_steps, turn_kind, BoardLocation, Direction, GameMap, SignalPhase, TileKind,
    TilePoint, TurnKind, MAX_CURVE_SPEED, MAX_STRAIGHT_SPEED, MAX_UTURN_SPEED, UNITS_PER_TILE,
};

/// Every curve starts at the canonical lane entry cell for its entry
/// direction and moves one unit at a time.
#[test]
fn curves_are_contiguous() {
    for entry in Direction::ALL {
        for exit in Direction::ALL {
            let c = curve(entry, exit);
            assert!(!c.is_empty(), "curve {:?}->{:?} is empty", entry, exit);
            for pair in c.cells.windows(2) {
                let (x0, y0) = pair[0];
                let (x1, y1) = pair[1];
                assert_eq!(
                    (x1 - x0).abs() + (y1 - y0).abs(),
                    1,
                    "curve {:?}->{:?} jumps from {:?} to {:?}",
                    entry,
                    exit,
                    pair[0],
                    pair[1]
                );
            }
            for (x, y) in &c.cells {
                assert!(*x >= 0 && *x < UNITS_PER_TILE && *y >= 0 && *y < UNITS_PER_TILE);
            }
        }
    }
}

/// All curves with the same entry direction start at the same cell, so a
/// tile handoff works no matter which exit the previous tile used.
#[test]
fn curves_share_entry_cells() {
    for entry in Direction::ALL {
        let reference = curve(entry, entry).cells[0];
        for exit in Direction::ALL {
            assert_eq!(
                curve(entry, exit).cells[0],
                reference,
                "curve {:?}->{:?} enters at the wrong cell",
                entry,
                exit
            );
        }
    }
}

/// Crossing a tile boundary lands exactly on the neighboring tile's entry
/// cell, for every exit direction.
#[test]
fn crossing_lands_on_neighbor_entry_cell() {
    for entry in Direction::ALL {
        for exit in Direction::ALL {
            let c = curve(entry, exit);
            let tile = TilePoint::new(3, 3);
            let mut loc = BoardLocation::new(tile, entry, exit, c.len() - 1);
            let predicted = loc.next_position();
            assert_eq!(predicted.tile(), tile.neighbor(exit));

            loc.cross_into(exit);
            assert_eq!(loc.map_position(), predicted);
            assert_eq!(loc.tile, tile.neighbor(exit));
        }
    }
}

#[test]
fn curve_speed_limits_follow_turn_kind() {
    for entry in Direction::ALL {
        for exit in Direction::ALL {
            let expected = match turn_kind(entry, exit) {
                TurnKind::Straight => MAX_STRAIGHT_SPEED,
                TurnKind::Right | TurnKind::Left => MAX_CURVE_SPEED,
                TurnKind::UTurn => MAX_UTURN_SPEED,
            };
            assert_eq!(curve(entry, exit).max_speed, expected);
        }
    }
}

#[test]
fn straight_curves_span_the_tile() {
    for dir in Direction::ALL {
        assert_eq!(curve(dir, dir).len() as i32, UNITS_PER_TILE);
    }
    assert!(max_tile_steps() as i32 >= UNITS_PER_TILE);
}

#[test]
fn ascii_map_derives_connectivity() {
    let map = GameMap::from_ascii(
        "\
.......
...#...
.>#S##.
...#...
.......",
    )
    .expect("map should parse");

    let cross = map.square(TilePoint::new(3, 2)).unwrap();
    assert_eq!(cross.open.len(), 4);
    assert!(cross.is_intersection());
    assert!(cross.is_signal());
    assert_eq!(cross.signal, SignalPhase::EastWestGreen);

    let start = map.square(TilePoint::new(1, 2)).unwrap();
    assert_eq!(start.start_heading, Some(Direction::East));
    assert_eq!(start.kind, TileKind::Road);

    let stub = map.square(TilePoint::new(3, 1)).unwrap();
    assert!(stub.is_dead_end());

    assert!(!map.is_drivable(TilePoint::new(0, 0)));
    assert_eq!(map.start_locations().len(), 1);
}

#[test]
fn ascii_map_rejects_isolated_road() {
    assert!(GameMap::from_ascii(
        "\
...
.#.
...",
    )
    .is_err());
}

#[test]
fn straight_next_prefers_straight_then_forced_turns() {
    let map = GameMap::from_ascii(
        "\
.....
.##..
..#..
..##.
.....",
    )
    .expect("map should parse");

    // A corner has exactly one way out.
    let corner = map.square(TilePoint::new(2, 1)).unwrap();
    assert_eq!(corner.straight_next(Direction::East), Some(Direction::South));

    // Entering the stem of a tee leaves a real choice: no guess.
    let map = GameMap::from_ascii(
        "\
.....
.###.
..#..
.....",
    )
    .expect("map should parse");
    let tee = map.square(TilePoint::new(2, 1)).unwrap();
    assert_eq!(tee.straight_next(Direction::North), None);
    // Crossing the top of the tee is unambiguous.
    assert_eq!(tee.straight_next(Direction::East), Some(Direction::East));
}
