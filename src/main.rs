mod simulation;

use clap::Parser;
use log::info;
use ordered_float::OrderedFloat;

use simulation::{
    AiBrain, Company, Engine, GameMap, Passenger, PassengerId, Player, RouteGraph, TilePoint,
    Tuning,
};

#[derive(Parser)]
#[command(name = "limopolis")]
#[command(about = "Limo traffic simulation, headless")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "400")]
    ticks: u64,

    /// Number of AI players
    #[arg(long, default_value = "4")]
    players: usize,

    /// RNG seed for reproducible runs
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Ticks between asking each brain for fresh orders
    #[arg(long, default_value = "8")]
    think_interval: u64,
}

/// Built-in demo map: a ring road with a signalled crossroads, an all-way
/// stop, four company bus stops and four start markers.
const DEMO_MAP: &str = "\
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
...............";

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let map = match GameMap::from_ascii(DEMO_MAP) {
        Ok(map) => map,
        Err(err) => {
            eprintln!("Error: bad built-in map: {err:#}");
            std::process::exit(1);
        }
    };
    let routes = RouteGraph::build(&map);

    let mut engine = Engine::new(map, Tuning::default(), cli.seed);
    let player_cap = engine.map.start_locations().len();
    for i in 0..cli.players.min(player_cap) {
        engine.add_player(format!("Limo {}", i + 1));
    }
    if let Err(err) = engine.start_round() {
        eprintln!("Error: could not start round: {err:#}");
        std::process::exit(1);
    }

    let sender = engine.order_sender();
    let mut brains: Vec<CourierBrain> = engine
        .players
        .iter()
        .map(|_| CourierBrain { routes: &routes })
        .collect();

    println!(
        "Running {} ticks with {} players (seed {})",
        cli.ticks,
        engine.players.len(),
        cli.seed
    );

    for tick in 0..cli.ticks {
        // Brains run between ticks and submit through the queue, exactly
        // like remote AIs would.
        if tick % cli.think_interval == 0 {
            for (i, brain) in brains.iter_mut().enumerate() {
                let player = &engine.players[i];
                if let Some((route, pickups)) = brain.decide(
                    &engine.map,
                    player,
                    &engine.players,
                    &engine.companies,
                    &engine.passengers,
                ) {
                    sender.submit(player.id, route, pickups);
                }
            }
        }

        engine.tick();

        for event in engine.drain_events() {
            info!(
                "status: player {:?} {:?} passenger {:?} company {:?}",
                event.player, event.status, event.passenger, event.company
            );
        }
    }

    println!();
    engine.print_summary();
}

/// A straightforward demo brain: fetch the nearest waiting passenger, drive
/// them to their destination, repeat.
struct CourierBrain<'a> {
    routes: &'a RouteGraph,
}

impl CourierBrain<'_> {
    fn distance(a: TilePoint, b: TilePoint) -> OrderedFloat<f32> {
        let dx = (a.x - b.x) as f32;
        let dy = (a.y - b.y) as f32;
        OrderedFloat((dx * dx + dy * dy).sqrt())
    }
}

impl AiBrain for CourierBrain<'_> {
    fn decide(
        &mut self,
        _map: &GameMap,
        you: &Player,
        _players: &[Player],
        companies: &[Company],
        passengers: &[Passenger],
    ) -> Option<(Vec<TilePoint>, Vec<PassengerId>)> {
        let here = you.limo.location.tile;

        // Riding: head for the passenger's destination.
        if let Some(pid) = you.passenger {
            let dest = companies[passengers[pid.0].destination.0].bus_stop;
            let route = self.routes.find_route(here, dest)?;
            return Some((route, Vec::new()));
        }

        // Otherwise: nearest undelivered passenger waiting in a lobby.
        let target = passengers
            .iter()
            .filter(|p| !p.done && p.car.is_none() && p.lobby.is_some())
            .filter_map(|p| {
                p.lobby
                    .map(|lobby| (p.id, companies[lobby.0].bus_stop))
            })
            .min_by_key(|(_, stop)| Self::distance(here, *stop))?;

        let (pid, stop) = target;
        let route = self.routes.find_route(here, stop)?;
        Some((route, vec![pid]))
    }
}
