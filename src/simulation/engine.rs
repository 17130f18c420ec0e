//! The tick engine
//!
//! Advances every limo each tick: drains queued AI orders, refreshes
//! look-ahead buffers on a cadence, deals out step budgets, then runs
//! repeated movement passes over all limos until every step is spent or a
//! pass makes no progress. Arbitration at controlled tiles and all
//! inter-limo yield checks happen inside the passes.
//!
//! Within a pass, whichever limo is visited first wins ties (who locks a
//! signal, who defers to whom). That iteration-order tie-breaking is
//! accepted and deliberate; the pass/termination structure itself is
//! deterministic.

use anyhow::{bail, Context, Result};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::limo::{MAX_TURNS_STOPPED, NUM_FUTURE, NUM_TAIL};
use super::location::BoardLocation;
use super::map::{GameMap, SignalPhase, TileKind};
use super::movement::max_tile_steps;
use super::orders::{order_channel, OrderQueue, OrderSender, Orders};
use super::passenger::{generate_roster, Company, Passenger};
use super::player::Player;
use super::types::{
    direction_between, turn_kind, CompanyId, Direction, PassengerId, PlayerId, TilePoint,
    TurnKind, MAX_CURVE_SPEED, MAX_STRAIGHT_SPEED, UNITS_PER_CELL, UNITS_PER_TILE,
};

/// Tuned gameplay distances. Scenario tests pin the behavior the defaults
/// produce.
#[derive(Debug, Clone)]
pub struct Tuning {
    /// Map units from limo center to front bumper.
    pub limo_half_len: i32,
    /// Extra clearance beyond the limo body needed to cross at a stop sign.
    pub cross_margin: i32,
    /// Clear distance required ahead before following another limo.
    pub follow_safe_distance: i32,
    /// How far oncoming traffic is scanned before committing to a left turn.
    pub oncoming_safe_distance: i32,
    /// Consecutive stopped ticks before the gridlock override kicks in.
    pub max_turns_stopped: u32,
    /// Ticks between look-ahead recomputations.
    pub prepare_interval: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        let limo_half_len = UNITS_PER_CELL;
        // Worst case for a left turn: we cross the tile at curve speed while
        // the oncoming limo closes at straight speed.
        let crossing_ticks =
            (max_tile_steps() as i32 + MAX_CURVE_SPEED - 1) / MAX_CURVE_SPEED;
        Self {
            limo_half_len,
            cross_margin: UNITS_PER_TILE / 2,
            follow_safe_distance: 3 * limo_half_len + 1,
            oncoming_safe_distance: 3 * limo_half_len + 1 + crossing_ticks * MAX_STRAIGHT_SPEED,
            max_turns_stopped: MAX_TURNS_STOPPED,
            prepare_interval: 6,
        }
    }
}

/// What a passenger-event or order broadcast reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// A submitted route could not be joined to the current one.
    NoPath,
    /// A bus-stop visit with nothing to do.
    NoAction,
    Delivered,
    Abandoned,
    Refused,
    PickedUp,
    DeliveredAndPickedUp,
}

/// A status broadcast. Every event goes to all players.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub player: PlayerId,
    pub status: StatusKind,
    pub passenger: Option<PassengerId>,
    pub company: Option<CompanyId>,
}

/// Outcome of a yield check for one step attempt.
enum StepHold {
    /// Keep the remaining steps and retry next pass.
    Defer,
    /// Halt definitively.
    Stop,
    /// Shed speed behind a blocker that is itself not moving.
    Decelerate,
}

pub struct Engine {
    pub map: GameMap,
    pub players: Vec<Player>,
    pub companies: Vec<Company>,
    pub passengers: Vec<Passenger>,
    /// Which round we are on, starting at 1 after the first `start_round`.
    pub round: u32,
    tuning: Tuning,
    rng: StdRng,
    orders: OrderQueue,
    sender: OrderSender,
    events: Vec<StatusEvent>,
    ticks_to_prepare: i32,
    tick_count: u64,
}

impl Engine {
    pub fn new(map: GameMap, tuning: Tuning, seed: u64) -> Self {
        let (sender, orders) = order_channel();
        Self {
            map,
            players: Vec::new(),
            companies: Vec::new(),
            passengers: Vec::new(),
            round: 0,
            tuning,
            rng: StdRng::seed_from_u64(seed),
            orders,
            sender,
            events: Vec::new(),
            ticks_to_prepare: 0,
            tick_count: 0,
        }
    }

    /// A handle AIs use to submit orders. Clone freely across threads.
    pub fn order_sender(&self) -> OrderSender {
        self.sender.clone()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn add_player(&mut self, name: impl Into<String>) -> PlayerId {
        let id = PlayerId(self.players.len());
        let starts = self.map.start_locations();
        let (tile, heading) = starts
            .get(self.players.len() % starts.len().max(1))
            .copied()
            .unwrap_or((TilePoint::new(0, 0), Direction::North));
        self.players
            .push(Player::new(id, name, BoardLocation::centered(tile, heading)));
        id
    }

    /// Begin a round: reset the overlay, deal shuffled start locations to
    /// the players and shuffled bus stops to a fresh company roster.
    pub fn start_round(&mut self) -> Result<()> {
        self.map.reset_overlay();

        let mut starts = self.map.start_locations();
        if starts.len() < self.players.len() {
            bail!(
                "map has {} start locations for {} players",
                starts.len(),
                self.players.len()
            );
        }
        starts.shuffle(&mut self.rng);
        for (player, (tile, heading)) in self.players.iter_mut().zip(starts.iter()) {
            player.reset(BoardLocation::centered(*tile, *heading));
        }

        let mut stops = self.map.bus_stops();
        stops.shuffle(&mut self.rng);
        let (mut companies, passengers) = generate_roster(&mut self.rng, stops.len());
        for (company, stop) in companies.iter_mut().zip(stops.iter()) {
            company.bus_stop = *stop;
            if let Some(sq) = self.map.square_mut(*stop) {
                sq.company = Some(company.id);
            }
        }
        // Bus stops beyond the roster stay companyless this round.
        self.companies = companies;
        self.passengers = passengers;
        self.events.clear();
        self.ticks_to_prepare = 0;
        self.round += 1;
        info!(
            "round {} started: {} players, {} companies, {} passengers",
            self.round,
            self.players.len(),
            self.companies.len(),
            self.passengers.len()
        );
        Ok(())
    }

    /// Take the status events accumulated since the last drain.
    pub fn drain_events(&mut self) -> Vec<StatusEvent> {
        std::mem::take(&mut self.events)
    }

    fn push_status(
        &mut self,
        player: PlayerId,
        status: StatusKind,
        passenger: Option<PassengerId>,
        company: Option<CompanyId>,
    ) {
        self.events.push(StatusEvent {
            player,
            status,
            passenger,
            company,
        });
    }

    /// Advance the whole simulation by one tick.
    pub fn tick(&mut self) {
        self.validate_all();

        self.process_all_order_messages();

        // Refresh look-ahead buffers on the cadence. A fault in one limo's
        // prediction is contained to that limo.
        if self.ticks_to_prepare <= 0 {
            for idx in 0..self.players.len() {
                if let Err(err) = self.prepare_to_move(idx) {
                    error!(
                        "{} : prepare_to_move: {:#}",
                        self.players[idx].name, err
                    );
                    self.players[idx].limo.route.clear();
                }
            }
            self.ticks_to_prepare = self.tuning.prepare_interval as i32;
        }
        self.ticks_to_prepare -= 1;

        // Every limo's step budget is fixed before any movement pass runs,
        // so pass order cannot affect per-tick speed accrual.
        for player in &mut self.players {
            let limo = &mut player.limo;
            limo.accelerate();
            limo.accrued_steps += limo.speed;
            limo.steps_remaining = limo.accrued_steps as i32;
            limo.accrued_steps -= limo.steps_remaining as f32;
        }

        // Movement passes. The cap of (player count + 1) passes guarantees
        // termination independent of convergence; a pass with no progress
        // becomes the last pass, on which every deferral must resolve.
        let positions_before: Vec<_> = self
            .players
            .iter()
            .map(|p| p.limo.location.map_position())
            .collect();
        let mut signals_set: Vec<TilePoint> = Vec::new();
        let mut prev_total = i32::MAX;
        let mut iters_left = self.players.len() as i32;
        loop {
            let total: i32 = self
                .players
                .iter()
                .map(|p| p.limo.steps_remaining)
                .sum();
            if total == 0 {
                break;
            }
            let last_pass = iters_left <= 0 || total == prev_total;
            prev_total = total;
            for idx in 0..self.players.len() {
                if let Err(err) = self.move_limo(idx, &mut signals_set, last_pass) {
                    error!("{} : move_limo: {:#}", self.players[idx].name, err);
                    self.players[idx].limo.route.clear();
                }
            }
            if last_pass {
                break;
            }
            iters_left -= 1;
        }

        // Ticks spent without moving feed the gridlock override; any actual
        // step already reset the counter.
        for (player, before) in self.players.iter_mut().zip(positions_before) {
            if player.limo.location.map_position() == before {
                player.limo.turns_stopped += 1;
            }
        }

        self.tick_count += 1;
        self.validate_all();
    }

    /// Drain all queued AI orders and schedule a prompt look-ahead refresh
    /// if any arrived.
    pub fn process_all_order_messages(&mut self) {
        while let Some(orders) = self.orders.try_next() {
            self.apply_orders(orders);
            self.ticks_to_prepare = 0;
        }
    }

    /// Merge a submitted route into the player's pending route without a
    /// teleport, and replace the pickup list. An empty route or pickup list
    /// means "no change" for that half.
    fn apply_orders(&mut self, orders: Orders) {
        let Orders {
            player,
            route: mut path,
            pickups,
        } = orders;
        let Some(idx) = self.players.iter().position(|p| p.id == player) else {
            warn!("orders for unknown player {:?} dropped", player);
            return;
        };

        if !path.is_empty() {
            let chained = path.windows(2).all(|w| w[0].is_adjacent(w[1]));
            let drivable = path.iter().all(|t| self.map.is_drivable(*t));
            if !chained || !drivable {
                warn!(
                    "{} : submitted route is not a chain of drivable tiles",
                    self.players[idx].name
                );
                self.push_status(player, StatusKind::NoPath, None, None);
            } else {
                self.reconcile_route(idx, path);

                // Remember the next company stop on the resulting route.
                let next_stop = self.players[idx].limo.route.iter().skip(1).find_map(|t| {
                    self.companies
                        .iter()
                        .find(|c| c.bus_stop == *t)
                        .map(|c| c.id)
                });
                if next_stop.is_some() {
                    self.players[idx].next_bus_stop = next_stop;
                }
            }
        }

        if pickups.is_empty() {
            return;
        }
        let player = &mut self.players[idx];
        let delivered = std::mem::take(&mut player.delivered);
        player.pickup.clear();
        player
            .pickup
            .extend(pickups.into_iter().filter(|p| !delivered.contains(p)));
        player.delivered = delivered;
    }

    /// The reconciliation itself: trim, replace (with a U-turn stepping
    /// stone when needed) or splice; emit NoPath when nothing joins.
    fn reconcile_route(&mut self, idx: usize, mut path: Vec<TilePoint>) {
        let here = self.players[idx].limo.location.tile;

        // The new route may pass through the tile we are on partway in;
        // everything before that is already behind us.
        if let Some(i) = path.iter().position(|t| *t == here) {
            if i > 0 {
                path.drain(..i);
            }
        }

        if path[0] == here {
            let limo = &mut self.players[idx].limo;
            limo.route.clear();
            // If the route doubles back, step into the next tile first and
            // U-turn from there.
            let stepping_stone = limo.location.exit_tile();
            if path.len() == 1 || stepping_stone != path[1] {
                limo.route.push(stepping_stone);
            }
            limo.route.extend(path);
            return;
        }

        // The new route is for a little further along: splice it onto the
        // pending route at its first tile.
        let limo = &mut self.players[idx].limo;
        if let Some(i) = limo.route.iter().position(|t| *t == path[0]) {
            limo.route.truncate(i);
            limo.route.extend(path);
            return;
        }

        let player = self.players[idx].id;
        debug!(
            "{} : new route does not join current position or route",
            self.players[idx].name
        );
        self.push_status(player, StatusKind::NoPath, None, None);
    }

    /// Rebuild one limo's look-ahead buffer: walk forward from the current
    /// position, following the route where it is usable and continuing
    /// straight otherwise, until a controlled tile, a dead decision point or
    /// the buffer bound. The limo itself does not move.
    fn prepare_to_move(&mut self, idx: usize) -> Result<()> {
        let mut loc = self.players[idx].limo.location;
        debug!(
            "{} : prepare_to_move from {:?}",
            self.players[idx].name, loc.tile
        );
        self.players[idx].limo.clear_future();
        self.players[idx].limo.push_future(loc.map_position());
        let mut path_offset = 0usize;

        for _ in 0..NUM_FUTURE {
            if loc.is_move_inside_tile() {
                loc.advance();
                self.players[idx].limo.push_future(loc.map_position());
                continue;
            }

            let entering = loc.exit_tile();
            let heading = loc.direction();
            let Some(square) = self.map.square(entering) else {
                break;
            };

            // A stop sign or signal ahead ends the guess: what happens
            // there depends on the other limos. Signals halt prediction
            // whatever their color, since the color can change before we
            // arrive.
            if square.halts_prediction(heading) {
                debug!(
                    "{} : prediction halts at control {:?}",
                    self.players[idx].name, entering
                );
                break;
            }

            // A U-turn route revisits a tile, so consume at most one
            // waypoint per crossing rather than searching.
            {
                let route = &self.players[idx].limo.route;
                if path_offset < route.len() && route[path_offset] == entering {
                    path_offset += 1;
                }
            }

            let mut dest = None;
            {
                let route = &self.players[idx].limo.route;
                if path_offset < route.len() {
                    let wp = route[path_offset];
                    if entering.is_adjacent(wp) && self.map.is_drivable(wp) {
                        dest = direction_between(entering, wp);
                    } else {
                        debug!(
                            "{} : route step at {:?} unusable from {:?}",
                            self.players[idx].name, wp, entering
                        );
                    }
                }
            }
            let dest = dest.or_else(|| square.straight_next(heading));
            let Some(dest) = dest else {
                // Dead decision point with no guidance.
                break;
            };

            loc.cross_into(dest);
            self.players[idx].limo.push_future(loc.map_position());
        }
        Ok(())
    }

    /// Move one limo for one pass, consuming its remaining steps one
    /// sub-tile step at a time. Each step attempt resolves to advance,
    /// defer-until-next-pass (early return, steps kept) or a definitive
    /// stop; on the last pass deferrals are no longer allowed.
    fn move_limo(
        &mut self,
        idx: usize,
        signals_set: &mut Vec<TilePoint>,
        last_pass: bool,
    ) -> Result<()> {
        let half_len = self.tuning.limo_half_len;

        // Gridlock override: a limo stuck long enough is granted one forced
        // move that ignores right-of-way.
        if self.players[idx].limo.turns_stopped >= self.tuning.max_turns_stopped {
            debug!(
                "{} : forced move after {} stopped turns",
                self.players[idx].name, self.players[idx].limo.turns_stopped
            );
            let limo = &mut self.players[idx].limo;
            limo.accelerate();
            limo.force_move = true;
            limo.steps_remaining = MAX_STRAIGHT_SPEED;
        } else {
            self.players[idx].limo.force_move = false;
        }

        while self.players[idx].limo.steps_remaining > 0 {
            let loc = self.players[idx].limo.location;
            let force_move = self.players[idx].limo.force_move;
            let front_tile = self.players[idx].limo.front(half_len).tile();
            let front_next_tile = self.players[idx].limo.front_next(half_len).tile();
            let heading = loc.direction();

            if log::log_enabled!(log::Level::Debug) {
                debug!(
                    "{} : step, tile {:?} offset {} front {:?} -> {:?}",
                    self.players[idx].name,
                    loc.tile,
                    loc.offset(),
                    front_tile,
                    front_next_tile
                );
            }

            // Arbitration only applies while entering a tile. Once the
            // front is inside, the limo always continues.
            if !force_move && front_tile != front_next_tile {
                let square = self
                    .map
                    .square(front_next_tile)
                    .context("front bumper crossed the map boundary")?;
                let mut is_stop = square.is_stop(heading);
                let has_signal = square.is_signal();
                let has_stop_signs = square.has_stop_signs();
                let at_intersection = square.is_intersection();

                // Signal: the first limo to touch it this tick owns the
                // phase decision for the rest of the tick.
                if has_signal {
                    let car_in = Self::car_in_intersection(
                        &self.players,
                        &self.map,
                        idx,
                        front_next_tile,
                        half_len,
                    );
                    let locked = signals_set.contains(&front_next_tile);

                    // Unlocked but occupied: the occupant may leave before
                    // the last pass, so hold the decision.
                    if !locked && car_in && !last_pass {
                        debug!(
                            "{} : waiting to see if signal {:?} opens up",
                            self.players[idx].name, front_next_tile
                        );
                        return Ok(());
                    }

                    if !locked {
                        // Lock it now, even on a green we pass through;
                        // otherwise a later limo could flip it under us.
                        signals_set.push(front_next_tile);
                        if is_stop {
                            let sq = self
                                .map
                                .square_mut(front_next_tile)
                                .context("signal square vanished")?;
                            if car_in {
                                // Request the crossing: yellow for our axis
                                // until the intersection clears.
                                sq.signal = SignalPhase::yellow_for(heading);
                            } else {
                                sq.signal = SignalPhase::green_for(heading);
                                is_stop = false;
                            }
                            debug!(
                                "{} : signal at {:?} now {:?}",
                                self.players[idx].name,
                                front_next_tile,
                                self.map
                                    .square(front_next_tile)
                                    .map(|s| s.signal)
                            );
                        }
                    }
                }

                // Stop sign: having stopped once, go again when the
                // crossing is clear by a full margin.
                if is_stop && has_stop_signs && self.players[idx].limo.stopped {
                    let car_in = Self::car_in_intersection(
                        &self.players,
                        &self.map,
                        idx,
                        front_next_tile,
                        half_len + self.tuning.cross_margin,
                    );
                    if !car_in {
                        is_stop = false;
                        self.players[idx].limo.go();
                    } else if !last_pass {
                        debug!(
                            "{} : waiting to see if stop {:?} clears",
                            self.players[idx].name, front_next_tile
                        );
                        return Ok(());
                    }
                }

                if is_stop {
                    self.players[idx].limo.stop();
                    debug!("{} : stopped entering {:?}", self.players[idx].name, front_next_tile);
                    return Ok(());
                }

                // A left or U turn must also yield to oncoming traffic. We
                // can only tell it is a left turn when a route says where
                // we exit; free-roam exits are chosen at the crossing.
                let hold = {
                    let route = &self.players[idx].limo.route;
                    if !route.is_empty() && at_intersection {
                        let mut pt_next = route[0];
                        let mut ind = 1;
                        if pt_next == front_tile && ind < route.len() {
                            pt_next = route[ind];
                            ind += 1;
                        }
                        if pt_next == front_next_tile && ind < route.len() {
                            pt_next = route[ind];
                        }
                        if pt_next == front_next_tile {
                            None
                        } else {
                            match (
                                direction_between(front_tile, front_next_tile),
                                direction_between(front_next_tile, pt_next),
                            ) {
                                (Some(dir_enter), Some(dir_exit))
                                    if matches!(
                                        turn_kind(dir_enter, dir_exit),
                                        TurnKind::Left | TurnKind::UTurn
                                    ) =>
                                {
                                    Self::oncoming_conflict(
                                        &self.players,
                                        idx,
                                        front_next_tile,
                                        dir_enter,
                                        half_len,
                                        self.tuning.oncoming_safe_distance,
                                        last_pass,
                                    )
                                }
                                _ => None,
                            }
                        }
                    } else {
                        None
                    }
                };
                match hold {
                    Some(StepHold::Defer) => {
                        debug!(
                            "{} : left turn waits for oncoming traffic",
                            self.players[idx].name
                        );
                        return Ok(());
                    }
                    Some(StepHold::Stop) => {
                        self.players[idx].limo.stop();
                        debug!(
                            "{} : left turn stopped for oncoming traffic",
                            self.players[idx].name
                        );
                        return Ok(());
                    }
                    _ => {}
                }
            }

            // Rear-end check, independent of tile entry: our predicted
            // cells against the other limos' trailing footprints.
            if !force_move {
                match Self::tail_conflict(
                    &self.players,
                    idx,
                    self.tuning.follow_safe_distance,
                    last_pass,
                ) {
                    Some(StepHold::Defer) => {
                        debug!("{} : waiting behind traffic", self.players[idx].name);
                        return Ok(());
                    }
                    Some(StepHold::Decelerate) => {
                        self.players[idx].limo.decelerate();
                        debug!("{} : slowing behind stopped traffic", self.players[idx].name);
                        return Ok(());
                    }
                    _ => {}
                }
            }

            // The step itself: within the tile, or across the boundary.
            if loc.is_move_inside_tile() {
                {
                    let limo = &mut self.players[idx].limo;
                    limo.location.advance();
                    limo.steps_remaining -= 1;
                    limo.record_step();
                }

                // Bus-stop processing happens exactly at the tile center.
                let center = self.players[idx].limo.location;
                if center.offset() == center.curve().center_offset() {
                    let is_bus_stop = self
                        .map
                        .square(center.tile)
                        .is_some_and(|sq| sq.kind == TileKind::BusStop);
                    if is_bus_stop {
                        self.bus_stop_off_on(idx, center.tile)?;
                        let limo = &mut self.players[idx].limo;
                        limo.stop();
                        limo.go();
                    }
                }
                continue;
            }

            let entering = loc.exit_tile();

            // Shed a stale head waypoint (typically the tile we are on,
            // left by a fresh route), then the waypoints this crossing
            // satisfies.
            {
                let route = &mut self.players[idx].limo.route;
                if route.first() == Some(&loc.tile) {
                    route.remove(0);
                }
                if let Some(i) = route.iter().position(|t| *t == entering) {
                    route.drain(..=i);
                }
            }

            // Pick the exit from the tile being entered: routed when the
            // next waypoint is usable, otherwise a random legal exit.
            let mut dest = None;
            let mut route_broken = false;
            if let Some(&wp) = self.players[idx].limo.route.first() {
                if entering.is_adjacent(wp) && self.map.is_drivable(wp) {
                    dest = direction_between(entering, wp);
                } else {
                    route_broken = true;
                }
            }
            if route_broken {
                warn!(
                    "{} : route is unusable at {:?}; falling back to roaming",
                    self.players[idx].name, entering
                );
                let player = self.players[idx].id;
                self.push_status(player, StatusKind::NoPath, None, None);
                self.players[idx].limo.route.clear();
            }
            let dest = match dest {
                Some(d) => d,
                None => self.random_exit(entering, heading)?,
            };

            {
                let limo = &mut self.players[idx].limo;
                limo.location.cross_into(dest);
                limo.steps_remaining -= 1;
                limo.record_step();

                // Curves carry a lower speed limit: clamp and burn the
                // excess from this tick's budget.
                let cap = limo.location.curve().max_speed as f32;
                if cap < limo.speed {
                    let diff = limo.speed - cap;
                    limo.speed = cap;
                    limo.steps_remaining =
                        (limo.steps_remaining - (diff + 0.9) as i32).max(0);
                }
            }
        }
        Ok(())
    }

    /// A random legal exit out of a tile, U-turn only when there is no
    /// alternative.
    fn random_exit(&mut self, tile: TilePoint, heading: Direction) -> Result<Direction> {
        let exits = self
            .map
            .square(tile)
            .context("limo crossed into a tile outside the map")?
            .exits_no_uturn(heading);
        match exits.as_slice().choose(&mut self.rng) {
            Some(d) => Ok(*d),
            None => Ok(heading.opposite()),
        }
    }

    /// Whether any other limo occupies (or is predicted to occupy within
    /// `look` steps) the given tile. Distance pruning skips limos too far
    /// away for any of their scanned cells to land in the tile.
    fn car_in_intersection(
        players: &[Player],
        map: &GameMap,
        idx: usize,
        target: TilePoint,
        look: i32,
    ) -> bool {
        let my_pos = players[idx].limo.location.map_position();
        let prune = look + 2 * UNITS_PER_TILE + NUM_TAIL as i32;
        for (j, other) in players.iter().enumerate() {
            if j == idx {
                continue;
            }
            let opos = other.limo.location.map_position();
            if (my_pos.x - opos.x).abs() > prune || (my_pos.y - opos.y).abs() > prune {
                continue;
            }

            let mut budget = look;
            for step in other.limo.future_from_now() {
                if step.cell.tile() == target {
                    return true;
                }
                budget -= step.steps as i32;
                if budget <= 0 {
                    break;
                }
            }

            if other.limo.tail_cells().any(|c| c.tile() == target) {
                // Dead-end pull-in/pull-out: two limos passing in opposite
                // directions both clip the tile; neither blocks the other.
                let opposite_ways = other.limo.location.direction()
                    == players[idx].limo.location.direction().opposite();
                let dead_end = map.square(target).is_some_and(|sq| sq.is_dead_end());
                if dead_end && opposite_ways {
                    continue;
                }
                return true;
            }
        }
        false
    }

    /// Conflict check for a left/U turn into `target`: any oncoming limo
    /// whose prediction reaches the tile within the safe distance. Limos
    /// already stopped and not aimed at the tile are no threat.
    fn oncoming_conflict(
        players: &[Player],
        idx: usize,
        target: TilePoint,
        dir_enter: Direction,
        half_len: i32,
        safe_distance: i32,
        last_pass: bool,
    ) -> Option<StepHold> {
        let my_pos = players[idx].limo.location.map_position();
        let prune = safe_distance + 2 * UNITS_PER_TILE;
        for (j, other) in players.iter().enumerate() {
            if j == idx {
                continue;
            }
            let opos = other.limo.location.map_position();
            if (my_pos.x - opos.x).abs() > prune || (my_pos.y - opos.y).abs() > prune {
                continue;
            }
            if other.limo.stopped && other.limo.front(half_len).tile() != target {
                continue;
            }

            // A limo whose center is already in the tile blocks the turn
            // outright, whatever direction it came from.
            let mut wait = other.limo.location.tile == target;

            if !wait {
                let mut budget = safe_distance;
                for step in other.limo.future_from_now() {
                    if step.cell.tile() == target {
                        // Only opposing traffic matters; cross traffic will
                        // meet its own signal or stop sign.
                        match other.limo.future_heading() {
                            Some((_, other_dir)) if other_dir.opposite() != dir_enter => {}
                            _ => wait = true,
                        }
                        break;
                    }
                    budget -= step.steps as i32;
                    if budget <= 0 {
                        break;
                    }
                }
            }

            if !wait {
                continue;
            }
            if !last_pass && other.limo.steps_remaining > 0 {
                return Some(StepHold::Defer);
            }
            return Some(StepHold::Stop);
        }
        None
    }

    /// Rear-end check: our predicted cells against other limos' trailing
    /// footprints, scanned out to the following distance.
    fn tail_conflict(
        players: &[Player],
        idx: usize,
        safe_distance: i32,
        last_pass: bool,
    ) -> Option<StepHold> {
        let me = &players[idx].limo;
        let my_pos = me.location.map_position();
        let prune = (NUM_FUTURE + NUM_TAIL) as i32 + UNITS_PER_TILE;
        for (j, other) in players.iter().enumerate() {
            if j == idx {
                continue;
            }
            let opos = other.limo.location.map_position();
            if (my_pos.x - opos.x).abs() > prune || (my_pos.y - opos.y).abs() > prune {
                continue;
            }

            let mut budget = safe_distance;
            for step in me.future_from_now() {
                if other.limo.tail_contains(step.cell) {
                    if !last_pass && other.limo.steps_remaining > 0 {
                        return Some(StepHold::Defer);
                    }
                    return Some(StepHold::Decelerate);
                }
                budget -= step.steps as i32;
                if budget <= 0 {
                    break;
                }
            }
        }
        None
    }

    /// Drop-off then pickup at a company bus stop. One status broadcast per
    /// visit, whatever happened.
    fn bus_stop_off_on(&mut self, idx: usize, stop: TilePoint) -> Result<()> {
        let Some(company_id) = self
            .companies
            .iter()
            .find(|c| c.bus_stop == stop)
            .map(|c| c.id)
        else {
            info!(
                "{} enters bus stop {:?} which is no company's",
                self.players[idx].name, stop
            );
            return Ok(());
        };
        let player_id = self.players[idx].id;
        let mut status = StatusKind::NoAction;
        let mut event_passenger = None;
        let mut just_abandoned: Option<PassengerId> = None;

        if let Some(pid) = self.players[idx].passenger {
            let carried = &self.passengers[pid.0];
            let refused = self.companies[company_id.0].lobby.iter().any(|waiting| {
                carried.enemies.contains(waiting)
                    && self.passengers[waiting.0].lobby == Some(company_id)
            });
            if refused {
                info!(
                    "{} could not drop off {} at {}",
                    self.players[idx].name,
                    self.passengers[pid.0].name,
                    self.companies[company_id.0].name
                );
                status = StatusKind::Refused;
                event_passenger = Some(pid);
            } else if self.passengers[pid.0].destination == company_id {
                info!(
                    "{} dropped off {} at {}",
                    self.players[idx].name,
                    self.passengers[pid.0].name,
                    self.companies[company_id.0].name
                );
                self.players[idx].delivered.push(pid);
                self.players[idx].passenger = None;
                let p = &mut self.passengers[pid.0];
                p.car = None;
                p.lobby = Some(company_id);
                p.done = true;
                self.companies[company_id.0].lobby.push(pid);
                status = StatusKind::Delivered;
                event_passenger = Some(pid);
            } else {
                info!(
                    "{} abandoned {} at {}",
                    self.players[idx].name,
                    self.passengers[pid.0].name,
                    self.companies[company_id.0].name
                );
                self.players[idx].passenger = None;
                let p = &mut self.passengers[pid.0];
                p.car = None;
                p.lobby = Some(company_id);
                self.companies[company_id.0].lobby.push(pid);
                just_abandoned = Some(pid);
                status = StatusKind::Abandoned;
                event_passenger = Some(pid);
            }
        }

        // Pick up if the seat is free. Never someone already delivered, and
        // never the one just set down.
        if self.players[idx].passenger.is_none() {
            let choice = self.players[idx].pickup.iter().copied().find(|p| {
                self.passengers[p.0].lobby == Some(company_id)
                    && self.passengers[p.0].car.is_none()
                    && !self.players[idx].delivered.contains(p)
                    && Some(*p) != just_abandoned
            });
            if let Some(pid) = choice {
                info!(
                    "{} picked up {} at {}",
                    self.players[idx].name,
                    self.passengers[pid.0].name,
                    self.companies[company_id.0].name
                );
                let p = &mut self.passengers[pid.0];
                p.car = Some(player_id);
                p.lobby = None;
                self.companies[company_id.0].lobby.retain(|w| *w != pid);
                self.players[idx].pickup.retain(|w| *w != pid);
                self.players[idx].passenger = Some(pid);
                status = if status == StatusKind::NoAction {
                    StatusKind::PickedUp
                } else {
                    StatusKind::DeliveredAndPickedUp
                };
                event_passenger = Some(pid);
            }
        }

        self.push_status(player_id, status, event_passenger, Some(company_id));
        Ok(())
    }

    /// Print a one-screen summary of the simulation state.
    pub fn print_summary(&self) {
        println!("=== Limopolis Summary ===");
        println!("Round: {}, tick: {}", self.round, self.tick_count);
        println!();
        println!("--- Players ---");
        for player in &self.players {
            let riding = player
                .passenger
                .map(|p| self.passengers[p.0].name.clone())
                .unwrap_or_else(|| "{none}".to_string());
            println!(
                "  {}: tile {:?}, speed {:.1}, delivered {}, riding {}",
                player.name,
                player.limo.location.tile,
                player.limo.speed,
                player.delivered.len(),
                riding
            );
        }
        println!("--- Companies ---");
        for company in &self.companies {
            let waiting: Vec<&str> = company
                .lobby
                .iter()
                .map(|p| self.passengers[p.0].name.as_str())
                .collect();
            println!(
                "  {} at {:?}: lobby [{}]",
                company.name,
                company.bus_stop,
                waiting.join(", ")
            );
        }
    }

    /// Debug-build consistency validator: scans actor and passenger state
    /// for invariant violations and treats any as fatal. Compiles to
    /// nothing in release builds.
    #[cfg(debug_assertions)]
    fn validate_all(&self) {
        let mut errors: Vec<String> = Vec::new();

        for player in &self.players {
            if let Some(p) = player.passenger {
                if player.delivered.contains(&p) {
                    errors.push(format!(
                        "{} is carrying {} who was already delivered",
                        player.name, self.passengers[p.0].name
                    ));
                }
            }
            for p in &player.pickup {
                if player.delivered.contains(p) {
                    errors.push(format!(
                        "{} wants to pick up {} who was already delivered",
                        player.name, self.passengers[p.0].name
                    ));
                }
            }

            for tile in &player.limo.route {
                if !self.map.is_drivable(*tile) {
                    errors.push(format!(
                        "{} has route entry {:?} which is not drivable",
                        player.name, tile
                    ));
                }
            }
            for pair in player.limo.route.windows(2) {
                if !pair[0].is_adjacent(pair[1]) {
                    errors.push(format!(
                        "{} has illegal route step {:?} -> {:?}",
                        player.name, pair[0], pair[1]
                    ));
                }
            }

            if !self.map.is_drivable(player.limo.location.tile) {
                errors.push(format!(
                    "{} is located on non-drivable tile {:?}",
                    player.name, player.limo.location.tile
                ));
            }
        }

        for passenger in &self.passengers {
            if passenger.car.is_some() && passenger.lobby.is_some() {
                errors.push(format!(
                    "{} is in a car and in lobby {:?} at once",
                    passenger.name, passenger.lobby
                ));
            }
            if let Some(lobby) = passenger.lobby {
                if !self.companies[lobby.0].lobby.contains(&passenger.id) {
                    errors.push(format!(
                        "{} claims lobby {} which does not list them",
                        passenger.name, self.companies[lobby.0].name
                    ));
                }
            }
        }
        for company in &self.companies {
            for p in &company.lobby {
                if self.passengers[p.0].lobby != Some(company.id) {
                    errors.push(format!(
                        "{} lists {} who is not in that lobby",
                        company.name, self.passengers[p.0].name
                    ));
                }
            }
        }

        #[cfg(feature = "strict")]
        {
            for (i, a) in self.players.iter().enumerate() {
                for b in self.players.iter().skip(i + 1) {
                    if a.limo.tail_cells().any(|cell| b.limo.tail_contains(cell)) {
                        errors.push(format!(
                            "{} and {} overlap on a collision cell",
                            a.name, b.name
                        ));
                    }
                }
            }
        }

        if !errors.is_empty() {
            for err in &errors {
                warn!("validate: {}", err);
            }
            panic!("simulation invariants violated: {}", errors.join("; "));
        }
    }

    #[cfg(not(debug_assertions))]
    fn validate_all(&self) {}
}
