//! AI order submission
//!
//! AIs run out-of-band from the tick loop and submit orders through a
//! thread-safe, order-preserving queue. The engine drains the queue at the
//! start of each tick and never blocks on an AI. An empty route means "keep
//! the current route"; an empty pickup list means "keep the current
//! pickups".

use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

use super::map::GameMap;
use super::passenger::{Company, Passenger};
use super::player::Player;
use super::types::{PassengerId, PlayerId, TilePoint};

/// One order submission from an AI.
#[derive(Debug, Clone)]
pub struct Orders {
    pub player: PlayerId,
    pub route: Vec<TilePoint>,
    pub pickups: Vec<PassengerId>,
}

/// The submitting half of the order queue. Clone one per AI; sends never
/// block.
#[derive(Debug, Clone)]
pub struct OrderSender {
    tx: Sender<Orders>,
}

impl OrderSender {
    pub fn submit(&self, player: PlayerId, route: Vec<TilePoint>, pickups: Vec<PassengerId>) {
        // A closed receiver just means the engine is gone; nothing to do.
        let _ = self.tx.send(Orders {
            player,
            route,
            pickups,
        });
    }
}

/// The draining half, owned by the engine.
#[derive(Debug)]
pub struct OrderQueue {
    rx: Receiver<Orders>,
}

impl OrderQueue {
    pub fn try_next(&mut self) -> Option<Orders> {
        match self.rx.try_recv() {
            Ok(orders) => Some(orders),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

pub fn order_channel() -> (OrderSender, OrderQueue) {
    let (tx, rx) = channel();
    (OrderSender { tx }, OrderQueue { rx })
}

/// The capability contract an AI implements. The engine never calls this
/// itself; a host pumps brains between ticks and forwards their decisions
/// through an [`OrderSender`].
pub trait AiBrain {
    /// Decide new orders from the observable game state. `None` means no
    /// change.
    fn decide(
        &mut self,
        map: &GameMap,
        you: &Player,
        players: &[Player],
        companies: &[Company],
        passengers: &[Passenger],
    ) -> Option<(Vec<TilePoint>, Vec<PassengerId>)>;
}
