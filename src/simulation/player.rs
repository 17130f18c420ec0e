//! Player state
//!
//! One player per AI: a limo, the passenger currently riding in it, the
//! pickup wish-list supplied by the AI and the record of completed
//! deliveries.

use super::limo::Limo;
use super::location::BoardLocation;
use super::types::{CompanyId, PassengerId, PlayerId};

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub limo: Limo,
    /// The passenger riding in the limo, if any.
    pub passenger: Option<PassengerId>,
    /// Passengers the AI wants picked up, in preference order.
    pub pickup: Vec<PassengerId>,
    /// Passengers this player has delivered this round.
    pub delivered: Vec<PassengerId>,
    /// The first company bus stop on the current route, if any.
    pub next_bus_stop: Option<CompanyId>,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>, location: BoardLocation) -> Self {
        Self {
            id,
            name: name.into(),
            limo: Limo::new(location),
            passenger: None,
            pickup: Vec::new(),
            delivered: Vec::new(),
            next_bus_stop: None,
        }
    }

    /// Reset for a new round at a fresh start location.
    pub fn reset(&mut self, location: BoardLocation) {
        self.limo.place(location);
        self.passenger = None;
        self.pickup.clear();
        self.delivered.clear();
        self.next_bus_stop = None;
    }
}
