//! Passengers and companies
//!
//! A passenger is held by at most one of a company lobby or a limo at any
//! time; the debug validator enforces this. Rosters are dealt from a seeded
//! RNG at round start so runs are reproducible.

use rand::rngs::StdRng;
use rand::Rng;

use super::types::{CompanyId, PassengerId, PlayerId, TilePoint};

/// A company with a bus stop and a lobby of waiting passengers.
#[derive(Debug, Clone)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub bus_stop: TilePoint,
    /// Passengers waiting in this company's lobby.
    pub lobby: Vec<PassengerId>,
}

/// A passenger trying to get from one company to another.
#[derive(Debug, Clone)]
pub struct Passenger {
    pub id: PassengerId,
    pub name: String,
    pub destination: CompanyId,
    /// Passengers this one refuses to share a lobby with on arrival.
    pub enemies: Vec<PassengerId>,
    /// The lobby this passenger waits in, if any.
    pub lobby: Option<CompanyId>,
    /// The limo this passenger rides in, if any.
    pub car: Option<PlayerId>,
    /// Set once delivered to the destination.
    pub done: bool,
}

const COMPANY_NAMES: [&str; 8] = [
    "Ajax Mills",
    "Bergamot & Sons",
    "Custer Combines",
    "Dynamic Dynamics",
    "Evergreen Holdings",
    "Fiddler Freight",
    "Gawker Consolidated",
    "Hightower Group",
];

const PASSENGER_NAMES: [&str; 16] = [
    "Ada", "Blaise", "Claude", "Donald", "Edsger", "Frances", "Grace", "Haskell", "Ivan",
    "Julia", "Kathleen", "Leslie", "Margaret", "Niklaus", "Ole", "Peter",
];

/// Deal a fresh roster: up to `max_companies` companies and a passenger for
/// each name, each waiting in a random lobby with a different destination.
/// Bus stops are assigned by the engine afterwards.
pub fn generate_roster(rng: &mut StdRng, max_companies: usize) -> (Vec<Company>, Vec<Passenger>) {
    if max_companies == 0 {
        return (Vec::new(), Vec::new());
    }
    let company_count = COMPANY_NAMES.len().min(max_companies);
    let mut companies: Vec<Company> = COMPANY_NAMES
        .iter()
        .take(company_count)
        .enumerate()
        .map(|(i, name)| Company {
            id: CompanyId(i),
            name: (*name).to_string(),
            bus_stop: TilePoint::default(),
            lobby: Vec::new(),
        })
        .collect();

    let mut passengers = Vec::with_capacity(PASSENGER_NAMES.len());
    for (i, name) in PASSENGER_NAMES.iter().enumerate() {
        let lobby = CompanyId(rng.random_range(0..company_count));
        let destination = if company_count == 1 {
            lobby
        } else {
            // Anywhere but where they already are.
            let mut dest = rng.random_range(0..company_count - 1);
            if dest >= lobby.0 {
                dest += 1;
            }
            CompanyId(dest)
        };
        let id = PassengerId(i);
        companies[lobby.0].lobby.push(id);
        passengers.push(Passenger {
            id,
            name: (*name).to_string(),
            destination,
            enemies: Vec::new(),
            lobby: Some(lobby),
            car: None,
            done: false,
        });
    }

    // A sprinkle of rivalries: some passengers refuse to be dropped into a
    // lobby where an enemy is waiting.
    for i in 0..passengers.len() {
        if rng.random_range(0..3) == 0 {
            let other = rng.random_range(0..passengers.len() - 1);
            let other = if other >= i { other + 1 } else { other };
            passengers[i].enemies.push(PassengerId(other));
        }
    }

    (companies, passengers)
}
