//! Limopolis
//!
//! The turn/tick simulation core of a multi-player limo traffic game. AIs
//! submit routes and pickup lists asynchronously; the engine executes them
//! tile by tile under traffic rules.

pub mod simulation;
