//! Square coverage over a player's online game history: which (piece kind,
//! square) pairs the player has ever moved a piece to, and how much clock
//! time it took to get there.

pub mod chess;

pub use chess::{
    CoverageGrid, CoverageSink, FetchError, FetchRequest, GameRecord, GameSource, HistoryStore,
    Report, RunConfig, RunError, Runner,
};
