pub mod config;
pub mod coverage;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod ledger;
pub mod log;
pub mod moves;
pub mod run;
pub mod store;
pub mod timecontrol;
pub mod types;
pub mod visitor;

pub use config::{CompressionMode, ConfigError, RunConfig, ScoreMode};
pub use coverage::{CoverageGrid, CoverageTracker, PROMOTION_SQUARES, TOTAL_SQUARES};
pub use error::{FetchError, MalformedGame, RunError, StoreError};
pub use fetch::{FetchRequest, GameSource};
pub use ledger::{GameTime, TimeLedger, game_time};
pub use moves::{MoveEvent, decode_moves};
pub use run::{CoverageSink, GameSummary, Report, Runner, SkipKind, SkippedGame, Tally};
pub use store::HistoryStore;
pub use types::{GameRecord, GameResult, PlayerOutcome};
pub use visitor::read_games;
