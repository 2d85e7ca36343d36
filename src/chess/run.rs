use super::config::{RunConfig, ScoreMode};
use super::coverage::{CoverageGrid, CoverageTracker, PROMOTION_SQUARES, TOTAL_SQUARES};
use super::error::{FetchError, MalformedGame, RunError};
use super::fetch::{FetchRequest, GameSource};
use super::filter::{SkipReason, check_game};
use super::ledger::{GameTime, TimeLedger, game_time};
use super::moves::decode_moves;
use super::store::HistoryStore;
use super::timecontrol::parse_timecontrol;
use super::types::{GameRecord, PlayerOutcome};
use super::visitor::read_games;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use shakmaty::{Color, Role, Square};
use std::fmt;

/// Where a run currently is. Every run ends back in `Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    CursorDerived,
    Fetched,
    Merged,
    Processing(u32),
    Reported,
}

/// Per-game report line.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSummary {
    /// 1-based, counts accepted games only.
    pub index: u32,
    pub id: String,
    pub side: Color,
    pub outcome: PlayerOutcome,
    pub speed: Option<&'static str>,
    pub new_squares: usize,
    pub time: GameTime,
    pub total_used: u64,
    pub total_penalized: u64,
}

impl GameSummary {
    pub fn to_json(&self) -> Value {
        json!({
            "game": self.index,
            "id": self.id,
            "side": if self.side == Color::White { "white" } else { "black" },
            "outcome": match self.outcome {
                PlayerOutcome::Won => "won",
                PlayerOutcome::Lost => "lost",
                PlayerOutcome::Draw => "draw",
            },
            "speed": self.speed,
            "new_squares": self.new_squares,
            "max_seconds": self.time.max,
            "used_seconds": self.time.used,
            "scored_seconds": self.time.scored,
            "total_used_seconds": self.total_used,
            "total_penalized_seconds": self.total_penalized,
        })
    }
}

impl fmt::Display for GameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "game {} ({}): {} new squares, used {}s, scored {}s, totals {}s/{}s",
            self.index,
            self.id,
            self.new_squares,
            self.time.used,
            self.time.scored,
            self.total_used,
            self.total_penalized
        )
    }
}

/// Why a stored game contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipKind {
    Filtered(SkipReason),
    Malformed(MalformedGame),
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filtered(reason) => write!(f, "filtered: {reason}"),
            Self::Malformed(err) => write!(f, "malformed: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedGame {
    pub id: String,
    pub kind: SkipKind,
}

/// Receives every accepted game right after it is folded in.
///
/// `touched` lists the squares this game reached first, for highlighting.
pub trait CoverageSink {
    fn game_processed(
        &mut self,
        summary: &GameSummary,
        grid: &CoverageGrid,
        touched: &[(Role, Square)],
    );
}

impl CoverageSink for () {
    fn game_processed(&mut self, _: &GameSummary, _: &CoverageGrid, _: &[(Role, Square)]) {}
}

/// Everything a run accumulates, threaded through the fold explicitly.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    tracker: CoverageTracker,
    ledger: TimeLedger,
    games: u32,
    skipped: Vec<SkippedGame>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(&self) -> &CoverageGrid {
        self.tracker.grid()
    }

    pub fn ledger(&self) -> TimeLedger {
        self.ledger
    }

    pub fn games(&self) -> u32 {
        self.games
    }

    pub fn skipped(&self) -> &[SkippedGame] {
        &self.skipped
    }

    /// Folds one game in. A filtered or malformed game is recorded as skipped
    /// and leaves the grid, the ledger and the counter as they were.
    pub fn fold(&mut self, record: &GameRecord, username: &str) -> Result<GameSummary, SkipKind> {
        let id = record.id().unwrap_or("?").to_string();
        self.try_fold(record, username, &id).inspect_err(|kind| {
            self.skipped.push(SkippedGame {
                id: id.clone(),
                kind: kind.clone(),
            });
        })
    }

    fn try_fold(
        &mut self,
        record: &GameRecord,
        username: &str,
        id: &str,
    ) -> Result<GameSummary, SkipKind> {
        check_game(record).map_err(SkipKind::Filtered)?;

        let malformed = SkipKind::Malformed;
        if let Some(error) = &record.parse_error {
            return Err(malformed(MalformedGame::Unreadable(error.clone())));
        }
        let side = record
            .side_of(username)
            .ok_or_else(|| malformed(MalformedGame::PlayerNotInGame(username.to_string())))?;
        let outcome = record
            .outcome_for(side)
            .ok_or(malformed(MalformedGame::MissingResult))?;

        let raw_tc = record.time_control.clone().unwrap_or_default();
        let time_control = parse_timecontrol(&raw_tc)
            .map_err(|_| malformed(MalformedGame::TimeControl(raw_tc.clone())))?;
        let clock = time_control
            .clock()
            .ok_or_else(|| malformed(MalformedGame::TimeControl(raw_tc.clone())))?;

        let events = decode_moves(&record.movetext).map_err(malformed)?;
        let time = game_time(clock, &events, outcome).map_err(malformed)?;

        // Nothing below can fail; the grid only changes for accepted games.
        self.tracker.begin_game();
        for event in events.iter().filter(|e| e.mover() == side) {
            self.tracker.record_if_new(event.role, event.square);
        }
        self.ledger.record(&time);
        self.games += 1;

        Ok(GameSummary {
            index: self.games,
            id: id.to_string(),
            side,
            outcome,
            speed: time_control.speed(),
            new_squares: self.tracker.newly_touched().len(),
            time,
            total_used: self.ledger.used_seconds,
            total_penalized: self.ledger.penalized_seconds,
        })
    }

    pub fn newly_touched(&self) -> &[(Role, Square)] {
        self.tracker.newly_touched()
    }

    pub fn into_report(self, score_mode: ScoreMode) -> Report {
        let grid = *self.tracker.grid();
        Report {
            games: self.games,
            squares_covered: grid.total(),
            promotion_squares: grid.promotion_squares(),
            ledger: self.ledger,
            score_mode,
            skipped: self.skipped,
            grid,
        }
    }
}

/// Final tallies of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub games: u32,
    pub squares_covered: usize,
    pub promotion_squares: usize,
    pub ledger: TimeLedger,
    pub score_mode: ScoreMode,
    pub skipped: Vec<SkippedGame>,
    pub grid: CoverageGrid,
}

impl Report {
    pub fn total_possible(&self) -> usize {
        TOTAL_SQUARES
    }

    pub fn percentage(&self) -> f64 {
        self.squares_covered as f64 * 100.0 / TOTAL_SQUARES as f64
    }

    pub fn is_complete(&self) -> bool {
        self.squares_covered == TOTAL_SQUARES
    }

    /// The time total selected by the score mode.
    pub fn chosen_seconds(&self) -> u64 {
        match self.score_mode {
            ScoreMode::Raw => self.ledger.used_seconds,
            ScoreMode::Penalized => self.ledger.penalized_seconds,
        }
    }

    pub fn to_json(&self) -> Value {
        let skipped: Vec<Value> = self
            .skipped
            .iter()
            .map(|s| json!({ "id": s.id, "reason": s.kind.to_string() }))
            .collect();

        json!({
            "games": self.games,
            "squares_covered": self.squares_covered,
            "total_squares": self.total_possible(),
            "complete": self.is_complete(),
            "promotion_squares": self.promotion_squares,
            "total_promotion_squares": PROMOTION_SQUARES,
            "percentage": self.percentage(),
            "used_seconds": self.ledger.used_seconds,
            "penalized_seconds": self.ledger.penalized_seconds,
            "score_mode": self.score_mode.as_str(),
            "score_seconds": self.chosen_seconds(),
            "skipped": skipped,
        })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "games counted: {}", self.games)?;
        writeln!(
            f,
            "squares covered: {}/{} ({:.2}%){}",
            self.squares_covered,
            self.total_possible(),
            self.percentage(),
            if self.is_complete() { ", complete" } else { "" }
        )?;
        writeln!(
            f,
            "promotion squares: {}/{}",
            self.promotion_squares, PROMOTION_SQUARES
        )?;
        writeln!(f, "time used: {}s", self.ledger.used_seconds)?;
        writeln!(f, "time penalized: {}s", self.ledger.penalized_seconds)?;
        write!(
            f,
            "score ({}): {}s",
            self.score_mode.as_str(),
            self.chosen_seconds()
        )?;
        if !self.skipped.is_empty() {
            write!(f, "\nskipped: {}", self.skipped.len())?;
        }
        Ok(())
    }
}

/// Drives one incremental run: fetch, merge, persist, fold, report.
#[derive(Debug)]
pub struct Runner {
    config: RunConfig,
    phase: Phase,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Opens the history file the config points at.
    pub fn open_store(&self) -> Result<HistoryStore, RunError> {
        Ok(HistoryStore::open(
            &self.config.history_path,
            self.config.compression,
        )?)
    }

    fn enter(&mut self, phase: Phase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "run phase");
        self.phase = phase;
    }

    pub fn run_now<S, K>(
        &mut self,
        store: &mut HistoryStore,
        source: &mut S,
        sink: &mut K,
    ) -> Result<Report, RunError>
    where
        S: GameSource + ?Sized,
        K: CoverageSink + ?Sized,
    {
        self.run(store, source, sink, Utc::now())
    }

    /// Brings `store` up to date with games played before `now` and folds the
    /// whole history.
    ///
    /// A fetch, merge or save failure aborts the run; `store`, in memory and
    /// on disk, is then exactly as it was. Per-game problems only show up in
    /// [`Report::skipped`].
    pub fn run<S, K>(
        &mut self,
        store: &mut HistoryStore,
        source: &mut S,
        sink: &mut K,
        now: DateTime<Utc>,
    ) -> Result<Report, RunError>
    where
        S: GameSource + ?Sized,
        K: CoverageSink + ?Sized,
    {
        let result = self.run_phases(store, source, sink, now);
        if let Err(err) = &result {
            tracing::error!(error = %err, "run aborted");
        }
        self.enter(Phase::Idle);
        result
    }

    fn run_phases<S, K>(
        &mut self,
        store: &mut HistoryStore,
        source: &mut S,
        sink: &mut K,
        now: DateTime<Utc>,
    ) -> Result<Report, RunError>
    where
        S: GameSource + ?Sized,
        K: CoverageSink + ?Sized,
    {
        let since = store.cursor(self.config.since_default);
        self.enter(Phase::CursorDerived);

        let request = FetchRequest::new(&self.config.username, since, now);
        tracing::info!(
            user = %request.username,
            since = %since,
            until = %now,
            "fetching games"
        );
        let blob = source.fetch(&request)?;
        self.enter(Phase::Fetched);

        let fetched = if blob.trim().is_empty() {
            Vec::new()
        } else {
            read_games(blob.as_bytes())
                .map_err(|e| FetchError::new(format!("unreadable PGN response: {e}")))?
        };

        // Merge into a copy; the caller's store only changes once the file does.
        let mut added = 0;
        if !fetched.is_empty() {
            let mut updated = store.clone();
            added = updated.merge(fetched)?;
            updated.save()?;
            *store = updated;
        }
        tracing::info!(added, stored = store.len(), "history merged");
        self.enter(Phase::Merged);

        let mut tally = Tally::new();
        for record in store.chronological() {
            match tally.fold(record, &self.config.username) {
                Ok(summary) => {
                    self.enter(Phase::Processing(summary.index));
                    tracing::info!(
                        game = summary.index,
                        id = %summary.id,
                        new_squares = summary.new_squares,
                        used = summary.time.used,
                        scored = summary.time.scored,
                        "game processed"
                    );
                    sink.game_processed(&summary, tally.grid(), tally.newly_touched());
                }
                Err(SkipKind::Filtered(reason)) => {
                    tracing::info!(id = record.id().unwrap_or("?"), %reason, "game skipped");
                }
                Err(SkipKind::Malformed(err)) => {
                    tracing::warn!(id = record.id().unwrap_or("?"), error = %err, "malformed game");
                }
            }
        }

        let report = tally.into_report(self.config.score_mode);
        tracing::info!(
            games = report.games,
            squares = report.squares_covered,
            used = report.ledger.used_seconds,
            penalized = report.ledger.penalized_seconds,
            "run complete"
        );
        self.enter(Phase::Reported);
        Ok(report)
    }
}
