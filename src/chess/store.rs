use super::config::CompressionMode;
use super::error::StoreError;
use super::types::GameRecord;
use super::visitor::read_games;

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder as ZstdDecoder;
use zstd::stream::write::Encoder as ZstdEncoder;

type PgnInput = Box<dyn Read>;

const ZSTD_LEVEL: i32 = 3;

fn io_error(path: &Path, source: io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// `None` when the file does not exist yet.
fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<Option<PgnInput>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_error(path, e)),
    };

    match compression {
        CompressionMode::Plain => Ok(Some(Box::new(file))),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Some(Box::new(decoder) as PgnInput))
            .map_err(|e| io_error(path, e)),
    }
}

/// Persisted game history, newest first, one record per identifier.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    compression: CompressionMode,
    games: Vec<GameRecord>,
}

impl HistoryStore {
    /// Loads the history file; a missing file is an empty store.
    ///
    /// Fails on a damaged file, duplicate identifiers or timestamps that are
    /// not strictly newest first; nothing is repaired or dropped silently.
    pub fn open(path: impl Into<PathBuf>, compression: CompressionMode) -> Result<Self, StoreError> {
        let path = path.into();
        let games = match open_input_stream(&path, compression)? {
            Some(input) => read_games(input).map_err(|source| StoreError::Unreadable {
                path: path.clone(),
                source,
            })?,
            None => Vec::new(),
        };
        tracing::debug!(path = %path.display(), games = games.len(), "history loaded");

        Self::with_games(path, compression, games)
    }

    pub fn with_games(
        path: impl Into<PathBuf>,
        compression: CompressionMode,
        games: Vec<GameRecord>,
    ) -> Result<Self, StoreError> {
        validate_newest_first(&games, None)?;
        Ok(Self {
            path: path.into(),
            compression,
            games,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Newest first.
    pub fn games(&self) -> &[GameRecord] {
        &self.games
    }

    pub fn newest(&self) -> Option<DateTime<Utc>> {
        self.games.first().and_then(|g| g.played_at)
    }

    /// One second past the newest stored game, or `default` when empty.
    pub fn cursor(&self, default: DateTime<Utc>) -> DateTime<Utc> {
        self.newest()
            .map(|newest| newest + TimeDelta::seconds(1))
            .unwrap_or(default)
    }

    /// Prepends a newest-first batch of freshly fetched games.
    ///
    /// Every game in the batch must be strictly newer than the current newest
    /// game. The batch is validated as a whole before anything changes, so
    /// on error the store is untouched. Returns the number of games added.
    pub fn merge(&mut self, batch: Vec<GameRecord>) -> Result<usize, StoreError> {
        if batch.is_empty() {
            return Ok(0);
        }

        validate_newest_first(&batch, Some(self.games.as_slice()))?;

        let added = batch.len();
        let mut games = batch;
        games.append(&mut self.games);
        self.games = games;
        Ok(added)
    }

    /// Oldest first, the order games are folded in.
    pub fn chronological(&self) -> impl DoubleEndedIterator<Item = &GameRecord> + '_ {
        self.games.iter().rev()
    }

    /// Rewrites the history file through a sibling temp file and a rename.
    pub fn save(&self) -> Result<(), StoreError> {
        let tmp_path = self.tmp_path();
        self.write_to(&tmp_path)
            .and_then(|()| fs::rename(&tmp_path, &self.path))
            .map_err(|e| {
                let _ = fs::remove_file(&tmp_path);
                io_error(&self.path, e)
            })?;
        tracing::debug!(path = %self.path.display(), games = self.games.len(), "history saved");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_to(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        match self.compression {
            CompressionMode::Plain => {
                let mut out = io::BufWriter::new(file);
                self.write_games(&mut out)?;
                out.flush()?;
                out.get_ref().sync_all()
            }
            CompressionMode::Zstd => {
                let mut encoder = ZstdEncoder::new(file, ZSTD_LEVEL)?;
                self.write_games(&mut encoder)?;
                encoder.finish()?.sync_all()
            }
        }
    }

    fn write_games<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for game in &self.games {
            out.write_all(game.to_pgn().as_bytes())?;
        }
        Ok(())
    }
}

/// Checks identifiers, diagnostics and timestamps of `games` (strictly
/// newest first, no two games in the same second). With
/// `existing`, the games must also be strictly newer than `existing[0]` and
/// share no identifier with it.
fn validate_newest_first(
    games: &[GameRecord],
    existing: Option<&[GameRecord]>,
) -> Result<(), StoreError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(games.len());
    if let Some(existing) = existing {
        seen.extend(existing.iter().filter_map(GameRecord::id));
    }

    let mut previous: Option<DateTime<Utc>> = None;
    for (index, game) in games.iter().enumerate() {
        let id = game.id().ok_or(StoreError::MissingIdentifier { index })?;
        let played_at = game.played_at.ok_or_else(|| StoreError::MissingTimestamp {
            id: id.to_string(),
        })?;

        if let Some(detail) = &game.parse_error {
            return Err(StoreError::InvalidRecord {
                id: id.to_string(),
                detail: detail.clone(),
            });
        }

        if !seen.insert(id) {
            return Err(StoreError::DuplicateIdentifier { id: id.to_string() });
        }

        if previous.is_some_and(|prev| played_at >= prev) {
            return Err(StoreError::OutOfOrder { id: id.to_string() });
        }
        previous = Some(played_at);
    }

    let newest_existing = existing.and_then(|e| e.first()).and_then(|g| g.played_at);
    if let (Some(oldest_new), Some(newest_existing)) = (games.last(), newest_existing)
        && oldest_new.played_at.is_some_and(|t| t <= newest_existing)
    {
        let id = oldest_new.id().unwrap_or_default().to_string();
        return Err(StoreError::NotNewer { id });
    }

    Ok(())
}
