use std::fmt;
use std::io;
use std::path::PathBuf;

/// Collects per-record diagnostics into a single `"; "`-joined message.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        let joined = self.0.get_or_insert_with(String::new);
        if !joined.is_empty() {
            joined.push_str("; ");
        }
        joined.push_str(msg);
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

/// A single game could not be decoded or accounted.
///
/// Fatal to that game only: the run logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedGame {
    MissingClock { ply: u32 },
    IllegalMove { ply: u32, san: String },
    TimeControl(String),
    PlayerNotInGame(String),
    MissingResult,
    NegativeTime { used: i64, max: i64 },
    Unreadable(String),
}

impl fmt::Display for MalformedGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingClock { ply } => write!(f, "missing clock annotation at ply {ply}"),
            Self::IllegalMove { ply, san } => write!(f, "illegal move '{san}' at ply {ply}"),
            Self::TimeControl(raw) => write!(f, "unsupported time control '{raw}'"),
            Self::PlayerNotInGame(user) => write!(f, "'{user}' is neither White nor Black"),
            Self::MissingResult => write!(f, "no decisive or drawn result"),
            Self::NegativeTime { used, max } => {
                write!(f, "clock sequence yields negative time (used={used}, max={max})")
            }
            Self::Unreadable(msg) => write!(f, "unreadable game: {msg}"),
        }
    }
}

impl std::error::Error for MalformedGame {}

/// The fetch collaborator failed; nothing was merged.
#[derive(Debug, Clone)]
pub struct FetchError {
    pub message: String,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch failed: {}", self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug)]
pub enum StoreError {
    Io { path: PathBuf, source: io::Error },
    /// The history file could not be read to the end; nothing was loaded.
    Unreadable { path: PathBuf, source: io::Error },
    /// A record carries header diagnostics and would not survive a rewrite.
    InvalidRecord { id: String, detail: String },
    MissingIdentifier { index: usize },
    MissingTimestamp { id: String },
    DuplicateIdentifier { id: String },
    OutOfOrder { id: String },
    NotNewer { id: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "history file '{}': {}", path.display(), source)
            }
            Self::Unreadable { path, source } => {
                write!(f, "history file '{}' is damaged: {}", path.display(), source)
            }
            Self::InvalidRecord { id, detail } => write!(f, "game '{id}': {detail}"),
            Self::MissingIdentifier { index } => {
                write!(f, "game #{index} has no Site identifier")
            }
            Self::MissingTimestamp { id } => write!(f, "game '{id}' has no UTC date/time"),
            Self::DuplicateIdentifier { id } => write!(f, "duplicate game identifier '{id}'"),
            Self::OutOfOrder { id } => {
                write!(f, "game '{id}' breaks newest-first timestamp order")
            }
            Self::NotNewer { id } => {
                write!(f, "fetched game '{id}' is not newer than the stored history")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } | Self::Unreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Run-level failure. Per-game problems never surface here.
#[derive(Debug)]
pub enum RunError {
    Fetch(FetchError),
    Store(StoreError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "history store: {e}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(e) => Some(e),
            Self::Store(e) => Some(e),
        }
    }
}

impl From<FetchError> for RunError {
    fn from(e: FetchError) -> Self {
        Self::Fetch(e)
    }
}

impl From<StoreError> for RunError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
