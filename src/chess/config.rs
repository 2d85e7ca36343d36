use chrono::{DateTime, Utc};
use std::env;
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompressionMode {
    #[default]
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let normalized = raw.trim();
        if normalized.is_empty() {
            return Err(ConfigError::new(
                "Invalid compression value ''. Supported values: 'zstd' or omitted.",
            ));
        }

        if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(ConfigError::new(format!(
                "Invalid compression value '{}'. Supported values: 'zstd' or omitted.",
                normalized
            )))
        }
    }
}

/// Which time total the report leads with.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ScoreMode {
    Raw,
    #[default]
    Penalized,
}

impl ScoreMode {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "raw" | "used" => Ok(Self::Raw),
            "penalized" | "scored" => Ok(Self::Penalized),
            other => Err(ConfigError::new(format!(
                "Invalid score mode '{}'. Supported values: 'raw' or 'penalized'.",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Penalized => "penalized",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Monitored player.
    pub username: String,
    /// Fetch lower bound when the history is empty.
    pub since_default: DateTime<Utc>,
    pub score_mode: ScoreMode,
    pub history_path: PathBuf,
    pub compression: CompressionMode,
}

impl RunConfig {
    pub fn new(username: impl Into<String>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            username: username.into(),
            since_default: DateTime::<Utc>::UNIX_EPOCH,
            score_mode: ScoreMode::default(),
            history_path: history_path.into(),
            compression: CompressionMode::default(),
        }
    }

    pub fn since_default(mut self, since: DateTime<Utc>) -> Self {
        self.since_default = since;
        self
    }

    pub fn score_mode(mut self, mode: ScoreMode) -> Self {
        self.score_mode = mode;
        self
    }

    pub fn compression(mut self, compression: CompressionMode) -> Self {
        self.compression = compression;
        self
    }

    /// `CHESS_USER` (required), `CHESS_HISTORY`, `CHESS_SINCE` (RFC 3339),
    /// `CHESS_SCORE`, `CHESS_COMPRESSION`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let username = lookup("CHESS_USER")
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ConfigError::new("CHESS_USER is not set"))?;
        let history = lookup("CHESS_HISTORY").unwrap_or_else(|| "games.pgn".to_string());

        let mut config = Self::new(username.trim(), history);

        if let Some(since) = lookup("CHESS_SINCE") {
            let parsed = DateTime::parse_from_rfc3339(since.trim()).map_err(|e| {
                ConfigError::new(format!("Invalid CHESS_SINCE '{}': {}", since.trim(), e))
            })?;
            config = config.since_default(parsed.with_timezone(&Utc));
        }
        if let Some(score) = lookup("CHESS_SCORE") {
            config = config.score_mode(ScoreMode::parse(&score)?);
        }
        if let Some(compression) = lookup("CHESS_COMPRESSION") {
            config = config.compression(CompressionMode::parse(&compression)?);
        }

        Ok(config)
    }
}
