use super::error::FetchError;
use chrono::{DateTime, Utc};

/// Bounds and options for one export request to the games API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub username: String,
    pub since_ms: i64,
    pub until_ms: i64,
    /// Ask for `[%clk]` annotations on every ply.
    pub clocks: bool,
}

impl FetchRequest {
    pub fn new(username: &str, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            username: username.to_string(),
            since_ms: since.timestamp_millis(),
            until_ms: until.timestamp_millis(),
            clocks: true,
        }
    }
}

/// The remote side of a run: returns a PGN blob, newest game first, or an
/// empty string when there is nothing new. Retries are the implementor's
/// business; one call is one attempt from the run's point of view.
pub trait GameSource {
    fn fetch(&mut self, request: &FetchRequest) -> Result<String, FetchError>;
}

impl<F> GameSource for F
where
    F: FnMut(&FetchRequest) -> Result<String, FetchError>,
{
    fn fetch(&mut self, request: &FetchRequest) -> Result<String, FetchError> {
        self(request)
    }
}
