use super::error::ErrorAccumulator;
use super::types::GameRecord;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use pgn_reader::{Outcome, RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use std::fmt::Write;
use std::io::{self, Read};
use std::mem;
use std::ops::ControlFlow;

/// Streaming PGN visitor (pgn-reader) producing one [`GameRecord`] per game.
///
/// Mainline movetext keeps move numbers and `{ ... }` comments so clock
/// annotations survive a write/read cycle. The result comes from the
/// `Result` tag, or from the movetext marker when the tag is missing.
#[derive(Default)]
pub struct GameVisitor {
    tags: Vec<(String, String)>,
    ply: u32,
    outcome_marker: Option<String>,
    diagnostics: ErrorAccumulator,
    pub current_game: Option<GameRecord>,
}

/// First non-empty value of `key`; later duplicates are ignored.
fn first_tag(tags: &[(String, String)], key: &str) -> Option<String> {
    tags.iter()
        .find(|(k, v)| k == key && !v.trim().is_empty())
        .map(|(_, v)| v.clone())
}

/// Parses one date/time header, recording a conversion error for values that
/// are present but not understood. Unknown (`?`) components count as absent.
fn parse_header<T>(
    raw: Option<&str>,
    label: &str,
    diagnostics: &mut ErrorAccumulator,
    parse: impl FnOnce(&str) -> chrono::ParseResult<T>,
) -> Option<T> {
    let s = raw?.trim();
    if s.contains('?') {
        return None;
    }
    parse(s)
        .inspect_err(|e| {
            diagnostics.push(&format!("Conversion error: {label}='{s}' (chrono: {e})"));
        })
        .ok()
}

fn parse_day(s: &str) -> chrono::ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(&s.replace('.', "-"), "%Y-%m-%d")
}

fn parse_time_of_day(s: &str) -> chrono::ParseResult<NaiveTime> {
    NaiveTime::parse_from_str(s.strip_suffix('Z').unwrap_or(s), "%H:%M:%S")
}

impl GameVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `UTCDate` (falling back to `Date`) joined with `UTCTime`; a missing
    /// time of day means midnight.
    fn played_at(&mut self) -> Option<DateTime<Utc>> {
        let utc_date = first_tag(&self.tags, "UTCDate");
        let date = first_tag(&self.tags, "Date");
        let utc_time = first_tag(&self.tags, "UTCTime");

        let day = parse_header(utc_date.as_deref(), "UTCDate", &mut self.diagnostics, parse_day)
            .or_else(|| {
                parse_header(date.as_deref(), "Date", &mut self.diagnostics, parse_day)
            })?;
        let time = parse_header(
            utc_time.as_deref(),
            "UTCTime",
            &mut self.diagnostics,
            parse_time_of_day,
        )
        .unwrap_or(NaiveTime::MIN);

        Some(day.and_time(time).and_utc())
    }

    fn build_game_record(&mut self, movetext: &str) {
        let played_at = self.played_at();
        let tag = |key: &str| first_tag(&self.tags, key);

        let record = GameRecord {
            site: tag("Site"),
            white: tag("White"),
            black: tag("Black"),
            result: tag("Result").or_else(|| self.outcome_marker.clone()),
            variant: tag("Variant"),
            time_control: tag("TimeControl"),
            white_rating_diff: tag("WhiteRatingDiff"),
            black_rating_diff: tag("BlackRatingDiff"),
            played_at,
            movetext: movetext.trim().to_string(),
            parse_error: None,
            tags: Vec::new(),
        };

        self.current_game = Some(GameRecord {
            tags: mem::take(&mut self.tags),
            parse_error: self.diagnostics.take(),
            ..record
        });
    }
}

impl Visitor for GameVisitor {
    type Tags = ();
    type Movetext = String;
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.tags.clear();
        self.ply = 0;
        self.outcome_marker = None;
        self.diagnostics = ErrorAccumulator::default();
        self.current_game = None;
        ControlFlow::Continue(())
    }

    fn tag(
        &mut self,
        _: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        self.tags.push((
            String::from_utf8_lossy(key).into_owned(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        ));
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(String::with_capacity(256))
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        if !movetext.is_empty() {
            movetext.push(' ');
        }
        if self.ply.is_multiple_of(2) {
            let _ = write!(movetext, "{}. ", self.ply / 2 + 1);
        }
        let _ = write!(movetext, "{san}");
        self.ply += 1;
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        movetext: &mut Self::Movetext,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        let text = String::from_utf8_lossy(comment.as_bytes());
        if !movetext.is_empty() {
            movetext.push(' ');
        }
        let _ = write!(movetext, "{{ {} }}", text.trim());
        ControlFlow::Continue(())
    }

    fn outcome(
        &mut self,
        _movetext: &mut Self::Movetext,
        outcome: Outcome,
    ) -> ControlFlow<Self::Output> {
        self.outcome_marker = Some(outcome.to_string());
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        self.build_game_record(&movetext);
    }
}

/// Reads every game in `input`, in source order.
///
/// A reader-stage error (I/O, truncated compressed stream) fails the whole
/// read; a partial game list is never returned.
pub fn read_games<R: Read>(input: R) -> io::Result<Vec<GameRecord>> {
    let mut reader = Reader::new(input);
    let mut visitor = GameVisitor::new();
    let mut games = Vec::new();

    loop {
        match reader.read_game(&mut visitor) {
            Ok(Some(())) => games.extend(visitor.current_game.take()),
            Ok(None) => return Ok(games),
            Err(error) => {
                let game_number = games.len() + 1;
                tracing::warn!(game = game_number, %error, "PGN reader stopped");
                return Err(io::Error::new(
                    error.kind(),
                    format!("reader error in game #{game_number}: {error}"),
                ));
            }
        }
    }
}
