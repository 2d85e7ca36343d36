use chrono::{DateTime, Utc};
use shakmaty::Color;
use std::fmt::Write;

/// One played game as read from PGN.
///
/// `tags` keeps every header in source order so the record can be written
/// back unchanged; the typed fields mirror the headers the engine reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameRecord {
    pub tags: Vec<(String, String)>,

    pub site: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,
    pub variant: Option<String>,
    pub time_control: Option<String>,
    pub white_rating_diff: Option<String>,
    pub black_rating_diff: Option<String>,

    /// `UTCDate` + `UTCTime`.
    pub played_at: Option<DateTime<Utc>>,

    /// Mainline movetext with move numbers and `{ ... }` comments; variations
    /// and NAGs are dropped, the result marker is not included.
    pub movetext: String,

    /// NULL for cleanly parsed games, otherwise the joined diagnostics.
    pub parse_error: Option<String>,
}

/// Result from White's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
}

impl GameResult {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1-0" => Some(Self::WhiteWins),
            "0-1" => Some(Self::BlackWins),
            "1/2-1/2" => Some(Self::Draw),
            _ => None,
        }
    }

    pub fn for_side(self, side: Color) -> PlayerOutcome {
        match (self, side) {
            (Self::Draw, _) => PlayerOutcome::Draw,
            (Self::WhiteWins, Color::White) | (Self::BlackWins, Color::Black) => PlayerOutcome::Won,
            _ => PlayerOutcome::Lost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerOutcome {
    Won,
    Lost,
    Draw,
}

impl GameRecord {
    /// Last path segment of the `Site` tag, e.g. `abcd1234` for
    /// `https://lichess.org/abcd1234`.
    pub fn id(&self) -> Option<&str> {
        let site = self.site.as_deref()?.trim().trim_end_matches('/');
        let token = site.rsplit('/').next()?;
        if token.is_empty() { None } else { Some(token) }
    }

    /// The side `username` played, compared ASCII case-insensitively.
    pub fn side_of(&self, username: &str) -> Option<Color> {
        let matches = |name: &Option<String>| {
            name.as_deref()
                .is_some_and(|n| n.trim().eq_ignore_ascii_case(username.trim()))
        };

        if matches(&self.white) {
            Some(Color::White)
        } else if matches(&self.black) {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn game_result(&self) -> Option<GameResult> {
        self.result.as_deref().and_then(GameResult::parse)
    }

    pub fn outcome_for(&self, side: Color) -> Option<PlayerOutcome> {
        self.game_result().map(|r| r.for_side(side))
    }

    /// A post-game rating adjustment is present for either player.
    pub fn has_rating_diff(&self) -> bool {
        self.white_rating_diff.is_some() || self.black_rating_diff.is_some()
    }

    /// Serializes the record as one PGN game block terminated by a blank line.
    pub fn to_pgn(&self) -> String {
        let mut out = String::with_capacity(self.movetext.len() + 64 * self.tags.len());
        for (key, value) in &self.tags {
            let _ = writeln!(out, "[{key} \"{value}\"]");
        }
        out.push('\n');

        out.push_str(&self.movetext);
        let result = self.result.as_deref().unwrap_or("*");
        if !self.movetext.is_empty() {
            out.push(' ');
        }
        out.push_str(result);
        out.push_str("\n\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_site(site: &str) -> GameRecord {
        GameRecord {
            site: Some(site.to_string()),
            ..GameRecord::default()
        }
    }

    #[test]
    fn test_id_is_last_site_segment() {
        assert_eq!(
            record_with_site("https://lichess.org/abcd1234").id(),
            Some("abcd1234")
        );
        assert_eq!(
            record_with_site("https://lichess.org/abcd1234/").id(),
            Some("abcd1234")
        );
        assert_eq!(record_with_site("abcd1234").id(), Some("abcd1234"));
        assert_eq!(record_with_site("").id(), None);
        assert_eq!(GameRecord::default().id(), None);
    }

    #[test]
    fn test_side_of_is_case_insensitive() {
        let record = GameRecord {
            white: Some("CLSmith15".to_string()),
            black: Some("opponent".to_string()),
            ..GameRecord::default()
        };

        assert_eq!(record.side_of("clsmith15"), Some(Color::White));
        assert_eq!(record.side_of("Opponent"), Some(Color::Black));
        assert_eq!(record.side_of("someone"), None);
    }

    #[test]
    fn test_outcome_for_each_side() {
        assert_eq!(
            GameResult::WhiteWins.for_side(Color::White),
            PlayerOutcome::Won
        );
        assert_eq!(
            GameResult::WhiteWins.for_side(Color::Black),
            PlayerOutcome::Lost
        );
        assert_eq!(
            GameResult::BlackWins.for_side(Color::White),
            PlayerOutcome::Lost
        );
        assert_eq!(GameResult::Draw.for_side(Color::Black), PlayerOutcome::Draw);
        assert_eq!(GameResult::parse("*"), None);
    }

    #[test]
    fn test_to_pgn_writes_tags_movetext_and_result() {
        let record = GameRecord {
            tags: vec![
                ("Site".to_string(), "https://lichess.org/x".to_string()),
                ("Result".to_string(), "1-0".to_string()),
            ],
            result: Some("1-0".to_string()),
            movetext: "1. e4 { [%clk 0:03:00] }".to_string(),
            ..GameRecord::default()
        };

        assert_eq!(
            record.to_pgn(),
            "[Site \"https://lichess.org/x\"]\n[Result \"1-0\"]\n\n1. e4 { [%clk 0:03:00] } 1-0\n\n"
        );
    }
}
