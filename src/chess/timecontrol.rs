use std::error::Error;
use std::fmt;

/// One `[moves/]base[+increment]` stage of a time control, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub moves: Option<u32>,
    pub base_seconds: u32,
    pub increment_seconds: u32,
}

/// A PGN `TimeControl` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeControl {
    /// `?`
    Unknown,
    /// `-`
    Untimed,
    /// `*N`: N seconds per move.
    Sandclock(u32),
    Stages(Vec<Stage>),
}

/// The `base+increment` clock a game is accounted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub main_seconds: u32,
    pub increment_seconds: u32,
}

#[derive(Debug, Clone)]
pub struct TimeControlError {
    pub message: String,
}

impl fmt::Display for TimeControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for TimeControlError {}

fn number(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}

fn parse_stage(s: &str) -> Option<Stage> {
    let (head, increment) = match s.split_once('+') {
        Some((head, inc)) => (head, number(inc)?),
        None => (s, 0),
    };
    let (moves, base) = match head.split_once('/') {
        Some((moves, base)) => (Some(number(moves)?), base),
        None => (None, head),
    };

    Some(Stage {
        moves,
        base_seconds: number(base)?,
        increment_seconds: increment,
    })
}

/// Parses a PGN `TimeControl` value. Values are seconds, as lichess writes
/// them (`180+2`, `-`, `40/5400+30:1800+30`); no minute inference.
pub fn parse_timecontrol(raw: &str) -> Result<TimeControl, TimeControlError> {
    let input = raw.trim();
    match input {
        "" => {
            return Err(TimeControlError {
                message: "empty time control".to_string(),
            });
        }
        "?" => return Ok(TimeControl::Unknown),
        "-" => return Ok(TimeControl::Untimed),
        _ => {}
    }

    if let Some(secs) = input.strip_prefix('*').and_then(number) {
        return Ok(TimeControl::Sandclock(secs));
    }

    input
        .split(':')
        .map(parse_stage)
        .collect::<Option<Vec<_>>>()
        .map(TimeControl::Stages)
        .ok_or_else(|| TimeControlError {
            message: format!("unparseable time control '{input}'"),
        })
}

impl TimeControl {
    pub fn is_untimed(&self) -> bool {
        matches!(self, Self::Untimed)
    }

    /// The single sudden-death stage, if that is what this control is.
    pub fn clock(&self) -> Option<Clock> {
        match self {
            Self::Stages(stages) => match stages.as_slice() {
                [stage] if stage.moves.is_none() => Some(Clock {
                    main_seconds: stage.base_seconds,
                    increment_seconds: stage.increment_seconds,
                }),
                _ => None,
            },
            _ => None,
        }
    }

    /// Lichess speed bucket from the first stage's estimated duration
    /// (`base + 40 * increment`).
    pub fn speed(&self) -> Option<&'static str> {
        let Self::Stages(stages) = self else {
            return None;
        };
        let first = stages.first()?;
        let estimated = u64::from(first.base_seconds) + 40 * u64::from(first.increment_seconds);

        Some(match estimated {
            0..=29 => "ultra-bullet",
            30..=179 => "bullet",
            180..=479 => "blitz",
            480..=1499 => "rapid",
            _ => "classical",
        })
    }
}

impl fmt::Display for TimeControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "?"),
            Self::Untimed => write!(f, "-"),
            Self::Sandclock(secs) => write!(f, "*{secs}"),
            Self::Stages(stages) => {
                for (i, stage) in stages.iter().enumerate() {
                    if i > 0 {
                        write!(f, ":")?;
                    }
                    if let Some(moves) = stage.moves {
                        write!(f, "{moves}/")?;
                    }
                    write!(f, "{}+{}", stage.base_seconds, stage.increment_seconds)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lichess_blitz() {
        let tc = parse_timecontrol("180+2").unwrap();
        assert_eq!(
            tc.clock(),
            Some(Clock {
                main_seconds: 180,
                increment_seconds: 2
            })
        );
        assert_eq!(tc.to_string(), "180+2");
    }

    #[test]
    fn test_small_values_stay_seconds() {
        // ultra-bullet is written 15+0: fifteen seconds
        let tc = parse_timecontrol("15+0").unwrap();
        assert_eq!(tc.clock().map(|c| c.main_seconds), Some(15));
    }

    #[test]
    fn test_missing_increment_is_zero_and_spaces_are_tolerated() {
        let tc = parse_timecontrol(" 600 ").unwrap();
        assert_eq!(tc.clock().map(|c| c.increment_seconds), Some(0));
        assert_eq!(parse_timecontrol("600 + 5").unwrap().to_string(), "600+5");
    }

    #[test]
    fn test_parse_dash_is_untimed() {
        let tc = parse_timecontrol("-").unwrap();
        assert!(tc.is_untimed());
        assert_eq!(tc.clock(), None);
    }

    #[test]
    fn test_unknown_and_sandclock_have_no_clock() {
        assert_eq!(parse_timecontrol("?").unwrap(), TimeControl::Unknown);
        let tc = parse_timecontrol("*60").unwrap();
        assert_eq!(tc, TimeControl::Sandclock(60));
        assert_eq!(tc.clock(), None);
        assert!(!tc.is_untimed());
    }

    #[test]
    fn test_parse_multi_stage_has_no_accounting_clock() {
        let tc = parse_timecontrol("40/5400+30:1800+30").unwrap();
        assert_eq!(tc.to_string(), "40/5400+30:1800+30");
        assert_eq!(tc.clock(), None);
    }

    #[test]
    fn test_parse_rejects_garbage_and_empty() {
        assert!(parse_timecontrol("klassisch").is_err());
        assert!(parse_timecontrol("x/600+5").is_err());
        assert!(parse_timecontrol("180+").is_err());
        assert!(parse_timecontrol("   ").is_err());
    }

    #[test]
    fn test_speed_threshold_boundaries() {
        let speed = |raw: &str| parse_timecontrol(raw).ok().and_then(|tc| tc.speed());

        assert_eq!(speed("15+0"), Some("ultra-bullet"));
        assert_eq!(speed("60+0"), Some("bullet"));
        assert_eq!(speed("180+0"), Some("blitz"));
        assert_eq!(speed("180+2"), Some("blitz"));
        assert_eq!(speed("480+0"), Some("rapid"));
        assert_eq!(speed("1500+0"), Some("classical"));
        assert_eq!(speed("-"), None);
    }
}
