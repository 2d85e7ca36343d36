use super::timecontrol::parse_timecontrol;
use super::types::GameRecord;
use std::fmt;

/// Why a game is left out of all accounting. Not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Variant(String),
    Untimed,
    Unrated,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variant(name) => write!(f, "non-standard variant '{name}'"),
            Self::Untimed => write!(f, "untimed game"),
            Self::Unrated => write!(f, "no rating adjustment (aborted or casual)"),
        }
    }
}

fn is_standard_variant(variant: Option<&str>) -> bool {
    match variant.map(str::trim) {
        None | Some("") => true,
        Some(name) => name.eq_ignore_ascii_case("standard"),
    }
}

fn is_untimed(time_control: Option<&str>) -> bool {
    match time_control {
        None => true,
        Some(raw) => parse_timecontrol(raw).is_ok_and(|tc| tc.is_untimed()),
    }
}

/// Filter policy: standard variant, timed, and carrying a rating adjustment.
///
/// A time control that fails to parse passes the filter; the decoder
/// reports it as malformed.
pub fn check_game(record: &GameRecord) -> Result<(), SkipReason> {
    if !is_standard_variant(record.variant.as_deref()) {
        let name = record.variant.clone().unwrap_or_default();
        return Err(SkipReason::Variant(name));
    }

    if is_untimed(record.time_control.as_deref()) {
        return Err(SkipReason::Untimed);
    }

    if !record.has_rating_diff() {
        return Err(SkipReason::Unrated);
    }

    Ok(())
}
