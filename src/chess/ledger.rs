use super::error::MalformedGame;
use super::moves::MoveEvent;
use super::timecontrol::Clock;
use super::types::PlayerOutcome;

/// Time budget and usage of one game, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameTime {
    /// Both starting budgets plus every increment earned.
    pub max: u64,
    /// `max` minus both clocks left at the end.
    pub used: u64,
    /// `max` for a loss, `used` otherwise.
    pub scored: u64,
}

/// Accounts one game's clock.
///
/// A side's starting budget is the nominal main time unless its first clock
/// reading is lower (berserk), in which case that reading is the budget.
pub fn game_time(
    clock: Clock,
    events: &[MoveEvent],
    outcome: PlayerOutcome,
) -> Result<GameTime, MalformedGame> {
    let main = i64::from(clock.main_seconds);
    let first_reading = |ply: usize| events.get(ply).map(|e| i64::from(e.clock));
    let white_budget = first_reading(0).map_or(main, |c| c.min(main));
    let black_budget = first_reading(1).map_or(main, |c| c.min(main));

    let (mut clk0, mut clk1) = (white_budget, black_budget);
    for event in events {
        clk0 = clk1;
        clk1 = i64::from(event.clock);
    }

    let plies = events.len() as i64;
    let max = white_budget + black_budget + i64::from(clock.increment_seconds) * plies;
    let used = max - clk0 - clk1;
    if used < 0 {
        return Err(MalformedGame::NegativeTime { used, max });
    }

    let (max, used) = (max as u64, used as u64);
    let scored = match outcome {
        PlayerOutcome::Lost => max,
        PlayerOutcome::Won | PlayerOutcome::Draw => used,
    };

    Ok(GameTime { max, used, scored })
}

/// Running totals over accepted games; both only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeLedger {
    pub used_seconds: u64,
    pub penalized_seconds: u64,
}

impl TimeLedger {
    pub fn record(&mut self, time: &GameTime) {
        self.used_seconds += time.used;
        self.penalized_seconds += time.scored;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{Role, Square};

    const BLITZ: Clock = Clock {
        main_seconds: 180,
        increment_seconds: 2,
    };

    fn events(clocks: &[u32]) -> Vec<MoveEvent> {
        clocks
            .iter()
            .zip(0u32..)
            .map(|(&clock, ply)| MoveEvent {
                ply,
                square: Square::E4,
                role: Role::Pawn,
                promotion: false,
                clock,
            })
            .collect()
    }

    /// 40 plies ending with clk0 = 95, clk1 = 90.
    fn scenario_clocks() -> Vec<u32> {
        let mut clocks = vec![180; 38];
        clocks.extend([95, 90]);
        clocks
    }

    #[test]
    fn test_scenario_loss_scores_full_budget() {
        let time = game_time(BLITZ, &events(&scenario_clocks()), PlayerOutcome::Lost).unwrap();
        assert_eq!(time.max, 440);
        assert_eq!(time.used, 255);
        assert_eq!(time.scored, 440);
    }

    #[test]
    fn test_scenario_win_scores_used_time() {
        let time = game_time(BLITZ, &events(&scenario_clocks()), PlayerOutcome::Won).unwrap();
        assert_eq!(time.max, 440);
        assert_eq!(time.used, 255);
        assert_eq!(time.scored, 255);
    }

    #[test]
    fn test_draw_scores_used_time() {
        let time = game_time(BLITZ, &events(&scenario_clocks()), PlayerOutcome::Draw).unwrap();
        assert_eq!(time.scored, time.used);
    }

    #[test]
    fn test_berserk_lowers_starting_budget() {
        // White berserked: first reading is half of the main time
        let time = game_time(BLITZ, &events(&[90, 180, 85, 170]), PlayerOutcome::Won).unwrap();
        assert_eq!(time.max, 90 + 180 + 2 * 4);
        assert_eq!(time.used, time.max - 85 - 170);
    }

    #[test]
    fn test_first_reading_above_main_keeps_nominal_budget() {
        let time = game_time(BLITZ, &events(&[182, 181]), PlayerOutcome::Won).unwrap();
        assert_eq!(time.max, 360 + 4);
        assert_eq!(time.used, 364 - 182 - 181);
    }

    #[test]
    fn test_no_moves_uses_nothing() {
        let time = game_time(BLITZ, &[], PlayerOutcome::Draw).unwrap();
        assert_eq!(time.max, 360);
        assert_eq!(time.used, 0);
    }

    #[test]
    fn test_single_ply_keeps_black_budget_as_clk0() {
        let time = game_time(BLITZ, &events(&[180]), PlayerOutcome::Won).unwrap();
        assert_eq!(time.max, 362);
        assert_eq!(time.used, 2);
    }

    #[test]
    fn test_negative_time_is_malformed() {
        let err = game_time(
            Clock {
                main_seconds: 60,
                increment_seconds: 0,
            },
            &events(&[60, 60, 500, 500]),
            PlayerOutcome::Won,
        )
        .unwrap_err();

        assert_eq!(err, MalformedGame::NegativeTime { used: -880, max: 120 });
    }

    #[test]
    fn test_ledger_accumulates_both_totals() {
        let mut ledger = TimeLedger::default();
        ledger.record(&GameTime {
            max: 440,
            used: 255,
            scored: 440,
        });
        ledger.record(&GameTime {
            max: 440,
            used: 255,
            scored: 255,
        });

        assert_eq!(ledger.used_seconds, 510);
        assert_eq!(ledger.penalized_seconds, 695);
    }
}
