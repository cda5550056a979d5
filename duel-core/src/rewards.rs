use duel_types::DuelOutcome;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIN_EXPERIENCE: i64 = 100;
pub const DEFAULT_WIN_POINTS: i64 = 30;
pub const DEFAULT_TIE_EXPERIENCE: i64 = 50;
pub const DEFAULT_TIE_POINTS: i64 = 15;
pub const DEFAULT_LOSS_EXPERIENCE: i64 = 25;
pub const DEFAULT_LOSS_POINTS: i64 = 5;
pub const DEFAULT_FORFEIT_EXPERIENCE: i64 = 50;
pub const DEFAULT_FORFEIT_POINTS: i64 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub experience: i64,
    pub points: i64,
}

impl Reward {
    pub const NONE: Reward = Reward {
        experience: 0,
        points: 0,
    };

    pub fn new(experience: i64, points: i64) -> Self {
        Self { experience, points }
    }
}

/// Fixed experience/points credited per duel outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSchedule {
    pub win: Reward,
    pub tie: Reward,
    pub loss: Reward,
    pub forfeit_win: Reward, // challenger whose opponent never answered
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            win: Reward::new(DEFAULT_WIN_EXPERIENCE, DEFAULT_WIN_POINTS),
            tie: Reward::new(DEFAULT_TIE_EXPERIENCE, DEFAULT_TIE_POINTS),
            loss: Reward::new(DEFAULT_LOSS_EXPERIENCE, DEFAULT_LOSS_POINTS),
            forfeit_win: Reward::new(DEFAULT_FORFEIT_EXPERIENCE, DEFAULT_FORFEIT_POINTS),
        }
    }
}

impl RewardSchedule {
    pub fn for_outcome(&self, outcome: DuelOutcome) -> Reward {
        match outcome {
            DuelOutcome::Win => self.win,
            DuelOutcome::Tie => self.tie,
            DuelOutcome::Loss => self.loss,
            DuelOutcome::Pending => Reward::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule_orders_outcomes() {
        let schedule = RewardSchedule::default();
        let win = schedule.for_outcome(DuelOutcome::Win);
        let tie = schedule.for_outcome(DuelOutcome::Tie);
        let loss = schedule.for_outcome(DuelOutcome::Loss);

        assert!(win.experience > tie.experience && tie.experience > loss.experience);
        assert!(win.points > tie.points && tie.points > loss.points);
        assert_eq!(schedule.for_outcome(DuelOutcome::Pending), Reward::NONE);
    }
}
