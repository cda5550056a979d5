#![allow(dead_code)]

use duel_types::{
    AchievementDefinition, Duel, DuelStatus, RoundAnswer, SideResult, SportCategory,
    SubmittedResult, UserStats,
};
use uuid::Uuid;

/// Creates an open duel between two fresh players
pub fn create_test_duel() -> Duel {
    Duel {
        id: Uuid::new_v4(),
        player1_id: Uuid::new_v4(),
        player2_id: Some(Uuid::new_v4()),
        sport: SportCategory::Basketball,
        status: DuelStatus::WaitingForP2,
        player1: None,
        player2: None,
        winner_id: None,
        player1_reward_applied: false,
        player2_reward_applied: false,
        expires_at: "2026-01-02T00:00:00+00:00".to_string(),
        created_at: "2026-01-01T00:00:00+00:00".to_string(),
    }
}

/// Creates a round list with `correct` right answers out of `total`
pub fn create_rounds(correct: usize, total: usize) -> SubmittedResult {
    let rounds = (0..total)
        .map(|i| RoundAnswer {
            answer: Some(format!("answer-{}", i)),
            elapsed_time: 2.5 + i as f64,
            correct: i < correct,
        })
        .collect();
    SubmittedResult::Rounds(rounds)
}

/// Creates a recorded side with the given score
pub fn create_side(score: i32) -> SideResult {
    SideResult {
        result: Some(create_rounds(score as usize, 5)),
        score: Some(score),
        completed_at: "2026-01-01T12:00:00+00:00".to_string(),
    }
}

pub fn create_stats(duels_played: i64, duels_won: i64, experience: i64) -> UserStats {
    UserStats {
        user_id: Uuid::new_v4(),
        experience,
        level: duel_core::level_for_experience(experience),
        duels_played,
        duels_won,
    }
}

/// The achievement set the migration seeds
pub fn create_default_definitions() -> Vec<AchievementDefinition> {
    [
        (1, "First Victory", 50, "duel_wins:1"),
        (2, "Duelist", 25, "duels_played:1"),
        (3, "Seasoned Duelist", 100, "duels_played:25"),
        (4, "Champion", 250, "duel_wins:10"),
        (5, "Rising Star", 75, "level:3"),
    ]
    .into_iter()
    .map(|(id, name, experience_reward, condition)| AchievementDefinition {
        id,
        name: name.to_string(),
        experience_reward,
        condition: condition.to_string(),
    })
    .collect()
}
