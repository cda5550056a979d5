use duel_types::{RoundAnswer, SubmittedResult, UserId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("Result is not a valid round list: {0}")]
    MalformedRounds(String),
    #[error("Result contains no rounds")]
    NoRounds,
    #[error("Round {index} has an invalid elapsed time")]
    InvalidElapsedTime { index: usize },
}

pub struct ScoringEngine;

impl ScoringEngine {
    /// Decode a JSON-encoded round list into its structured form and validate
    /// the rounds. Flags are returned unchanged.
    pub fn normalize(result: &SubmittedResult) -> Result<SubmittedResult, ScoringError> {
        match result {
            SubmittedResult::Correct(correct) => Ok(SubmittedResult::Correct(*correct)),
            SubmittedResult::Rounds(rounds) => {
                Self::validate_rounds(rounds)?;
                Ok(SubmittedResult::Rounds(rounds.clone()))
            }
            SubmittedResult::Encoded(encoded) => {
                Ok(SubmittedResult::Rounds(Self::decode_rounds(encoded)?))
            }
        }
    }

    /// Score of a submitted result: 1/0 for a single flag, otherwise the number
    /// of correctly answered rounds.
    pub fn score(result: &SubmittedResult) -> Result<i32, ScoringError> {
        match result {
            SubmittedResult::Correct(correct) => Ok(if *correct { 1 } else { 0 }),
            SubmittedResult::Rounds(rounds) => {
                Self::validate_rounds(rounds)?;
                Ok(Self::count_correct(rounds))
            }
            SubmittedResult::Encoded(encoded) => {
                Ok(Self::count_correct(&Self::decode_rounds(encoded)?))
            }
        }
    }

    /// Higher score wins, equal scores are a tie (`None`).
    pub fn determine_winner(player1: (UserId, i32), player2: (UserId, i32)) -> Option<UserId> {
        let (player1_id, player1_score) = player1;
        let (player2_id, player2_score) = player2;

        match player1_score.cmp(&player2_score) {
            std::cmp::Ordering::Greater => Some(player1_id),
            std::cmp::Ordering::Less => Some(player2_id),
            std::cmp::Ordering::Equal => None,
        }
    }

    fn decode_rounds(encoded: &str) -> Result<Vec<RoundAnswer>, ScoringError> {
        let rounds: Vec<RoundAnswer> = serde_json::from_str(encoded)
            .map_err(|e| ScoringError::MalformedRounds(e.to_string()))?;
        Self::validate_rounds(&rounds)?;
        Ok(rounds)
    }

    fn count_correct(rounds: &[RoundAnswer]) -> i32 {
        rounds.iter().filter(|round| round.correct).count() as i32
    }

    fn validate_rounds(rounds: &[RoundAnswer]) -> Result<(), ScoringError> {
        if rounds.is_empty() {
            return Err(ScoringError::NoRounds);
        }

        for (index, round) in rounds.iter().enumerate() {
            if !round.elapsed_time.is_finite() || round.elapsed_time < 0.0 {
                return Err(ScoringError::InvalidElapsedTime { index });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn round(correct: bool) -> RoundAnswer {
        RoundAnswer {
            answer: Some("answer".to_string()),
            elapsed_time: 3.5,
            correct,
        }
    }

    #[test]
    fn test_single_flag_scores_one_or_zero() {
        assert_eq!(ScoringEngine::score(&SubmittedResult::Correct(true)), Ok(1));
        assert_eq!(ScoringEngine::score(&SubmittedResult::Correct(false)), Ok(0));
    }

    #[test]
    fn test_round_list_counts_correct_rounds() {
        let result = SubmittedResult::Rounds(vec![round(true), round(false), round(true)]);
        assert_eq!(ScoringEngine::score(&result), Ok(2));
    }

    #[test]
    fn test_encoded_round_list_is_decoded() {
        let encoded = r#"[{"answer":"Brady","elapsedTime":2.0,"correct":true},
                          {"answer":null,"elapsedTime":10.0,"correct":false}]"#;
        let result = SubmittedResult::Encoded(encoded.to_string());

        assert_eq!(ScoringEngine::score(&result), Ok(1));
        match ScoringEngine::normalize(&result).unwrap() {
            SubmittedResult::Rounds(rounds) => assert_eq!(rounds.len(), 2),
            other => panic!("Expected decoded rounds, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_encoded_rounds_rejected() {
        let result = SubmittedResult::Encoded("{not json".to_string());
        assert!(matches!(
            ScoringEngine::score(&result),
            Err(ScoringError::MalformedRounds(_))
        ));
    }

    #[test]
    fn test_empty_round_list_rejected() {
        assert_eq!(
            ScoringEngine::score(&SubmittedResult::Rounds(Vec::new())),
            Err(ScoringError::NoRounds)
        );
        assert_eq!(
            ScoringEngine::score(&SubmittedResult::Encoded("[]".to_string())),
            Err(ScoringError::NoRounds)
        );
    }

    #[test]
    fn test_negative_elapsed_time_rejected() {
        let mut bad = round(true);
        bad.elapsed_time = -1.0;
        let result = SubmittedResult::Rounds(vec![round(true), bad]);

        assert_eq!(
            ScoringEngine::score(&result),
            Err(ScoringError::InvalidElapsedTime { index: 1 })
        );
    }

    #[test]
    fn test_determine_winner() {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        assert_eq!(ScoringEngine::determine_winner((alice, 4), (bob, 2)), Some(alice));
        assert_eq!(ScoringEngine::determine_winner((alice, 1), (bob, 3)), Some(bob));
        assert_eq!(ScoringEngine::determine_winner((alice, 2), (bob, 2)), None);
    }
}
