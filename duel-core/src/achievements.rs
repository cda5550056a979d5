use std::collections::HashSet;
use std::str::FromStr;

use duel_types::{AchievementDefinition, UserStats};

/// Predicate behind an achievement definition's condition identifier.
///
/// Identifiers have the form `<counter>:<threshold>`, e.g. `duel_wins:10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementCondition {
    DuelWins(i64),
    DuelsPlayed(i64),
    ReachLevel(i32),
}

impl AchievementCondition {
    pub fn is_satisfied(&self, stats: &UserStats) -> bool {
        match *self {
            AchievementCondition::DuelWins(wins) => stats.duels_won >= wins,
            AchievementCondition::DuelsPlayed(played) => stats.duels_played >= played,
            AchievementCondition::ReachLevel(level) => stats.level >= level,
        }
    }
}

impl FromStr for AchievementCondition {
    type Err = String;

    fn from_str(identifier: &str) -> Result<Self, Self::Err> {
        let (counter, threshold) = identifier
            .split_once(':')
            .ok_or_else(|| format!("Condition '{}' has no threshold", identifier))?;
        let threshold = threshold.trim();

        let invalid = |_| format!("Condition '{}' has an invalid threshold", identifier);
        match counter.trim() {
            "duel_wins" => Ok(AchievementCondition::DuelWins(threshold.parse().map_err(invalid)?)),
            "duels_played" => Ok(AchievementCondition::DuelsPlayed(
                threshold.parse().map_err(invalid)?,
            )),
            "level" => Ok(AchievementCondition::ReachLevel(threshold.parse().map_err(invalid)?)),
            other => Err(format!("Unknown achievement counter '{}'", other)),
        }
    }
}

/// Definitions not yet in `unlocked` whose condition holds for `stats`.
/// Definitions with an unparseable condition never qualify.
pub fn qualifying_achievements<'a>(
    definitions: &'a [AchievementDefinition],
    unlocked: &HashSet<i32>,
    stats: &UserStats,
) -> Vec<&'a AchievementDefinition> {
    definitions
        .iter()
        .filter(|definition| !unlocked.contains(&definition.id))
        .filter(|definition| match definition.condition.parse::<AchievementCondition>() {
            Ok(condition) => condition.is_satisfied(stats),
            Err(reason) => {
                tracing::warn!("Skipping achievement '{}': {}", definition.name, reason);
                false
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn definition(id: i32, name: &str, condition: &str) -> AchievementDefinition {
        AchievementDefinition {
            id,
            name: name.to_string(),
            experience_reward: 10,
            condition: condition.to_string(),
        }
    }

    fn stats(duels_played: i64, duels_won: i64, level: i32) -> UserStats {
        UserStats {
            user_id: Uuid::new_v4(),
            experience: 0,
            level,
            duels_played,
            duels_won,
        }
    }

    #[test]
    fn test_parse_conditions() {
        assert_eq!(
            "duel_wins:10".parse::<AchievementCondition>(),
            Ok(AchievementCondition::DuelWins(10))
        );
        assert_eq!(
            "duels_played:1".parse::<AchievementCondition>(),
            Ok(AchievementCondition::DuelsPlayed(1))
        );
        assert_eq!(
            "level:5".parse::<AchievementCondition>(),
            Ok(AchievementCondition::ReachLevel(5))
        );
        assert!("streak:3".parse::<AchievementCondition>().is_err());
        assert!("duel_wins".parse::<AchievementCondition>().is_err());
        assert!("duel_wins:many".parse::<AchievementCondition>().is_err());
    }

    #[test]
    fn test_qualifying_skips_unlocked_and_unknown() {
        let definitions = vec![
            definition(1, "First Blood", "duel_wins:1"),
            definition(2, "Regular", "duels_played:5"),
            definition(3, "Mystery", "streak:3"),
            definition(4, "Rookie", "duels_played:1"),
        ];
        let unlocked: HashSet<i32> = [4].into_iter().collect();

        let qualifying = qualifying_achievements(&definitions, &unlocked, &stats(2, 1, 1));
        let names: Vec<_> = qualifying.iter().map(|d| d.name.as_str()).collect();

        assert_eq!(names, vec!["First Blood"]);
    }
}
