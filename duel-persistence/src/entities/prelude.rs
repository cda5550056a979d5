pub use super::achievements::Entity as Achievements;
pub use super::duels::Entity as Duels;
pub use super::user_achievements::Entity as UserAchievements;
pub use super::user_points::Entity as UserPoints;
pub use super::user_stats::Entity as UserStats;
