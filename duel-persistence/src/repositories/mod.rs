pub mod achievement_repository;
pub mod duel_repository;
pub mod user_stats_repository;

pub use achievement_repository::AchievementRepository;
pub use duel_repository::DuelRepository;
pub use user_stats_repository::UserStatsRepository;
