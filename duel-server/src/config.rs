use std::env;
use std::str::FromStr;

use duel_core::{Reward, RewardSchedule};

const DEFAULT_RESPONSE_WINDOW_HOURS: i64 = 24;
const MAX_RESPONSE_WINDOW_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// How long an opponent has to answer before the duel is forfeited
    pub response_window_hours: i64,
    pub sweep_interval_minutes: u64,
    /// Shared secret the external scheduler sends on `/internal/sweep`.
    /// The route rejects every call when unset.
    pub scheduler_token: Option<String>,
    pub auth_dev_mode: bool,
    pub auth_issuer: Option<String>,
    pub auth_audience: String,
    pub auth_jwks_url: Option<String>,
    pub rewards: RewardSchedule,
}

impl Config {
    pub fn new() -> Self {
        let defaults = RewardSchedule::default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("PORT", 8080),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://duel_arena.db?mode=rwc".to_string()),
            response_window_hours: response_window_from_env("DUEL_RESPONSE_WINDOW_HOURS"),
            sweep_interval_minutes: env_or("SWEEP_INTERVAL_MINUTES", 60),
            scheduler_token: env::var("SCHEDULER_TOKEN")
                .ok()
                .filter(|token| !token.is_empty()),
            auth_dev_mode: env::var("AUTH_DEV_MODE")
                .map(|value| value == "true" || value == "1")
                .unwrap_or(false),
            auth_issuer: env::var("AUTH_ISSUER").ok(),
            auth_audience: env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "duel-arena".to_string()),
            auth_jwks_url: env::var("AUTH_JWKS_URL").ok(),
            rewards: RewardSchedule {
                win: reward_from_env("WIN", defaults.win),
                tie: reward_from_env("TIE", defaults.tie),
                loss: reward_from_env("LOSS", defaults.loss),
                forfeit_win: reward_from_env("FORFEIT", defaults.forfeit_win),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse `key`, keeping `default` when it is unset or malformed.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}={:?}, using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Windows outside `1..=MAX_RESPONSE_WINDOW_HOURS` fall back to the default.
fn response_window_from_env(key: &str) -> i64 {
    let hours = env_or(key, DEFAULT_RESPONSE_WINDOW_HOURS);

    if !(1..=MAX_RESPONSE_WINDOW_HOURS).contains(&hours) {
        tracing::warn!(
            "{}={} is outside 1..={} hours, using default {}",
            key,
            hours,
            MAX_RESPONSE_WINDOW_HOURS,
            DEFAULT_RESPONSE_WINDOW_HOURS
        );
        return DEFAULT_RESPONSE_WINDOW_HOURS;
    }

    hours
}

/// `<OUTCOME>_EXPERIENCE` / `<OUTCOME>_POINTS`. Negative amounts fall back too.
fn reward_from_env(outcome: &str, default: Reward) -> Reward {
    let experience = env_or(&format!("{}_EXPERIENCE", outcome), default.experience);
    let points = env_or(&format!("{}_POINTS", outcome), default.points);

    if experience < 0 || points < 0 {
        tracing::warn!(
            "Negative {} reward ({} xp, {} points), using defaults",
            outcome.to_lowercase(),
            experience,
            points
        );
        return default;
    }

    Reward::new(experience, points)
}
