use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::rewards::RewardDispatcher;
use duel_persistence::repositories::DuelRepository;
use duel_types::{Duel, SweepError, SweepReport};

/// Forfeits open duels whose opponent let the response window lapse.
pub struct ExpirationSweeper {
    duels: Arc<DuelRepository>,
    rewards: Arc<RewardDispatcher>,
}

impl ExpirationSweeper {
    pub fn new(duels: Arc<DuelRepository>, rewards: Arc<RewardDispatcher>) -> Self {
        Self { duels, rewards }
    }

    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(Utc::now()).await
    }

    /// One pass over duels overdue at `now`. A failing duel is recorded in the
    /// report and the pass moves on; only the initial scan can fail the pass.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let candidates = self.duels.find_expired_open(now).await?;
        let mut report = SweepReport {
            total_found: candidates.len() as u32,
            ..SweepReport::default()
        };

        for duel in candidates {
            match self.forfeit(&duel, now).await {
                Ok(true) => report.processed_count += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to expire duel {}: {:#}", duel.id, e);
                    report.errors.push(SweepError {
                        duel_id: duel.id,
                        message: format!("{:#}", e),
                    });
                }
            }
        }

        info!(
            "Expiration sweep: {} of {} overdue duels forfeited, {} errors",
            report.processed_count,
            report.total_found,
            report.errors.len()
        );
        Ok(report)
    }

    /// `Ok(false)` when a late submission or a concurrent sweep got there first.
    async fn forfeit(&self, duel: &Duel, now: DateTime<Utc>) -> Result<bool> {
        if !self.duels.expire_duel(duel.id, now).await? {
            debug!("Duel {} changed before it could be expired, skipping", duel.id);
            return Ok(false);
        }

        let reward = self.rewards.schedule().forfeit_win;
        let applied = self
            .rewards
            .credit(duel.player1_id, reward, duel.sport, true)
            .await?;

        info!(
            "Duel {} expired, challenger {} awarded {} xp by forfeit{}",
            duel.id,
            duel.player1_id,
            applied.reward.experience,
            if applied.unlocked.is_empty() {
                String::new()
            } else {
                format!(" and unlocked {}", applied.unlocked.join(", "))
            }
        );
        Ok(true)
    }
}
