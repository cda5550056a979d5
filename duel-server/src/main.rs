use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use duel_persistence::{
    connection::connect_and_migrate,
    repositories::{AchievementRepository, DuelRepository, UserStatsRepository},
};
use duel_server::{
    achievements::AchievementEvaluator, auth::AuthService, config::Config, create_routes,
    duel_resolver::DuelResolver, rewards::RewardDispatcher, sweeper::ExpirationSweeper,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting duel arena server...");

    let config = Config::new();

    let db = match connect_and_migrate(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };

    let duel_repository = Arc::new(DuelRepository::new(db.clone()));
    let stats_repository = Arc::new(UserStatsRepository::new(db.clone()));
    let achievement_repository = Arc::new(AchievementRepository::new(db));

    let evaluator = Arc::new(AchievementEvaluator::new(
        achievement_repository.clone(),
        stats_repository.clone(),
    ));
    let rewards = Arc::new(RewardDispatcher::new(
        stats_repository.clone(),
        evaluator,
        config.rewards,
    ));
    let resolver = Arc::new(DuelResolver::new(
        duel_repository.clone(),
        rewards.clone(),
        chrono::Duration::hours(config.response_window_hours),
    ));
    let sweeper = Arc::new(ExpirationSweeper::new(duel_repository, rewards));

    let auth_service = if config.auth_dev_mode {
        info!("Starting in development authentication mode - JWT validation disabled");
        Arc::new(AuthService::new_dev_mode())
    } else {
        let Some(jwks_url) = config.auth_jwks_url.clone() else {
            error!("AUTH_JWKS_URL must be set unless AUTH_DEV_MODE=true");
            std::process::exit(1);
        };
        Arc::new(AuthService::new(
            jwks_url,
            config.auth_audience.clone(),
            config.auth_issuer.clone(),
        ))
    };

    if config.scheduler_token.is_none() {
        info!("SCHEDULER_TOKEN not set, /internal/sweep is disabled");
    }

    let routes = create_routes(
        resolver,
        sweeper.clone(),
        stats_repository,
        achievement_repository,
        auth_service,
        config.scheduler_token.clone(),
    );

    // In-process expiration sweep; the scheduler endpoint can run it too
    let sweep_interval = Duration::from_secs(config.sweep_interval_minutes.max(1) * 60);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            if let Err(e) = sweeper.sweep().await {
                error!("Expiration sweep failed: {:#}", e);
            }
        }
    });

    let ip = match config.host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip,
        Err(e) => {
            error!("Invalid HOST '{}': {}", config.host, e);
            std::process::exit(1);
        }
    };

    info!("Server starting on {}:{}", config.host, config.port);

    let (addr, server) =
        warp::serve(routes).bind_with_graceful_shutdown((ip, config.port), shutdown_signal());

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal as unix_signal};

        match (
            unix_signal(SignalKind::interrupt()),
            unix_signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("Received SIGINT, shutting down gracefully...");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down gracefully...");
                    }
                }
            }
            _ => {
                error!("Failed to install signal handlers, falling back to Ctrl+C");
                if signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down gracefully...");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
