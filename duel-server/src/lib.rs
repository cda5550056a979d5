use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use warp::Filter;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;

use crate::auth::{AuthService, AuthenticatedUser};
use crate::duel_resolver::DuelResolver;
use crate::error::DuelError;
use crate::sweeper::ExpirationSweeper;
use duel_core::experience_for_level;
use duel_persistence::repositories::{AchievementRepository, UserStatsRepository};
use duel_types::{
    CreateDuelRequest, Duel, DuelView, LeaderboardEntry, PointsCategory, SportCategory,
    SubmitResultRequest, SubmitResultResponse, SweepReport, TimeWindow, UserStatsResponse,
};

pub mod achievements;
pub mod auth;
pub mod config;
pub mod duel_resolver;
pub mod error;
pub mod rewards;
pub mod sweeper;

const MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Deserialize)]
struct LeaderboardQuery {
    window: Option<String>,
    sport: Option<String>,
    limit: Option<u64>,
}

pub fn create_routes(
    resolver: Arc<DuelResolver>,
    sweeper: Arc<ExpirationSweeper>,
    stats_repository: Arc<UserStatsRepository>,
    achievement_repository: Arc<AchievementRepository>,
    auth_service: Arc<AuthService>,
    scheduler_token: Option<String>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let resolver_filter = warp::any().map({
        let resolver = resolver.clone();
        move || resolver.clone()
    });

    let sweeper_filter = warp::any().map({
        let sweeper = sweeper.clone();
        move || sweeper.clone()
    });

    let stats_filter = warp::any().map({
        let stats_repository = stats_repository.clone();
        move || stats_repository.clone()
    });

    let achievements_filter = warp::any().map({
        let achievement_repository = achievement_repository.clone();
        move || achievement_repository.clone()
    });

    let auth_filter = warp::any().map({
        let auth_service = auth_service.clone();
        move || auth_service.clone()
    });

    let scheduler_token_filter = warp::any().map(move || scheduler_token.clone());

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let submit_result = warp::path!("duels" / String / "result")
        .and(warp::post())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and(resolver_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_submit_result);

    let create_duel = warp::path!("duels")
        .and(warp::post())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::bytes())
        .and(resolver_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_create_duel);

    let view_duel = warp::path!("duels" / String)
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(resolver_filter.clone())
        .and(auth_filter.clone())
        .and_then(handle_view_duel);

    // Called by the external scheduler, not by players
    let sweep = warp::path!("internal" / "sweep")
        .and(warp::post())
        .and(warp::header::optional::<String>("x-scheduler-token"))
        .and(scheduler_token_filter)
        .and(sweeper_filter)
        .and_then(handle_sweep);

    let user_stats = warp::path!("users" / String / "stats")
        .and(warp::get())
        .and(warp::header::optional::<String>("authorization"))
        .and(stats_filter.clone())
        .and(achievements_filter)
        .and(auth_filter.clone())
        .and_then(handle_user_stats_request);

    let leaderboard = warp::path("leaderboard")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<LeaderboardQuery>())
        .and(stats_filter)
        .and_then(handle_leaderboard_request);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization"])
        .allow_methods(vec!["GET", "POST"]);

    health
        .or(submit_result)
        .or(create_duel)
        .or(view_duel)
        .or(sweep)
        .or(user_stats)
        .or(leaderboard)
        .with(cors)
        .with(warp::log("duel_arena"))
}

fn reply_json<T: Serialize>(
    body: &T,
    status: StatusCode,
) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(body), status)
}

fn reply_result<T: Serialize>(
    result: Result<T, DuelError>,
    status: StatusCode,
) -> warp::reply::WithStatus<warp::reply::Json> {
    match result {
        Ok(body) => reply_json(&body, status),
        Err(err) => {
            match &err {
                DuelError::Persistence(_) => tracing::error!("Request failed: {}", err),
                _ => tracing::debug!("Request rejected: {}", err),
            }
            reply_json(&err.to_api_error(), err.status())
        }
    }
}

async fn authenticate(
    auth_header: Option<String>,
    auth_service: &AuthService,
) -> Result<AuthenticatedUser, DuelError> {
    let auth_header = auth_header
        .ok_or_else(|| DuelError::Unauthorized("missing bearer token".to_string()))?;
    let token = auth_header.strip_prefix("Bearer ").unwrap_or(&auth_header);

    Ok(auth_service.validate_token(token).await?)
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, DuelError> {
    Uuid::parse_str(raw).map_err(|_| DuelError::InvalidRequest(format!("Invalid {} ID format", what)))
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, DuelError> {
    serde_json::from_slice(body).map_err(|e| DuelError::InvalidRequest(e.to_string()))
}

async fn handle_submit_result(
    duel_id: String,
    auth_header: Option<String>,
    body: Bytes,
    resolver: Arc<DuelResolver>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = submit_result(&duel_id, auth_header, &body, &resolver, &auth_service).await;
    Ok(reply_result(result, StatusCode::OK))
}

async fn submit_result(
    duel_id: &str,
    auth_header: Option<String>,
    body: &[u8],
    resolver: &DuelResolver,
    auth_service: &AuthService,
) -> Result<SubmitResultResponse, DuelError> {
    let user = authenticate(auth_header, auth_service).await?;
    let duel_id = parse_id(duel_id, "duel")?;
    let request: SubmitResultRequest = parse_body(body)?;

    resolver
        .submit_result(duel_id, user.id, request.role, request.result)
        .await
}

async fn handle_create_duel(
    auth_header: Option<String>,
    body: Bytes,
    resolver: Arc<DuelResolver>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = create_duel(auth_header, &body, &resolver, &auth_service).await;
    Ok(reply_result(result, StatusCode::CREATED))
}

async fn create_duel(
    auth_header: Option<String>,
    body: &[u8],
    resolver: &DuelResolver,
    auth_service: &AuthService,
) -> Result<Duel, DuelError> {
    let user = authenticate(auth_header, auth_service).await?;
    let request: CreateDuelRequest = parse_body(body)?;

    resolver.create_duel(user.id, request).await
}

async fn handle_view_duel(
    duel_id: String,
    auth_header: Option<String>,
    resolver: Arc<DuelResolver>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = view_duel(&duel_id, auth_header, &resolver, &auth_service).await;
    Ok(reply_result(result, StatusCode::OK))
}

async fn view_duel(
    duel_id: &str,
    auth_header: Option<String>,
    resolver: &DuelResolver,
    auth_service: &AuthService,
) -> Result<DuelView, DuelError> {
    let user = authenticate(auth_header, auth_service).await?;
    let duel_id = parse_id(duel_id, "duel")?;

    resolver.view_duel(duel_id, user.id).await
}

async fn handle_sweep(
    provided_token: Option<String>,
    scheduler_token: Option<String>,
    sweeper: Arc<ExpirationSweeper>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = sweep(provided_token, scheduler_token, &sweeper).await;
    Ok(reply_result(result, StatusCode::OK))
}

async fn sweep(
    provided_token: Option<String>,
    scheduler_token: Option<String>,
    sweeper: &ExpirationSweeper,
) -> Result<SweepReport, DuelError> {
    let Some(expected) = scheduler_token else {
        return Err(DuelError::Forbidden(
            "Sweep endpoint is disabled".to_string(),
        ));
    };
    if provided_token.as_deref() != Some(expected.as_str()) {
        tracing::warn!("Rejected sweep request with missing or wrong scheduler token");
        return Err(DuelError::Unauthorized(
            "invalid scheduler token".to_string(),
        ));
    }

    Ok(sweeper.sweep().await?)
}

async fn handle_user_stats_request(
    user_id: String,
    auth_header: Option<String>,
    stats_repository: Arc<UserStatsRepository>,
    achievement_repository: Arc<AchievementRepository>,
    auth_service: Arc<AuthService>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = user_stats(
        &user_id,
        auth_header,
        &stats_repository,
        &achievement_repository,
        &auth_service,
    )
    .await;
    Ok(reply_result(result, StatusCode::OK))
}

async fn user_stats(
    user_id: &str,
    auth_header: Option<String>,
    stats_repository: &UserStatsRepository,
    achievement_repository: &AchievementRepository,
    auth_service: &AuthService,
) -> Result<UserStatsResponse, DuelError> {
    let user = authenticate(auth_header, auth_service).await?;
    let user_id = parse_id(user_id, "user")?;

    // Only allow users to view their own stats
    if user.id != user_id {
        return Err(DuelError::Forbidden(
            "Not authorized to view this user's stats".to_string(),
        ));
    }

    let stats = stats_repository.stats_or_empty(user_id).await?;
    let points = stats_repository.points_for_user(user_id).await?;
    let achievements = achievement_repository.unlocked_for_user(user_id).await?;

    Ok(UserStatsResponse {
        next_level_experience: experience_for_level(stats.level + 1),
        stats,
        points,
        achievements,
    })
}

async fn handle_leaderboard_request(
    query: LeaderboardQuery,
    stats_repository: Arc<UserStatsRepository>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = leaderboard(query, &stats_repository).await;
    Ok(reply_result(result, StatusCode::OK))
}

async fn leaderboard(
    query: LeaderboardQuery,
    stats_repository: &UserStatsRepository,
) -> Result<Vec<LeaderboardEntry>, DuelError> {
    let window = match query.window.as_deref() {
        Some(raw) => raw.parse::<TimeWindow>().map_err(DuelError::InvalidRequest)?,
        None => TimeWindow::AllTime,
    };
    let sport = query
        .sport
        .as_deref()
        .map(str::parse::<SportCategory>)
        .transpose()
        .map_err(DuelError::InvalidRequest)?;
    let limit = query.limit.unwrap_or(10).clamp(1, 100); // Default 10, max 100

    Ok(stats_repository
        .leaderboard(window, PointsCategory::from(sport), limit)
        .await?)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::achievements::AchievementEvaluator;
    use crate::rewards::RewardDispatcher;
    use duel_core::RewardSchedule;
    use duel_persistence::repositories::DuelRepository;
    use duel_types::{ApiError, ApiErrorKind, DuelOutcome};
    use migration::{Migrator, MigratorTrait};

    const SCHEDULER_TOKEN: &str = "test-scheduler-token";

    async fn create_dev_test_app()
    -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let db = duel_persistence::connection::connect_to_memory_database()
            .await
            .unwrap();
        Migrator::up(&db, None).await.unwrap();

        let duels = Arc::new(DuelRepository::new(db.clone()));
        let ledger = Arc::new(UserStatsRepository::new(db.clone()));
        let achievements = Arc::new(AchievementRepository::new(db));
        let evaluator = Arc::new(AchievementEvaluator::new(
            achievements.clone(),
            ledger.clone(),
        ));
        let rewards = Arc::new(RewardDispatcher::new(
            ledger.clone(),
            evaluator,
            RewardSchedule::default(),
        ));
        let resolver = Arc::new(DuelResolver::new(
            duels.clone(),
            rewards.clone(),
            chrono::Duration::hours(24),
        ));
        let sweeper = Arc::new(ExpirationSweeper::new(duels, rewards));

        create_routes(
            resolver,
            sweeper,
            ledger,
            achievements,
            Arc::new(AuthService::new_dev_mode()),
            Some(SCHEDULER_TOKEN.to_string()),
        )
    }

    fn bearer(user_id: Uuid) -> String {
        format!("Bearer {}", user_id)
    }

    async fn open_duel<F>(app: &F, challenger: Uuid, opponent: Uuid) -> Duel
    where
        F: Filter + 'static,
        F::Extract: warp::Reply + Send,
    {
        let response = warp::test::request()
            .method("POST")
            .path("/duels")
            .header("authorization", bearer(challenger))
            .json(&serde_json::json!({ "opponentId": opponent, "sport": "soccer" }))
            .reply(app)
            .await;

        assert_eq!(response.status(), 201);
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_dev_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), "OK");
    }

    #[tokio::test]
    async fn test_submit_requires_authentication() {
        let app = create_dev_test_app().await;

        let response = warp::test::request()
            .method("POST")
            .path(&format!("/duels/{}/result", Uuid::new_v4()))
            .json(&serde_json::json!({ "result": true, "role": "challenger" }))
            .reply(&app)
            .await;

        assert_eq!(response.status(), 401);
        let body: ApiError = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.error, ApiErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_full_duel_over_http() {
        let app = create_dev_test_app().await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let duel = open_duel(&app, alice, bob).await;

        let response = warp::test::request()
            .method("POST")
            .path(&format!("/duels/{}/result", duel.id))
            .header("authorization", bearer(alice))
            .json(&serde_json::json!({ "result": true, "role": "challenger" }))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);
        let first: SubmitResultResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(first.duel_result, DuelOutcome::Pending);

        let response = warp::test::request()
            .method("POST")
            .path(&format!("/duels/{}/result", duel.id))
            .header("authorization", bearer(bob))
            .json(&serde_json::json!({ "result": false, "role": "opponent" }))
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);
        let second: SubmitResultResponse = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(second.duel_result, DuelOutcome::Loss);
        assert_eq!(second.winner_id, Some(alice));

        let response = warp::test::request()
            .method("GET")
            .path("/leaderboard?window=weekly&sport=soccer")
            .reply(&app)
            .await;
        assert_eq!(response.status(), 200);
        let leaderboard: Vec<LeaderboardEntry> = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(leaderboard[0].user_id, alice);
        assert_eq!(leaderboard[0].rank, 1);
    }

    #[tokio::test]
    async fn test_submit_with_wrong_role_is_forbidden() {
        let app = create_dev_test_app().await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let duel = open_duel(&app, alice, bob).await;

        let response = warp::test::request()
            .method("POST")
            .path(&format!("/duels/{}/result", duel.id))
            .header("authorization", bearer(bob))
            .json(&serde_json::json!({ "result": true, "role": "challenger" }))
            .reply(&app)
            .await;

        assert_eq!(response.status(), 403);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = create_dev_test_app().await;
        let alice = Uuid::new_v4();
        let duel = open_duel(&app, alice, Uuid::new_v4()).await;

        let response = warp::test::request()
            .method("POST")
            .path(&format!("/duels/{}/result", duel.id))
            .header("authorization", bearer(alice))
            .body("{not json")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 400);
        let body: ApiError = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body.error, ApiErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_unknown_duel_is_not_found() {
        let app = create_dev_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path(&format!("/duels/{}", Uuid::new_v4()))
            .header("authorization", bearer(Uuid::new_v4()))
            .reply(&app)
            .await;

        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_sweep_requires_scheduler_token() {
        let app = create_dev_test_app().await;

        let rejected = warp::test::request()
            .method("POST")
            .path("/internal/sweep")
            .header("x-scheduler-token", "wrong")
            .reply(&app)
            .await;
        assert_eq!(rejected.status(), 401);

        let accepted = warp::test::request()
            .method("POST")
            .path("/internal/sweep")
            .header("x-scheduler-token", SCHEDULER_TOKEN)
            .reply(&app)
            .await;
        assert_eq!(accepted.status(), 200);
        let report: SweepReport = serde_json::from_slice(accepted.body()).unwrap();
        assert_eq!(report, SweepReport::default());
    }

    #[tokio::test]
    async fn test_user_stats_only_for_self() {
        let app = create_dev_test_app().await;
        let alice = Uuid::new_v4();

        let own = warp::test::request()
            .method("GET")
            .path(&format!("/users/{}/stats", alice))
            .header("authorization", bearer(alice))
            .reply(&app)
            .await;
        assert_eq!(own.status(), 200);
        let stats: UserStatsResponse = serde_json::from_slice(own.body()).unwrap();
        assert_eq!(stats.stats.level, 1);
        assert_eq!(stats.next_level_experience, experience_for_level(2));

        let other = warp::test::request()
            .method("GET")
            .path(&format!("/users/{}/stats", Uuid::new_v4()))
            .header("authorization", bearer(alice))
            .reply(&app)
            .await;
        assert_eq!(other.status(), 403);
    }

    #[tokio::test]
    async fn test_leaderboard_rejects_unknown_window() {
        let app = create_dev_test_app().await;

        let response = warp::test::request()
            .method("GET")
            .path("/leaderboard?window=daily")
            .reply(&app)
            .await;

        assert_eq!(response.status(), 400);
    }
}
