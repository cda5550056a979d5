
use duel_types::SportCategory;
use test_helpers::*;
use uuid::Uuid;

#[tokio::test]
async fn test_evaluation_unlocks_satisfied_achievements() {
    let setup = TestDuelServerSetup::new().await;
    let user_id = Uuid::new_v4();

    setup
        .ledger
        .apply_duel_reward(user_id, 100, 30, SportCategory::Football, true)
        .await
        .unwrap();

    let unlocked = setup.evaluator.evaluate(user_id).await.unwrap();
    assert_eq!(unlocked, vec!["First Victory", "Duelist"]);
    assert_eq!(setup.stats(user_id).await.experience, 175);

    // Nothing left to unlock
    assert!(setup.evaluator.evaluate(user_id).await.unwrap().is_empty());
    assert_eq!(setup.stats(user_id).await.experience, 175);
}

#[tokio::test]
async fn test_bonus_experience_can_unlock_level_achievement() {
    let setup = TestDuelServerSetup::new().await;
    let user_id = Uuid::new_v4();

    // 200 + 50 + 25 crosses the level 3 threshold at 250
    setup
        .ledger
        .apply_duel_reward(user_id, 200, 0, SportCategory::General, true)
        .await
        .unwrap();

    let unlocked = setup.evaluator.evaluate(user_id).await.unwrap();
    assert_eq!(unlocked, vec!["First Victory", "Duelist", "Rising Star"]);

    let stats = setup.stats(user_id).await;
    assert_eq!(stats.experience, 350);
    assert_eq!(stats.level, 3);
}

#[tokio::test]
async fn test_user_without_stats_unlocks_nothing() {
    let setup = TestDuelServerSetup::new().await;
    let user_id = Uuid::new_v4();

    assert!(setup.evaluator.evaluate(user_id).await.unwrap().is_empty());
    assert_eq!(setup.ledger.find_stats(user_id).await.unwrap(), None);
}

#[tokio::test]
async fn test_concurrent_evaluations_unlock_each_achievement_once() {
    let setup = TestDuelServerSetup::new().await;
    let user_id = Uuid::new_v4();

    setup
        .ledger
        .apply_duel_reward(user_id, 100, 30, SportCategory::Basketball, true)
        .await
        .unwrap();

    let evaluations = (0..4).map(|_| setup.evaluator.evaluate(user_id));
    let results = futures::future::join_all(evaluations).await;

    let mut names: Vec<String> = results
        .into_iter()
        .flat_map(|result| result.unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Duelist", "First Victory"]);

    assert_eq!(setup.stats(user_id).await.experience, 175);
    assert_eq!(setup.achievements.unlocked_for_user(user_id).await.unwrap().len(), 2);
}
