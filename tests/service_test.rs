use std::sync::Arc;

use tatl::repository::table::Table;
use tatl::service::error::ServiceError;
use tatl::service::subscription_service::SubscriptionService;

mod common;

fn setup_service(db: Arc<tatl::repository::Repository>) -> (SubscriptionService, common::MockPlatform) {
    let platform = common::MockPlatform::new();
    platform.add_user(141981764, "twitchdev", "TwitchDev");
    platform.add_user(12826, "twitch", "Twitch");
    let service = SubscriptionService::new(db, Arc::new(platform.clone()));
    (service, platform)
}

#[tokio::test]
async fn test_subscribe_stores_display_name() {
    let (db, db_path) = common::setup_db().await;
    let (service, _) = setup_service(db.clone());

    let subscribed = service
        .subscribe("TwitchDev", 1001)
        .await
        .expect("Failed to subscribe");
    assert_eq!(subscribed.display_name, "TwitchDev");
    assert_eq!(subscribed.subscription.streamer_id, 141981764);

    let subs = db.subscription.select_all().await.unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].streamer_login, "TwitchDev");
    assert_eq!(subs[0].channel_id, 1001);
    assert!(!subs[0].is_pending());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_subscribe_twice_reports_duplicate() {
    let (db, db_path) = common::setup_db().await;
    let (service, _) = setup_service(db.clone());

    service.subscribe("twitchdev", 1001).await.unwrap();
    let err = service.subscribe("twitchdev", 1001).await.unwrap_err();

    assert!(matches!(err, ServiceError::DuplicateSubscription { .. }));
    assert_eq!(
        err.to_string(),
        "This channel is already subscribed to TwitchDev streams"
    );
    assert!(err.is_user_facing());
    assert_eq!(db.subscription.select_all().await.unwrap().len(), 1);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_subscribe_unknown_streamer() {
    let (db, db_path) = common::setup_db().await;
    let (service, _) = setup_service(db.clone());

    let err = service.subscribe("nobody", 1001).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Unable to find user nobody. Expected 1 result, got 0"
    );

    let err = service.subscribe("   ", 1001).await.unwrap_err();
    assert!(matches!(err, ServiceError::StreamerNotFound { found: 0, .. }));

    assert!(db.subscription.select_all().await.unwrap().is_empty());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_subscribe_ambiguous_login() {
    let (db, db_path) = common::setup_db().await;
    let (service, platform) = setup_service(db.clone());
    platform.add_user(1, "twin", "Twin");
    platform.add_user(2, "twin", "TwinToo");

    let err = service.subscribe("twin", 1001).await.unwrap_err();

    assert!(matches!(err, ServiceError::StreamerNotFound { found: 2, .. }));
    assert_eq!(
        err.to_string(),
        "Unable to find user twin. Expected 1 result, got 2"
    );
    assert!(db.subscription.select_all().await.unwrap().is_empty());

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_unsubscribe_counts_and_scopes_to_channel() {
    let (db, db_path) = common::setup_db().await;
    let (service, _) = setup_service(db.clone());

    service.subscribe("twitchdev", 1001).await.unwrap();
    service.subscribe("twitchdev", 1002).await.unwrap();

    assert_eq!(service.unsubscribe("TwitchDev", 1001).await.unwrap(), 1);
    assert_eq!(service.unsubscribe("TwitchDev", 1001).await.unwrap(), 0);
    assert_eq!(service.unsubscribe("never-subscribed", 1003).await.unwrap(), 0);

    let remaining = service.list_channel_subscriptions(1002).await.unwrap();
    assert_eq!(remaining.len(), 1);

    common::teardown_db(db_path).await;
}

#[tokio::test]
async fn test_list_channel_subscriptions_sorted() {
    let (db, db_path) = common::setup_db().await;
    let (service, _) = setup_service(db.clone());

    service.subscribe("twitchdev", 1001).await.unwrap();
    service.subscribe("twitch", 1001).await.unwrap();
    service.subscribe("twitch", 1002).await.unwrap();

    let logins: Vec<String> = service
        .list_channel_subscriptions(1001)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.streamer_login)
        .collect();
    assert_eq!(logins, vec!["Twitch".to_string(), "TwitchDev".to_string()]);

    assert!(service.list_pending().await.unwrap().is_empty());

    common::teardown_db(db_path).await;
}
