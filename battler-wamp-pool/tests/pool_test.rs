use std::{
    sync::Arc,
    time::Duration,
};

use battler_wamp_pool::{
    connection::{
        ConnectionPool,
        ConnectionState,
    },
    core::{
        credentials::{
            AuthMethod,
            Credentials,
        },
        key::ConnectionKey,
        options::SubscribeOptions,
    },
};
use futures_util::future::join_all;
use pretty_assertions::assert_eq;
use test_utils::{
    fake::{
        FakeSessionProvider,
        NoopHandler,
    },
    setup::setup_test_environment,
    wait::eventually,
};

const ADDRESS: &str = "ws://localhost:8080/ws";
const REALM: &str = "com.battler.test";
const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

fn new_pool() -> (Arc<FakeSessionProvider>, ConnectionPool) {
    let provider = Arc::new(FakeSessionProvider::new());
    let pool = ConnectionPool::new(provider.clone());
    (provider, pool)
}

#[tokio::test]
async fn returns_same_connection_for_same_key() {
    setup_test_environment();

    let (provider, pool) = new_pool();
    let first = pool
        .get(ADDRESS, REALM, Credentials::none(), MAX_RETRY_DELAY)
        .await;
    let second = pool
        .get(ADDRESS, REALM, Credentials::none(), MAX_RETRY_DELAY)
        .await;
    assert!(Arc::ptr_eq(&first, &second));

    let other_realm = pool
        .get(ADDRESS, "com.battler.other", Credentials::none(), MAX_RETRY_DELAY)
        .await;
    assert!(!Arc::ptr_eq(&first, &other_realm));
    assert_eq!(pool.len().await, 2);

    eventually("two connections", async || provider.open_count() == 2)
        .await
        .unwrap();
}

#[tokio::test]
async fn concurrent_gets_open_one_connection() {
    setup_test_environment();

    let (provider, pool) = new_pool();
    let managers = join_all(
        (0..10).map(|_| pool.get(ADDRESS, REALM, Credentials::none(), MAX_RETRY_DELAY)),
    )
    .await;
    assert!(
        managers
            .iter()
            .all(|manager| Arc::ptr_eq(manager, &managers[0]))
    );

    eventually("connection opened", async || provider.open_count() == 1)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(provider.open_count(), 1);
}

#[tokio::test]
async fn opens_connection_with_key_and_credentials() {
    setup_test_environment();

    let (provider, pool) = new_pool();
    let manager = pool
        .get(
            ADDRESS,
            REALM,
            Credentials::new(AuthMethod::Ticket, "user", "hunter2"),
            Duration::from_secs(10),
        )
        .await;
    assert_eq!(manager.key(), &ConnectionKey::new(ADDRESS, REALM));

    eventually("connection opened", async || provider.open_count() == 1)
        .await
        .unwrap();
    let connection = provider.last_connection().unwrap();
    let config = connection.config();
    assert_eq!(config.transport_url, ADDRESS);
    assert_eq!(config.realm, REALM);
    assert!(config.retry_if_unreachable);
    assert_eq!(config.max_retries, None);
    assert_eq!(config.max_retry_delay, Duration::from_secs(10));
    assert_eq!(config.auth_methods(), vec![AuthMethod::Ticket]);
    assert_eq!(
        config
            .authentication
            .as_ref()
            .map(|credentials| credentials.challenge_response()),
        Some("hunter2")
    );
}

#[tokio::test]
async fn close_removes_connection_and_later_get_starts_fresh() {
    setup_test_environment();

    let (provider, pool) = new_pool();
    let first = pool
        .get(ADDRESS, REALM, Credentials::none(), MAX_RETRY_DELAY)
        .await;
    first.subscribe(
        "com.battler.topic",
        Arc::new(NoopHandler),
        SubscribeOptions::default(),
        "sub-1",
    );
    eventually("subscription recorded", async || {
        first.subscription_ids().await == vec!["sub-1".to_owned()]
    })
    .await
    .unwrap();

    pool.close(ADDRESS, REALM).await;
    assert!(!pool.contains(&ConnectionKey::new(ADDRESS, REALM)).await);
    let mut state_rx = first.state_rx();
    state_rx
        .wait_for(|state| *state == ConnectionState::Closed)
        .await
        .unwrap();
    assert!(provider.connections()[0].closed());

    let second = pool
        .get(ADDRESS, REALM, Credentials::none(), MAX_RETRY_DELAY)
        .await;
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(second.subscription_ids().await.is_empty());
    eventually("second connection", async || provider.open_count() == 2)
        .await
        .unwrap();
}

#[tokio::test]
async fn closing_unknown_connection_does_nothing() {
    setup_test_environment();

    let (provider, pool) = new_pool();
    pool.close(ADDRESS, REALM).await;
    assert!(pool.is_empty().await);
    assert_eq!(provider.open_count(), 0);
}

#[tokio::test]
async fn close_all_closes_every_connection() {
    setup_test_environment();

    let (provider, pool) = new_pool();
    let first = pool
        .get(ADDRESS, REALM, Credentials::none(), MAX_RETRY_DELAY)
        .await;
    let second = pool
        .get(ADDRESS, "com.battler.other", Credentials::none(), MAX_RETRY_DELAY)
        .await;
    eventually("connections opened", async || provider.open_count() == 2)
        .await
        .unwrap();

    pool.close_all().await;
    assert!(pool.is_empty().await);
    for manager in [first, second] {
        let mut state_rx = manager.state_rx();
        state_rx
            .wait_for(|state| *state == ConnectionState::Closed)
            .await
            .unwrap();
    }
}
