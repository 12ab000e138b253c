use std::{
    sync::Arc,
    time::Duration,
};

use assert_matches::assert_matches;
use battler_wamp_pool::{
    connection::{
        ConnectionPool,
        ConnectionState,
        ConnectionStatus,
    },
    core::{
        credentials::Credentials,
        key::ConnectionKey,
        options::SubscribeOptions,
    },
    session::{
        CloseDetails,
        CloseReason,
        ConnectionEvent,
        RetryPolicy,
        RetryingSessionProvider,
        SessionConfig,
        SessionProvider,
    },
};
use pretty_assertions::assert_eq;
use test_utils::{
    fake::{
        FakeConnector,
        NoopHandler,
        SessionCall,
    },
    setup::setup_test_environment,
    wait::{
        eventually,
        wait_for_status,
        within,
    },
};
use tokio::sync::mpsc;

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        initial_retry_delay: Duration::from_millis(1),
        retry_delay_growth: 1.0,
        retry_delay_jitter: 0.0,
    }
}

fn new_provider(connector: &Arc<FakeConnector>) -> RetryingSessionProvider<Arc<FakeConnector>> {
    RetryingSessionProvider::with_policy(connector.clone(), fast_policy())
}

fn session_config() -> SessionConfig {
    SessionConfig::new(
        &ConnectionKey::new("ws://localhost:8080/ws", "com.battler.test"),
        &Credentials::none(),
        Duration::from_secs(1),
    )
}

async fn next_event(events_rx: &mut mpsc::UnboundedReceiver<ConnectionEvent>) -> ConnectionEvent {
    within("connection event", events_rx.recv())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn retries_until_connected() {
    setup_test_environment();

    let connector = Arc::new(FakeConnector::new([false, false, true]));
    let provider = new_provider(&connector);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let _connection = provider.open(session_config(), events_tx);

    for _ in 0..2 {
        assert_matches!(
            next_event(&mut events_rx).await,
            ConnectionEvent::Closed(CloseDetails {
                reason: CloseReason::Unreachable,
                will_retry: true,
                ..
            })
        );
    }
    assert_matches!(next_event(&mut events_rx).await, ConnectionEvent::Opened(_));
    assert_eq!(connector.attempts(), 3);
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    setup_test_environment();

    let connector = Arc::new(FakeConnector::new([]));
    let provider = new_provider(&connector);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut config = session_config();
    config.max_retries = Some(2);
    let _connection = provider.open(config, events_tx);

    let mut will_retry = Vec::new();
    loop {
        match next_event(&mut events_rx).await {
            ConnectionEvent::Closed(details) => {
                will_retry.push(details.will_retry);
                if !details.will_retry {
                    break;
                }
            }
            event => panic!("unexpected event: {event:?}"),
        }
    }
    assert_eq!(will_retry, vec![true, true, false]);
    assert_eq!(connector.attempts(), 3);
}

#[tokio::test]
async fn does_not_retry_unreachable_router_when_disabled() {
    setup_test_environment();

    let connector = Arc::new(FakeConnector::new([]));
    let provider = new_provider(&connector);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut config = session_config();
    config.retry_if_unreachable = false;
    let _connection = provider.open(config, events_tx);

    assert_matches!(
        next_event(&mut events_rx).await,
        ConnectionEvent::Closed(CloseDetails {
            reason: CloseReason::Unreachable,
            will_retry: false,
            ..
        })
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(connector.attempts(), 1);
}

#[tokio::test]
async fn close_leaves_session_and_stops() {
    setup_test_environment();

    let connector = Arc::new(FakeConnector::new([true]));
    let provider = new_provider(&connector);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let connection = provider.open(session_config(), events_tx);
    assert_matches!(next_event(&mut events_rx).await, ConnectionEvent::Opened(_));

    connection.close();
    assert_matches!(
        next_event(&mut events_rx).await,
        ConnectionEvent::Closed(CloseDetails {
            reason: CloseReason::Closed,
            will_retry: false,
            ..
        })
    );
    assert_eq!(
        connector.sessions()[0].session.calls(),
        vec![SessionCall::Leave]
    );
    // The provider task is done, so the sender is dropped.
    assert_matches!(within("end of events", events_rx.recv()).await, Ok(None));
}

#[tokio::test]
async fn manager_reconnects_and_replays_through_retrying_provider() {
    setup_test_environment();

    let connector = Arc::new(FakeConnector::new([false, true, true]));
    let pool = ConnectionPool::new(Arc::new(new_provider(&connector)));
    let manager = pool
        .get(
            "ws://localhost:8080/ws",
            "com.battler.test",
            Credentials::none(),
            Duration::from_secs(1),
        )
        .await;
    let mut status_rx = manager.status_rx();
    manager.subscribe(
        "com.battler.topic",
        Arc::new(NoopHandler),
        SubscribeOptions::default(),
        "sub-1",
    );

    wait_for_status(&mut status_rx, ConnectionStatus::Ready)
        .await
        .unwrap();
    eventually("first subscription", async || {
        manager.active_subscription("sub-1").await.is_some()
    })
    .await
    .unwrap();

    // The router drops the session; the provider reconnects on its own.
    connector.sessions()[0].end("router shutting down");
    wait_for_status(&mut status_rx, ConnectionStatus::Closed)
        .await
        .unwrap();
    wait_for_status(&mut status_rx, ConnectionStatus::Ready)
        .await
        .unwrap();
    eventually("second subscription", async || {
        manager.active_subscription("sub-1").await.is_some()
    })
    .await
    .unwrap();

    let sessions = connector.sessions();
    assert_eq!(sessions.len(), 2);
    for connected in &sessions {
        assert_eq!(
            connected.session.resource_calls(),
            vec![SessionCall::Subscribe {
                topic: "com.battler.topic".to_owned(),
                options: SubscribeOptions::default(),
            }]
        );
    }

    pool.close_all().await;
    let mut state_rx = manager.state_rx();
    state_rx
        .wait_for(|state| *state == ConnectionState::Closed)
        .await
        .unwrap();
    eventually("leave", async || {
        sessions[1].session.calls().contains(&SessionCall::Leave)
    })
    .await
    .unwrap();
}
