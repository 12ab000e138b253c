use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Mutex,
        atomic::{
            AtomicU64,
            Ordering,
        },
    },
};

use anyhow::{
    Error,
    Result,
};
use async_trait::async_trait;
use battler_wamp_pool::{
    core::options::{
        RegisterOptions,
        SubscribeOptions,
    },
    session::{
        CloseDetails,
        CloseReason,
        Connection,
        ConnectionEvent,
        ConnectionEventSender,
        Connector,
        EstablishedSession,
        EventHandler,
        Invocation,
        ProcedureHandler,
        PublishedEvent,
        ReceivedEvent,
        RegistrationHandle,
        RpcCall,
        RpcResult,
        RpcYield,
        Session,
        SessionConfig,
        SessionProvider,
        SubscriptionHandle,
    },
};
use tokio::sync::oneshot;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// A call made on a [`FakeSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCall {
    Publish {
        topic: String,
        event: PublishedEvent,
    },
    Subscribe {
        topic: String,
        options: SubscribeOptions,
    },
    Register {
        procedure: String,
        options: RegisterOptions,
    },
    Call {
        procedure: String,
        rpc_call: RpcCall,
    },
    Leave,
}

/// An in-memory session that records every call made on it.
///
/// Subscriptions and registrations succeed unless their URI was marked as failing or stalled. Calls
/// fail unless a result was set for the procedure.
pub struct FakeSession {
    id: u64,
    next_resource_id: AtomicU64,
    calls: Mutex<Vec<SessionCall>>,
    failing: Mutex<Vec<String>>,
    stalled: Mutex<Vec<String>>,
    subscriptions: Mutex<Vec<(String, Arc<dyn EventHandler>)>>,
    registrations: Mutex<Vec<(String, Arc<dyn ProcedureHandler>)>>,
    call_results: Mutex<Vec<(String, RpcResult)>>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::SeqCst),
            next_resource_id: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(Vec::new()),
            stalled: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            call_results: Mutex::new(Vec::new()),
        }
    }

    /// Makes subscriptions, registrations, and calls on the URI fail.
    pub fn fail(&self, uri: &str) {
        self.failing.lock().unwrap().push(uri.to_owned());
    }

    /// Makes subscriptions and registrations on the URI never complete.
    pub fn stall(&self, uri: &str) {
        self.stalled.lock().unwrap().push(uri.to_owned());
    }

    /// Sets the result of calls to a procedure.
    pub fn set_call_result(&self, procedure: &str, result: RpcResult) {
        self.call_results
            .lock()
            .unwrap()
            .push((procedure.to_owned(), result));
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Subscribe and register calls made so far, in order.
    pub fn resource_calls(&self) -> Vec<SessionCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    SessionCall::Subscribe { .. } | SessionCall::Register { .. }
                )
            })
            .collect()
    }

    /// Delivers an event to every handler subscribed to the topic.
    ///
    /// Returns the number of handlers the event was delivered to.
    pub async fn deliver_event(&self, topic: &str, event: ReceivedEvent) -> usize {
        let handlers = self
            .subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|(subscribed, _)| subscribed == topic)
            .map(|(_, handler)| handler.clone())
            .collect::<Vec<_>>();
        for handler in &handlers {
            handler.handle_event(event.clone()).await;
        }
        handlers.len()
    }

    /// Invokes the handler registered for the procedure.
    pub async fn invoke(&self, procedure: &str, invocation: Invocation) -> Result<RpcYield> {
        let handler = self
            .registrations
            .lock()
            .unwrap()
            .iter()
            .find(|(registered, _)| registered == procedure)
            .map(|(_, handler)| handler.clone())
            .ok_or_else(|| Error::msg(format!("no registration for {procedure}")))?;
        handler.invoke(invocation).await
    }

    fn record(&self, call: SessionCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn wait_unless_stalled(&self, uri: &str) {
        let stalled = self
            .stalled
            .lock()
            .unwrap()
            .iter()
            .any(|stalled| stalled == uri);
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    fn check(&self, uri: &str) -> Result<()> {
        if self.failing.lock().unwrap().iter().any(|failing| failing == uri) {
            return Err(Error::msg(format!("{uri} is rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl Session for FakeSession {
    fn id(&self) -> u64 {
        self.id
    }

    async fn publish(&self, topic: &str, event: PublishedEvent) -> Result<()> {
        self.record(SessionCall::Publish {
            topic: topic.to_owned(),
            event,
        });
        self.check(topic)
    }

    async fn subscribe(
        &self,
        topic: &str,
        options: &SubscribeOptions,
        handler: Arc<dyn EventHandler>,
    ) -> Result<SubscriptionHandle> {
        self.record(SessionCall::Subscribe {
            topic: topic.to_owned(),
            options: options.clone(),
        });
        self.wait_unless_stalled(topic).await;
        self.check(topic)?;
        self.subscriptions
            .lock()
            .unwrap()
            .push((topic.to_owned(), handler));
        Ok(SubscriptionHandle {
            id: self.next_resource_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn register(
        &self,
        procedure: &str,
        options: &RegisterOptions,
        handler: Arc<dyn ProcedureHandler>,
    ) -> Result<RegistrationHandle> {
        self.record(SessionCall::Register {
            procedure: procedure.to_owned(),
            options: options.clone(),
        });
        self.wait_unless_stalled(procedure).await;
        self.check(procedure)?;
        self.registrations
            .lock()
            .unwrap()
            .push((procedure.to_owned(), handler));
        Ok(RegistrationHandle {
            id: self.next_resource_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn call(&self, procedure: &str, rpc_call: RpcCall) -> Result<RpcResult> {
        self.record(SessionCall::Call {
            procedure: procedure.to_owned(),
            rpc_call,
        });
        self.check(procedure)?;
        self.call_results
            .lock()
            .unwrap()
            .iter()
            .find(|(called, _)| called == procedure)
            .map(|(_, result)| result.clone())
            .ok_or_else(|| Error::msg(format!("no such procedure {procedure}")))
    }

    async fn leave(&self) -> Result<()> {
        self.record(SessionCall::Leave);
        Ok(())
    }
}

/// A connection opened by a [`FakeSessionProvider`], driven by the test.
pub struct FakeConnection {
    config: SessionConfig,
    events_tx: ConnectionEventSender,
    session: Mutex<Option<Arc<FakeSession>>>,
    closed: Mutex<bool>,
}

impl FakeConnection {
    fn new(config: SessionConfig, events_tx: ConnectionEventSender) -> Self {
        Self {
            config,
            events_tx,
            session: Mutex::new(None),
            closed: Mutex::new(false),
        }
    }

    /// The config the connection was opened with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Reports a new session.
    pub fn open_session(&self) -> Arc<FakeSession> {
        self.open_prepared_session(Arc::new(FakeSession::new()))
    }

    /// Reports a session the test prepared, for example to fail some URIs.
    pub fn open_prepared_session(&self, session: Arc<FakeSession>) -> Arc<FakeSession> {
        *self.session.lock().unwrap() = Some(session.clone());
        self.send(ConnectionEvent::Opened(session.clone()));
        session
    }

    /// Reports the current session as lost.
    pub fn drop_session(&self, will_retry: bool) {
        self.session.lock().unwrap().take();
        self.send(ConnectionEvent::Closed(
            CloseDetails::new(CloseReason::Lost, will_retry).with_message("connection reset"),
        ));
    }

    /// Reports a failed connect attempt.
    pub fn fail_attempt(&self, will_retry: bool) {
        self.send(ConnectionEvent::Closed(
            CloseDetails::new(CloseReason::Unreachable, will_retry).with_message("unreachable"),
        ));
    }

    /// The session most recently opened, if it is still open.
    pub fn session(&self) -> Option<Arc<FakeSession>> {
        self.session.lock().unwrap().clone()
    }

    /// Whether [`Connection::close`] was called.
    pub fn closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }

    fn send(&self, event: ConnectionEvent) {
        // The owner may be gone already.
        self.events_tx.send(event).ok();
    }
}

struct FakeConnectionHandle(Arc<FakeConnection>);

impl Connection for FakeConnectionHandle {
    fn close(&self) {
        *self.0.closed.lock().unwrap() = true;
        if self.0.session.lock().unwrap().take().is_some() {
            self.0.send(ConnectionEvent::Closed(CloseDetails::new(
                CloseReason::Closed,
                false,
            )));
        }
    }
}

/// A session provider whose connections are driven by the test.
#[derive(Default)]
pub struct FakeSessionProvider {
    auto_open: bool,
    connections: Mutex<Vec<Arc<FakeConnection>>>,
}

impl FakeSessionProvider {
    /// A provider whose connections open nothing until the test says so.
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose connections report a new session as soon as they are opened.
    pub fn auto_open() -> Self {
        Self {
            auto_open: true,
            ..Default::default()
        }
    }

    /// Every connection opened so far, in order.
    pub fn connections(&self) -> Vec<Arc<FakeConnection>> {
        self.connections.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    /// The connection most recently opened.
    pub fn last_connection(&self) -> Option<Arc<FakeConnection>> {
        self.connections.lock().unwrap().last().cloned()
    }
}

impl SessionProvider for FakeSessionProvider {
    fn open(&self, config: SessionConfig, events_tx: ConnectionEventSender) -> Box<dyn Connection> {
        let connection = Arc::new(FakeConnection::new(config, events_tx));
        self.connections.lock().unwrap().push(connection.clone());
        if self.auto_open {
            connection.open_session();
        }
        Box::new(FakeConnectionHandle(connection))
    }
}

/// A session established by a [`FakeConnector`].
pub struct ConnectedSession {
    pub session: Arc<FakeSession>,
    finished_tx: Mutex<Option<oneshot::Sender<String>>>,
}

impl ConnectedSession {
    /// Ends the session from the router's side.
    pub fn end(&self, message: &str) {
        if let Some(finished_tx) = self.finished_tx.lock().unwrap().take() {
            finished_tx.send(message.to_owned()).ok();
        }
    }
}

/// A connector that follows a script of successful and failed attempts.
///
/// Attempts past the end of the script fail.
#[derive(Default)]
pub struct FakeConnector {
    script: Mutex<VecDeque<bool>>,
    attempts: Mutex<Vec<SessionConfig>>,
    sessions: Mutex<Vec<Arc<ConnectedSession>>>,
}

impl FakeConnector {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Default::default()
        }
    }

    /// Number of connect attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// Every session established so far, in order.
    pub fn sessions(&self) -> Vec<Arc<ConnectedSession>> {
        self.sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, config: &SessionConfig) -> Result<EstablishedSession> {
        self.attempts.lock().unwrap().push(config.clone());
        let succeed = self.script.lock().unwrap().pop_front().unwrap_or(false);
        if !succeed {
            return Err(Error::msg("connection refused"));
        }
        let (finished_tx, finished_rx) = oneshot::channel();
        let session = Arc::new(FakeSession::new());
        self.sessions.lock().unwrap().push(Arc::new(ConnectedSession {
            session: session.clone(),
            finished_tx: Mutex::new(Some(finished_tx)),
        }));
        Ok(EstablishedSession {
            session,
            finished_rx,
        })
    }
}


/// A handler that ignores events and answers invocations with nothing.
pub struct NoopHandler;

#[async_trait]
impl EventHandler for NoopHandler {
    async fn handle_event(&self, _: ReceivedEvent) {}
}

#[async_trait]
impl ProcedureHandler for NoopHandler {
    async fn invoke(&self, _: Invocation) -> Result<RpcYield> {
        Ok(RpcYield::default())
    }
}
