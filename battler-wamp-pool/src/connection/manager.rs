use std::{
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use futures_util::lock::Mutex;
use log::{
    debug,
    error,
    info,
    warn,
};
use tokio::sync::{
    broadcast,
    mpsc,
    oneshot,
    watch,
};

use crate::{
    connection::{
        pending_call::PendingCall,
        state::{
            ConnectionState,
            ConnectionStatus,
        },
        table::RegistrationTable,
    },
    core::{
        credentials::Credentials,
        key::ConnectionKey,
        options::{
            CallOptions,
            PublishOptions,
            RegisterOptions,
            SubscribeOptions,
        },
        types::{
            Dictionary,
            List,
        },
    },
    session::{
        CloseDetails,
        Connection,
        ConnectionClosedError,
        ConnectionEvent,
        EventHandler,
        ProcedureHandler,
        PublishedEvent,
        RegistrationHandle,
        RpcCall,
        Session,
        SessionConfig,
        SessionProvider,
        SubscriptionHandle,
    },
};

#[derive(Clone)]
struct SubscriptionRequest {
    topic: String,
    options: SubscribeOptions,
    handler: Arc<dyn EventHandler>,
}

#[derive(Clone)]
struct ProcedureRequest {
    procedure: String,
    options: RegisterOptions,
    handler: Arc<dyn ProcedureHandler>,
}

enum Command {
    Subscribe {
        id: String,
        request: SubscriptionRequest,
    },
    RegisterProcedure {
        id: String,
        request: ProcedureRequest,
    },
    Close {
        done_tx: oneshot::Sender<()>,
    },
}

/// Mutable state of a manager, only ever modified by its task.
#[derive(Default)]
struct ManagerState {
    session: Option<Arc<dyn Session>>,
    connection: Option<Box<dyn Connection>>,
    connecting: bool,
    closing: bool,
    subscriptions: RegistrationTable<SubscriptionRequest, SubscriptionHandle>,
    procedures: RegistrationTable<ProcedureRequest, RegistrationHandle>,
}

/// Channel ends owned by the manager's task, taken when the manager starts.
struct TaskChannels {
    command_rx: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
    session_tx: watch::Sender<Option<Arc<dyn Session>>>,
    close_rx: watch::Receiver<bool>,
}

/// Manages a single shared connection to a router, for one realm.
///
/// The manager continually keeps a session open through a [`SessionProvider`]. Consumers record
/// subscriptions and procedure registrations under their own IDs at any time, connected or not.
/// Every time a new session opens, all recorded requests are replayed on it in the order they were
/// first made, so consumers never need to care about reconnection.
///
/// All state changes happen on a single background task, one command or connection event at a
/// time. Replaying requests on a new session runs to completion before any other change is made,
/// unless the manager is closed in the meantime.
pub struct ConnectionManager {
    key: ConnectionKey,
    credentials: Credentials,
    max_retry_delay: Duration,

    state: Arc<Mutex<ManagerState>>,
    command_tx: mpsc::UnboundedSender<Command>,
    close_tx: watch::Sender<bool>,
    status_tx: broadcast::Sender<ConnectionStatus>,
    state_rx: watch::Receiver<ConnectionState>,
    session_rx: watch::Receiver<Option<Arc<dyn Session>>>,

    task_channels: Mutex<Option<TaskChannels>>,
}

impl ConnectionManager {
    /// Creates a new manager for a key.
    ///
    /// The manager does nothing until [`Self::start`] is called.
    pub fn new(key: ConnectionKey, credentials: Credentials, max_retry_delay: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, _) = broadcast::channel(16);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (session_tx, session_rx) = watch::channel(None);
        let (close_tx, close_rx) = watch::channel(false);
        Self {
            key,
            credentials,
            max_retry_delay,
            state: Arc::new(Mutex::new(ManagerState::default())),
            command_tx,
            close_tx,
            status_tx,
            state_rx,
            session_rx,
            task_channels: Mutex::new(Some(TaskChannels {
                command_rx,
                state_tx,
                session_tx,
                close_rx,
            })),
        }
    }

    /// Starts connecting through the provider, in a background task.
    ///
    /// Starting an already-started manager does nothing.
    pub async fn start(&self, provider: Arc<dyn SessionProvider>) {
        let channels = match self.task_channels.lock().await.take() {
            Some(channels) => channels,
            None => {
                warn!("Connection manager for {} is already started", self.key);
                return;
            }
        };
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let task = ManagerTask {
            key: self.key.clone(),
            config: SessionConfig::new(&self.key, &self.credentials, self.max_retry_delay),
            provider,
            state: self.state.clone(),
            status_tx: self.status_tx.clone(),
            state_tx: channels.state_tx,
            session_tx: channels.session_tx,
            close_rx: channels.close_rx,
            events_tx,
        };
        tokio::spawn(task.run(channels.command_rx, events_rx));
    }

    /// The key this manager connects for.
    pub fn key(&self) -> &ConnectionKey {
        &self.key
    }

    /// The current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// A receiver of lifecycle state changes.
    pub fn state_rx(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// A receiver of status events, in the order they are emitted.
    pub fn status_rx(&self) -> broadcast::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    /// Waits until a session is open.
    ///
    /// Fails if the manager closes first. Like any connection state, readiness can be lost
    /// immediately after this method returns.
    pub async fn wait_until_ready(&self) -> Result<()> {
        let mut state_rx = self.state_rx.clone();
        let state = *state_rx
            .wait_for(|state| *state == ConnectionState::Connected || state.closing())
            .await?;
        match state {
            ConnectionState::Connected => Ok(()),
            _ => Err(ConnectionClosedError::new(format!("connection {} is closed", self.key)).into()),
        }
    }

    /// Closes the connection for good.
    ///
    /// No further connect attempts are made after this call, and the manager stops once the last
    /// session ends. Subscriptions and registrations still in flight are abandoned. Closing a
    /// closed manager does nothing.
    pub async fn close(&self) {
        self.close_tx.send_replace(true);
        let (done_tx, done_rx) = oneshot::channel();
        if self.command_tx.send(Command::Close { done_tx }).is_err() {
            return;
        }
        done_rx.await.ok();
    }

    /// Subscribes to a topic on every session, under a consumer ID.
    ///
    /// A previous subscription under the same ID is replaced. If a session is open, the
    /// subscription is attempted on it immediately; otherwise it is attempted on the next session.
    pub fn subscribe<S, I>(
        &self,
        topic: S,
        handler: Arc<dyn EventHandler>,
        options: SubscribeOptions,
        id: I,
    ) where
        S: Into<String>,
        I: Into<String>,
    {
        let id = id.into();
        let topic = topic.into();
        debug!("Recording subscription {id} to {topic} on {}", self.key);
        self.send_command(Command::Subscribe {
            id,
            request: SubscriptionRequest {
                topic,
                options,
                handler,
            },
        });
    }

    /// Registers a procedure on every session, under a consumer ID.
    ///
    /// A previous registration under the same ID is replaced. If a session is open, the
    /// registration is attempted on it immediately; otherwise it is attempted on the next session.
    pub fn register_procedure<S, I>(
        &self,
        procedure: S,
        handler: Arc<dyn ProcedureHandler>,
        options: RegisterOptions,
        id: I,
    ) where
        S: Into<String>,
        I: Into<String>,
    {
        let id = id.into();
        let procedure = procedure.into();
        debug!("Recording registration {id} of {procedure} on {}", self.key);
        self.send_command(Command::RegisterProcedure {
            id,
            request: ProcedureRequest {
                procedure,
                options,
                handler,
            },
        });
    }

    /// Publishes an event to a topic, if a session is open.
    ///
    /// Publishing is fire-and-forget: nothing happens without a session, and failures are only
    /// logged.
    pub fn publish<S>(
        &self,
        topic: S,
        arguments: List,
        arguments_keyword: Dictionary,
        options: PublishOptions,
    ) where
        S: Into<String>,
    {
        let topic = topic.into();
        let session = match self.current_session() {
            Some(session) => session,
            None => {
                warn!("Publish to {topic} failed: {} is not connected", self.key);
                return;
            }
        };
        let event = PublishedEvent {
            arguments,
            arguments_keyword,
            options,
        };
        tokio::spawn(async move {
            if let Err(err) = session.publish(&topic, event).await {
                warn!("Publish to {topic} failed: {err}");
            }
        });
    }

    /// Calls a procedure, if a session is open.
    ///
    /// Returns `None` if the call was not attempted because there is no session. A call that was
    /// attempted reports its outcome through the returned [`PendingCall`].
    pub fn call_procedure<S>(
        &self,
        procedure: S,
        arguments: List,
        arguments_keyword: Dictionary,
        options: CallOptions,
    ) -> Option<PendingCall>
    where
        S: Into<String>,
    {
        let procedure = procedure.into();
        let session = match self.current_session() {
            Some(session) => session,
            None => {
                warn!("Call to {procedure} failed: {} is not connected", self.key);
                return None;
            }
        };
        let rpc_call = RpcCall {
            arguments,
            arguments_keyword,
            options,
        };
        let (result_tx, result_rx) = oneshot::channel();
        let task_procedure = procedure.clone();
        tokio::spawn(async move {
            let result = session.call(&task_procedure, rpc_call).await;
            result_tx.send(result).ok();
        });
        Some(PendingCall::new(procedure, result_rx))
    }

    /// The active subscription for a consumer, if subscribed on the current session.
    pub async fn active_subscription(&self, id: &str) -> Option<SubscriptionHandle> {
        self.state.lock().await.subscriptions.active(id)
    }

    /// The active registration for a consumer, if registered on the current session.
    pub async fn active_registration(&self, id: &str) -> Option<RegistrationHandle> {
        self.state.lock().await.procedures.active(id)
    }

    /// IDs of all recorded subscriptions, in the order they were first made.
    pub async fn subscription_ids(&self) -> Vec<String> {
        self.state.lock().await.subscriptions.ids()
    }

    /// IDs of all recorded procedure registrations, in the order they were first made.
    pub async fn procedure_ids(&self) -> Vec<String> {
        self.state.lock().await.procedures.ids()
    }

    fn current_session(&self) -> Option<Arc<dyn Session>> {
        self.session_rx.borrow().clone()
    }

    fn send_command(&self, command: Command) {
        if self.command_tx.send(command).is_err() {
            warn!("Connection manager for {} is no longer running", self.key);
        }
    }
}

/// The background task owning all state changes of a [`ConnectionManager`].
struct ManagerTask {
    key: ConnectionKey,
    config: SessionConfig,
    provider: Arc<dyn SessionProvider>,

    state: Arc<Mutex<ManagerState>>,
    status_tx: broadcast::Sender<ConnectionStatus>,
    state_tx: watch::Sender<ConnectionState>,
    session_tx: watch::Sender<Option<Arc<dyn Session>>>,
    close_rx: watch::Receiver<bool>,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ManagerTask {
    async fn run(
        self,
        mut command_rx: mpsc::UnboundedReceiver<Command>,
        mut events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    ) {
        {
            let mut state = self.state.lock().await;
            self.emit(ConnectionStatus::Closed);
            self.open_connection(&mut state);
        }

        loop {
            // Commands are preferred, so that requests made before a session opened are recorded
            // before it is replayed.
            let done = tokio::select! {
                biased;
                command = command_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("Connection manager for {} dropped", self.key);
                        self.finish(&mut *self.state.lock().await);
                        true
                    }
                },
                event = events_rx.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        error!("Connection events for {} ended unexpectedly", self.key);
                        self.finish(&mut *self.state.lock().await);
                        true
                    }
                },
            };
            if done {
                break;
            }
        }
    }

    fn emit(&self, status: ConnectionStatus) {
        self.status_tx.send(status).ok();
    }

    fn set_state(&self, next: ConnectionState) {
        self.state_tx.send_replace(next);
    }

    fn open_connection(&self, state: &mut ManagerState) {
        if state.closing || state.connecting || state.session.is_some() {
            return;
        }
        state.connecting = true;
        self.set_state(ConnectionState::Connecting);
        info!("Connecting to {}", self.key);
        state.connection = Some(
            self.provider
                .open(self.config.clone(), self.events_tx.clone()),
        );
    }

    /// Ends the manager for good.
    fn finish(&self, state: &mut ManagerState) {
        if let Some(connection) = state.connection.take() {
            connection.close();
        }
        state.closing = true;
        state.connecting = false;
        state.session = None;
        self.session_tx.send_replace(None);
        state.subscriptions.clear_active();
        state.procedures.clear_active();
        self.set_state(ConnectionState::Closed);
        self.emit(ConnectionStatus::Closed);
        info!("Connection {} closed", self.key);
    }

    async fn handle_command(&self, command: Command) -> bool {
        match command {
            Command::Subscribe { id, request } => {
                let session = {
                    let mut state = self.state.lock().await;
                    state.subscriptions.insert(id.clone(), request.clone());
                    state.session.clone()
                };
                if let Some(session) = session {
                    self.restore_subscriptions(&session, vec![(id, request)])
                        .await;
                }
                false
            }
            Command::RegisterProcedure { id, request } => {
                let session = {
                    let mut state = self.state.lock().await;
                    state.procedures.insert(id.clone(), request.clone());
                    state.session.clone()
                };
                if let Some(session) = session {
                    self.restore_registrations(&session, vec![(id, request)])
                        .await;
                }
                false
            }
            Command::Close { done_tx } => {
                let done = self.close(&mut *self.state.lock().await);
                done_tx.send(()).ok();
                done
            }
        }
    }

    fn close(&self, state: &mut ManagerState) -> bool {
        if state.closing {
            return false;
        }
        info!("Closing connection {}", self.key);
        state.closing = true;
        self.session_tx.send_replace(None);
        if state.session.is_none() {
            // Nothing open to wait for.
            self.finish(state);
            return true;
        }
        self.set_state(ConnectionState::Closing);
        if let Some(connection) = &state.connection {
            connection.close();
        }
        false
    }

    async fn handle_event(&self, event: ConnectionEvent) -> bool {
        match event {
            ConnectionEvent::Opened(session) => {
                self.session_opened(session).await;
                false
            }
            ConnectionEvent::Closed(details) => {
                self.session_closed(&mut *self.state.lock().await, details)
            }
        }
    }

    async fn session_opened(&self, session: Arc<dyn Session>) {
        let (subscriptions, procedures) = {
            let mut state = self.state.lock().await;
            if state.closing {
                debug!(
                    "Ignoring session {} opened for {} while closing",
                    session.id(),
                    self.key
                );
                return;
            }
            if state.session.is_some() {
                warn!(
                    "Ignoring session {} opened for {} while another session is open",
                    session.id(),
                    self.key
                );
                return;
            }

            info!("Connection {} established session {}", self.key, session.id());
            state.session = Some(session.clone());
            state.connecting = false;
            self.set_state(ConnectionState::Connected);
            self.session_tx.send_replace(Some(session.clone()));
            self.emit(ConnectionStatus::Ready);
            (state.subscriptions.requests(), state.procedures.requests())
        };

        self.restore_session_state(&session, subscriptions, procedures)
            .await;
    }

    /// Replays every recorded request on a new session, in order.
    ///
    /// A failed request is skipped until the next session.
    async fn restore_session_state(
        &self,
        session: &Arc<dyn Session>,
        subscriptions: Vec<(String, SubscriptionRequest)>,
        procedures: Vec<(String, ProcedureRequest)>,
    ) {
        let counts = (subscriptions.len(), procedures.len());
        if self.restore_subscriptions(session, subscriptions).await
            && self.restore_registrations(session, procedures).await
        {
            debug!(
                "Connection {} replayed {} subscriptions and {} registrations",
                self.key, counts.0, counts.1
            );
        }
    }

    /// Attempts subscriptions on a session, in order.
    ///
    /// Returns `false` if the manager closed before all of them were attempted.
    async fn restore_subscriptions(
        &self,
        session: &Arc<dyn Session>,
        requests: Vec<(String, SubscriptionRequest)>,
    ) -> bool {
        for (id, request) in requests {
            let match_style: &str = request.options.match_style.into();
            let result = match self
                .unless_closed(session.subscribe(
                    &request.topic,
                    &request.options,
                    request.handler.clone(),
                ))
                .await
            {
                Some(result) => result,
                None => {
                    info!(
                        "Subscription {id} to {} on {} abandoned because the connection is closing",
                        request.topic, self.key
                    );
                    return false;
                }
            };
            let active = match result {
                Ok(subscription) => {
                    info!(
                        "Subscription {id} to {} ({match_style}) on {} succeeded",
                        request.topic, self.key
                    );
                    Some(subscription)
                }
                Err(err) => {
                    warn!(
                        "Subscription {id} to {} ({match_style}) on {} failed: {err}",
                        request.topic, self.key
                    );
                    None
                }
            };
            self.state
                .lock()
                .await
                .subscriptions
                .set_active(&id, active);
        }
        true
    }

    /// Attempts procedure registrations on a session, in order.
    ///
    /// Returns `false` if the manager closed before all of them were attempted.
    async fn restore_registrations(
        &self,
        session: &Arc<dyn Session>,
        requests: Vec<(String, ProcedureRequest)>,
    ) -> bool {
        for (id, request) in requests {
            let match_style: &str = request.options.match_style.into();
            let result = match self
                .unless_closed(session.register(
                    &request.procedure,
                    &request.options,
                    request.handler.clone(),
                ))
                .await
            {
                Some(result) => result,
                None => {
                    info!(
                        "Registration {id} of {} on {} abandoned because the connection is closing",
                        request.procedure, self.key
                    );
                    return false;
                }
            };
            let active = match result {
                Ok(registration) => {
                    info!(
                        "Registration {id} of {} ({match_style}) on {} succeeded",
                        request.procedure, self.key
                    );
                    Some(registration)
                }
                Err(err) => {
                    warn!(
                        "Registration {id} of {} ({match_style}) on {} failed: {err}",
                        request.procedure, self.key
                    );
                    None
                }
            };
            self.state.lock().await.procedures.set_active(&id, active);
        }
        true
    }

    /// Runs a session request, unless the manager is closed first.
    ///
    /// The state lock must not be held, so that the manager can be inspected while the request is
    /// in flight.
    async fn unless_closed<F, T>(&self, request: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = closed(self.close_rx.clone()) => None,
            result = request => Some(result),
        }
    }

    fn session_closed(&self, state: &mut ManagerState, details: CloseDetails) -> bool {
        let message = details.message.as_deref().unwrap_or_default();
        info!(
            "Connection {} closed ({}): {message}",
            self.key, details.reason
        );

        state.session = None;
        self.session_tx.send_replace(None);
        state.subscriptions.clear_active();
        state.procedures.clear_active();

        if state.closing {
            self.finish(state);
            return true;
        }

        self.emit(ConnectionStatus::Closed);
        if details.will_retry {
            state.connecting = true;
            self.set_state(ConnectionState::Connecting);
        } else {
            state.connecting = false;
            state.connection = None;
            self.set_state(ConnectionState::Disconnected);
            self.open_connection(state);
        }
        false
    }
}

/// Waits until the manager is closed or dropped.
async fn closed(mut close_rx: watch::Receiver<bool>) {
    close_rx.wait_for(|closing| *closing).await.ok();
}
