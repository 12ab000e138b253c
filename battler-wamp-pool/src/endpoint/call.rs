use std::{
    fmt::Debug,
    sync::Arc,
};

use log::{
    debug,
    warn,
};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    connection::ConnectionManager,
    core::{
        arguments::ArgumentParts,
        options::CallOptions,
    },
    endpoint::{
        client::{
            WampClient,
            require_client,
        },
        error::EndpointError,
        message::{
            CallRequest,
            CallResponse,
        },
        status::{
            EndpointStatus,
            StatusTracker,
        },
    },
};

/// Configuration for a [`CallEndpoint`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct CallConfig {
    /// The procedure to call.
    ///
    /// Requests are ignored if unset.
    #[serde(default)]
    pub procedure: Option<String>,
}

/// An endpoint that calls a procedure for each request, and delivers the results.
pub struct CallEndpoint {
    id: String,
    procedure: Option<String>,
    client: Arc<WampClient>,
    connection: Arc<ConnectionManager>,
    status: StatusTracker,
    results_tx: mpsc::UnboundedSender<CallResponse>,
}

impl Debug for CallEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallEndpoint")
            .field("id", &self.id)
            .field("procedure", &self.procedure)
            .field("status", &self.status.status())
            .finish_non_exhaustive()
    }
}

impl CallEndpoint {
    /// Creates a new endpoint on the client's shared connection.
    ///
    /// Successful results are sent to `results_tx`.
    pub async fn new<S>(
        id: S,
        config: CallConfig,
        client: Option<Arc<WampClient>>,
        results_tx: mpsc::UnboundedSender<CallResponse>,
    ) -> Result<Self, EndpointError>
    where
        S: Into<String>,
    {
        let id = id.into();
        let client = require_client(&id, client)?;
        let connection = client.connection().await;
        let status = StatusTracker::start(&id, &connection);
        Ok(Self {
            id,
            procedure: config.procedure,
            client,
            connection,
            status,
            results_tx,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> EndpointStatus {
        self.status.status()
    }

    pub fn status_tracker(&self) -> &StatusTracker {
        &self.status
    }

    /// Calls the procedure with the request's arguments.
    ///
    /// The call proceeds in the background. Returns whether the call was attempted, which requires
    /// a procedure and an open session. Rejected calls are logged and deliver no result.
    pub fn handle(&self, request: CallRequest) -> bool {
        let procedure = match &self.procedure {
            Some(procedure) => procedure.clone(),
            None => {
                debug!("Endpoint {} has no procedure to call", self.id);
                return false;
            }
        };
        let ArgumentParts { args, kwargs } = ArgumentParts::from_payload(&request.payload);
        let options = request
            .options
            .as_ref()
            .map(CallOptions::from_value)
            .unwrap_or_default();
        let pending = match self
            .connection
            .call_procedure(procedure, args, kwargs, options)
        {
            Some(pending) => pending,
            None => return false,
        };

        let id = self.id.clone();
        let results_tx = self.results_tx.clone();
        tokio::spawn(async move {
            let procedure = pending.procedure().to_owned();
            match pending.result().await {
                Ok(result) => {
                    let payload = ArgumentParts::new(result.arguments, result.arguments_keyword);
                    debug!("Endpoint {id} call to {procedure} returned {payload:?}");
                    results_tx.send(CallResponse { payload }).ok();
                }
                Err(err) => warn!("Endpoint {id} call to {procedure} failed: {err}"),
            }
        });
        true
    }

    /// Closes the shared connection of the endpoint's client.
    pub async fn close(&self) {
        self.client.close().await
    }
}
