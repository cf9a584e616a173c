//! Long-lived connection to the capability provider.
//!
//! [`CapabilitySession`] owns the one live provider handle and publishes a
//! [`CapabilitySnapshot`] of what discovery found. Readers take the current
//! snapshot as an `Arc` without waiting on connection work; (re)connects
//! build a complete new snapshot and swap it in.
//!
//! [`CapabilitySession::spawn_maintenance`] runs the keep-alive loop as a
//! background task: it connects, pings on every tick, and (optionally)
//! reconnects with backoff after the connection is lost. The returned
//! [`MaintenanceHandle`] stops it and closes the provider.

pub mod error;
pub mod snapshot;

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::mcp::provider::{CapabilityProvider, ProviderConnector};
use crate::mcp::types::{CallToolResult, ResourceContents, ResourceDescriptor};

pub use error::SessionError;
pub use snapshot::CapabilitySnapshot;

/// Prompt id fetched during discovery unless configured otherwise.
pub const DEFAULT_PROMPT_ID: &str = "a2ui_system";

/// Connect + discovery timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 30;

/// Resource browsing operations forwarded to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRequest {
    List,
    Read { uri: String },
}

/// Result of a [`ResourceRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceResponse {
    Resources(Vec<ResourceDescriptor>),
    Contents(Vec<ResourceContents>),
}

/// Keep-alive and reconnection settings for the maintenance task.
#[derive(Debug, Clone)]
pub struct KeepAlivePolicy {
    /// Delay between liveness pings.
    pub interval: Duration,
    /// Whether to reconnect after the connection is lost or the first
    /// connect fails.
    pub reconnect: bool,
    /// First reconnect delay; doubles after every failed attempt.
    pub initial_backoff: Duration,
    /// Upper bound for the reconnect delay.
    pub max_backoff: Duration,
    /// A ping without an answer after this long counts as a lost connection.
    pub ping_timeout: Duration,
}

impl Default for KeepAlivePolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            reconnect: true,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(10),
        }
    }
}

/// Owner of the provider connection and the published capability snapshot.
pub struct CapabilitySession {
    connector: Arc<dyn ProviderConnector>,
    prompt_id: String,
    connect_timeout: Duration,
    snapshot: RwLock<Arc<CapabilitySnapshot>>,
    provider: RwLock<Option<Arc<dyn CapabilityProvider>>>,
    /// Serializes connect/disconnect so at most one provider is ever live.
    lifecycle: Mutex<()>,
}

impl std::fmt::Debug for CapabilitySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.current_snapshot();
        f.debug_struct("CapabilitySession")
            .field("endpoint", &self.connector.endpoint())
            .field("prompt_id", &self.prompt_id)
            .field("ready", &snapshot.is_ready())
            .field("tools", &snapshot.tools().len())
            .finish()
    }
}

impl CapabilitySession {
    pub fn new(connector: Arc<dyn ProviderConnector>) -> Self {
        Self {
            connector,
            prompt_id: DEFAULT_PROMPT_ID.to_string(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            snapshot: RwLock::new(Arc::new(CapabilitySnapshot::not_ready())),
            provider: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    /// Builder: set the prompt id fetched during discovery.
    pub fn with_prompt_id(mut self, prompt_id: impl Into<String>) -> Self {
        self.prompt_id = prompt_id.into();
        self
    }

    /// Builder: set the connect + discovery timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    // -----------------------------------------------------------------------
    // Snapshot
    // -----------------------------------------------------------------------

    /// The latest published snapshot (or the not-ready sentinel).
    pub fn current_snapshot(&self) -> Arc<CapabilitySnapshot> {
        self.snapshot.read().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot.read().is_ready()
    }

    fn publish(&self, snapshot: CapabilitySnapshot) {
        *self.snapshot.write() = Arc::new(snapshot);
    }

    fn live_provider(&self) -> Result<Arc<dyn CapabilityProvider>, SessionError> {
        self.provider
            .read()
            .clone()
            .ok_or(SessionError::ConnectionNotReady)
    }

    // -----------------------------------------------------------------------
    // Connect / Disconnect
    // -----------------------------------------------------------------------

    /// Open a connection, run discovery, and publish a ready snapshot.
    ///
    /// Any previously live provider is closed first. On failure the session
    /// is left not ready and the error is logged and returned.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let _guard = self.lifecycle.lock().await;
        self.release().await;

        let endpoint = self.connector.endpoint();
        let started_at = Instant::now();
        log::info!("Connecting to capability provider at {}...", endpoint);

        let attempt = tokio::time::timeout(self.connect_timeout, self.open_and_discover()).await;
        let outcome = match attempt {
            Ok(outcome) => outcome,
            Err(_) => Err(SessionError::ConnectTimeout(self.connect_timeout.as_secs())),
        };

        match outcome {
            Ok((provider, snapshot)) => {
                log::info!(
                    "Capability provider ready: {} ({} tools, prompt '{}' {} chars, {}ms)",
                    endpoint,
                    snapshot.tools().len(),
                    self.prompt_id,
                    snapshot.system_prompt().len(),
                    started_at.elapsed().as_millis()
                );
                *self.provider.write() = Some(provider);
                self.publish(snapshot);
                Ok(())
            }
            Err(e) => {
                log::error!("Capability provider connection failed: {}: {}", endpoint, e);
                Err(e)
            }
        }
    }

    async fn open_and_discover(
        &self,
    ) -> Result<(Arc<dyn CapabilityProvider>, CapabilitySnapshot), SessionError> {
        let provider = self.connector.open().await?;
        match self.discover(provider.as_ref()).await {
            Ok(snapshot) => Ok((provider, snapshot)),
            Err(e) => {
                if let Err(close_err) = provider.close().await {
                    log::debug!("Closing half-open provider failed: {}", close_err);
                }
                Err(e)
            }
        }
    }

    async fn discover(&self, provider: &dyn CapabilityProvider) -> Result<CapabilitySnapshot, SessionError> {
        let tools = provider.list_tools().await?;
        log::info!("Discovered {} MCP tools.", tools.len());

        let prompt = provider
            .get_prompt(&self.prompt_id)
            .await
            .map_err(|source| SessionError::Prompt {
                id: self.prompt_id.clone(),
                source,
            })?;
        log::info!("Fetched system prompt '{}'.", self.prompt_id);

        CapabilitySnapshot::new(tools, prompt)
    }

    /// Mark the session not ready and close the live provider, if any.
    pub async fn disconnect(&self) {
        let _guard = self.lifecycle.lock().await;
        self.release().await;
    }

    async fn release(&self) {
        self.publish(CapabilitySnapshot::not_ready());
        let previous = self.provider.write().take();
        if let Some(provider) = previous {
            if let Err(e) = provider.close().await {
                log::warn!("Error closing capability provider {}: {}", provider.identifier(), e);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Forwarded operations
    // -----------------------------------------------------------------------

    /// Call a remote tool on the live provider.
    ///
    /// # Errors
    ///
    /// * [`SessionError::ConnectionNotReady`] without a live provider.
    /// * [`SessionError::RemoteTool`] if the provider reports `isError`.
    /// * [`SessionError::Provider`] for transport/protocol failures,
    ///   including the provider rejecting an unknown tool name.
    pub async fn invoke(&self, tool_name: &str, arguments: Value) -> Result<CallToolResult, SessionError> {
        let provider = self.live_provider()?;
        let result = provider.call_tool(tool_name, arguments).await?;
        if result.is_error {
            return Err(SessionError::RemoteTool {
                tool: tool_name.to_string(),
                content: result.content,
            });
        }
        Ok(result)
    }

    /// Forward a resource browsing request to the live provider.
    pub async fn fetch_resource(&self, request: ResourceRequest) -> Result<ResourceResponse, SessionError> {
        let provider = self.live_provider()?;
        match request {
            ResourceRequest::List => Ok(ResourceResponse::Resources(provider.list_resources().await?)),
            ResourceRequest::Read { uri } => {
                Ok(ResourceResponse::Contents(provider.read_resource(&uri).await?))
            }
        }
    }

    /// Ping the live provider.
    pub async fn ping(&self) -> Result<(), SessionError> {
        let provider = self.live_provider()?;
        provider.ping().await.map_err(SessionError::from)
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Spawn the background keep-alive task.
    pub fn spawn_maintenance(self: &Arc<Self>, policy: KeepAlivePolicy) -> MaintenanceHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.clone().maintain(policy, shutdown_rx));
        MaintenanceHandle { shutdown_tx, task }
    }

    async fn maintain(self: Arc<Self>, policy: KeepAlivePolicy, mut shutdown: watch::Receiver<bool>) {
        let mut state = ReconnectState::new(&policy);
        let mut ticker = tokio::time::interval(policy.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop_requested(&mut shutdown) => break,
                _ = ticker.tick() => {
                    // A hung ping or connect must not hold up shutdown.
                    tokio::select! {
                        _ = stop_requested(&mut shutdown) => break,
                        _ = self.tick(&policy, &mut state) => {}
                    }
                }
            }
        }

        if tokio::time::timeout(policy.ping_timeout, self.disconnect()).await.is_err() {
            log::warn!("Capability provider did not close within {:?}", policy.ping_timeout);
        }
        log::info!("Capability session maintenance stopped.");
    }

    /// One keep-alive step: ping a live connection, or (re)connect when due.
    async fn tick(&self, policy: &KeepAlivePolicy, state: &mut ReconnectState) {
        if self.is_ready() {
            let alive = match tokio::time::timeout(policy.ping_timeout, self.ping()).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    log::warn!("Capability provider keep-alive failed: {}", e);
                    false
                }
                Err(_) => {
                    log::warn!("Capability provider keep-alive timed out after {:?}", policy.ping_timeout);
                    false
                }
            };
            if !alive {
                self.disconnect().await;
                state.backoff = policy.initial_backoff;
                state.next_attempt = Instant::now();
            }
        } else if (!state.attempted || policy.reconnect) && Instant::now() >= state.next_attempt {
            state.attempted = true;
            match self.connect().await {
                Ok(()) => state.backoff = policy.initial_backoff,
                Err(_) => {
                    if policy.reconnect {
                        log::info!("Retrying capability provider connection in {:?}", state.backoff);
                    }
                    state.next_attempt = Instant::now() + state.backoff;
                    state.backoff = (state.backoff * 2).min(policy.max_backoff);
                }
            }
        }
    }
}

/// Reconnect bookkeeping of the maintenance task.
#[derive(Debug)]
struct ReconnectState {
    backoff: Duration,
    next_attempt: Instant,
    attempted: bool,
}

impl ReconnectState {
    fn new(policy: &KeepAlivePolicy) -> Self {
        Self {
            backoff: policy.initial_backoff,
            next_attempt: Instant::now(),
            attempted: false,
        }
    }
}

/// Resolves once shutdown was requested or the handle was dropped.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Handle to the background maintenance task.
#[derive(Debug)]
pub struct MaintenanceHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Stop the keep-alive loop and wait until the provider is closed.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            log::error!("Capability session maintenance task failed: {}", e);
        }
    }
}
