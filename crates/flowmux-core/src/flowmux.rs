use std::sync::Arc;

use tracing::warn;

use crate::config::FlowmuxConfig;
use crate::fingerprint::clienthello::parse_client_hello;
use crate::observer::{ConnectionCompleted, ConnectionEvents, ConnectionListener, FailureObserver};
use crate::routing::{Address, RoutingDecision, RoutingStrategy};

/// Entry points for a host proxy runtime.
///
/// Cheap to clone; clones share one strategy.
#[derive(Clone)]
pub struct Flowmux {
    strategy: Arc<RoutingStrategy>,
    observer: Arc<FailureObserver>,
}

impl Flowmux {
    pub fn new(config: &FlowmuxConfig) -> Self {
        let strategy = Arc::new(RoutingStrategy::from_config(config));
        let observer = Arc::new(FailureObserver::new(strategy.clone()));
        Self { strategy, observer }
    }

    /// Register the failure feedback listener with the host's event registry.
    pub fn attach(&self, events: &ConnectionEvents) {
        events.subscribe(self.observer.clone());
    }

    /// Apply a new configuration at reconfiguration time.
    pub fn configure(&self, config: &FlowmuxConfig) {
        self.strategy.reconfigure(config);
    }

    /// Decide the route for an intercepted ClientHello.
    ///
    /// `raw_hello` may be a full TLS record or a bare handshake message.
    /// Anything that fails to parse passes through.
    pub fn on_client_hello(
        &self,
        client_address: &Address,
        server_address: &Address,
        raw_hello: &[u8],
    ) -> RoutingDecision {
        match parse_client_hello(raw_hello) {
            Ok(hello) => self.strategy.evaluate(client_address, server_address, &hello),
            Err(e) => {
                warn!(
                    "client {} -> server {}: ClientHello parse error ({}), passing through",
                    client_address, server_address, e
                );
                RoutingDecision::Passthrough
            }
        }
    }

    /// Report the outcome of an outbound connection attempt.
    pub fn on_connection_result(&self, address: &Address, error: Option<&str>) {
        let event = ConnectionCompleted {
            address: address.clone(),
            error: error.map(str::to_string),
        };
        self.observer.connection_completed(&event);
    }

    pub fn strategy(&self) -> &Arc<RoutingStrategy> {
        &self.strategy
    }
}
