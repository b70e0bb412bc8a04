//! Connection lifecycle events.
//!
//! The host transport owns a [`ConnectionEvents`] registry and publishes a
//! [`ConnectionCompleted`] after every outbound connection attempt.
//! [`FailureObserver`] is the listener that feeds failures back into the
//! routing strategy.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::routing::{Address, RoutingStrategy};

/// Outcome of one outbound connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCompleted {
    pub address: Address,
    /// Transport error description, `None` on success.
    pub error: Option<String>,
}

impl ConnectionCompleted {
    pub fn succeeded(address: Address) -> Self {
        Self {
            address,
            error: None,
        }
    }

    pub fn failed(address: Address, error: impl Into<String>) -> Self {
        Self {
            address,
            error: Some(error.into()),
        }
    }
}

pub trait ConnectionListener: Send + Sync {
    fn connection_completed(&self, event: &ConnectionCompleted);
}

/// Listener registry for connection lifecycle events.
#[derive(Default)]
pub struct ConnectionEvents {
    listeners: RwLock<Vec<Arc<dyn ConnectionListener>>>,
}

impl ConnectionEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn ConnectionListener>) {
        self.listeners.write().push(listener);
    }

    /// Deliver `event` to every listener on the calling thread.
    pub fn publish(&self, event: &ConnectionCompleted) {
        // Clone out so listeners run without the registry lock held.
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.connection_completed(event);
        }
    }
}

/// Forwards failed connection attempts to [`RoutingStrategy::on_connection_failure`].
pub struct FailureObserver {
    strategy: Arc<RoutingStrategy>,
}

impl FailureObserver {
    pub fn new(strategy: Arc<RoutingStrategy>) -> Self {
        Self { strategy }
    }
}

impl ConnectionListener for FailureObserver {
    fn connection_completed(&self, event: &ConnectionCompleted) {
        match &event.error {
            Some(error) => {
                self.strategy.on_connection_failure(&event.address, error);
            }
            None => debug!("connection to {} established", event.address),
        }
    }
}
