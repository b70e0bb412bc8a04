use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::FlowmuxConfig;
use crate::fingerprint::ja3::compute_ja3;
use crate::fingerprint::types::{ClientHello, Ja3Hash};
use crate::routing::{Address, FailureKind, RoutingDecision};

#[derive(Debug, Default)]
struct State {
    /// Fallback targets; the last entry is the active redirect target.
    candidates: Vec<Address>,
    target: Option<Ja3Hash>,
}

/// Fingerprint-driven steering with failure-driven candidate eviction.
///
/// `evaluate` only reads; `on_connection_failure` is the only mutator and
/// pops from the tail under the write lock. Both are safe to call from any
/// number of threads.
#[derive(Debug, Default)]
pub struct RoutingStrategy {
    state: RwLock<State>,
}

impl RoutingStrategy {
    pub fn new(candidates: Vec<Address>, target: Option<Ja3Hash>) -> Self {
        Self {
            state: RwLock::new(State { candidates, target }),
        }
    }

    pub fn from_config(config: &FlowmuxConfig) -> Self {
        Self::new(config.fallbacks.clone(), config.target_ja3.clone())
    }

    /// Replace candidates and target in one step.
    pub fn reconfigure(&self, config: &FlowmuxConfig) {
        let mut state = self.state.write();
        state.candidates = config.fallbacks.clone();
        state.target = config.target_ja3.clone();
        drop(state);
        info!(
            "strategy reconfigured: {} fallback(s), target {}",
            config.fallbacks.len(),
            config
                .target_ja3
                .as_ref()
                .map(Ja3Hash::as_str)
                .unwrap_or("(none)")
        );
    }

    /// Fingerprint `hello` and decide where the connection goes.
    ///
    /// Fails open: a hello that cannot be fingerprinted passes through.
    pub fn evaluate(
        &self,
        client_addr: &Address,
        server_addr: &Address,
        hello: &ClientHello,
    ) -> RoutingDecision {
        let ja3 = match compute_ja3(hello) {
            Ok(ja3) => ja3,
            Err(e) => {
                warn!(
                    "client {} -> server {}: fingerprint failed ({}), passing through",
                    client_addr, server_addr, e
                );
                return RoutingDecision::Passthrough;
            }
        };

        info!(
            "client {} -> server {}, ja3 {}",
            client_addr, server_addr, ja3.hash
        );
        debug!("ja3 raw {}", ja3.raw_string);

        let decision = self.decide(&ja3.hash);
        info!("decision {}", decision);
        decision
    }

    /// Match a computed hash against the target. Redirects only when a
    /// candidate is available.
    pub fn decide(&self, hash: &Ja3Hash) -> RoutingDecision {
        let state = self.state.read();
        match (&state.target, state.candidates.last()) {
            (Some(target), Some(last)) if target == hash => RoutingDecision::Redirect(last.clone()),
            _ => RoutingDecision::Passthrough,
        }
    }

    /// Evict the tail candidate if it is `address` and the failure was a
    /// refusal. Returns whether a candidate was removed.
    pub fn on_connection_failure(&self, address: &Address, error: &str) -> bool {
        let kind = FailureKind::classify(error);
        if !kind.is_refused() {
            debug!("connection to {} failed ({}), not a refusal", address, error);
            return false;
        }

        let mut state = self.state.write();
        if state.candidates.last() != Some(address) {
            drop(state);
            debug!("connection to {} refused, not the active fallback", address);
            return false;
        }
        state.candidates.pop();
        let remaining = state.candidates.len();
        drop(state);

        info!(
            "fallback {} refused connection, evicted ({} remaining)",
            address, remaining
        );
        true
    }

    /// Snapshot of the current candidate list, head first.
    pub fn candidates(&self) -> Vec<Address> {
        self.state.read().candidates.clone()
    }

    pub fn target(&self) -> Option<Ja3Hash> {
        self.state.read().target.clone()
    }
}
