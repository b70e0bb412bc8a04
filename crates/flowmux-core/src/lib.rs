//! JA3 fingerprinting of TLS ClientHellos and fingerprint-driven backend
//! steering with self-healing fallback eviction.

pub mod config;
pub mod fingerprint;
pub mod flowmux;
pub mod observer;
pub mod routing;

pub use config::{ConfigError, FlowmuxConfig};
pub use fingerprint::FingerprintError;
pub use flowmux::Flowmux;
pub use routing::{Address, RoutingDecision};
