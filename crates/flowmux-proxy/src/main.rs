use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flowmux_core::fingerprint::types::Ja3Hash;
use flowmux_core::observer::ConnectionEvents;
use flowmux_core::{Address, Flowmux, FlowmuxConfig};

mod relay;

#[derive(Parser)]
#[command(name = "flowmux-proxy")]
#[command(about = "TCP front end that steers TLS clients to fallback backends by JA3 fingerprint")]
struct Cli {
    /// Address to accept client connections on
    #[arg(short, long, default_value = "0.0.0.0:8443")]
    listen: SocketAddr,

    /// Backend for connections that are not redirected (host:port)
    #[arg(short, long)]
    upstream: Address,

    /// TOML config file with `target_ja3` and `[[fallbacks]]`.
    /// Re-read on SIGHUP.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JA3 hash to redirect (overrides the config file)
    #[arg(long)]
    target_ja3: Option<Ja3Hash>,

    /// Fallback backend (host:port); repeat for more, last is tried first.
    /// Replaces the config file's list when given.
    #[arg(long = "fallback")]
    fallbacks: Vec<Address>,
}

impl Cli {
    fn load_config(&self) -> Result<FlowmuxConfig> {
        let mut config = match &self.config {
            Some(path) => FlowmuxConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => FlowmuxConfig::default(),
        };
        if let Some(hash) = &self.target_ja3 {
            config.target_ja3 = Some(hash.clone());
        }
        if !self.fallbacks.is_empty() {
            config.fallbacks = self.fallbacks.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = cli.load_config()?;
    let flowmux = Flowmux::new(&config);
    let events = Arc::new(ConnectionEvents::new());
    flowmux.attach(&events);

    info!(
        "target ja3: {}",
        config
            .target_ja3
            .as_ref()
            .map(Ja3Hash::as_str)
            .unwrap_or("(none)")
    );
    for addr in &config.fallbacks {
        info!("fallback: {}", addr);
    }

    let listen = cli.listen;
    let upstream = cli.upstream.clone();

    #[cfg(unix)]
    spawn_reload_on_sighup(cli, flowmux.clone())?;

    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;
    info!("flowmux listening on {}, upstream {}", listen, upstream);

    loop {
        let (stream, peer) = listener.accept().await?;
        let flowmux = flowmux.clone();
        let events = events.clone();
        let upstream = upstream.clone();

        tokio::spawn(async move {
            if let Err(e) = relay::handle(stream, peer, &upstream, &flowmux, &events).await {
                warn!("[{}] {:#}", peer, e);
            }
        });
    }
}

#[cfg(unix)]
fn spawn_reload_on_sighup(cli: Cli, flowmux: Flowmux) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            match cli.load_config() {
                Ok(config) => flowmux.configure(&config),
                Err(e) => warn!("config reload failed, keeping current state: {:#}", e),
            }
        }
    });
    Ok(())
}
