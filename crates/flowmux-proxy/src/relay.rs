use std::io;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use flowmux_core::observer::{ConnectionCompleted, ConnectionEvents};
use flowmux_core::routing::FailureKind;
use flowmux_core::{Address, Flowmux, RoutingDecision};

const TLS_HEADER_LEN: usize = 5;
const MAX_RECORD_LEN: usize = 16384;

/// Steer one client connection: read its first TLS record, pick a backend,
/// connect, report the outcome, then relay bytes both ways.
pub async fn handle(
    mut client: TcpStream,
    peer: SocketAddr,
    upstream: &Address,
    flowmux: &Flowmux,
    events: &ConnectionEvents,
) -> Result<()> {
    let hello = read_first_record(&mut client)
        .await
        .context("failed to read ClientHello")?;

    let decision = flowmux.on_client_hello(&Address::from(peer), upstream, &hello);
    let backend = match decision {
        RoutingDecision::Redirect(addr) => addr,
        RoutingDecision::Passthrough => upstream.clone(),
    };

    let mut server = match TcpStream::connect((backend.host.as_str(), backend.port)).await {
        Ok(s) => {
            events.publish(&ConnectionCompleted::succeeded(backend.clone()));
            s
        }
        Err(e) => {
            let kind = FailureKind::from(&e);
            events.publish(&ConnectionCompleted::failed(backend.clone(), kind.to_string()));
            return Err(e).with_context(|| format!("connect to {} failed", backend));
        }
    };
    info!("[{}] relaying to {}", peer, backend);

    server.write_all(&hello).await?;
    match tokio::io::copy_bidirectional(&mut client, &mut server).await {
        Ok((up, down)) => debug!("[{}] closed: {} bytes up, {} bytes down", peer, up, down),
        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
            debug!("[{}] reset by peer", peer)
        }
        Err(e) => warn!("[{}] relay error: {}", peer, e),
    }
    Ok(())
}

/// Read the TLS record header and, for a handshake record of sane size,
/// its body. Non-TLS or oversized input returns just the header so the
/// caller can still forward it.
async fn read_first_record(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    // content_type(1) + version(2) + length(2)
    let mut buf = vec![0u8; TLS_HEADER_LEN];
    stream.read_exact(&mut buf).await?;

    if buf[0] != 0x16 {
        return Ok(buf);
    }

    let record_len = u16::from_be_bytes([buf[3], buf[4]]) as usize;
    if record_len > MAX_RECORD_LEN {
        return Ok(buf);
    }

    buf.resize(TLS_HEADER_LEN + record_len, 0);
    stream.read_exact(&mut buf[TLS_HEADER_LEN..]).await?;
    Ok(buf)
}
