pub mod clienthello;
pub mod ja3;
pub mod types;
pub mod wire;

/// Errors raised while decoding or fingerprinting a ClientHello.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FingerprintError {
    #[error("not a TLS handshake record")]
    NotHandshake,
    #[error("not a ClientHello message")]
    NotClientHello,
    #[error("malformed handshake: {0}")]
    MalformedHandshake(String),
    #[error("extension {0} missing from ClientHello")]
    MissingExtension(u16),
    #[error("unsupported TLS version 0x{0:04x}")]
    UnsupportedVersion(u16),
}
