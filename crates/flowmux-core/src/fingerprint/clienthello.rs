use tls_parser::nom::Err as NomErr;
use tls_parser::{
    parse_tls_message_handshake, parse_tls_plaintext, TlsClientHelloContents, TlsMessage,
    TlsMessageHandshake, TlsRecordType,
};

use crate::fingerprint::types::{ClientHello, Extension, TlsVersion};
use crate::fingerprint::wire::Reader;
use crate::fingerprint::FingerprintError;

const CONTENT_TYPE_HANDSHAKE: u8 = 0x16;
const HANDSHAKE_TYPE_CLIENT_HELLO: u8 = 0x01;

/// Parse raw bytes into a `ClientHello`.
///
/// Accepts either a full TLS record starting with the record header
/// (content type 0x16), or a bare handshake message starting with the
/// handshake header (type 0x01), which is what a terminating proxy hands
/// over after it has stripped the record layer.
pub fn parse_client_hello(raw: &[u8]) -> Result<ClientHello, FingerprintError> {
    match raw.first() {
        Some(&CONTENT_TYPE_HANDSHAKE) => parse_record(raw),
        Some(&HANDSHAKE_TYPE_CLIENT_HELLO) => parse_handshake(raw),
        Some(_) => Err(FingerprintError::NotHandshake),
        None => Err(FingerprintError::MalformedHandshake("empty input".to_string())),
    }
}

fn parse_record(raw: &[u8]) -> Result<ClientHello, FingerprintError> {
    let (_, record) = parse_tls_plaintext(raw).map_err(nom_error)?;

    if record.hdr.record_type != TlsRecordType::Handshake {
        return Err(FingerprintError::NotHandshake);
    }

    for msg in &record.msg {
        if let TlsMessage::Handshake(TlsMessageHandshake::ClientHello(ch)) = msg {
            // content_type(1) + version(2), then the length-prefixed fragment
            let mut reader = Reader::new(raw);
            reader.read_bytes(3, "record header")?;
            let fragment = reader.read_u16_prefixed("record fragment")?;
            return from_contents(ch, fragment);
        }
    }

    Err(FingerprintError::NotClientHello)
}

fn parse_handshake(raw: &[u8]) -> Result<ClientHello, FingerprintError> {
    let (_, msg) = parse_tls_message_handshake(raw).map_err(nom_error)?;
    match msg {
        TlsMessage::Handshake(TlsMessageHandshake::ClientHello(ch)) => from_contents(&ch, raw),
        _ => Err(FingerprintError::NotClientHello),
    }
}

/// `message` starts at the ClientHello handshake header.
fn from_contents(
    ch: &TlsClientHelloContents,
    message: &[u8],
) -> Result<ClientHello, FingerprintError> {
    let version = TlsVersion::from(ch.version.0);
    if version.major != 3 {
        return Err(FingerprintError::UnsupportedVersion(version.as_u16()));
    }

    let extensions = match extension_block(message)? {
        Some(block) => parse_extension_block(block)?,
        None => Vec::new(),
    };

    Ok(ClientHello {
        version,
        cipher_suites: ch.ciphers.iter().map(|c| c.0).collect(),
        extensions,
    })
}

/// Walk the ClientHello body and return its extensions block.
///
/// The decoder in `tls-parser` tolerates an extensions length that
/// disagrees with the handshake length (too long reads as "no extensions",
/// too short drops the tail). Every length here must add up exactly.
fn extension_block(message: &[u8]) -> Result<Option<&[u8]>, FingerprintError> {
    let mut header = Reader::new(message);
    if header.read_u8("handshake type")? != HANDSHAKE_TYPE_CLIENT_HELLO {
        return Err(FingerprintError::NotClientHello);
    }
    let len = header.read_u24("handshake length")? as usize;
    let mut body = Reader::new(header.read_bytes(len, "handshake body")?);

    body.read_bytes(2 + 32, "version and random")?;
    body.read_u8_prefixed("session_id")?;
    body.read_u16_prefixed("cipher_suites")?;
    body.read_u8_prefixed("compression_methods")?;
    if body.is_empty() {
        return Ok(None);
    }
    let block = body.read_u16_prefixed("extensions")?;
    body.finish("ClientHello body")?;
    Ok(Some(block))
}

/// Split the extensions block (without its outer length prefix) into
/// `{type u16}{length u16}{body}` entries, preserving wire order.
fn parse_extension_block(block: &[u8]) -> Result<Vec<Extension>, FingerprintError> {
    let mut reader = Reader::new(block);
    let mut extensions = Vec::new();
    while !reader.is_empty() {
        let kind = reader.read_u16("extension type")?;
        let payload = reader.read_u16_prefixed("extension body")?;
        extensions.push(Extension {
            kind,
            payload: payload.to_vec(),
        });
    }
    Ok(extensions)
}

fn nom_error<E: std::fmt::Debug>(e: NomErr<E>) -> FingerprintError {
    match e {
        NomErr::Incomplete(_) => {
            FingerprintError::MalformedHandshake("truncated handshake".to_string())
        }
        _ => FingerprintError::MalformedHandshake(format!("{:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a ClientHello handshake message (no record header).
    fn handshake(version: u16, ciphers: &[u16], extensions: &[(u16, Vec<u8>)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&version.to_be_bytes());
        body.extend_from_slice(&[0x42; 32]); // random
        body.push(0); // session_id
        body.extend_from_slice(&((ciphers.len() * 2) as u16).to_be_bytes());
        for c in ciphers {
            body.extend_from_slice(&c.to_be_bytes());
        }
        body.extend_from_slice(&[1, 0]); // compression: null
        let mut ext = Vec::new();
        for (kind, payload) in extensions {
            ext.extend_from_slice(&kind.to_be_bytes());
            ext.extend_from_slice(&(payload.len() as u16).to_be_bytes());
            ext.extend_from_slice(payload);
        }
        body.extend_from_slice(&(ext.len() as u16).to_be_bytes());
        body.extend_from_slice(&ext);

        let mut msg = vec![HANDSHAKE_TYPE_CLIENT_HELLO];
        msg.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        msg.extend_from_slice(&body);
        msg
    }

    fn record(handshake: &[u8]) -> Vec<u8> {
        let mut out = vec![CONTENT_TYPE_HANDSHAKE, 0x03, 0x01];
        out.extend_from_slice(&(handshake.len() as u16).to_be_bytes());
        out.extend_from_slice(handshake);
        out
    }

    fn groups(values: &[u16]) -> Vec<u8> {
        let mut out = ((values.len() * 2) as u16).to_be_bytes().to_vec();
        for v in values {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out
    }

    fn formats(values: &[u8]) -> Vec<u8> {
        let mut out = vec![values.len() as u8];
        out.extend_from_slice(values);
        out
    }

    fn sample_extensions() -> Vec<(u16, Vec<u8>)> {
        vec![
            (0x0a0a, vec![]),
            (0x000a, groups(&[0x0a0a, 0x0017])),
            (0x000b, formats(&[0x00])),
        ]
    }

    #[test]
    fn parses_full_record() {
        let raw = record(&handshake(0x0303, &[0x0a0a, 0x1301, 0x1302], &sample_extensions()));
        let hello = parse_client_hello(&raw).unwrap();

        assert_eq!(hello.version, TlsVersion { major: 3, minor: 3 });
        assert_eq!(hello.cipher_suites, vec![0x0a0a, 0x1301, 0x1302]);
        assert_eq!(hello.extension_types().collect::<Vec<_>>(), vec![0x0a0a, 10, 11]);
        assert_eq!(hello.supported_groups().unwrap(), vec![0x0a0a, 0x0017]);
        assert_eq!(hello.ec_point_formats().unwrap(), vec![0x00]);
    }

    #[test]
    fn parses_bare_handshake() {
        let msg = handshake(0x0303, &[0x1301], &sample_extensions());
        let from_msg = parse_client_hello(&msg).unwrap();
        let from_record = parse_client_hello(&record(&msg)).unwrap();
        assert_eq!(from_msg, from_record);
    }

    #[test]
    fn no_extensions() {
        let raw = record(&handshake(0x0303, &[0x1301], &[]));
        let hello = parse_client_hello(&raw).unwrap();
        assert!(hello.extensions.is_empty());
    }

    #[test]
    fn rejects_non_handshake() {
        let raw = [0x17, 0x03, 0x03, 0x00, 0x01, 0x00];
        assert_eq!(parse_client_hello(&raw), Err(FingerprintError::NotHandshake));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            parse_client_hello(&[]),
            Err(FingerprintError::MalformedHandshake(_))
        ));
    }

    #[test]
    fn truncated_record_is_malformed() {
        let raw = record(&handshake(0x0303, &[0x1301], &sample_extensions()));
        let cut = &raw[..raw.len() - 10];
        assert!(matches!(
            parse_client_hello(cut),
            Err(FingerprintError::MalformedHandshake(_))
        ));
    }

    #[test]
    fn extension_length_past_block_is_malformed() {
        // Bump the length high byte: body now claims 0x0801 bytes, 1 follows.
        let mut msg = handshake(0x0303, &[0x1301], &[(0x000b, vec![0x00])]);
        let len = msg.len();
        msg[len - 3] = 0x08;
        let err = parse_client_hello(&record(&msg)).unwrap_err();
        assert!(matches!(err, FingerprintError::MalformedHandshake(_)));
    }

    /// Offset of the extensions length field in a message from `handshake`.
    fn extensions_len_offset(cipher_count: usize) -> usize {
        4 + 2 + 32 + 1 + 2 + cipher_count * 2 + 2
    }

    fn with_extensions_len_delta(msg: &mut [u8], cipher_count: usize, delta: i32) {
        let at = extensions_len_offset(cipher_count);
        let len = u16::from_be_bytes([msg[at], msg[at + 1]]) as i32 + delta;
        msg[at..at + 2].copy_from_slice(&(len as u16).to_be_bytes());
    }

    #[test]
    fn extensions_length_too_short_is_malformed() {
        // Declared block ends right before the trailing empty 0x0017 extension.
        let mut extensions = sample_extensions();
        extensions.push((0x0017, vec![]));
        let mut msg = handshake(0x0303, &[0x0a0a, 0x1301], &extensions);
        with_extensions_len_delta(&mut msg, 2, -4);

        for raw in [msg.clone(), record(&msg)] {
            assert!(matches!(
                parse_client_hello(&raw),
                Err(FingerprintError::MalformedHandshake(_))
            ));
        }
    }

    #[test]
    fn extensions_length_too_long_is_malformed() {
        let mut msg = handshake(0x0303, &[0x0a0a, 0x1301], &sample_extensions());
        with_extensions_len_delta(&mut msg, 2, 50);

        for raw in [msg.clone(), record(&msg)] {
            assert!(matches!(
                parse_client_hello(&raw),
                Err(FingerprintError::MalformedHandshake(_))
            ));
        }
    }

    #[test]
    fn group_list_with_trailing_bytes_is_malformed() {
        let mut groups_blob = groups(&[0x0a0a, 0x0017]);
        groups_blob.extend_from_slice(&[0xde, 0xad]);
        let raw = record(&handshake(
            0x0303,
            &[0x1301],
            &[(0x000a, groups_blob), (0x000b, formats(&[0x00]))],
        ));
        let hello = parse_client_hello(&raw).unwrap();
        assert!(matches!(
            hello.supported_groups(),
            Err(FingerprintError::MalformedHandshake(_))
        ));
    }

    #[test]
    fn rejects_unknown_major_version() {
        let raw = record(&handshake(0x0203, &[0x1301], &sample_extensions()));
        assert_eq!(
            parse_client_hello(&raw),
            Err(FingerprintError::UnsupportedVersion(0x0203))
        );
    }
}
