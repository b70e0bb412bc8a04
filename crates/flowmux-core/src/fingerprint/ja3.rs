use md5::{Digest, Md5};

use crate::fingerprint::types::{ClientHello, Ja3Hash, Ja3Result};
use crate::fingerprint::FingerprintError;

/// Compute the JA3 fingerprint from a parsed ClientHello.
///
/// JA3 format: MD5(SSLVersion,Ciphers,Extensions,EllipticCurves,EcPointFormats)
///
/// - Fields separated by commas, values within a field by dashes, all decimal
/// - The first cipher suite, first extension and first supported group are
///   dropped unconditionally: clients put their reserved (GREASE) entry there.
///   Point formats are kept whole.
/// - Extensions 10 and 11 must both be present
pub fn compute_ja3(hello: &ClientHello) -> Result<Ja3Result, FingerprintError> {
    let groups = hello.supported_groups()?;
    let point_formats = hello.ec_point_formats()?;

    let extensions: Vec<u16> = hello.extension_types().collect();

    let raw_string = [
        hello.version.as_u16().to_string(),
        join(skip_first(&hello.cipher_suites)),
        join(skip_first(&extensions)),
        join(skip_first(&groups)),
        join(&point_formats),
    ]
    .join(",");

    let mut hasher = Md5::new();
    hasher.update(raw_string.as_bytes());
    let hash = Ja3Hash::from_digest(&hasher.finalize());

    Ok(Ja3Result { hash, raw_string })
}

fn skip_first<T>(values: &[T]) -> &[T] {
    values.get(1..).unwrap_or(&[])
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("-")
}
