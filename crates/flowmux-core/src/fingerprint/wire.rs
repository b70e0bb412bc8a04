use crate::fingerprint::FingerprintError;

/// Big-endian cursor over a handshake byte slice.
///
/// Every read is bounds-checked; running past the end yields
/// `FingerprintError::MalformedHandshake` naming the field being read.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self, field: &str) -> Result<u8, FingerprintError> {
        let b = self.read_bytes(1, field)?;
        Ok(b[0])
    }

    pub fn read_u16(&mut self, field: &str) -> Result<u16, FingerprintError> {
        let b = self.read_bytes(2, field)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u24(&mut self, field: &str) -> Result<u32, FingerprintError> {
        let b = self.read_bytes(3, field)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn read_bytes(&mut self, len: usize, field: &str) -> Result<&'a [u8], FingerprintError> {
        if len > self.remaining() {
            return Err(FingerprintError::MalformedHandshake(format!(
                "{}: need {} bytes, {} remaining",
                field,
                len,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Read a `{u8 length}{payload}` block.
    pub fn read_u8_prefixed(&mut self, field: &str) -> Result<&'a [u8], FingerprintError> {
        let len = self.read_u8(field)? as usize;
        self.read_bytes(len, field)
    }

    /// Read a `{u16 length}{payload}` block.
    pub fn read_u16_prefixed(&mut self, field: &str) -> Result<&'a [u8], FingerprintError> {
        let len = self.read_u16(field)? as usize;
        self.read_bytes(len, field)
    }

    /// Fail unless every byte has been consumed.
    pub fn finish(&self, field: &str) -> Result<(), FingerprintError> {
        if self.is_empty() {
            return Ok(());
        }
        Err(FingerprintError::MalformedHandshake(format!(
            "{}: {} trailing bytes",
            field,
            self.remaining()
        )))
    }
}

/// Decode a `{u16 length}{u16 elements...}` list, e.g. the supported_groups
/// extension body. The list must fill `data` exactly.
pub fn parse_u16_list(data: &[u8], field: &str) -> Result<Vec<u16>, FingerprintError> {
    let mut reader = Reader::new(data);
    let payload = reader.read_u16_prefixed(field)?;
    reader.finish(field)?;
    if payload.len() % 2 != 0 {
        return Err(FingerprintError::MalformedHandshake(format!(
            "{}: list length {} is not a multiple of 2",
            field,
            payload.len()
        )));
    }
    Ok(payload
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect())
}

/// Decode a `{u8 length}{u8 elements...}` list, e.g. the ec_point_formats
/// extension body. The list must fill `data` exactly.
pub fn parse_u8_list(data: &[u8], field: &str) -> Result<Vec<u8>, FingerprintError> {
    let mut reader = Reader::new(data);
    let payload = reader.read_u8_prefixed(field)?;
    reader.finish(field)?;
    Ok(payload.to_vec())
}
