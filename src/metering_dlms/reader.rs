use super::DlmsParseError;

/// Cursor over one telegram buffer.
///
/// All multi-byte reads are big-endian. Running past the end of the buffer
/// yields `UnexpectedEndOfInput`, never a panic; the buffer itself is never
/// modified.
pub struct TelegramReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TelegramReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor offset, mainly for diagnostics.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DlmsParseError> {
        if self.pos + n > self.data.len() {
            return Err(DlmsParseError::UnexpectedEndOfInput);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, DlmsParseError> {
        let b = self.read_bytes(1)?;
        Ok(b[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DlmsParseError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, DlmsParseError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// One length byte L, then L raw bytes.
    pub fn read_length_prefixed_bytes(&mut self) -> Result<&'a [u8], DlmsParseError> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }

    /// One length byte L, then L bytes decoded as text (lossy UTF-8).
    pub fn read_length_prefixed_string(&mut self) -> Result<(usize, String), DlmsParseError> {
        let bytes = self.read_length_prefixed_bytes()?;
        Ok((bytes.len(), String::from_utf8_lossy(bytes).into_owned()))
    }
}
