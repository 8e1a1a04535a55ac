//! Minimaler ASN.1 DER Reader
//!
//! Liest Tag-Length-Value Tripel aus einem Puffer, gerade genug um einen
//! PKCS#8-Container und ein verschachteltes SEC1 `ECPrivateKey` zu oeffnen.
//! Nicht validierend: indefinite-length BER wird nicht unterstuetzt.
//!
//! ## Laengen
//! ```text
//! 0x00..=0x7F           Kurzform, Laenge direkt
//! 0x80 | n, [n Bytes]   Langform, n Bytes Big-Endian (1 <= n <= 4)
//! ```

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_SEQUENCE: u8 = 0x30;

const MAX_LENGTH_BYTES: usize = 4;

/// Ein gelesenes TLV-Element (borgt den Eingabepuffer)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub value: &'a [u8],
}

/// Cursor ueber einen DER-Puffer
#[derive(Debug, Clone)]
pub struct DerReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DerReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Liest das naechste TLV
    ///
    /// Bei Fehler bleibt der Cursor unveraendert.
    pub fn read_tlv(&mut self, expected_tag: Option<u8>) -> Option<Tlv<'a>> {
        let mut pos = self.pos;

        let tag = *self.buf.get(pos)?;
        if let Some(expected) = expected_tag {
            if tag != expected {
                return None;
            }
        }
        pos += 1;

        let first = *self.buf.get(pos)?;
        pos += 1;

        let len = if first & 0x80 == 0 {
            usize::from(first)
        } else {
            let n = usize::from(first & 0x7F);
            if n == 0 || n > MAX_LENGTH_BYTES {
                return None;
            }
            let bytes = self.buf.get(pos..pos.checked_add(n)?)?;
            pos += n;
            bytes
                .iter()
                .fold(0usize, |acc, b| (acc << 8) | usize::from(*b))
        };

        let end = pos.checked_add(len)?;
        let value = self.buf.get(pos..end)?;

        self.pos = end;
        Some(Tlv { tag, value })
    }

    /// Verbleibende, noch nicht gelesene Bytes
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
