//! Key layout.

use byteorder::{BigEndian, ByteOrder};
use chime_core::error::{ChimeError, Result};

pub const CURSOR_KEY: &[u8] = b"meta/cursor";

/// One key range per entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Groups,
    Rules,
    Triggers,
    Jobs,
    Resources,
}

impl Namespace {
    pub fn prefix(&self) -> &'static [u8] {
        match self {
            Self::Groups => b"groups/",
            Self::Rules => b"rules/",
            Self::Triggers => b"triggers/",
            Self::Jobs => b"jobs/",
            Self::Resources => b"resources/",
        }
    }

    pub fn key(&self, id: u64) -> Vec<u8> {
        let prefix = self.prefix();
        let mut key = Vec::with_capacity(prefix.len() + 8);
        key.extend_from_slice(prefix);
        key.extend_from_slice(&encode_id(id));
        key
    }

    /// Recover the identifier from a key of this namespace.
    pub fn parse_id(&self, key: &[u8]) -> Result<u64> {
        let rest = key.strip_prefix(self.prefix()).ok_or_else(|| {
            ChimeError::Decode(format!("key {:?} is outside {self:?}", String::from_utf8_lossy(key)))
        })?;
        decode_id(rest)
    }
}

pub fn encode_id(id: u64) -> [u8; 8] {
    let mut buf = [0u8; 8];
    BigEndian::write_u64(&mut buf, id);
    buf
}

pub fn decode_id(bytes: &[u8]) -> Result<u64> {
    if bytes.len() != 8 {
        return Err(ChimeError::Decode(format!(
            "identifier must be 8 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(BigEndian::read_u64(bytes))
}
