//! Persisted identifier cursor.

use byteorder::{BigEndian, ByteOrder};
use chime_core::error::{ChimeError, Result};

use crate::keys::CURSOR_KEY;
use crate::kv::KvStore;

/// Monotonic id source. Every increment is written to the store before the
/// new value is handed out, so an id is never issued twice across restarts.
#[derive(Debug)]
pub struct Cursor {
    value: u64,
}

impl Cursor {
    /// Read the persisted value, 0 when the store is fresh.
    pub fn load(store: &dyn KvStore) -> Result<Self> {
        let value = match store.get(CURSOR_KEY)? {
            Some(bytes) if bytes.len() == 8 => BigEndian::read_u64(&bytes),
            Some(bytes) => {
                return Err(ChimeError::Decode(format!(
                    "cursor must be 8 bytes, got {}",
                    bytes.len()
                )));
            }
            None => 0,
        };
        Ok(Self { value })
    }

    pub fn current(&self) -> u64 {
        self.value
    }

    /// Allocate the next id.
    pub fn next(&mut self, store: &dyn KvStore) -> Result<u64> {
        let next = self
            .value
            .checked_add(1)
            .ok_or_else(|| ChimeError::Internal("identifier space exhausted".into()))?;
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, next);
        store.put(CURSOR_KEY, &buf)?;
        self.value = next;
        Ok(next)
    }

    /// Move past an id found in the store, in case the cursor record lags
    /// behind the entries.
    pub fn observe(&mut self, id: u64) {
        if id > self.value {
            tracing::warn!("⚠️ Cursor {} behind stored id {id}, advancing", self.value);
            self.value = id;
        }
    }
}
