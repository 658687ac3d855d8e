//! # Chime Store
//! The system of record: an ordered key-value store with prefix scans,
//! the key layout of every entry namespace, and the persisted identifier
//! cursor.
//!
//! ```text
//! meta/cursor        → u64 (big-endian)
//! groups/<id>        → Group record
//! rules/<id>         → Rule record
//! triggers/<id>      → Trigger record
//! jobs/<id>          → Job record
//! resources/<id>     → Resource record
//! ```
//! `<id>` is the big-endian u64, so a prefix scan walks ids in ascending order.

pub mod codec;
pub mod cursor;
pub mod keys;
pub mod kv;
pub mod sqlite;

pub use codec::{decode_record, encode_record};
pub use cursor::Cursor;
pub use keys::{CURSOR_KEY, Namespace};
pub use kv::{KvStore, MemoryStore};
pub use sqlite::SqliteStore;
