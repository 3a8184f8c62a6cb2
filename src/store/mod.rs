//! The store operations the dump and restore engines consume.

use async_trait::async_trait;

pub use self::memory::{MemoryStore, StoredValue};
pub use self::redis::RedisStore;

use crate::types::{StoreResult, ValueType};

pub mod memory;
pub mod redis;

/// A value as the store's native read command returns it, before it is
/// shaped into a [`RecordValue`](crate::types::RecordValue).
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Nil,
    Text(String),
    /// Flat array; pairs for `ZRANGE .. WITHSCORES` and `HGETALL`.
    Array(Vec<String>),
}

/// One key of a scripted batch read.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub key: String,
    pub kind: String,
    pub pttl: i64,
    pub value: RawValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        key: String,
        value: String,
        ttl: Option<u64>,
    },
    Delete {
        key: String,
    },
    RPush {
        key: String,
        values: Vec<String>,
    },
    SAdd {
        key: String,
        members: Vec<String>,
    },
    ZAdd {
        key: String,
        members: Vec<(f64, String)>,
    },
    HSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    PExpire {
        key: String,
        ttl: u64,
    },
}

impl WriteOp {
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Set { key, .. }
            | WriteOp::Delete { key }
            | WriteOp::RPush { key, .. }
            | WriteOp::SAdd { key, .. }
            | WriteOp::ZAdd { key, .. }
            | WriteOp::HSet { key, .. }
            | WriteOp::PExpire { key, .. } => key,
        }
    }
}

/// A connection to a multi-database key-value store.
///
/// All key-level operations act on the database chosen by the last
/// [`select`](Store::select).
#[async_trait]
pub trait Store: Send {
    async fn select(&mut self, db: u32) -> StoreResult<()>;

    /// Number of databases the server is configured with; 0 if unknown.
    async fn database_count(&mut self) -> StoreResult<u32>;

    async fn key_count(&mut self) -> StoreResult<u64>;

    /// Every key of the selected database. The same key may be reported
    /// more than once.
    async fn scan_keys(&mut self) -> StoreResult<Vec<String>>;

    async fn flush(&mut self) -> StoreResult<()>;

    /// Type, `PTTL` and value of every key in one server-side script call.
    async fn fetch_batch(&mut self, keys: &[String]) -> StoreResult<Vec<RawEntry>>;

    async fn key_type(&mut self, key: &str) -> StoreResult<String>;

    async fn pttl(&mut self, key: &str) -> StoreResult<i64>;

    async fn read_value(&mut self, key: &str, value_type: ValueType) -> StoreResult<RawValue>;

    /// Sends all writes without waiting on each, then waits for the lot.
    async fn apply(&mut self, writes: &[WriteOp]) -> StoreResult<()>;
}
