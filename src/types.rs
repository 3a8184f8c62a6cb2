use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::type_tag;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Transport(String),
    #[error("server error: {0}")]
    Response(String),
}

impl StoreError {
    /// Connection-level failures abort the run; everything else is a reply
    /// the caller may recover from.
    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Transport(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no `{0}` field")]
    MissingField(&'static str),
    #[error("unsupported type tag: {0}")]
    UnknownType(String),
    #[error("value does not match type {value_type}: {source}")]
    InvalidValue {
        value_type: ValueType,
        source: serde_json::Error,
    },
    #[error("invalid TTL: {0}")]
    InvalidTtl(String),
    #[error("{value_type} reply has an odd number of elements ({len})")]
    OddPairs { value_type: ValueType, len: usize },
    #[error("invalid score: {0:?}")]
    InvalidScore(String),
    #[error("unexpected {value_type} reply: {detail}")]
    UnexpectedReply {
        value_type: ValueType,
        detail: String,
    },
}

pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Error, Debug, PartialEq)]
pub enum SettingsError {
    #[error("--flush wipes the target database; specify --force as well to confirm")]
    FlushWithoutForce,
    #[error("database index must not be negative: {0}")]
    NegativeDatabase(i64),
    #[error("database index out of range: {0}")]
    DatabaseOutOfRange(i64),
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
    #[error("invalid key pattern: {0}")]
    InvalidKeyPattern(String),
}

#[derive(Error, Debug)]
pub enum SnapError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot file is not valid: {0}")]
    Json(#[from] serde_json::Error),
    #[error(
        "database {db} is not empty ({key_count} keys); \
         use --force to overwrite keys or --flush --force to wipe it first"
    )]
    NotEmpty { db: u32, key_count: u64 },
}

pub type SnapResult<T> = Result<T, SnapError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    List,
    Set,
    #[serde(rename = "zset")]
    SortedSet,
    Hash,
}

impl ValueType {
    pub fn tag(self) -> &'static str {
        match self {
            ValueType::String => type_tag::STRING,
            ValueType::List => type_tag::LIST,
            ValueType::Set => type_tag::SET,
            ValueType::SortedSet => type_tag::ZSET,
            ValueType::Hash => type_tag::HASH,
        }
    }

    /// Classifies a `TYPE` reply; anything outside the five supported
    /// shapes (streams, module types, vanished keys) yields `None`.
    pub fn from_tag(tag: &str) -> Option<ValueType> {
        match tag {
            type_tag::STRING => Some(ValueType::String),
            type_tag::LIST => Some(ValueType::List),
            type_tag::SET => Some(ValueType::Set),
            type_tag::ZSET => Some(ValueType::SortedSet),
            type_tag::HASH => Some(ValueType::Hash),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMember {
    #[serde(rename = "Member")]
    pub member: String,
    #[serde(rename = "Score", with = "crate::codec::score")]
    pub score: f64,
}

impl ScoredMember {
    pub fn new(member: impl Into<String>, score: f64) -> ScoredMember {
        ScoredMember {
            member: member.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordValue {
    String(String),
    List(Vec<String>),
    Set(BTreeSet<String>),
    /// Ascending by score, as returned by the source.
    SortedSet(Vec<ScoredMember>),
    Hash(BTreeMap<String, String>),
}

impl RecordValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            RecordValue::String(_) => ValueType::String,
            RecordValue::List(_) => ValueType::List,
            RecordValue::Set(_) => ValueType::Set,
            RecordValue::SortedSet(_) => ValueType::SortedSet,
            RecordValue::Hash(_) => ValueType::Hash,
        }
    }

    /// True for collections without elements. A string is never empty in
    /// this sense, even when it holds `""`.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            RecordValue::String(_) => false,
            RecordValue::List(values) => values.is_empty(),
            RecordValue::Set(members) => members.is_empty(),
            RecordValue::SortedSet(members) => members.is_empty(),
            RecordValue::Hash(fields) => fields.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyRecord {
    pub value: RecordValue,
    /// Milliseconds remaining at capture time; `None` means no expiry.
    pub ttl: Option<u64>,
}

impl KeyRecord {
    pub fn new(value: RecordValue, ttl: Option<u64>) -> KeyRecord {
        KeyRecord { value, ttl }
    }

    /// Builds a record from a raw `PTTL` reply. Negative replies (no expiry,
    /// or the key vanished since it was listed) are recorded as no expiry.
    pub fn with_raw_ttl(value: RecordValue, pttl: i64) -> KeyRecord {
        let ttl = u64::try_from(pttl).ok();
        KeyRecord { value, ttl }
    }

    pub fn value_type(&self) -> ValueType {
        self.value.value_type()
    }
}

/// Key name to record, in enumeration order.
pub type DatabaseSnapshot = IndexMap<String, KeyRecord>;

/// Database index to captured keys.
pub type Snapshot = BTreeMap<u32, DatabaseSnapshot>;

/// A snapshot as read from disk, with each record still undecoded so that a
/// malformed record only costs its own key.
pub type EncodedSnapshot = BTreeMap<u32, IndexMap<String, serde_json::Value>>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DumpSummary {
    pub databases: usize,
    pub keys: usize,
    pub skipped: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    pub databases: usize,
    pub restored: usize,
    pub skipped: usize,
}
