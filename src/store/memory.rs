use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use super::{RawEntry, RawValue, Store, WriteOp};
use crate::constants::{defaults, ttl, type_tag};
use crate::types::{StoreError, StoreResult, ValueType};

#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    String(String),
    List(Vec<String>),
    Set(BTreeSet<String>),
    /// Kept ordered by score, then member.
    SortedSet(Vec<(String, f64)>),
    Hash(BTreeMap<String, String>),
    /// A type the snapshot cannot carry, reported by `TYPE` under this name.
    Other(String),
}

impl StoredValue {
    fn type_name(&self) -> &str {
        match self {
            StoredValue::String(_) => type_tag::STRING,
            StoredValue::List(_) => type_tag::LIST,
            StoredValue::Set(_) => type_tag::SET,
            StoredValue::SortedSet(_) => type_tag::ZSET,
            StoredValue::Hash(_) => type_tag::HASH,
            StoredValue::Other(name) => name,
        }
    }

    fn to_raw(&self) -> RawValue {
        match self {
            StoredValue::String(value) => RawValue::Text(value.clone()),
            StoredValue::List(values) => RawValue::Array(values.clone()),
            StoredValue::Set(members) => RawValue::Array(members.iter().cloned().collect()),
            StoredValue::SortedSet(members) => RawValue::Array(
                members
                    .iter()
                    .flat_map(|(member, score)| [member.clone(), score.to_string()])
                    .collect(),
            ),
            StoredValue::Hash(fields) => RawValue::Array(
                fields
                    .iter()
                    .flat_map(|(field, value)| [field.clone(), value.clone()])
                    .collect(),
            ),
            StoredValue::Other(_) => RawValue::Nil,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    ttl: Option<u64>,
}

/// An in-process store with the same observable behaviour as a server for
/// the operations of [`Store`]. TTLs are frozen: they never count down.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    databases: BTreeMap<u32, BTreeMap<String, Entry>>,
    selected: u32,
    database_count: u32,
    scripting: bool,
    rejected: BTreeSet<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Response(format!(
        "WRONGTYPE Operation against a key holding the wrong kind of value: {}",
        key
    ))
}

fn compare_scored(a: &(String, f64), b: &(String, f64)) -> Ordering {
    a.1.partial_cmp(&b.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            databases: BTreeMap::new(),
            selected: 0,
            database_count: defaults::DATABASE_COUNT,
            scripting: true,
            rejected: BTreeSet::new(),
        }
    }

    /// Makes every scripted batch read fail, as on a server with scripting
    /// disabled.
    pub fn without_scripting(mut self) -> MemoryStore {
        self.scripting = false;
        self
    }

    /// Makes every write to `key` fail with an error reply, as a server
    /// refusing the command would.
    pub fn with_rejected_key(mut self, key: &str) -> MemoryStore {
        self.rejected.insert(key.to_string());
        self
    }

    pub fn with_database_count(mut self, count: u32) -> MemoryStore {
        self.database_count = count;
        self
    }

    pub fn insert(&mut self, db: u32, key: &str, value: StoredValue, ttl: Option<u64>) {
        let value = match value {
            StoredValue::SortedSet(mut members) => {
                members.sort_by(compare_scored);
                StoredValue::SortedSet(members)
            }
            other => other,
        };
        self.databases
            .entry(db)
            .or_default()
            .insert(key.to_string(), Entry { value, ttl });
    }

    pub fn get(&self, db: u32, key: &str) -> Option<&StoredValue> {
        self.databases.get(&db)?.get(key).map(|entry| &entry.value)
    }

    pub fn ttl(&self, db: u32, key: &str) -> Option<u64> {
        self.databases.get(&db)?.get(key)?.ttl
    }

    pub fn len(&self, db: u32) -> usize {
        self.databases.get(&db).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, db: u32) -> bool {
        self.len(db) == 0
    }

    fn current(&self) -> Option<&BTreeMap<String, Entry>> {
        self.databases.get(&self.selected)
    }

    fn current_mut(&mut self) -> &mut BTreeMap<String, Entry> {
        self.databases.entry(self.selected).or_default()
    }

    fn entry(&self, key: &str) -> Option<&Entry> {
        self.current()?.get(key)
    }

    fn raw_pttl(&self, key: &str) -> i64 {
        match self.entry(key) {
            None => ttl::MISSING,
            Some(Entry { ttl: None, .. }) => ttl::NO_EXPIRY,
            Some(Entry { ttl: Some(ms), .. }) => i64::try_from(*ms).unwrap_or(i64::MAX),
        }
    }

    fn raw_type(&self, key: &str) -> String {
        self.entry(key)
            .map_or(type_tag::NONE, |entry| entry.value.type_name())
            .to_string()
    }

    /// Value of `key`, creating an empty one with `empty` when absent.
    fn collection(
        &mut self,
        key: &str,
        empty: impl FnOnce() -> StoredValue,
    ) -> &mut StoredValue {
        &mut self
            .current_mut()
            .entry(key.to_string())
            .or_insert_with(|| Entry {
                value: empty(),
                ttl: None,
            })
            .value
    }

    fn write(&mut self, op: &WriteOp) -> StoreResult<()> {
        if self.rejected.contains(op.key()) {
            return Err(StoreError::Response(format!(
                "ERR write refused for key {}",
                op.key()
            )));
        }
        match op {
            WriteOp::Set { key, value, ttl } => {
                self.current_mut().insert(
                    key.clone(),
                    Entry {
                        value: StoredValue::String(value.clone()),
                        ttl: *ttl,
                    },
                );
            }
            WriteOp::Delete { key } => {
                self.current_mut().remove(key);
            }
            WriteOp::RPush { key, values } => {
                match self.collection(key, || StoredValue::List(Vec::new())) {
                    StoredValue::List(list) => list.extend(values.iter().cloned()),
                    _ => return Err(wrong_type(key)),
                }
            }
            WriteOp::SAdd { key, members } => {
                match self.collection(key, || StoredValue::Set(BTreeSet::new())) {
                    StoredValue::Set(set) => set.extend(members.iter().cloned()),
                    _ => return Err(wrong_type(key)),
                }
            }
            WriteOp::ZAdd { key, members } => {
                match self.collection(key, || StoredValue::SortedSet(Vec::new())) {
                    StoredValue::SortedSet(zset) => {
                        for (score, member) in members {
                            zset.retain(|(existing, _)| existing != member);
                            zset.push((member.clone(), *score));
                        }
                        zset.sort_by(compare_scored);
                    }
                    _ => return Err(wrong_type(key)),
                }
            }
            WriteOp::HSet { key, fields } => {
                match self.collection(key, || StoredValue::Hash(BTreeMap::new())) {
                    StoredValue::Hash(hash) => hash.extend(fields.iter().cloned()),
                    _ => return Err(wrong_type(key)),
                }
            }
            WriteOp::PExpire { key, ttl } => {
                if let Some(entry) = self.current_mut().get_mut(key) {
                    entry.ttl = Some(*ttl);
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&mut self, db: u32) -> StoreResult<()> {
        if db >= self.database_count {
            return Err(StoreError::Response("ERR DB index is out of range".into()));
        }
        self.selected = db;
        Ok(())
    }

    async fn database_count(&mut self) -> StoreResult<u32> {
        Ok(self.database_count)
    }

    async fn key_count(&mut self) -> StoreResult<u64> {
        Ok(self.current().map_or(0, |db| db.len() as u64))
    }

    async fn scan_keys(&mut self) -> StoreResult<Vec<String>> {
        Ok(self
            .current()
            .map(|db| db.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn flush(&mut self) -> StoreResult<()> {
        self.databases.remove(&self.selected);
        Ok(())
    }

    async fn fetch_batch(&mut self, keys: &[String]) -> StoreResult<Vec<RawEntry>> {
        if !self.scripting {
            return Err(StoreError::Response(
                "NOSCRIPT scripting is disabled on this store".into(),
            ));
        }
        Ok(keys
            .iter()
            .map(|key| RawEntry {
                key: key.clone(),
                kind: self.raw_type(key),
                pttl: self.raw_pttl(key),
                value: self
                    .entry(key)
                    .map_or(RawValue::Nil, |entry| entry.value.to_raw()),
            })
            .collect())
    }

    async fn key_type(&mut self, key: &str) -> StoreResult<String> {
        Ok(self.raw_type(key))
    }

    async fn pttl(&mut self, key: &str) -> StoreResult<i64> {
        Ok(self.raw_pttl(key))
    }

    async fn read_value(&mut self, key: &str, value_type: ValueType) -> StoreResult<RawValue> {
        let Some(entry) = self.entry(key) else {
            return Ok(match value_type {
                ValueType::String => RawValue::Nil,
                _ => RawValue::Array(Vec::new()),
            });
        };
        if entry.value.type_name() != value_type.tag() {
            return Err(wrong_type(key));
        }
        Ok(entry.value.to_raw())
    }

    async fn apply(&mut self, writes: &[WriteOp]) -> StoreResult<()> {
        // Every write runs, like a pipeline; the first failure is reported.
        let mut first_error = None;
        for op in writes {
            if let Err(err) = self.write(op) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_pttl_sentinels() {
        let mut store = MemoryStore::new();
        store.insert(0, "plain", StoredValue::String("a".into()), None);
        store.insert(0, "expiring", StoredValue::String("b".into()), Some(5000));

        assert_eq!(store.pttl("plain").await.unwrap(), ttl::NO_EXPIRY);
        assert_eq!(store.pttl("expiring").await.unwrap(), 5000);
        assert_eq!(store.pttl("missing").await.unwrap(), ttl::MISSING);
        assert_eq!(store.key_type("missing").await.unwrap(), "none");
    }

    #[tokio::test]
    async fn test_sorted_set_reads_ascending_by_score() {
        let mut store = MemoryStore::new();
        store.insert(
            0,
            "ranking",
            StoredValue::SortedSet(vec![("b".into(), 2.5), ("a".into(), 1.0)]),
            None,
        );

        let raw = store.read_value("ranking", ValueType::SortedSet).await.unwrap();
        assert_eq!(
            raw,
            RawValue::Array(vec!["a".into(), "1".into(), "b".into(), "2.5".into()])
        );
    }

    #[tokio::test]
    async fn test_apply_runs_every_write_despite_errors() {
        let mut store = MemoryStore::new();
        store.insert(0, "text", StoredValue::String("x".into()), None);

        let result = store
            .apply(&[
                WriteOp::RPush {
                    key: "text".into(),
                    values: vec!["y".into()],
                },
                WriteOp::SAdd {
                    key: "tags".into(),
                    members: vec!["red".into()],
                },
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(
            store.get(0, "tags"),
            Some(&StoredValue::Set(BTreeSet::from(["red".to_string()])))
        );
    }

    #[tokio::test]
    async fn test_select_is_bounded_by_database_count() {
        let mut store = MemoryStore::new().with_database_count(2);
        assert!(store.select(1).await.is_ok());
        assert!(store.select(2).await.is_err());
    }

    #[tokio::test]
    async fn test_rejected_key_refuses_every_write() {
        let mut store = MemoryStore::new().with_rejected_key("locked");
        store.insert(0, "locked", StoredValue::String("old".into()), None);

        let result = store
            .apply(&[
                WriteOp::Delete {
                    key: "locked".into(),
                },
                WriteOp::Set {
                    key: "open".into(),
                    value: "new".into(),
                    ttl: None,
                },
            ])
            .await;

        assert!(matches!(result, Err(StoreError::Response(_))));
        assert_eq!(
            store.get(0, "locked"),
            Some(&StoredValue::String("old".into()))
        );
        assert_eq!(store.get(0, "open"), Some(&StoredValue::String("new".into())));
    }
}
