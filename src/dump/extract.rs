use std::collections::HashMap;

use log::debug;

use crate::codec::decode_reply;
use crate::store::{RawEntry, RawValue, Store};
use crate::types::{CodecResult, KeyRecord, StoreError, StoreResult, ValueType};

/// Outcome of the scripted batch read. A failure here is expected on
/// stores without scripting and only selects the per-key path.
#[derive(Debug)]
pub enum BatchRead {
    Scripted(Vec<RawEntry>),
    Unavailable(StoreError),
}

/// A key of the batch and its record, `None` when the key was omitted.
pub type Extracted = (String, Option<KeyRecord>);

#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    scripting: bool,
}

impl Extractor {
    pub fn new(scripting: bool) -> Extractor {
        Extractor { scripting }
    }

    /// Reads type, TTL and value of every key of the batch. Only transport
    /// errors are returned; a key that cannot be read or classified comes
    /// back as `None`.
    pub async fn extract<S: Store>(&self, store: &mut S, keys: &[String]) -> StoreResult<Vec<Extracted>> {
        if self.scripting {
            match read_scripted(store, keys).await {
                BatchRead::Scripted(entries) => return Ok(from_entries(keys, entries)),
                BatchRead::Unavailable(err) => {
                    debug!(
                        "scripted read of {} keys failed, reading them one by one: {}",
                        keys.len(),
                        err
                    );
                }
            }
        }

        let mut extracted = Vec::with_capacity(keys.len());
        for key in keys {
            let record = read_key(store, key).await?;
            extracted.push((key.clone(), record));
        }
        Ok(extracted)
    }
}

pub async fn read_scripted<S: Store>(store: &mut S, keys: &[String]) -> BatchRead {
    match store.fetch_batch(keys).await {
        Ok(entries) => BatchRead::Scripted(entries),
        Err(err) => BatchRead::Unavailable(err),
    }
}

fn from_entries(keys: &[String], entries: Vec<RawEntry>) -> Vec<Extracted> {
    let mut by_key: HashMap<String, RawEntry> = entries
        .into_iter()
        .map(|entry| (entry.key.clone(), entry))
        .collect();

    keys.iter()
        .map(|key| {
            let record = match by_key.remove(key) {
                None => {
                    debug!("{}: missing from the batch reply", key);
                    None
                }
                Some(entry) => match decode_entry(&entry.kind, entry.pttl, entry.value) {
                    Ok(record) => record,
                    Err(err) => {
                        debug!("{}: {}", key, err);
                        None
                    }
                },
            };
            (key.clone(), record)
        })
        .collect()
}

fn decode_entry(kind: &str, pttl: i64, raw: RawValue) -> CodecResult<Option<KeyRecord>> {
    let Some(value_type) = ValueType::from_tag(kind) else {
        debug!("omitting key of unsupported type {:?}", kind);
        return Ok(None);
    };
    let value = decode_reply(value_type, raw)?;
    Ok(Some(KeyRecord::with_raw_ttl(value, pttl)))
}

/// Keeps transport errors fatal and turns server replies into an omitted key.
fn recover<T>(key: &str, result: StoreResult<T>) -> StoreResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_transport() => Err(err),
        Err(err) => {
            debug!("{}: {}", key, err);
            Ok(None)
        }
    }
}

/// Per-key read: type, then TTL, then value.
///
/// TTL and value come from separate calls, so a key expiring between them
/// may be recorded with a TTL it no longer has.
async fn read_key<S: Store>(store: &mut S, key: &str) -> StoreResult<Option<KeyRecord>> {
    let Some(kind) = recover(key, store.key_type(key).await)? else {
        return Ok(None);
    };
    let Some(value_type) = ValueType::from_tag(&kind) else {
        debug!("{}: omitting key of unsupported type {:?}", key, kind);
        return Ok(None);
    };
    let Some(pttl) = recover(key, store.pttl(key).await)? else {
        return Ok(None);
    };
    let Some(raw) = recover(key, store.read_value(key, value_type).await)? else {
        return Ok(None);
    };

    match decode_reply(value_type, raw) {
        Ok(value) => Ok(Some(KeyRecord::with_raw_ttl(value, pttl))),
        Err(err) => {
            debug!("{}: {}", key, err);
            Ok(None)
        }
    }
}
