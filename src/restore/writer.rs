use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Value as Json;

use crate::codec::decode_record;
use crate::filter::Filter;
use crate::observer::{KeyOutcome, Observer};
use crate::store::{Store, WriteOp};
use crate::types::{KeyRecord, RecordValue, StoreResult};

/// The store rejects a zero expiry; a key captured with 0 ms left is
/// written with the shortest one instead.
fn expiry(ttl: u64) -> u64 {
    ttl.max(1)
}

/// Writes that recreate `key` from its record.
///
/// Strings are set with their expiry in one command. Collections are
/// deleted first, then written in one bulk command and given their expiry;
/// an empty collection is only deleted.
pub fn reconstruct(key: &str, record: KeyRecord) -> Vec<WriteOp> {
    let key = key.to_string();
    let ttl = record.ttl.map(expiry);

    if record.value.is_empty_collection() {
        return vec![WriteOp::Delete { key }];
    }

    let bulk = match record.value {
        RecordValue::String(value) => return vec![WriteOp::Set { key, value, ttl }],
        RecordValue::List(values) => WriteOp::RPush {
            key: key.clone(),
            values,
        },
        RecordValue::Set(members) => WriteOp::SAdd {
            key: key.clone(),
            members: members.into_iter().collect(),
        },
        RecordValue::SortedSet(members) => WriteOp::ZAdd {
            key: key.clone(),
            members: members
                .into_iter()
                .map(|scored| (scored.score, scored.member))
                .collect(),
        },
        RecordValue::Hash(fields) => WriteOp::HSet {
            key: key.clone(),
            fields: fields.into_iter().collect(),
        },
    };
    let mut ops = vec![WriteOp::Delete { key: key.clone() }, bulk];

    if let Some(ttl) = ttl {
        ops.push(WriteOp::PExpire { key, ttl });
    }
    ops
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Written {
    /// Keys whose writes were dispatched.
    pub restored: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchWriter {
    batch_size: usize,
}

impl BatchWriter {
    pub fn new(batch_size: usize) -> BatchWriter {
        BatchWriter {
            batch_size: batch_size.max(1),
        }
    }

    /// Recreates every record in the selected database, one pipelined batch
    /// at a time. A record that does not decode is skipped; a failed write
    /// reply is logged and the remaining batches still go out. Only
    /// transport errors are returned.
    pub async fn write<S: Store, F: Filter, O: Observer>(
        &self,
        store: &mut S,
        db: u32,
        records: IndexMap<String, Json>,
        filter: &F,
        observer: &mut O,
    ) -> StoreResult<Written> {
        let mut written = Written::default();
        let records: Vec<(String, Json)> = records
            .into_iter()
            .filter(|(key, _)| filter.matches_key(key))
            .collect();

        for (index, batch) in records.chunks(self.batch_size).enumerate() {
            observer.batch_start(db, index, batch.len());

            let mut ops = Vec::new();
            for (key, raw) in batch {
                match decode_record(raw.clone()) {
                    Ok(record) if !filter.matches_type(record.value_type()) => {
                        observer.key_processed(db, key, KeyOutcome::Filtered(record.value_type()));
                    }
                    Ok(record) => {
                        let value_type = record.value_type();
                        ops.extend(reconstruct(key, record));
                        written.restored += 1;
                        observer.key_processed(db, key, KeyOutcome::Processed(value_type));
                    }
                    Err(err) => {
                        debug!("db {}: skipping {}: {}", db, key, err);
                        written.skipped += 1;
                        observer.key_processed(db, key, KeyOutcome::Skipped);
                    }
                }
            }

            match store.apply(&ops).await {
                Ok(()) => {}
                Err(err) if err.is_transport() => return Err(err),
                Err(err) => warn!("db {}: a write in batch {} failed: {}", db, index, err),
            }
        }

        Ok(written)
    }
}
