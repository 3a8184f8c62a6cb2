//! Captures databases of a running store into a [`Snapshot`].

use std::path::Path;

use log::{debug, warn};

use self::extract::Extractor;
use crate::codec;
use crate::constants::defaults;
use crate::filter::Filter;
use crate::observer::{KeyOutcome, Observer};
use crate::settings::DumpSettings;
use crate::store::Store;
use crate::types::{DatabaseSnapshot, DumpSummary, SnapResult, Snapshot, StoreResult};

pub mod extract;
pub mod keys;

/// Databases to visit, and whether they were discovered rather than chosen.
async fn databases<S: Store>(store: &mut S, settings: &DumpSettings) -> StoreResult<(Vec<u32>, bool)> {
    let selected = settings.filter().databases();
    if !selected.is_empty() {
        return Ok((selected.to_vec(), false));
    }

    let count = match store.database_count().await {
        Ok(0) => defaults::DATABASE_COUNT,
        Ok(count) => count,
        Err(err) if err.is_transport() => return Err(err),
        Err(err) => {
            warn!(
                "could not read the database count, assuming {}: {}",
                defaults::DATABASE_COUNT,
                err
            );
            defaults::DATABASE_COUNT
        }
    };
    Ok(((0..count).collect(), true))
}

/// Reads every selected database into memory.
///
/// Databases are visited one at a time; within a database keys are read in
/// batches of [`DumpSettings::batch_size`], in key order.
pub async fn dump<S: Store, O: Observer>(
    store: &mut S,
    settings: &DumpSettings,
    mut observer: O,
) -> SnapResult<(Snapshot, DumpSummary)> {
    let (databases, discovered) = databases(store, settings).await?;
    let extractor = Extractor::new(settings.scripting());
    let filter = settings.filter();

    let mut snapshot = Snapshot::new();
    let mut summary = DumpSummary::default();

    for db in databases {
        store.select(db).await?;
        let keys = keys::enumerate(store, filter).await?;
        if keys.is_empty() && discovered {
            debug!("db {}: empty, not recorded", db);
            continue;
        }

        let mut records = DatabaseSnapshot::with_capacity(keys.len());
        for (index, batch) in keys.chunks(settings.batch_size()).enumerate() {
            observer.batch_start(db, index, batch.len());
            for (key, record) in extractor.extract(store, batch).await? {
                match record {
                    Some(record) if filter.matches_type(record.value_type()) => {
                        observer.key_processed(db, &key, KeyOutcome::Processed(record.value_type()));
                        records.insert(key, record);
                    }
                    Some(record) => {
                        observer.key_processed(db, &key, KeyOutcome::Filtered(record.value_type()));
                    }
                    None => {
                        observer.key_processed(db, &key, KeyOutcome::Skipped);
                        summary.skipped += 1;
                    }
                }
            }
        }

        debug!("db {}: captured {} keys", db, records.len());
        observer.database_done(db, records.len());
        summary.databases += 1;
        summary.keys += records.len();
        snapshot.insert(db, records);
    }

    Ok((snapshot, summary))
}

/// Dumps and then writes the snapshot file in one piece. Nothing is written
/// when the dump fails.
pub async fn dump_to_file<S: Store, O: Observer>(
    store: &mut S,
    settings: &DumpSettings,
    observer: O,
    path: &Path,
) -> SnapResult<DumpSummary> {
    let (snapshot, summary) = dump(store, settings, observer).await?;
    codec::write_snapshot(path, &snapshot)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Nil;
    use crate::store::{MemoryStore, StoredValue};
    use crate::types::{RecordValue, ValueType};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        batches: Vec<(u32, usize, usize)>,
        done: Vec<(u32, usize)>,
        skipped: Vec<String>,
        filtered: Vec<String>,
    }

    impl Observer for Recorder {
        fn batch_start(&mut self, db: u32, index: usize, size: usize) {
            self.batches.push((db, index, size));
        }

        fn key_processed(&mut self, _db: u32, key: &str, outcome: KeyOutcome) {
            match outcome {
                KeyOutcome::Skipped => self.skipped.push(key.to_string()),
                KeyOutcome::Filtered(_) => self.filtered.push(key.to_string()),
                KeyOutcome::Processed(_) => {}
            }
        }

        fn database_done(&mut self, db: u32, keys: usize) {
            self.done.push((db, keys));
        }
    }

    fn strings(store: &mut MemoryStore, db: u32, count: usize) {
        for i in 0..count {
            store.insert(db, &format!("key:{:03}", i), StoredValue::String(i.to_string()), None);
        }
    }

    #[tokio::test]
    async fn test_batches_follow_key_order() {
        let mut store = MemoryStore::new();
        strings(&mut store, 0, 5);
        store.insert(0, "log", StoredValue::Other("stream".into()), None);
        let settings = DumpSettings::new(&[0]).unwrap().with_batch_size(2).unwrap();
        let mut recorder = Recorder::default();

        let (snapshot, summary) = dump(&mut store, &settings, &mut recorder).await.unwrap();

        assert_eq!(recorder.batches, vec![(0, 0, 2), (0, 1, 2), (0, 2, 2)]);
        assert_eq!(recorder.done, vec![(0, 5)]);
        assert_eq!(recorder.skipped, vec!["log".to_string()]);
        assert_eq!(summary, DumpSummary { databases: 1, keys: 5, skipped: 1 });
        let keys: Vec<&String> = snapshot[&0].keys().collect();
        assert_eq!(keys, ["key:000", "key:001", "key:002", "key:003", "key:004"]);
    }

    #[tokio::test]
    async fn test_discovery_skips_empty_databases() {
        let mut store = MemoryStore::new().with_database_count(4);
        strings(&mut store, 1, 1);
        strings(&mut store, 3, 2);
        let settings = DumpSettings::new(&[]).unwrap();

        let (snapshot, _) = dump(&mut store, &settings, Nil).await.unwrap();
        assert_eq!(snapshot.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_discovery_falls_back_to_default_count() {
        let mut store = MemoryStore::new().with_database_count(0);
        let settings = DumpSettings::new(&[]).unwrap();
        let (mut store_dbs, discovered) = databases(&mut store, &settings).await.unwrap();
        assert!(discovered);
        assert_eq!(store_dbs.len(), defaults::DATABASE_COUNT as usize);
        store_dbs.sort();
        assert_eq!(store_dbs[0], 0);
    }

    #[tokio::test]
    async fn test_selected_empty_database_is_recorded() {
        let mut store = MemoryStore::new();
        let settings = DumpSettings::new(&[2]).unwrap();
        let (snapshot, summary) = dump(&mut store, &settings, Nil).await.unwrap();
        assert!(snapshot[&2].is_empty());
        assert_eq!(summary.databases, 1);
    }

    #[tokio::test]
    async fn test_type_filter() {
        let mut store = MemoryStore::new();
        strings(&mut store, 0, 2);
        store.insert(0, "queue", StoredValue::List(vec!["a".into()]), None);
        let settings = DumpSettings::new(&[0])
            .unwrap()
            .with_types(&[ValueType::List]);
        let mut recorder = Recorder::default();

        let (snapshot, summary) = dump(&mut store, &settings, &mut recorder).await.unwrap();
        assert_eq!(snapshot[&0].len(), 1);
        assert_eq!(
            snapshot[&0]["queue"].value,
            RecordValue::List(vec!["a".into()])
        );
        assert_eq!(summary.skipped, 0);
        assert_eq!(recorder.filtered, vec!["key:000".to_string(), "key:001".to_string()]);
        assert!(recorder.skipped.is_empty());
    }
}
