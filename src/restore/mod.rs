//! Reconstructs a snapshot into a store.

use std::path::Path;

use log::{debug, warn};

use self::guard::{RestoreGuard, Verdict};
use self::writer::BatchWriter;
use crate::codec;
use crate::filter::Filter;
use crate::observer::Observer;
use crate::settings::RestoreSettings;
use crate::store::Store;
use crate::types::{EncodedSnapshot, RestoreSummary, SnapError, SnapResult};

pub mod guard;
pub mod writer;

/// Restores the selected databases of `snapshot`, one at a time.
///
/// Each database passes the [`RestoreGuard`] before anything is written to
/// it; a blocked database ends the run with [`SnapError::NotEmpty`].
pub async fn restore<S: Store, O: Observer>(
    store: &mut S,
    snapshot: EncodedSnapshot,
    settings: &RestoreSettings,
    mut observer: O,
) -> SnapResult<RestoreSummary> {
    let filter = settings.filter();
    for db in filter.databases() {
        if !snapshot.contains_key(db) {
            warn!("db {}: not present in the snapshot", db);
        }
    }

    let guard = RestoreGuard::new(settings.intent());
    let writer = BatchWriter::new(settings.batch_size());
    let mut summary = RestoreSummary::default();

    for (db, records) in snapshot {
        if !filter.matches_db(db) {
            continue;
        }

        store.select(db).await?;
        if let Verdict::Blocked { key_count } = guard.evaluate(store, db).await? {
            return Err(SnapError::NotEmpty { db, key_count });
        }

        let written = writer
            .write(store, db, records, filter, &mut observer)
            .await?;
        debug!("db {}: restored {} keys", db, written.restored);
        observer.database_done(db, written.restored);

        summary.databases += 1;
        summary.restored += written.restored;
        summary.skipped += written.skipped;
    }

    Ok(summary)
}

pub async fn restore_from_file<S: Store, O: Observer>(
    store: &mut S,
    settings: &RestoreSettings,
    observer: O,
    path: &Path,
) -> SnapResult<RestoreSummary> {
    let snapshot = codec::read_snapshot(path)?;
    restore(store, snapshot, settings, observer).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Nil;
    use crate::store::{MemoryStore, StoredValue};
    use indexmap::IndexMap;
    use serde_json::json;

    fn snapshot() -> EncodedSnapshot {
        EncodedSnapshot::from([
            (
                0,
                IndexMap::from([(
                    "a".to_string(),
                    json!({"Type": "string", "Value": "zero", "TTL": null}),
                )]),
            ),
            (
                1,
                IndexMap::from([(
                    "b".to_string(),
                    json!({"Type": "string", "Value": "one", "TTL": null}),
                )]),
            ),
        ])
    }

    #[tokio::test]
    async fn test_blocked_database_is_untouched() {
        let mut store = MemoryStore::new();
        store.insert(1, "b", StoredValue::String("mine".into()), None);
        let settings = RestoreSettings::new(&[1], false, false).unwrap();

        let err = restore(&mut store, snapshot(), &settings, Nil).await.unwrap_err();
        assert!(matches!(err, SnapError::NotEmpty { db: 1, key_count: 1 }));
        assert!(err.to_string().contains("1 keys"));
        assert_eq!(store.get(1, "b"), Some(&StoredValue::String("mine".into())));
    }

    #[tokio::test]
    async fn test_only_selected_databases_are_restored() {
        let mut store = MemoryStore::new();
        let settings = RestoreSettings::new(&[1, 9], false, false).unwrap();

        let summary = restore(&mut store, snapshot(), &settings, Nil).await.unwrap();
        assert_eq!(
            summary,
            RestoreSummary {
                databases: 1,
                restored: 1,
                skipped: 0
            }
        );
        assert!(store.is_empty(0));
        assert_eq!(store.get(1, "b"), Some(&StoredValue::String("one".into())));
    }
}
