use std::collections::BTreeSet;

use crate::filter::Filter;
use crate::store::Store;
use crate::types::StoreResult;

/// Every key of the selected database, deduplicated and in lexicographic
/// order so batch boundaries repeat across runs over the same data.
pub async fn enumerate<S: Store, F: Filter>(store: &mut S, filter: &F) -> StoreResult<Vec<String>> {
    let keys = store.scan_keys().await?;
    Ok(normalize(keys, filter))
}

pub(crate) fn normalize<F: Filter>(keys: Vec<String>, filter: &F) -> Vec<String> {
    keys.into_iter()
        .filter(|key| filter.matches_key(key))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Simple;
    use crate::store::{MemoryStore, StoredValue};
    use pretty_assertions::assert_eq;
    use regex::Regex;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_duplicates_are_removed_and_order_is_stable() {
        let reported = keys(&["b", "a", "c", "a", "b"]);
        assert_eq!(normalize(reported, &Simple::new()), keys(&["a", "b", "c"]));
    }

    #[test]
    fn test_key_pattern_applies() {
        let mut filter = Simple::new();
        filter.add_keys(Regex::new("^user:").unwrap());
        let reported = keys(&["user:2", "session:1", "user:1"]);
        assert_eq!(normalize(reported, &filter), keys(&["user:1", "user:2"]));
    }

    #[tokio::test]
    async fn test_enumerate_selected_database() {
        let mut store = MemoryStore::new();
        store.insert(1, "z", StoredValue::String("1".into()), None);
        store.insert(1, "m", StoredValue::String("2".into()), None);
        store.insert(0, "other", StoredValue::String("3".into()), None);

        store.select(1).await.unwrap();
        let found = enumerate(&mut store, &Simple::new()).await.unwrap();
        assert_eq!(found, keys(&["m", "z"]));
    }
}
