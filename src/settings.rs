//! Validated run settings. Everything here is checked before the store is
//! contacted.

use regex::Regex;

use crate::constants::defaults;
use crate::filter::Simple;
use crate::restore::guard::Intent;
use crate::types::{SettingsError, ValueType};

fn database_filter(databases: &[i64]) -> Result<Simple, SettingsError> {
    let mut filter = Simple::new();
    for &db in databases {
        if db < 0 {
            return Err(SettingsError::NegativeDatabase(db));
        }
        let db = u32::try_from(db).map_err(|_| SettingsError::DatabaseOutOfRange(db))?;
        filter.add_database(db);
    }
    Ok(filter)
}

fn key_pattern(pattern: &str) -> Result<Regex, SettingsError> {
    Regex::new(pattern).map_err(|e| SettingsError::InvalidKeyPattern(e.to_string()))
}

fn batch_size(size: usize) -> Result<usize, SettingsError> {
    match size {
        0 => Err(SettingsError::ZeroBatchSize),
        size => Ok(size),
    }
}

#[derive(Debug, Clone)]
pub struct DumpSettings {
    filter: Simple,
    batch_size: usize,
    scripting: bool,
}

impl DumpSettings {
    /// An empty database list selects every database on the server.
    pub fn new(databases: &[i64]) -> Result<DumpSettings, SettingsError> {
        Ok(DumpSettings {
            filter: database_filter(databases)?,
            batch_size: defaults::BATCH_SIZE,
            scripting: true,
        })
    }

    pub fn with_batch_size(mut self, size: usize) -> Result<DumpSettings, SettingsError> {
        self.batch_size = batch_size(size)?;
        Ok(self)
    }

    pub fn with_scripting(mut self, enabled: bool) -> DumpSettings {
        self.scripting = enabled;
        self
    }

    pub fn with_key_pattern(mut self, pattern: &str) -> Result<DumpSettings, SettingsError> {
        self.filter.add_keys(key_pattern(pattern)?);
        Ok(self)
    }

    pub fn with_types(mut self, types: &[ValueType]) -> DumpSettings {
        for &typ in types {
            self.filter.add_type(typ);
        }
        self
    }

    pub fn filter(&self) -> &Simple {
        &self.filter
    }

    /// Never zero.
    pub fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    /// Read batches through a server-side script before falling back to
    /// per-key reads.
    pub fn scripting(&self) -> bool {
        self.scripting
    }
}

#[derive(Debug, Clone)]
pub struct RestoreSettings {
    filter: Simple,
    batch_size: usize,
    intent: Intent,
}

impl RestoreSettings {
    /// Flushing without forcing is refused: wiping a database must be
    /// confirmed with both flags.
    pub fn new(
        databases: &[i64],
        flush: bool,
        force: bool,
    ) -> Result<RestoreSettings, SettingsError> {
        let intent = match (flush, force) {
            (true, false) => return Err(SettingsError::FlushWithoutForce),
            (true, true) => Intent::Flush,
            (false, true) => Intent::Force,
            (false, false) => Intent::Default,
        };
        Ok(RestoreSettings {
            filter: database_filter(databases)?,
            batch_size: defaults::BATCH_SIZE,
            intent,
        })
    }

    pub fn with_batch_size(mut self, size: usize) -> Result<RestoreSettings, SettingsError> {
        self.batch_size = batch_size(size)?;
        Ok(self)
    }

    pub fn with_key_pattern(mut self, pattern: &str) -> Result<RestoreSettings, SettingsError> {
        self.filter.add_keys(key_pattern(pattern)?);
        Ok(self)
    }

    pub fn with_types(mut self, types: &[ValueType]) -> RestoreSettings {
        for &typ in types {
            self.filter.add_type(typ);
        }
        self
    }

    pub fn filter(&self) -> &Simple {
        &self.filter
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use crate::observer::Nil;
    use crate::store::{MemoryStore, StoredValue};
    use rstest::rstest;

    #[test]
    fn test_flush_requires_force() {
        let err = RestoreSettings::new(&[], true, false).unwrap_err();
        assert_eq!(err, SettingsError::FlushWithoutForce);
        assert!(err.to_string().contains("--force"));
    }

    #[rstest]
    #[case(false, false, Intent::Default)]
    #[case(false, true, Intent::Force)]
    #[case(true, true, Intent::Flush)]
    fn test_restore_intent(#[case] flush: bool, #[case] force: bool, #[case] expected: Intent) {
        let settings = RestoreSettings::new(&[], flush, force).unwrap();
        assert_eq!(settings.intent(), expected);
    }

    #[test]
    fn test_negative_database_is_rejected() {
        assert_eq!(
            DumpSettings::new(&[0, -1]).unwrap_err(),
            SettingsError::NegativeDatabase(-1)
        );
        assert_eq!(
            RestoreSettings::new(&[-3], false, true).unwrap_err(),
            SettingsError::NegativeDatabase(-3)
        );
    }

    #[test]
    fn test_database_selection() {
        let settings = DumpSettings::new(&[3, 1]).unwrap();
        assert_eq!(settings.filter().databases(), &[3, 1]);
        assert!(settings.filter().matches_db(1));
        assert!(!settings.filter().matches_db(0));
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let settings = DumpSettings::new(&[]).unwrap();
        assert_eq!(settings.batch_size(), defaults::BATCH_SIZE);
        assert_eq!(
            settings.with_batch_size(0).unwrap_err(),
            SettingsError::ZeroBatchSize
        );
    }

    #[test]
    fn test_invalid_key_pattern() {
        let result = DumpSettings::new(&[]).unwrap().with_key_pattern("(unclosed");
        assert!(matches!(result, Err(SettingsError::InvalidKeyPattern(_))));
    }

    #[tokio::test]
    async fn test_zero_batch_size_cannot_reach_a_dump() {
        let mut store = MemoryStore::new();
        for key in ["a", "b", "c"] {
            store.insert(0, key, StoredValue::String(key.into()), None);
        }
        let mut settings = DumpSettings::new(&[0]).unwrap();
        settings.batch_size = 0;
        assert_eq!(settings.batch_size(), 1);

        let (snapshot, summary) = crate::dump(&mut store, &settings, Nil).await.unwrap();
        assert_eq!(snapshot[&0].len(), 3);
        assert_eq!(summary.keys, 3);
    }

    #[test]
    fn test_restore_batch_size_is_never_zero() {
        let mut settings = RestoreSettings::new(&[], false, false).unwrap();
        settings.batch_size = 0;
        assert_eq!(settings.batch_size(), 1);
    }
}
