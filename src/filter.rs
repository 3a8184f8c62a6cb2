//! Filter trait and implementations to skip databases, types or keys

use regex::Regex;

use crate::types::ValueType;

/// A trait to decide which databases, types or keys take part in a run
pub trait Filter {
    fn matches_db(&self, _db: u32) -> bool {
        true
    }
    fn matches_type(&self, _value_type: ValueType) -> bool {
        true
    }
    fn matches_key(&self, _key: &str) -> bool {
        true
    }
}

/// A filter to match by database, type or a regular expression against key names
#[derive(Debug, Clone, Default)]
pub struct Simple {
    databases: Vec<u32>,
    types: Vec<ValueType>,
    keys: Option<Regex>,
}

impl Simple {
    pub fn new() -> Simple {
        Simple::default()
    }

    pub fn add_database(&mut self, db: u32) {
        if !self.databases.contains(&db) {
            self.databases.push(db);
        }
    }

    pub fn add_type(&mut self, typ: ValueType) {
        if !self.types.contains(&typ) {
            self.types.push(typ);
        }
    }

    pub fn add_keys(&mut self, re: Regex) {
        self.keys = Some(re);
    }

    /// Explicitly selected databases; empty means all of them.
    pub fn databases(&self) -> &[u32] {
        &self.databases
    }
}

impl Filter for Simple {
    fn matches_db(&self, db: u32) -> bool {
        self.databases.is_empty() || self.databases.contains(&db)
    }

    fn matches_type(&self, value_type: ValueType) -> bool {
        self.types.is_empty() || self.types.contains(&value_type)
    }

    fn matches_key(&self, key: &str) -> bool {
        match &self.keys {
            None => true,
            Some(re) => re.is_match(key),
        }
    }
}
