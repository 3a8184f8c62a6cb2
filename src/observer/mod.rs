//! Progress reporting hooks. The engines call these synchronously; an
//! observer has no say over control flow.

pub use self::nil::Nil;
pub use self::plain::Plain;

use crate::types::ValueType;

pub mod nil;
pub mod plain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Captured on dump, dispatched on restore.
    Processed(ValueType),
    /// Read fine but left out by the type filter.
    Filtered(ValueType),
    Skipped,
}

#[allow(unused_variables)]
pub trait Observer {
    fn batch_start(&mut self, db: u32, index: usize, size: usize) {}

    fn key_processed(&mut self, db: u32, key: &str, outcome: KeyOutcome) {}

    fn database_done(&mut self, db: u32, keys: usize) {}
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn batch_start(&mut self, db: u32, index: usize, size: usize) {
        (**self).batch_start(db, index, size)
    }

    fn key_processed(&mut self, db: u32, key: &str, outcome: KeyOutcome) {
        (**self).key_processed(db, key, outcome)
    }

    fn database_done(&mut self, db: u32, keys: usize) {
        (**self).database_done(db, keys)
    }
}
