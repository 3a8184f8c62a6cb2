//! Point-in-time dump and restore of the contents of a running Redis store.
//!
//! A dump walks every key of the selected databases and captures its type,
//! value and remaining TTL into a JSON snapshot; a restore rebuilds that
//! state in a (possibly different) store, refusing to write into a
//! non-empty database unless told to overwrite or flush it.
//!
//! ```no_run
//! # async fn run() -> rdbsnap::SnapResult<()> {
//! use std::path::Path;
//! use rdbsnap::{observer, store::RedisStore, DumpSettings};
//!
//! let mut store = RedisStore::connect("redis://127.0.0.1:6379").await?;
//! let settings = DumpSettings::new(&[0, 1])?;
//! rdbsnap::dump_to_file(&mut store, &settings, observer::Nil, Path::new("dump.json")).await?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod constants;
pub mod dump;
pub mod filter;
pub mod observer;
pub mod restore;
pub mod settings;
pub mod store;
pub mod types;

pub use crate::dump::{dump, dump_to_file};
pub use crate::restore::{restore, restore_from_file};
pub use crate::settings::{DumpSettings, RestoreSettings};
pub use crate::types::{
    CodecError, DatabaseSnapshot, DumpSummary, KeyRecord, RecordValue, RestoreSummary,
    ScoredMember, SettingsError, SnapError, SnapResult, Snapshot, StoreError, ValueType,
};
