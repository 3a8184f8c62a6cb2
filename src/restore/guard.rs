//! Decides whether a restore may write into a database.

use log::info;

use crate::store::Store;
use crate::types::StoreResult;

/// Operator intent for a non-empty target. Flushing implies forcing; the
/// combination is validated in [`RestoreSettings`](crate::settings::RestoreSettings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intent {
    /// Refuse to write into a database that holds any key.
    #[default]
    Default,
    /// Overwrite conflicting keys, keep the others.
    Force,
    /// Wipe the database first.
    Flush,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Proceed,
    Blocked { key_count: u64 },
}

#[derive(Debug, Clone, Copy)]
pub struct RestoreGuard {
    intent: Intent,
}

impl RestoreGuard {
    pub fn new(intent: Intent) -> RestoreGuard {
        RestoreGuard { intent }
    }

    /// Evaluates the selected database. With [`Intent::Flush`] this wipes it.
    pub async fn evaluate<S: Store>(&self, store: &mut S, db: u32) -> StoreResult<Verdict> {
        match self.intent {
            Intent::Flush => {
                info!("db {}: flushing before restore", db);
                store.flush().await?;
                Ok(Verdict::Proceed)
            }
            Intent::Force => Ok(Verdict::Proceed),
            Intent::Default => match store.key_count().await? {
                0 => Ok(Verdict::Proceed),
                key_count => Ok(Verdict::Blocked { key_count }),
            },
        }
    }
}
