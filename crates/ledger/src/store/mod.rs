//! [`Storer`](crate::Storer) implementations.

mod db;
mod memory;

pub use db::{DbStore, DbStoreBuilder};
pub use memory::MemoryStore;

/// Run a block inside a DB transaction, committing on success. Any early
/// return drops the transaction, which rolls it back.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;
