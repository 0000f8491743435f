//! Shared-expense ledger for households.
//!
//! Groups of users record expenses, each split fairly across participants,
//! and direct payments between members. [`Manager`] is the entry point;
//! persistence goes through a [`Storer`], either [`DbStore`] (sea-orm) or
//! [`MemoryStore`].

pub use balances::{Balances, Settlement};
pub use categories::Category;
pub use error::LedgerError;
pub use expense_assignments::ExpenseAssignment;
pub use expenses::Expense;
pub use group_members::Membership;
pub use groups::Group;
pub use manager::Manager;
pub use money::Pence;
pub use payments::Payment;
pub use split::split_amount;
pub use store::{DbStore, DbStoreBuilder, MemoryStore};
pub use storer::Storer;
pub use users::User;

mod balances;
mod categories;
mod error;
mod manager;
mod money;
mod split;
mod store;
mod storer;

pub mod expense_assignments;
pub mod expenses;
pub mod group_members;
pub mod groups;
pub mod payments;
pub mod users;

pub type ResultLedger<T> = Result<T, LedgerError>;
