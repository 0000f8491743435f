//! The persistence boundary of the ledger.
//!
//! Behaviour every implementation must honour beyond the signatures:
//!
//! - inserting an entity whose `id` is non-zero fails with
//!   [`LedgerError::AlreadySaved`]; update and delete of an `id` of zero
//!   fail with [`LedgerError::NotSaved`];
//! - update, delete and lookup of a missing id fail with
//!   [`LedgerError::NotFound`];
//! - [`Storer::insert_expense`] inserts the expense row, splits it with
//!   [`Expense::assign`](crate::Expense::assign) and inserts every assignment
//!   in a single unit of work. Nothing is left behind when any step fails;
//! - [`Storer::update_expense`] replaces the assignments in the same unit of
//!   work as the field update;
//! - deleting an expense removes its assignments; deleting a group removes its
//!   memberships, expenses and payments.
//!
//! [`LedgerError::AlreadySaved`]: crate::LedgerError::AlreadySaved
//! [`LedgerError::NotSaved`]: crate::LedgerError::NotSaved
//! [`LedgerError::NotFound`]: crate::LedgerError::NotFound

use crate::{Expense, Group, Membership, Payment, ResultLedger, User};

#[allow(async_fn_in_trait)]
pub trait Storer {
    // Users (owned by the authentication layer)
    async fn insert_user(&self, user: &mut User) -> ResultLedger<()>;
    async fn update_user(&self, user: &User) -> ResultLedger<()>;
    async fn delete_user(&self, user: &User) -> ResultLedger<()>;
    async fn user_by_id(&self, id: i64) -> ResultLedger<User>;
    async fn user_by_email(&self, email: &str) -> ResultLedger<User>;
    async fn user_by_token(&self, token: &str) -> ResultLedger<User>;

    // Groups
    async fn insert_group(&self, group: &mut Group) -> ResultLedger<()>;
    async fn update_group(&self, group: &Group) -> ResultLedger<()>;
    async fn delete_group(&self, group: &Group) -> ResultLedger<()>;
    async fn group_by_id(&self, id: i64) -> ResultLedger<Group>;
    async fn groups(&self) -> ResultLedger<Vec<Group>>;
    async fn groups_by_user(&self, user: &User) -> ResultLedger<Vec<Group>>;
    /// Fails with `AlreadyMember` when the user is already in the group.
    async fn add_user_to_group(&self, group: &Group, user: &User, admin: bool)
    -> ResultLedger<()>;
    /// Fails with `NotMember` when the user is not in the group.
    async fn remove_user_from_group(&self, group: &Group, user: &User) -> ResultLedger<()>;
    async fn group_members(&self, group: &Group) -> ResultLedger<Vec<Membership>>;

    // Expenses
    /// Fills in `id`, `created_at` and `assignments`.
    async fn insert_expense(&self, expense: &mut Expense, user_ids: &[i64]) -> ResultLedger<()>;
    /// Fails with `NoAssignments` when the stored expense has none.
    async fn update_expense(&self, expense: &mut Expense, user_ids: &[i64]) -> ResultLedger<()>;
    async fn expense_by_id(&self, id: i64) -> ResultLedger<Expense>;
    async fn expenses_by_group(&self, group: &Group) -> ResultLedger<Vec<Expense>>;
    async fn delete_expense(&self, expense: &Expense) -> ResultLedger<()>;

    // Payments
    async fn insert_payment(&self, payment: &mut Payment) -> ResultLedger<()>;
    async fn update_payment(&self, payment: &Payment) -> ResultLedger<()>;
    async fn delete_payment(&self, payment: &Payment) -> ResultLedger<()>;
    async fn payment_by_id(&self, id: i64) -> ResultLedger<Payment>;
    async fn payments_by_group(&self, group: &Group) -> ResultLedger<Vec<Payment>>;
}
