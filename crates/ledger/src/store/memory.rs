//! In-process [`Storer`] backed by ordered maps.
//!
//! Every write runs inside a [`UnitOfWork`]: it holds the store lock and a
//! staged copy of the tables, publishes the copy on `commit` and discards it
//! when dropped. Useful for tests and for running the ledger without a
//! database.

use std::{
    collections::BTreeMap,
    ops::{Deref, DerefMut},
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
};

use chrono::Utc;
use sea_orm::DbErr;

use crate::{
    Expense, ExpenseAssignment, Group, LedgerError, Membership, Payment, ResultLedger, Storer,
    User, groups::normalize_name,
};

#[derive(Clone, Debug, Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    groups: BTreeMap<i64, Group>,
    members: BTreeMap<i64, Membership>,
    expenses: BTreeMap<i64, Expense>,
    assignments: BTreeMap<i64, ExpenseAssignment>,
    payments: BTreeMap<i64, Payment>,
}

impl Tables {
    /// Ids are shared by all tables and never handed out twice once committed.
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn group(&self, id: i64) -> ResultLedger<&Group> {
        self.groups
            .get(&id)
            .ok_or_else(|| LedgerError::not_found("group", id))
    }

    fn user(&self, id: i64) -> ResultLedger<&User> {
        self.users
            .get(&id)
            .ok_or_else(|| LedgerError::not_found("user", id))
    }

    fn membership_id(&self, group_id: i64, user_id: i64) -> Option<i64> {
        self.members
            .values()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .map(|m| m.id)
    }

    fn email_taken(&self, email: &str, except: i64) -> bool {
        self.users
            .values()
            .any(|u| u.id != except && u.email == email)
    }

    fn hydrate(&self, expense: &Expense) -> Expense {
        let mut expense = expense.clone();
        expense.assignments = self
            .assignments
            .values()
            .filter(|a| a.expense_id == expense.id)
            .cloned()
            .collect();
        expense
    }

    fn remove_assignments(&mut self, expense_id: i64) -> usize {
        let before = self.assignments.len();
        self.assignments.retain(|_, a| a.expense_id != expense_id);
        before - self.assignments.len()
    }
}

/// Scoped write access to a [`MemoryStore`].
struct UnitOfWork<'a> {
    guard: MutexGuard<'a, Tables>,
    staged: Tables,
}

impl UnitOfWork<'_> {
    /// Publishes the staged tables.
    fn commit(self) {
        let UnitOfWork { mut guard, staged } = self;
        *guard = staged;
    }
}

impl Deref for UnitOfWork<'_> {
    type Target = Tables;

    fn deref(&self) -> &Self::Target {
        &self.staged
    }
}

impl DerefMut for UnitOfWork<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.staged
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    assignment_budget: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            assignment_budget: AtomicUsize::new(usize::MAX),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fault injection: after `n` more assignment rows have been written,
    /// every further assignment insert fails.
    pub fn fail_assignment_inserts_after(&self, n: usize) {
        self.assignment_budget.store(n, Ordering::SeqCst);
    }

    fn read(&self) -> ResultLedger<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| LedgerError::StorePoisoned)
    }

    fn begin(&self) -> ResultLedger<UnitOfWork<'_>> {
        let guard = self.read()?;
        let staged = guard.clone();
        Ok(UnitOfWork { guard, staged })
    }

    fn insert_assignments(
        &self,
        uow: &mut UnitOfWork<'_>,
        assignments: Vec<ExpenseAssignment>,
    ) -> ResultLedger<Vec<ExpenseAssignment>> {
        let mut saved = Vec::with_capacity(assignments.len());
        for mut assignment in assignments {
            let budget = self.assignment_budget.load(Ordering::SeqCst);
            if budget == 0 {
                return Err(DbErr::Custom("assignment insert failed".to_string()).into());
            }
            if budget != usize::MAX {
                self.assignment_budget.store(budget - 1, Ordering::SeqCst);
            }
            assignment.id = uow.next_id();
            uow.assignments.insert(assignment.id, assignment.clone());
            saved.push(assignment);
        }
        Ok(saved)
    }
}

impl Storer for MemoryStore {
    async fn insert_user(&self, user: &mut User) -> ResultLedger<()> {
        if user.id != 0 {
            return Err(LedgerError::AlreadySaved("user"));
        }
        let email = user.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(LedgerError::InvalidName(
                "email must not be empty".to_string(),
            ));
        }

        let mut uow = self.begin()?;
        if uow.email_taken(&email, 0) {
            return Err(LedgerError::ExistingKey(email));
        }
        let id = uow.next_id();
        let saved = User {
            id,
            email,
            ..user.clone()
        };
        uow.users.insert(id, saved.clone());
        uow.commit();

        *user = saved;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> ResultLedger<()> {
        if user.id == 0 {
            return Err(LedgerError::NotSaved("user"));
        }
        let email = user.email.trim().to_lowercase();
        let mut uow = self.begin()?;
        uow.user(user.id)?;
        if uow.email_taken(&email, user.id) {
            return Err(LedgerError::ExistingKey(email));
        }
        uow.users.insert(
            user.id,
            User {
                email,
                ..user.clone()
            },
        );
        uow.commit();
        Ok(())
    }

    async fn delete_user(&self, user: &User) -> ResultLedger<()> {
        if user.id == 0 {
            return Err(LedgerError::NotSaved("user"));
        }
        let mut uow = self.begin()?;
        if uow.users.remove(&user.id).is_none() {
            return Err(LedgerError::not_found("user", user.id));
        }
        uow.members.retain(|_, m| m.user_id != user.id);
        let paid: Vec<i64> = uow
            .expenses
            .values()
            .filter(|e| e.payer_id == user.id)
            .map(|e| e.id)
            .collect();
        for id in paid {
            uow.expenses.remove(&id);
            uow.remove_assignments(id);
        }
        uow.assignments.retain(|_, a| a.user_id != user.id);
        uow.payments
            .retain(|_, p| p.giver_id != user.id && p.receiver_id != user.id);
        uow.commit();
        Ok(())
    }

    async fn user_by_id(&self, id: i64) -> ResultLedger<User> {
        self.read()?.user(id).cloned()
    }

    async fn user_by_email(&self, email: &str) -> ResultLedger<User> {
        let email = email.trim().to_lowercase();
        self.read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("user", email))
    }

    async fn user_by_token(&self, token: &str) -> ResultLedger<User> {
        self.read()?
            .users
            .values()
            .find(|u| u.token.as_deref() == Some(token))
            .cloned()
            .ok_or_else(|| LedgerError::NotFound("user with token".to_string()))
    }

    async fn insert_group(&self, group: &mut Group) -> ResultLedger<()> {
        if group.id != 0 {
            return Err(LedgerError::AlreadySaved("group"));
        }
        let name = normalize_name(&group.name)?;
        let mut uow = self.begin()?;
        let id = uow.next_id();
        uow.groups.insert(id, Group { id, name: name.clone() });
        uow.commit();

        group.id = id;
        group.name = name;
        Ok(())
    }

    async fn update_group(&self, group: &Group) -> ResultLedger<()> {
        if group.id == 0 {
            return Err(LedgerError::NotSaved("group"));
        }
        let name = normalize_name(&group.name)?;
        let mut uow = self.begin()?;
        uow.group(group.id)?;
        uow.groups.insert(group.id, Group { id: group.id, name });
        uow.commit();
        Ok(())
    }

    async fn delete_group(&self, group: &Group) -> ResultLedger<()> {
        if group.id == 0 {
            return Err(LedgerError::NotSaved("group"));
        }
        let mut uow = self.begin()?;
        if uow.groups.remove(&group.id).is_none() {
            return Err(LedgerError::not_found("group", group.id));
        }
        uow.members.retain(|_, m| m.group_id != group.id);
        let expense_ids: Vec<i64> = uow
            .expenses
            .values()
            .filter(|e| e.group_id == group.id)
            .map(|e| e.id)
            .collect();
        for id in expense_ids {
            uow.expenses.remove(&id);
            uow.remove_assignments(id);
        }
        uow.payments.retain(|_, p| p.group_id != group.id);
        uow.commit();
        Ok(())
    }

    async fn group_by_id(&self, id: i64) -> ResultLedger<Group> {
        self.read()?.group(id).cloned()
    }

    async fn groups(&self) -> ResultLedger<Vec<Group>> {
        Ok(self.read()?.groups.values().cloned().collect())
    }

    async fn groups_by_user(&self, user: &User) -> ResultLedger<Vec<Group>> {
        let tables = self.read()?;
        Ok(tables
            .groups
            .values()
            .filter(|g| tables.membership_id(g.id, user.id).is_some())
            .cloned()
            .collect())
    }

    async fn add_user_to_group(
        &self,
        group: &Group,
        user: &User,
        admin: bool,
    ) -> ResultLedger<()> {
        let mut uow = self.begin()?;
        uow.group(group.id)?;
        uow.user(user.id)?;
        if uow.membership_id(group.id, user.id).is_some() {
            return Err(LedgerError::AlreadyMember {
                group_id: group.id,
                user_id: user.id,
            });
        }
        let id = uow.next_id();
        uow.members.insert(
            id,
            Membership {
                id,
                group_id: group.id,
                user_id: user.id,
                is_admin: admin,
            },
        );
        uow.commit();
        Ok(())
    }

    async fn remove_user_from_group(&self, group: &Group, user: &User) -> ResultLedger<()> {
        let mut uow = self.begin()?;
        let id = uow
            .membership_id(group.id, user.id)
            .ok_or(LedgerError::NotMember {
                group_id: group.id,
                user_id: user.id,
            })?;
        uow.members.remove(&id);
        uow.commit();
        Ok(())
    }

    async fn group_members(&self, group: &Group) -> ResultLedger<Vec<Membership>> {
        let tables = self.read()?;
        tables.group(group.id)?;
        Ok(tables
            .members
            .values()
            .filter(|m| m.group_id == group.id)
            .cloned()
            .collect())
    }

    async fn insert_expense(&self, expense: &mut Expense, user_ids: &[i64]) -> ResultLedger<()> {
        if expense.id != 0 {
            return Err(LedgerError::AlreadySaved("expense"));
        }
        expense.validate()?;

        let mut uow = self.begin()?;
        uow.group(expense.group_id)?;

        let mut saved = expense.clone();
        saved.id = uow.next_id();
        saved.created_at = Utc::now();
        saved.assignments = Vec::new();
        uow.expenses.insert(saved.id, saved.clone());

        let assignments = saved.assign(user_ids)?;
        saved.assignments = self.insert_assignments(&mut uow, assignments)?;
        uow.commit();

        *expense = saved;
        Ok(())
    }

    async fn update_expense(&self, expense: &mut Expense, user_ids: &[i64]) -> ResultLedger<()> {
        if expense.id == 0 {
            return Err(LedgerError::NotSaved("expense"));
        }
        expense.validate()?;

        let mut uow = self.begin()?;
        let stored = uow
            .expenses
            .get(&expense.id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("expense", expense.id))?;
        if uow.remove_assignments(expense.id) == 0 {
            return Err(LedgerError::NoAssignments(expense.id));
        }

        let mut saved = Expense {
            group_id: stored.group_id,
            created_at: stored.created_at,
            assignments: Vec::new(),
            ..expense.clone()
        };
        uow.expenses.insert(saved.id, saved.clone());

        let assignments = saved.assign(user_ids)?;
        saved.assignments = self.insert_assignments(&mut uow, assignments)?;
        uow.commit();

        *expense = saved;
        Ok(())
    }

    async fn expense_by_id(&self, id: i64) -> ResultLedger<Expense> {
        let tables = self.read()?;
        let expense = tables
            .expenses
            .get(&id)
            .ok_or_else(|| LedgerError::not_found("expense", id))?;
        Ok(tables.hydrate(expense))
    }

    async fn expenses_by_group(&self, group: &Group) -> ResultLedger<Vec<Expense>> {
        let tables = self.read()?;
        tables.group(group.id)?;
        Ok(tables
            .expenses
            .values()
            .filter(|e| e.group_id == group.id)
            .map(|e| tables.hydrate(e))
            .collect())
    }

    async fn delete_expense(&self, expense: &Expense) -> ResultLedger<()> {
        if expense.id == 0 {
            return Err(LedgerError::NotSaved("expense"));
        }
        let mut uow = self.begin()?;
        if uow.expenses.remove(&expense.id).is_none() {
            return Err(LedgerError::not_found("expense", expense.id));
        }
        uow.remove_assignments(expense.id);
        uow.commit();
        Ok(())
    }

    async fn insert_payment(&self, payment: &mut Payment) -> ResultLedger<()> {
        if payment.id != 0 {
            return Err(LedgerError::AlreadySaved("payment"));
        }
        payment.validate()?;

        let mut uow = self.begin()?;
        uow.group(payment.group_id)?;
        let saved = Payment {
            id: uow.next_id(),
            created_at: Utc::now(),
            ..payment.clone()
        };
        uow.payments.insert(saved.id, saved.clone());
        uow.commit();

        *payment = saved;
        Ok(())
    }

    async fn update_payment(&self, payment: &Payment) -> ResultLedger<()> {
        if payment.id == 0 {
            return Err(LedgerError::NotSaved("payment"));
        }
        payment.validate()?;

        let mut uow = self.begin()?;
        let created_at = uow
            .payments
            .get(&payment.id)
            .map(|p| p.created_at)
            .ok_or_else(|| LedgerError::not_found("payment", payment.id))?;
        uow.group(payment.group_id)?;
        uow.payments.insert(
            payment.id,
            Payment {
                created_at,
                ..payment.clone()
            },
        );
        uow.commit();
        Ok(())
    }

    async fn delete_payment(&self, payment: &Payment) -> ResultLedger<()> {
        if payment.id == 0 {
            return Err(LedgerError::NotSaved("payment"));
        }
        let mut uow = self.begin()?;
        if uow.payments.remove(&payment.id).is_none() {
            return Err(LedgerError::not_found("payment", payment.id));
        }
        uow.commit();
        Ok(())
    }

    async fn payment_by_id(&self, id: i64) -> ResultLedger<Payment> {
        self.read()?
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("payment", id))
    }

    async fn payments_by_group(&self, group: &Group) -> ResultLedger<Vec<Payment>> {
        let tables = self.read()?;
        tables.group(group.id)?;
        Ok(tables
            .payments
            .values()
            .filter(|p| p.group_id == group.id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_unit_of_work_discards_changes() {
        let store = MemoryStore::new();
        {
            let mut uow = store.begin().unwrap();
            let id = uow.next_id();
            uow.groups.insert(
                id,
                Group {
                    id,
                    name: "gone".to_string(),
                },
            );
        }
        let tables = store.read().unwrap();
        assert!(tables.groups.is_empty());
        assert_eq!(tables.last_id, 0);
    }

    #[test]
    fn committed_unit_of_work_is_visible() {
        let store = MemoryStore::new();
        let mut uow = store.begin().unwrap();
        let id = uow.next_id();
        uow.groups.insert(
            id,
            Group {
                id,
                name: "kept".to_string(),
            },
        );
        uow.commit();

        assert_eq!(store.read().unwrap().group(id).unwrap().name, "kept");
    }
}
