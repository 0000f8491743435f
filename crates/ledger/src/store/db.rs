//! [`Storer`] over a sea-orm connection (SQLite in practice).
//!
//! Multi-row writes go through [`with_tx!`]; the schema lives in the
//! `migration` crate.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};

use super::with_tx;
use crate::{
    Expense, ExpenseAssignment, Group, LedgerError, Membership, Payment, ResultLedger, Storer,
    User, expense_assignments, expenses, group_members, groups, groups::normalize_name, payments,
    users,
};

#[derive(Clone, Debug)]
pub struct DbStore {
    database: DatabaseConnection,
}

impl DbStore {
    /// Return a builder for `DbStore`.
    pub fn builder() -> DbStoreBuilder {
        DbStoreBuilder::default()
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.database
    }
}

/// The builder for `DbStore`
#[derive(Default)]
pub struct DbStoreBuilder {
    database: DatabaseConnection,
}

impl DbStoreBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> DbStoreBuilder {
        self.database = db;
        self
    }

    /// Construct `DbStore`, checking the connection is alive.
    pub async fn build(self) -> ResultLedger<DbStore> {
        self.database.ping().await?;
        tracing::info!("ledger store connected");
        Ok(DbStore {
            database: self.database,
        })
    }
}

async fn find_group<C: ConnectionTrait>(db: &C, id: i64) -> ResultLedger<groups::Model> {
    groups::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| LedgerError::not_found("group", id))
}

async fn find_user<C: ConnectionTrait>(db: &C, id: i64) -> ResultLedger<users::Model> {
    users::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| LedgerError::not_found("user", id))
}

async fn find_expense<C: ConnectionTrait>(db: &C, id: i64) -> ResultLedger<expenses::Model> {
    expenses::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| LedgerError::not_found("expense", id))
}

async fn find_user_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> ResultLedger<Option<users::Model>> {
    Ok(users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(db)
        .await?)
}

async fn find_membership<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    user_id: i64,
) -> ResultLedger<Option<group_members::Model>> {
    Ok(group_members::Entity::find()
        .filter(group_members::Column::GroupId.eq(group_id))
        .filter(group_members::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}

/// Loads the assignments of `expense_ids` keyed by expense id.
///
/// Rows are grouped through the map, so the result does not depend on the
/// order the database returns them in; the ordering only keeps each
/// expense's assignments in insertion order.
async fn load_assignments<C: ConnectionTrait>(
    db: &C,
    expense_ids: Vec<i64>,
) -> ResultLedger<HashMap<i64, Vec<ExpenseAssignment>>> {
    let mut by_expense: HashMap<i64, Vec<ExpenseAssignment>> = HashMap::new();
    if expense_ids.is_empty() {
        return Ok(by_expense);
    }

    let rows = expense_assignments::Entity::find()
        .filter(expense_assignments::Column::ExpenseId.is_in(expense_ids))
        .order_by_asc(expense_assignments::Column::ExpenseId)
        .order_by_asc(expense_assignments::Column::Id)
        .all(db)
        .await?;
    for row in rows {
        by_expense
            .entry(row.expense_id)
            .or_default()
            .push(ExpenseAssignment::from(row));
    }
    Ok(by_expense)
}

async fn insert_assignments<C: ConnectionTrait>(
    db: &C,
    assignments: Vec<ExpenseAssignment>,
) -> ResultLedger<Vec<ExpenseAssignment>> {
    let mut saved = Vec::with_capacity(assignments.len());
    for assignment in &assignments {
        let model = expense_assignments::ActiveModel::from(assignment)
            .insert(db)
            .await?;
        saved.push(ExpenseAssignment::from(model));
    }
    Ok(saved)
}

fn normalize_email(email: &str) -> ResultLedger<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(LedgerError::InvalidName(
            "email must not be empty".to_string(),
        ));
    }
    Ok(email)
}

impl Storer for DbStore {
    async fn insert_user(&self, user: &mut User) -> ResultLedger<()> {
        if user.id != 0 {
            return Err(LedgerError::AlreadySaved("user"));
        }
        let row = User {
            email: normalize_email(&user.email)?,
            ..user.clone()
        };

        let saved: ResultLedger<User> = with_tx!(self, |db_tx| {
            if find_user_by_email(&db_tx, &row.email).await?.is_some() {
                return Err(LedgerError::ExistingKey(row.email));
            }
            let model = users::ActiveModel::from(&row).insert(&db_tx).await?;
            Ok(User::from(model))
        });
        *user = saved?;
        Ok(())
    }

    async fn update_user(&self, user: &User) -> ResultLedger<()> {
        if user.id == 0 {
            return Err(LedgerError::NotSaved("user"));
        }
        let row = User {
            email: normalize_email(&user.email)?,
            ..user.clone()
        };

        with_tx!(self, |db_tx| {
            find_user(&db_tx, row.id).await?;
            if let Some(other) = find_user_by_email(&db_tx, &row.email).await?
                && other.id != row.id
            {
                return Err(LedgerError::ExistingKey(row.email));
            }
            users::ActiveModel::from(&row).update(&db_tx).await?;
            Ok(())
        })
    }

    async fn delete_user(&self, user: &User) -> ResultLedger<()> {
        if user.id == 0 {
            return Err(LedgerError::NotSaved("user"));
        }
        with_tx!(self, |db_tx| {
            group_members::Entity::delete_many()
                .filter(group_members::Column::UserId.eq(user.id))
                .exec(&db_tx)
                .await?;
            let deleted = users::Entity::delete_by_id(user.id).exec(&db_tx).await?;
            if deleted.rows_affected == 0 {
                return Err(LedgerError::not_found("user", user.id));
            }
            Ok(())
        })
    }

    async fn user_by_id(&self, id: i64) -> ResultLedger<User> {
        Ok(find_user(&self.database, id).await?.into())
    }

    async fn user_by_email(&self, email: &str) -> ResultLedger<User> {
        let email = email.trim().to_lowercase();
        find_user_by_email(&self.database, &email)
            .await?
            .map(User::from)
            .ok_or_else(|| LedgerError::not_found("user", email))
    }

    async fn user_by_token(&self, token: &str) -> ResultLedger<User> {
        users::Entity::find()
            .filter(users::Column::Token.eq(token))
            .one(&self.database)
            .await?
            .map(User::from)
            .ok_or_else(|| LedgerError::NotFound("user with token".to_string()))
    }

    async fn insert_group(&self, group: &mut Group) -> ResultLedger<()> {
        if group.id != 0 {
            return Err(LedgerError::AlreadySaved("group"));
        }
        let row = Group {
            id: 0,
            name: normalize_name(&group.name)?,
        };
        let model = groups::ActiveModel::from(&row)
            .insert(&self.database)
            .await?;
        *group = Group::from(model);
        Ok(())
    }

    async fn update_group(&self, group: &Group) -> ResultLedger<()> {
        if group.id == 0 {
            return Err(LedgerError::NotSaved("group"));
        }
        let row = Group {
            id: group.id,
            name: normalize_name(&group.name)?,
        };
        with_tx!(self, |db_tx| {
            find_group(&db_tx, row.id).await?;
            groups::ActiveModel::from(&row).update(&db_tx).await?;
            Ok(())
        })
    }

    async fn delete_group(&self, group: &Group) -> ResultLedger<()> {
        if group.id == 0 {
            return Err(LedgerError::NotSaved("group"));
        }
        with_tx!(self, |db_tx| {
            find_group(&db_tx, group.id).await?;

            let expense_ids: Vec<i64> = expenses::Entity::find()
                .filter(expenses::Column::GroupId.eq(group.id))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|e| e.id)
                .collect();
            if !expense_ids.is_empty() {
                expense_assignments::Entity::delete_many()
                    .filter(expense_assignments::Column::ExpenseId.is_in(expense_ids))
                    .exec(&db_tx)
                    .await?;
            }
            expenses::Entity::delete_many()
                .filter(expenses::Column::GroupId.eq(group.id))
                .exec(&db_tx)
                .await?;
            payments::Entity::delete_many()
                .filter(payments::Column::GroupId.eq(group.id))
                .exec(&db_tx)
                .await?;
            group_members::Entity::delete_many()
                .filter(group_members::Column::GroupId.eq(group.id))
                .exec(&db_tx)
                .await?;
            groups::Entity::delete_by_id(group.id).exec(&db_tx).await?;
            Ok(())
        })
    }

    async fn group_by_id(&self, id: i64) -> ResultLedger<Group> {
        Ok(find_group(&self.database, id).await?.into())
    }

    async fn groups(&self) -> ResultLedger<Vec<Group>> {
        let rows = groups::Entity::find()
            .order_by_asc(groups::Column::Id)
            .all(&self.database)
            .await?;
        Ok(rows.into_iter().map(Group::from).collect())
    }

    async fn groups_by_user(&self, user: &User) -> ResultLedger<Vec<Group>> {
        let group_ids: Vec<i64> = group_members::Entity::find()
            .filter(group_members::Column::UserId.eq(user.id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|m| m.group_id)
            .collect();
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = groups::Entity::find()
            .filter(groups::Column::Id.is_in(group_ids))
            .order_by_asc(groups::Column::Id)
            .all(&self.database)
            .await?;
        Ok(rows.into_iter().map(Group::from).collect())
    }

    async fn add_user_to_group(
        &self,
        group: &Group,
        user: &User,
        admin: bool,
    ) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            find_group(&db_tx, group.id).await?;
            find_user(&db_tx, user.id).await?;
            if find_membership(&db_tx, group.id, user.id).await?.is_some() {
                return Err(LedgerError::AlreadyMember {
                    group_id: group.id,
                    user_id: user.id,
                });
            }
            let membership = Membership {
                id: 0,
                group_id: group.id,
                user_id: user.id,
                is_admin: admin,
            };
            group_members::ActiveModel::from(&membership)
                .insert(&db_tx)
                .await?;
            Ok(())
        })
    }

    async fn remove_user_from_group(&self, group: &Group, user: &User) -> ResultLedger<()> {
        let deleted = group_members::Entity::delete_many()
            .filter(group_members::Column::GroupId.eq(group.id))
            .filter(group_members::Column::UserId.eq(user.id))
            .exec(&self.database)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(LedgerError::NotMember {
                group_id: group.id,
                user_id: user.id,
            });
        }
        Ok(())
    }

    async fn group_members(&self, group: &Group) -> ResultLedger<Vec<Membership>> {
        find_group(&self.database, group.id).await?;
        let rows = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group.id))
            .order_by_asc(group_members::Column::Id)
            .all(&self.database)
            .await?;
        Ok(rows.into_iter().map(Membership::from).collect())
    }

    async fn insert_expense(&self, expense: &mut Expense, user_ids: &[i64]) -> ResultLedger<()> {
        if expense.id != 0 {
            return Err(LedgerError::AlreadySaved("expense"));
        }
        expense.validate()?;
        let row = Expense {
            created_at: Utc::now(),
            assignments: Vec::new(),
            ..expense.clone()
        };

        let saved: ResultLedger<Expense> = with_tx!(self, |db_tx| {
            find_group(&db_tx, row.group_id).await?;
            let model = expenses::ActiveModel::from(&row).insert(&db_tx).await?;
            let mut saved = Expense::from(model);
            // The split needs the id handed out by the insert above.
            let assignments = saved.assign(user_ids)?;
            saved.assignments = insert_assignments(&db_tx, assignments).await?;
            Ok(saved)
        });
        *expense = saved?;
        tracing::debug!(expense_id = expense.id, "expense inserted");
        Ok(())
    }

    async fn update_expense(&self, expense: &mut Expense, user_ids: &[i64]) -> ResultLedger<()> {
        if expense.id == 0 {
            return Err(LedgerError::NotSaved("expense"));
        }
        expense.validate()?;

        let saved: ResultLedger<Expense> = with_tx!(self, |db_tx| {
            let stored = find_expense(&db_tx, expense.id).await?;
            let removed = expense_assignments::Entity::delete_many()
                .filter(expense_assignments::Column::ExpenseId.eq(expense.id))
                .exec(&db_tx)
                .await?;
            if removed.rows_affected == 0 {
                return Err(LedgerError::NoAssignments(expense.id));
            }

            let row = Expense {
                group_id: stored.group_id,
                created_at: stored.created_at,
                assignments: Vec::new(),
                ..expense.clone()
            };
            let model = expenses::ActiveModel::from(&row).update(&db_tx).await?;
            let mut saved = Expense::from(model);
            let assignments = saved.assign(user_ids)?;
            saved.assignments = insert_assignments(&db_tx, assignments).await?;
            Ok(saved)
        });
        *expense = saved?;
        Ok(())
    }

    async fn expense_by_id(&self, id: i64) -> ResultLedger<Expense> {
        let mut expense = Expense::from(find_expense(&self.database, id).await?);
        let mut assignments = load_assignments(&self.database, vec![id]).await?;
        expense.assignments = assignments.remove(&id).unwrap_or_default();
        Ok(expense)
    }

    async fn expenses_by_group(&self, group: &Group) -> ResultLedger<Vec<Expense>> {
        find_group(&self.database, group.id).await?;
        let rows = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group.id))
            .order_by_asc(expenses::Column::Id)
            .all(&self.database)
            .await?;

        let ids = rows.iter().map(|e| e.id).collect();
        let mut assignments = load_assignments(&self.database, ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let mut expense = Expense::from(row);
                expense.assignments = assignments.remove(&expense.id).unwrap_or_default();
                expense
            })
            .collect())
    }

    async fn delete_expense(&self, expense: &Expense) -> ResultLedger<()> {
        if expense.id == 0 {
            return Err(LedgerError::NotSaved("expense"));
        }
        with_tx!(self, |db_tx| {
            find_expense(&db_tx, expense.id).await?;
            expense_assignments::Entity::delete_many()
                .filter(expense_assignments::Column::ExpenseId.eq(expense.id))
                .exec(&db_tx)
                .await?;
            expenses::Entity::delete_by_id(expense.id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    async fn insert_payment(&self, payment: &mut Payment) -> ResultLedger<()> {
        if payment.id != 0 {
            return Err(LedgerError::AlreadySaved("payment"));
        }
        payment.validate()?;
        let row = Payment {
            created_at: Utc::now(),
            ..payment.clone()
        };

        let saved: ResultLedger<Payment> = with_tx!(self, |db_tx| {
            find_group(&db_tx, row.group_id).await?;
            let model = payments::ActiveModel::from(&row).insert(&db_tx).await?;
            Ok(Payment::from(model))
        });
        *payment = saved?;
        Ok(())
    }

    async fn update_payment(&self, payment: &Payment) -> ResultLedger<()> {
        if payment.id == 0 {
            return Err(LedgerError::NotSaved("payment"));
        }
        payment.validate()?;

        with_tx!(self, |db_tx| {
            let stored = payments::Entity::find_by_id(payment.id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| LedgerError::not_found("payment", payment.id))?;
            find_group(&db_tx, payment.group_id).await?;
            let row = Payment {
                created_at: stored.created_at,
                ..payment.clone()
            };
            payments::ActiveModel::from(&row).update(&db_tx).await?;
            Ok(())
        })
    }

    async fn delete_payment(&self, payment: &Payment) -> ResultLedger<()> {
        if payment.id == 0 {
            return Err(LedgerError::NotSaved("payment"));
        }
        let deleted = payments::Entity::delete_by_id(payment.id)
            .exec(&self.database)
            .await?;
        if deleted.rows_affected == 0 {
            return Err(LedgerError::not_found("payment", payment.id));
        }
        Ok(())
    }

    async fn payment_by_id(&self, id: i64) -> ResultLedger<Payment> {
        payments::Entity::find_by_id(id)
            .one(&self.database)
            .await?
            .map(Payment::from)
            .ok_or_else(|| LedgerError::not_found("payment", id))
    }

    async fn payments_by_group(&self, group: &Group) -> ResultLedger<Vec<Payment>> {
        find_group(&self.database, group.id).await?;
        let rows = payments::Entity::find()
            .filter(payments::Column::GroupId.eq(group.id))
            .order_by_asc(payments::Column::Id)
            .all(&self.database)
            .await?;
        Ok(rows.into_iter().map(Payment::from).collect())
    }
}
