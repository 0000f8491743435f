//! Expenses and their assignment to participants.
//!
//! An [`Expense`] moves through `unsaved -> saved -> assigned`, may be
//! updated and re-assigned any number of times, and ends deleted. Stores
//! insert the row and its assignments in one unit of work, so a saved expense
//! without assignments is never observable.

use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{Category, ExpenseAssignment, LedgerError, Pence, ResultLedger, split::split_amount};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub amount: Pence,
    pub payer_id: i64,
    pub group_id: i64,
    pub category: Category,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub assignments: Vec<ExpenseAssignment>,
}

impl Expense {
    /// Creates an unsaved expense with no assignments.
    pub fn new(
        group_id: i64,
        amount: Pence,
        payer_id: i64,
        category: Category,
        description: &str,
    ) -> Self {
        Self {
            id: 0,
            amount,
            payer_id,
            group_id,
            category,
            description: description.trim().to_string(),
            created_at: Utc::now(),
            assignments: Vec::new(),
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id > 0
    }

    /// Positive amount, known category, positive payer and group ids.
    pub fn validate(&self) -> ResultLedger<()> {
        self.amount.validate()?;
        self.category.validate()?;
        if self.payer_id <= 0 || self.group_id <= 0 {
            return Err(LedgerError::InvalidId(
                "payer_id and group_id must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Splits the expense across `user_ids`, one assignment per entry.
    ///
    /// Duplicates are kept and the output follows the input order. The
    /// expense must be valid and already saved.
    pub fn assign(&self, user_ids: &[i64]) -> ResultLedger<Vec<ExpenseAssignment>> {
        self.assign_with(user_ids, &mut rand::thread_rng())
    }

    /// [`Expense::assign`] with an explicit source of randomness.
    pub fn assign_with<R: Rng + ?Sized>(
        &self,
        user_ids: &[i64],
        rng: &mut R,
    ) -> ResultLedger<Vec<ExpenseAssignment>> {
        self.validate()?;
        if !self.is_saved() {
            return Err(LedgerError::NotSaved("expense"));
        }
        if user_ids.is_empty() {
            return Err(LedgerError::NoParticipants);
        }

        let shares = split_amount(self.amount, user_ids.len(), rng)?;
        Ok(user_ids
            .iter()
            .zip(shares)
            .map(|(user_id, amount)| ExpenseAssignment {
                id: 0,
                user_id: *user_id,
                amount,
                expense_id: self.id,
            })
            .collect())
    }

    /// Sum of the current assignments.
    pub fn assigned_total(&self) -> Pence {
        self.assignments.iter().map(|a| a.amount).sum()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub amount: i64,
    pub payer_id: i64,
    pub group_id: i64,
    pub category: String,
    pub description: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::groups::Entity",
        from = "Column::GroupId",
        to = "super::groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Groups,
    #[sea_orm(has_many = "super::expense_assignments::Entity")]
    Assignments,
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl Related<super::expense_assignments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: if expense.id == 0 {
                ActiveValue::NotSet
            } else {
                ActiveValue::Set(expense.id)
            },
            amount: ActiveValue::Set(expense.amount.pence()),
            payer_id: ActiveValue::Set(expense.payer_id),
            group_id: ActiveValue::Set(expense.group_id),
            category: ActiveValue::Set(expense.category.to_string()),
            description: ActiveValue::Set(expense.description.clone()),
            created_at: ActiveValue::Set(expense.created_at),
        }
    }
}

impl From<Model> for Expense {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            amount: Pence::new(model.amount),
            payer_id: model.payer_id,
            group_id: model.group_id,
            category: Category::parse(&model.category),
            description: model.description,
            created_at: model.created_at,
            assignments: Vec::new(),
        }
    }
}
