//! Expense assignments.
//!
//! An [`ExpenseAssignment`] is one participant's share of an
//! [`Expense`](crate::Expense). Assignments live and die with their expense.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::Pence;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseAssignment {
    pub id: i64,
    pub user_id: i64,
    pub amount: Pence,
    pub expense_id: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub expense_id: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ExpenseAssignment> for ActiveModel {
    fn from(assignment: &ExpenseAssignment) -> Self {
        Self {
            id: if assignment.id == 0 {
                ActiveValue::NotSet
            } else {
                ActiveValue::Set(assignment.id)
            },
            user_id: ActiveValue::Set(assignment.user_id),
            amount: ActiveValue::Set(assignment.amount.pence()),
            expense_id: ActiveValue::Set(assignment.expense_id),
        }
    }
}

impl From<Model> for ExpenseAssignment {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            amount: Pence::new(model.amount),
            expense_id: model.expense_id,
        }
    }
}
