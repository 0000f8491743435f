//! Payments: a direct transfer of money from one member to another.
//!
//! Typically made by someone in deficit to someone who has paid more than
//! their share. Payments are never split.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{LedgerError, Pence, ResultLedger};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub group_id: i64,
    pub amount: Pence,
    pub giver_id: i64,
    pub receiver_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates an unsaved payment.
    pub fn new(group_id: i64, giver_id: i64, receiver_id: i64, amount: Pence) -> Self {
        Self {
            id: 0,
            group_id,
            amount,
            giver_id,
            receiver_id,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> ResultLedger<()> {
        self.amount.validate()?;
        if self.group_id <= 0 || self.giver_id <= 0 || self.receiver_id <= 0 {
            return Err(LedgerError::InvalidId(
                "group_id, giver_id and receiver_id must be positive".to_string(),
            ));
        }
        if self.giver_id == self.receiver_id {
            return Err(LedgerError::InvalidPayment(
                "giver and receiver must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub group_id: i64,
    pub amount: i64,
    pub giver_id: i64,
    pub receiver_id: i64,
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
}

impl Related<super::groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Groups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(payment: &Payment) -> Self {
        Self {
            id: if payment.id == 0 {
                ActiveValue::NotSet
            } else {
                ActiveValue::Set(payment.id)
            },
            group_id: ActiveValue::Set(payment.group_id),
            amount: ActiveValue::Set(payment.amount.pence()),
            giver_id: ActiveValue::Set(payment.giver_id),
            receiver_id: ActiveValue::Set(payment.receiver_id),
            created_at: ActiveValue::Set(payment.created_at),
        }
    }
}

impl From<Model> for Payment {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            group_id: model.group_id,
            amount: Pence::new(model.amount),
            giver_id: model.giver_id,
            receiver_id: model.receiver_id,
            created_at: model.created_at,
        }
    }
}
