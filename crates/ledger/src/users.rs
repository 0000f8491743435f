//! Users table (minimal entity).
//!
//! Accounts belong to the authentication layer; the ledger only reads them to
//! resolve payer, participant, giver and receiver ids.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub token: Option<String>,
}

impl User {
    /// Creates an unsaved user. The email is lower-cased.
    pub fn new(email: &str, is_admin: bool, is_active: bool) -> Self {
        Self {
            id: 0,
            email: email.trim().to_lowercase(),
            is_admin,
            is_active,
            token: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub email: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub token: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        Self {
            id: if user.id == 0 {
                ActiveValue::NotSet
            } else {
                ActiveValue::Set(user.id)
            },
            email: ActiveValue::Set(user.email.clone()),
            is_admin: ActiveValue::Set(user.is_admin),
            is_active: ActiveValue::Set(user.is_active),
            token: ActiveValue::Set(user.token.clone()),
        }
    }
}

impl From<Model> for User {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            is_admin: model.is_admin,
            is_active: model.is_active,
            token: model.token,
        }
    }
}
