//! The module contains the errors the ledger can return.
//!
//! Errors fall in a few families:
//!
//! - validation: [`InvalidMoneyStr`], [`NegativePence`], [`InvalidCategory`],
//!   [`InvalidId`], [`InvalidName`], [`InvalidPayment`], [`NoParticipants`]
//! - precondition: [`NotSaved`], [`AlreadySaved`], [`NoAssignments`]
//! - not found: [`NotFound`], [`NotMember`]
//! - conflict: [`ExistingKey`], [`AlreadyMember`]
//! - storage: [`Database`], [`StorePoisoned`]
//!
//! Errors bubbling up from a store are annotated with [`Context`]; use
//! [`LedgerError::root`] to get at the underlying kind.
//!
//!  [`InvalidMoneyStr`]: LedgerError::InvalidMoneyStr
//!  [`NegativePence`]: LedgerError::NegativePence
//!  [`InvalidCategory`]: LedgerError::InvalidCategory
//!  [`InvalidId`]: LedgerError::InvalidId
//!  [`InvalidName`]: LedgerError::InvalidName
//!  [`InvalidPayment`]: LedgerError::InvalidPayment
//!  [`NoParticipants`]: LedgerError::NoParticipants
//!  [`NotSaved`]: LedgerError::NotSaved
//!  [`AlreadySaved`]: LedgerError::AlreadySaved
//!  [`NoAssignments`]: LedgerError::NoAssignments
//!  [`NotFound`]: LedgerError::NotFound
//!  [`NotMember`]: LedgerError::NotMember
//!  [`ExistingKey`]: LedgerError::ExistingKey
//!  [`AlreadyMember`]: LedgerError::AlreadyMember
//!  [`Database`]: LedgerError::Database
//!  [`StorePoisoned`]: LedgerError::StorePoisoned
//!  [`Context`]: LedgerError::Context
use sea_orm::DbErr;
use thiserror::Error;

use crate::Pence;

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid money string: {0:?}")]
    InvalidMoneyStr(String),
    #[error("pence must be positive, got {0}")]
    NegativePence(Pence),
    #[error("invalid category: {0}")]
    InvalidCategory(String),
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("invalid payment: {0}")]
    InvalidPayment(String),
    #[error("an expense needs at least one participant")]
    NoParticipants,
    #[error("invalid operation: {0} must be saved first")]
    NotSaved(&'static str),
    #[error("invalid operation: {0} is already saved")]
    AlreadySaved(&'static str),
    #[error("expense {0} has no assignments to update")]
    NoAssignments(i64),
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("user {user_id} is not a member of group {group_id}")]
    NotMember { group_id: i64, user_id: i64 },
    #[error("\"{0}\" already present")]
    ExistingKey(String),
    #[error("user {user_id} is already a member of group {group_id}")]
    AlreadyMember { group_id: i64, user_id: i64 },
    #[error("store lock poisoned")]
    StorePoisoned,
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<LedgerError>,
    },
}

impl LedgerError {
    /// Strips every [`LedgerError::Context`] layer.
    pub fn root(&self) -> &LedgerError {
        let mut err = self;
        while let Self::Context { source, .. } = err {
            err = source;
        }
        err
    }

    /// Missing entity, suitable for a 404-like answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound(_) | Self::NotMember { .. })
    }

    /// Duplicate entity or membership, suitable for a 409-like answer.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self.root(),
            Self::ExistingKey(_) | Self::AlreadyMember { .. } | Self::AlreadySaved(_)
        )
    }

    pub(crate) fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{what} {id}"))
    }
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InvalidMoneyStr(a), Self::InvalidMoneyStr(b)) => a == b,
            (Self::NegativePence(a), Self::NegativePence(b)) => a == b,
            (Self::InvalidCategory(a), Self::InvalidCategory(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidPayment(a), Self::InvalidPayment(b)) => a == b,
            (Self::NoParticipants, Self::NoParticipants) => true,
            (Self::NotSaved(a), Self::NotSaved(b)) => a == b,
            (Self::AlreadySaved(a), Self::AlreadySaved(b)) => a == b,
            (Self::NoAssignments(a), Self::NoAssignments(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (
                Self::NotMember {
                    group_id: ga,
                    user_id: ua,
                },
                Self::NotMember {
                    group_id: gb,
                    user_id: ub,
                },
            ) => ga == gb && ua == ub,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (
                Self::AlreadyMember {
                    group_id: ga,
                    user_id: ua,
                },
                Self::AlreadyMember {
                    group_id: gb,
                    user_id: ub,
                },
            ) => ga == gb && ua == ub,
            (Self::StorePoisoned, Self::StorePoisoned) => true,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            (
                Self::Context {
                    context: ca,
                    source: sa,
                },
                Self::Context {
                    context: cb,
                    source: sb,
                },
            ) => ca == cb && sa == sb,
            _ => false,
        }
    }
}

/// Annotates an error with the operation that produced it.
pub(crate) trait Context<T> {
    fn context(self, context: impl Into<String>) -> Result<T, LedgerError>;
}

impl<T, E> Context<T> for Result<T, E>
where
    E: Into<LedgerError>,
{
    fn context(self, context: impl Into<String>) -> Result<T, LedgerError> {
        self.map_err(|err| LedgerError::Context {
            context: context.into(),
            source: Box::new(err.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_strips_every_context_layer() {
        let err: Result<(), _> = Err(LedgerError::NotSaved("expense"));
        let err = err.context("assigning expense").context("inserting expense");
        let Err(err) = err else {
            panic!("expected an error");
        };

        assert_eq!(err.root(), &LedgerError::NotSaved("expense"));
        assert_eq!(
            err.to_string(),
            "inserting expense: assigning expense: invalid operation: expense must be saved first"
        );
    }

    #[test]
    fn classification_sees_through_context() {
        let err: Result<(), _> = Err(LedgerError::AlreadyMember {
            group_id: 1,
            user_id: 2,
        });
        let err = err.context("adding member").unwrap_err();
        assert!(err.is_conflict());
        assert!(!err.is_not_found());

        let err: Result<(), _> = Err(LedgerError::not_found("expense", 7));
        let err = err.context("deleting expense").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.root(), &LedgerError::NotFound("expense 7".to_string()));
    }
}
