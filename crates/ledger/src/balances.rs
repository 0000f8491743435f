//! Settlement state of a group: who owes whom.
//!
//! A positive balance means the group owes the user money, a negative one
//! means the user owes the group. Balances of a group always sum to zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Expense, Payment, Pence};

/// A transfer that settles part of the outstanding balances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub from: i64,
    pub to: i64,
    pub amount: Pence,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    by_user: BTreeMap<i64, Pence>,
}

impl Balances {
    /// Folds expenses and payments into net balances.
    ///
    /// The payer of an expense is credited the full amount and every assignee
    /// is debited their share. A payment credits the giver and debits the
    /// receiver.
    pub fn compute<'a>(
        expenses: impl IntoIterator<Item = &'a Expense>,
        payments: impl IntoIterator<Item = &'a Payment>,
    ) -> Self {
        let mut balances = Self::default();
        for expense in expenses {
            balances.credit(expense.payer_id, expense.amount);
            for assignment in &expense.assignments {
                balances.credit(assignment.user_id, -assignment.amount);
            }
        }
        for payment in payments {
            balances.credit(payment.giver_id, payment.amount);
            balances.credit(payment.receiver_id, -payment.amount);
        }
        balances
    }

    fn credit(&mut self, user_id: i64, amount: Pence) {
        *self.by_user.entry(user_id).or_default() += amount;
    }

    /// Net balance of `user_id`; zero for users not involved.
    pub fn of(&self, user_id: i64) -> Pence {
        self.by_user.get(&user_id).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, Pence)> + '_ {
        self.by_user.iter().map(|(user, amount)| (*user, *amount))
    }

    pub fn total(&self) -> Pence {
        self.by_user.values().sum()
    }

    pub fn is_settled(&self) -> bool {
        self.by_user.values().all(|amount| *amount == Pence::ZERO)
    }

    /// Transfers that bring every balance back to zero.
    ///
    /// Largest debtor pays largest creditor first (ties by user id), so at
    /// most `n - 1` transfers are produced.
    pub fn settlements(&self) -> Vec<Settlement> {
        let mut debtors: Vec<(i64, Pence)> = self
            .iter()
            .filter(|(_, amount)| amount.is_negative())
            .map(|(user, amount)| (user, -amount))
            .collect();
        let mut creditors: Vec<(i64, Pence)> =
            self.iter().filter(|(_, amount)| amount.is_positive()).collect();
        debtors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        creditors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut settlements = Vec::new();
        let (mut d, mut c) = (0, 0);
        while d < debtors.len() && c < creditors.len() {
            let amount = debtors[d].1.min(creditors[c].1);
            settlements.push(Settlement {
                from: debtors[d].0,
                to: creditors[c].0,
                amount,
            });
            debtors[d].1 -= amount;
            creditors[c].1 -= amount;
            if debtors[d].1 == Pence::ZERO {
                d += 1;
            }
            if creditors[c].1 == Pence::ZERO {
                c += 1;
            }
        }
        settlements
    }
}
