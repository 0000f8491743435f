//! Application-facing operations over a [`Storer`].

use crate::{
    Balances, Category, Expense, Group, Membership, Payment, Pence, ResultLedger, Storer, User,
    error::Context,
};

/// Entry point of the ledger. Holds no state besides the store; every
/// operation awaits its store calls in order and returns when they are done.
#[derive(Debug)]
pub struct Manager<S> {
    store: S,
}

impl<S: Storer> Manager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates and persists a group. The name is trimmed and must not be
    /// empty.
    pub async fn new_group(&self, name: &str) -> ResultLedger<Group> {
        let mut group = Group::new(name)?;
        self.store
            .insert_group(&mut group)
            .await
            .context("creating group")?;
        tracing::debug!(group_id = group.id, name = %group.name, "group created");
        Ok(group)
    }

    pub async fn update_group(&self, group: &Group) -> ResultLedger<()> {
        self.store
            .update_group(group)
            .await
            .context(format!("updating group {}", group.id))?;
        tracing::debug!(group_id = group.id, "group updated");
        Ok(())
    }

    /// Deletes the group with its memberships, expenses and payments.
    pub async fn delete_group(&self, group: &Group) -> ResultLedger<()> {
        self.store
            .delete_group(group)
            .await
            .context(format!("deleting group {}", group.id))?;
        tracing::debug!(group_id = group.id, "group deleted");
        Ok(())
    }

    pub async fn group_by_id(&self, id: i64) -> ResultLedger<Group> {
        self.store
            .group_by_id(id)
            .await
            .context(format!("loading group {id}"))
    }

    pub async fn groups(&self) -> ResultLedger<Vec<Group>> {
        self.store.groups().await.context("listing groups")
    }

    /// Groups `user` is a member of.
    pub async fn user_groups(&self, user: &User) -> ResultLedger<Vec<Group>> {
        self.store
            .groups_by_user(user)
            .await
            .context(format!("listing groups of user {}", user.id))
    }

    pub async fn group_members(&self, group: &Group) -> ResultLedger<Vec<Membership>> {
        self.store
            .group_members(group)
            .await
            .context(format!("listing members of group {}", group.id))
    }

    /// Adds `user` to `group`. Adding twice is an error, not a no-op.
    pub async fn add_user_to_group(
        &self,
        group: &Group,
        user: &User,
        is_admin: bool,
    ) -> ResultLedger<()> {
        self.store
            .add_user_to_group(group, user, is_admin)
            .await
            .context(format!("adding user {} to group {}", user.id, group.id))?;
        tracing::debug!(group_id = group.id, user_id = user.id, is_admin, "member added");
        Ok(())
    }

    pub async fn remove_user_from_group(&self, group: &Group, user: &User) -> ResultLedger<()> {
        self.store
            .remove_user_from_group(group, user)
            .await
            .context(format!("removing user {} from group {}", user.id, group.id))?;
        tracing::debug!(group_id = group.id, user_id = user.id, "member removed");
        Ok(())
    }

    /// Records an expense paid by `payer_id` and splits it across
    /// `participant_ids`.
    ///
    /// The expense row and its assignments are persisted together; on error
    /// nothing is stored.
    pub async fn new_expense(
        &self,
        group: &Group,
        amount: Pence,
        payer_id: i64,
        category: Category,
        description: &str,
        participant_ids: &[i64],
    ) -> ResultLedger<Expense> {
        let mut expense = Expense::new(group.id, amount, payer_id, category, description);
        self.store
            .insert_expense(&mut expense, participant_ids)
            .await
            .context(format!("adding expense to group {}", group.id))?;
        tracing::debug!(
            expense_id = expense.id,
            group_id = group.id,
            amount = %expense.amount,
            participants = participant_ids.len(),
            "expense created"
        );
        Ok(expense)
    }

    /// Saves the fields of `expense` and re-splits it across
    /// `participant_ids`, refreshing `expense.assignments`.
    pub async fn update_expense(
        &self,
        expense: &mut Expense,
        participant_ids: &[i64],
    ) -> ResultLedger<()> {
        self.store
            .update_expense(expense, participant_ids)
            .await
            .context(format!("updating expense {}", expense.id))?;
        tracing::debug!(
            expense_id = expense.id,
            amount = %expense.amount,
            participants = participant_ids.len(),
            "expense updated"
        );
        Ok(())
    }

    pub async fn delete_expense(&self, expense: &Expense) -> ResultLedger<()> {
        self.store
            .delete_expense(expense)
            .await
            .context(format!("deleting expense {}", expense.id))?;
        tracing::debug!(expense_id = expense.id, "expense deleted");
        Ok(())
    }

    pub async fn expense_by_id(&self, id: i64) -> ResultLedger<Expense> {
        self.store
            .expense_by_id(id)
            .await
            .context(format!("loading expense {id}"))
    }

    pub async fn group_expenses(&self, group: &Group) -> ResultLedger<Vec<Expense>> {
        self.store
            .expenses_by_group(group)
            .await
            .context(format!("listing expenses of group {}", group.id))
    }

    /// Records `giver` paying `amount` straight to `receiver`.
    pub async fn insert_payment(
        &self,
        group: &Group,
        giver_id: i64,
        receiver_id: i64,
        amount: Pence,
    ) -> ResultLedger<Payment> {
        let mut payment = Payment::new(group.id, giver_id, receiver_id, amount);
        self.store
            .insert_payment(&mut payment)
            .await
            .context(format!("adding payment to group {}", group.id))?;
        tracing::debug!(
            payment_id = payment.id,
            group_id = group.id,
            giver_id,
            receiver_id,
            amount = %payment.amount,
            "payment created"
        );
        Ok(payment)
    }

    pub async fn update_payment(&self, payment: &Payment) -> ResultLedger<()> {
        self.store
            .update_payment(payment)
            .await
            .context(format!("updating payment {}", payment.id))?;
        tracing::debug!(payment_id = payment.id, "payment updated");
        Ok(())
    }

    pub async fn delete_payment(&self, payment: &Payment) -> ResultLedger<()> {
        self.store
            .delete_payment(payment)
            .await
            .context(format!("deleting payment {}", payment.id))?;
        tracing::debug!(payment_id = payment.id, "payment deleted");
        Ok(())
    }

    pub async fn payment_by_id(&self, id: i64) -> ResultLedger<Payment> {
        self.store
            .payment_by_id(id)
            .await
            .context(format!("loading payment {id}"))
    }

    pub async fn group_payments(&self, group: &Group) -> ResultLedger<Vec<Payment>> {
        self.store
            .payments_by_group(group)
            .await
            .context(format!("listing payments of group {}", group.id))
    }

    pub async fn user_by_id(&self, id: i64) -> ResultLedger<User> {
        self.store
            .user_by_id(id)
            .await
            .context(format!("loading user {id}"))
    }

    pub async fn user_by_email(&self, email: &str) -> ResultLedger<User> {
        self.store
            .user_by_email(email)
            .await
            .context(format!("loading user {email}"))
    }

    /// Net balance of every user involved in the group's expenses and
    /// payments.
    pub async fn group_balances(&self, group: &Group) -> ResultLedger<Balances> {
        let expenses = self.group_expenses(group).await?;
        let payments = self.group_payments(group).await?;
        Ok(Balances::compute(&expenses, &payments))
    }
}
