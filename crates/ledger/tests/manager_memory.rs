use ledger::{Category, LedgerError, Manager, MemoryStore, Pence, Storer, User};

async fn manager_with_users(emails: &[&str]) -> (Manager<MemoryStore>, Vec<User>) {
    let manager = Manager::new(MemoryStore::new());
    let mut users = Vec::with_capacity(emails.len());
    for email in emails {
        let mut user = User::new(email, false, true);
        manager.store().insert_user(&mut user).await.unwrap();
        users.push(user);
    }
    (manager, users)
}

#[tokio::test]
async fn membership_is_not_idempotent() {
    let (manager, users) = manager_with_users(&["alice@example.com"]).await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = &users[0];

    manager.add_user_to_group(&group, alice, false).await.unwrap();
    let err = manager
        .add_user_to_group(&group, alice, false)
        .await
        .unwrap_err();
    assert!(matches!(err.root(), LedgerError::AlreadyMember { .. }));

    manager.remove_user_from_group(&group, alice).await.unwrap();
    let err = manager
        .remove_user_from_group(&group, alice)
        .await
        .unwrap_err();
    assert_eq!(
        err.root(),
        &LedgerError::NotMember {
            group_id: group.id,
            user_id: alice.id
        }
    );
}

#[tokio::test]
async fn expense_insert_is_all_or_nothing() {
    let (manager, users) =
        manager_with_users(&["alice@example.com", "bob@example.com", "carol@example.com"]).await;
    let group = manager.new_group("Flat").await.unwrap();
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();

    // The second assignment row fails to insert.
    manager.store().fail_assignment_inserts_after(1);
    let err = manager
        .new_expense(&group, Pence::new(100), ids[0], Category::Groceries, "", &ids)
        .await
        .unwrap_err();
    assert!(matches!(err.root(), LedgerError::Database(_)));
    assert!(manager.group_expenses(&group).await.unwrap().is_empty());

    manager.store().fail_assignment_inserts_after(usize::MAX);
    let expense = manager
        .new_expense(&group, Pence::new(100), ids[0], Category::Groceries, "", &ids)
        .await
        .unwrap();
    assert_eq!(expense.assigned_total(), Pence::new(100));
    assert_eq!(manager.group_expenses(&group).await.unwrap(), vec![expense]);
}

#[tokio::test]
async fn failed_reassignment_keeps_previous_split() {
    let (manager, users) = manager_with_users(&["alice@example.com", "bob@example.com"]).await;
    let group = manager.new_group("Flat").await.unwrap();
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();

    let mut expense = manager
        .new_expense(&group, Pence::new(60), ids[0], Category::Bills, "power", &ids)
        .await
        .unwrap();
    let stored = manager.expense_by_id(expense.id).await.unwrap();

    manager.store().fail_assignment_inserts_after(0);
    expense.amount = Pence::new(90);
    let err = manager
        .update_expense(&mut expense, &ids)
        .await
        .unwrap_err();
    assert!(matches!(err.root(), LedgerError::Database(_)));
    assert_eq!(manager.expense_by_id(expense.id).await.unwrap(), stored);
}

#[tokio::test]
async fn expense_lifecycle() {
    let (manager, users) =
        manager_with_users(&["alice@example.com", "bob@example.com", "carol@example.com"]).await;
    let group = manager.new_group("Flat").await.unwrap();
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();

    let mut expense = manager
        .new_expense(&group, Pence::new(100), ids[1], Category::Misc, " milk ", &ids)
        .await
        .unwrap();
    assert_eq!(expense.description, "milk");
    let created_at = expense.created_at;

    expense.amount = Pence::new(101);
    manager
        .update_expense(&mut expense, &[ids[0], ids[2]])
        .await
        .unwrap();
    let shares: Vec<(i64, i64)> = expense
        .assignments
        .iter()
        .map(|a| (a.user_id, a.amount.pence()))
        .collect();
    assert_eq!(shares.len(), 2);
    assert_eq!(shares[0].0, ids[0]);
    assert_eq!(shares[1].0, ids[2]);
    assert_eq!(shares[0].1 + shares[1].1, 101);
    assert_eq!(expense.created_at, created_at);

    manager.delete_expense(&expense).await.unwrap();
    let err = manager.delete_expense(&expense).await.unwrap_err();
    assert!(err.is_not_found());

    let mut unsaved =
        ledger::Expense::new(group.id, Pence::new(5), ids[0], Category::Misc, "");
    let err = manager
        .update_expense(&mut unsaved, &ids)
        .await
        .unwrap_err();
    assert_eq!(err.root(), &LedgerError::NotSaved("expense"));
}

#[tokio::test]
async fn saved_entities_cannot_be_inserted_again() {
    let (manager, users) = manager_with_users(&["alice@example.com"]).await;
    let mut group = manager.new_group("Flat").await.unwrap();

    let err = manager.store().insert_group(&mut group).await.unwrap_err();
    assert_eq!(err, LedgerError::AlreadySaved("group"));

    let mut user = users[0].clone();
    let err = manager.store().insert_user(&mut user).await.unwrap_err();
    assert_eq!(err, LedgerError::AlreadySaved("user"));
}

#[tokio::test]
async fn balances_follow_expenses_and_payments() {
    let (manager, users) = manager_with_users(&["alice@example.com", "bob@example.com"]).await;
    let group = manager.new_group("Flat").await.unwrap();
    let (alice, bob) = (users[0].id, users[1].id);

    manager
        .new_expense(&group, Pence::new(1000), alice, Category::Tickets, "", &[alice, bob])
        .await
        .unwrap();
    let balances = manager.group_balances(&group).await.unwrap();
    assert_eq!(balances.of(alice), Pence::new(500));
    assert_eq!(balances.of(bob), Pence::new(-500));

    let payment = manager
        .insert_payment(&group, bob, alice, Pence::new(500))
        .await
        .unwrap();
    assert!(manager.group_balances(&group).await.unwrap().is_settled());

    manager.delete_payment(&payment).await.unwrap();
    assert_eq!(
        manager.group_balances(&group).await.unwrap().of(bob),
        Pence::new(-500)
    );
}

#[tokio::test]
async fn deleting_a_group_drops_its_ledger() {
    let (manager, users) = manager_with_users(&["alice@example.com", "bob@example.com"]).await;
    let group = manager.new_group("Flat").await.unwrap();
    let (alice, bob) = (users[0].id, users[1].id);
    manager
        .add_user_to_group(&group, &users[0], true)
        .await
        .unwrap();
    let expense = manager
        .new_expense(&group, Pence::new(10), alice, Category::Misc, "", &[bob])
        .await
        .unwrap();
    let payment = manager
        .insert_payment(&group, bob, alice, Pence::new(10))
        .await
        .unwrap();

    manager.delete_group(&group).await.unwrap();

    assert!(manager.group_by_id(group.id).await.unwrap_err().is_not_found());
    assert!(manager.expense_by_id(expense.id).await.unwrap_err().is_not_found());
    assert!(manager.payment_by_id(payment.id).await.unwrap_err().is_not_found());
    assert!(manager.user_groups(&users[0]).await.unwrap().is_empty());
}

#[tokio::test]
async fn users_are_found_by_token_and_email() {
    let (manager, users) = manager_with_users(&["alice@example.com"]).await;
    let mut alice = users[0].clone();
    alice.token = Some("s3cret".to_string());
    alice.email = "Alice@Home.example".to_string();
    manager.store().update_user(&alice).await.unwrap();

    let found = manager.store().user_by_token("s3cret").await.unwrap();
    assert_eq!(found.id, alice.id);
    assert_eq!(found.email, "alice@home.example");
    assert!(manager.store().user_by_token("nope").await.unwrap_err().is_not_found());

    manager.store().delete_user(&alice).await.unwrap();
    assert!(manager.user_by_email("alice@home.example").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn deleting_a_user_drops_their_shares_of_other_expenses() {
    let (manager, users) = manager_with_users(&["alice@example.com", "bob@example.com"]).await;
    let group = manager.new_group("Flat").await.unwrap();
    let (alice, bob) = (users[0].id, users[1].id);

    let shared = manager
        .new_expense(&group, Pence::new(100), alice, Category::Bills, "", &[alice, bob])
        .await
        .unwrap();
    let bobs_only = manager
        .new_expense(&group, Pence::new(40), alice, Category::Misc, "", &[bob])
        .await
        .unwrap();
    let paid_by_bob = manager
        .new_expense(&group, Pence::new(30), bob, Category::Misc, "", &[alice])
        .await
        .unwrap();

    manager.store().delete_user(&users[1]).await.unwrap();

    // Expenses bob paid go, expenses he only shared keep the other rows.
    assert!(manager.expense_by_id(paid_by_bob.id).await.unwrap_err().is_not_found());
    let shared = manager.expense_by_id(shared.id).await.unwrap();
    assert_eq!(shared.assignments.len(), 1);
    assert_eq!(shared.assignments[0].user_id, alice);
    assert!(shared.assigned_total() < shared.amount);
    let bobs_only = manager.expense_by_id(bobs_only.id).await.unwrap();
    assert!(bobs_only.assignments.is_empty());
}
