use sea_orm::{Database, DatabaseConnection, EntityTrait, PaginatorTrait};

use ledger::{
    Category, DbStore, LedgerError, Manager, Pence, Settlement, Storer, User, expense_assignments,
    expenses,
};
use migration::MigratorTrait;

async fn manager_with_db() -> (Manager<DbStore>, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let store = DbStore::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (Manager::new(store), db)
}

async fn new_user(manager: &Manager<DbStore>, email: &str) -> User {
    let mut user = User::new(email, false, true);
    manager.store().insert_user(&mut user).await.unwrap();
    user
}

async fn count_rows<E: EntityTrait>(db: &DatabaseConnection) -> u64
where
    E::Model: Sync,
{
    E::find().count(db).await.unwrap()
}

#[tokio::test]
async fn group_names_are_trimmed_and_required() {
    let (manager, _db) = manager_with_db().await;

    let mut group = manager.new_group("  Flat 3  ").await.unwrap();
    assert!(group.id > 0);
    assert_eq!(group.name, "Flat 3");

    let err = manager.new_group("   ").await.unwrap_err();
    assert!(matches!(err.root(), LedgerError::InvalidName(_)));

    group.name = "Flat 4".to_string();
    manager.update_group(&group).await.unwrap();
    assert_eq!(manager.group_by_id(group.id).await.unwrap().name, "Flat 4");
    assert_eq!(manager.groups().await.unwrap(), vec![group.clone()]);

    manager.delete_group(&group).await.unwrap();
    let err = manager.group_by_id(group.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let (manager, _db) = manager_with_db().await;
    new_user(&manager, "alice@example.com").await;

    let mut again = User::new("ALICE@example.com", false, true);
    let err = manager.store().insert_user(&mut again).await.unwrap_err();
    assert_eq!(err, LedgerError::ExistingKey("alice@example.com".to_string()));
    assert_eq!(again.id, 0);

    let found = manager.user_by_email("Alice@Example.com").await.unwrap();
    assert_eq!(found.email, "alice@example.com");
}

#[tokio::test]
async fn membership_is_not_idempotent() {
    let (manager, _db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;

    manager.add_user_to_group(&group, &alice, true).await.unwrap();
    let err = manager
        .add_user_to_group(&group, &alice, false)
        .await
        .unwrap_err();
    assert_eq!(
        err.root(),
        &LedgerError::AlreadyMember {
            group_id: group.id,
            user_id: alice.id
        }
    );
    assert!(err.is_conflict());

    let members = manager.group_members(&group).await.unwrap();
    assert_eq!(members.len(), 1);
    assert!(members[0].is_admin);
    assert_eq!(manager.user_groups(&alice).await.unwrap(), vec![group.clone()]);

    manager
        .remove_user_from_group(&group, &alice)
        .await
        .unwrap();
    let err = manager
        .remove_user_from_group(&group, &alice)
        .await
        .unwrap_err();
    assert!(matches!(err.root(), LedgerError::NotMember { .. }));
    assert!(manager.user_groups(&alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn adding_missing_user_is_not_found() {
    let (manager, _db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let ghost = User {
        id: 999,
        ..User::new("ghost@example.com", false, true)
    };

    let err = manager
        .add_user_to_group(&group, &ghost, false)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn new_expense_is_split_and_persisted() {
    let (manager, db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;
    let bob = new_user(&manager, "bob@example.com").await;
    let carol = new_user(&manager, "carol@example.com").await;

    let expense = manager
        .new_expense(
            &group,
            Pence::new(100),
            alice.id,
            Category::Groceries,
            "weekly shop",
            &[alice.id, bob.id, carol.id],
        )
        .await
        .unwrap();

    assert!(expense.id > 0);
    assert_eq!(expense.assigned_total(), Pence::new(100));
    let owners: Vec<i64> = expense.assignments.iter().map(|a| a.user_id).collect();
    assert_eq!(owners, vec![alice.id, bob.id, carol.id]);
    let mut shares: Vec<i64> = expense.assignments.iter().map(|a| a.amount.pence()).collect();
    shares.sort_unstable();
    assert_eq!(shares, vec![33, 33, 34]);

    let loaded = manager.expense_by_id(expense.id).await.unwrap();
    assert_eq!(loaded.assignments, expense.assignments);
    assert_eq!(loaded.category, Category::Groceries);
    assert_eq!(loaded.description, "weekly shop");
    assert_eq!(count_rows::<expense_assignments::Entity>(&db).await, 3);
}

#[tokio::test]
async fn failed_split_rolls_back_the_expense_row() {
    let (manager, db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;

    let err = manager
        .new_expense(
            &group,
            Pence::new(100),
            alice.id,
            Category::Bills,
            "",
            &[],
        )
        .await
        .unwrap_err();
    assert_eq!(err.root(), &LedgerError::NoParticipants);

    assert!(manager.group_expenses(&group).await.unwrap().is_empty());
    assert_eq!(count_rows::<expenses::Entity>(&db).await, 0);
}

#[tokio::test]
async fn assignment_failure_midway_rolls_back_everything() {
    let (manager, db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;

    // The first assignment row is written, the second breaks the user foreign key.
    let err = manager
        .new_expense(
            &group,
            Pence::new(100),
            alice.id,
            Category::Groceries,
            "",
            &[alice.id, 9999],
        )
        .await
        .unwrap_err();
    assert!(matches!(err.root(), LedgerError::Database(_)));

    assert!(manager.group_expenses(&group).await.unwrap().is_empty());
    assert_eq!(count_rows::<expenses::Entity>(&db).await, 0);
    assert_eq!(count_rows::<expense_assignments::Entity>(&db).await, 0);
}

#[tokio::test]
async fn invalid_expense_is_rejected_before_storage() {
    let (manager, db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;

    let err = manager
        .new_expense(&group, Pence::ZERO, alice.id, Category::Misc, "", &[alice.id])
        .await
        .unwrap_err();
    assert_eq!(err.root(), &LedgerError::NegativePence(Pence::ZERO));

    let err = manager
        .new_expense(
            &group,
            Pence::new(10),
            alice.id,
            Category::Unknown,
            "",
            &[alice.id],
        )
        .await
        .unwrap_err();
    assert!(matches!(err.root(), LedgerError::InvalidCategory(_)));
    assert_eq!(count_rows::<expenses::Entity>(&db).await, 0);
}

#[tokio::test]
async fn update_expense_replaces_assignments() {
    let (manager, db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;
    let bob = new_user(&manager, "bob@example.com").await;
    let carol = new_user(&manager, "carol@example.com").await;

    let mut expense = manager
        .new_expense(
            &group,
            Pence::new(100),
            alice.id,
            Category::Alcohol,
            "",
            &[alice.id, bob.id, carol.id],
        )
        .await
        .unwrap();

    expense.amount = Pence::new(200);
    expense.description = "corrected".to_string();
    manager
        .update_expense(&mut expense, &[alice.id, bob.id])
        .await
        .unwrap();

    assert_eq!(expense.assignments.len(), 2);
    assert!(expense
        .assignments
        .iter()
        .all(|a| a.amount == Pence::new(100)));

    let loaded = manager.expense_by_id(expense.id).await.unwrap();
    assert_eq!(loaded.amount, Pence::new(200));
    assert_eq!(loaded.description, "corrected");
    assert_eq!(loaded.assignments, expense.assignments);
    assert_eq!(count_rows::<expense_assignments::Entity>(&db).await, 2);
}

#[tokio::test]
async fn update_expense_preconditions() {
    let (manager, _db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;

    let mut unsaved = ledger::Expense::new(group.id, Pence::new(5), alice.id, Category::Misc, "");
    let err = manager
        .update_expense(&mut unsaved, &[alice.id])
        .await
        .unwrap_err();
    assert_eq!(err.root(), &LedgerError::NotSaved("expense"));

    let mut missing = unsaved.clone();
    missing.id = 4242;
    let err = manager
        .update_expense(&mut missing, &[alice.id])
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn failed_update_keeps_previous_split() {
    let (manager, _db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;
    let bob = new_user(&manager, "bob@example.com").await;

    let mut expense = manager
        .new_expense(
            &group,
            Pence::new(50),
            alice.id,
            Category::Tickets,
            "",
            &[alice.id, bob.id],
        )
        .await
        .unwrap();
    let before = expense.assignments.clone();

    expense.amount = Pence::new(80);
    let err = manager.update_expense(&mut expense, &[]).await.unwrap_err();
    assert_eq!(err.root(), &LedgerError::NoParticipants);

    let loaded = manager.expense_by_id(expense.id).await.unwrap();
    assert_eq!(loaded.amount, Pence::new(50));
    assert_eq!(loaded.assignments, before);
}

#[tokio::test]
async fn deleting_an_expense_twice_is_not_found() {
    let (manager, db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;

    let expense = manager
        .new_expense(
            &group,
            Pence::new(30),
            alice.id,
            Category::Presents,
            "",
            &[alice.id],
        )
        .await
        .unwrap();

    manager.delete_expense(&expense).await.unwrap();
    assert_eq!(count_rows::<expense_assignments::Entity>(&db).await, 0);

    let err = manager.delete_expense(&expense).await.unwrap_err();
    assert!(err.is_not_found());
    let err = manager.expense_by_id(expense.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn group_expenses_carry_their_own_assignments() {
    let (manager, _db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;
    let bob = new_user(&manager, "bob@example.com").await;

    let first = manager
        .new_expense(&group, Pence::new(10), alice.id, Category::Misc, "a", &[bob.id])
        .await
        .unwrap();
    let second = manager
        .new_expense(
            &group,
            Pence::new(21),
            bob.id,
            Category::Misc,
            "b",
            &[alice.id, bob.id, alice.id],
        )
        .await
        .unwrap();

    let listed = manager.group_expenses(&group).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[0].assignments, first.assignments);
    assert_eq!(listed[1].id, second.id);
    assert_eq!(listed[1].assignments, second.assignments);
    assert!(listed
        .iter()
        .all(|e| e.assignments.iter().all(|a| a.expense_id == e.id)));
}

#[tokio::test]
async fn payments_lifecycle() {
    let (manager, _db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;
    let bob = new_user(&manager, "bob@example.com").await;

    let err = manager
        .insert_payment(&group, alice.id, alice.id, Pence::new(10))
        .await
        .unwrap_err();
    assert!(matches!(err.root(), LedgerError::InvalidPayment(_)));

    let mut payment = manager
        .insert_payment(&group, bob.id, alice.id, Pence::new(250))
        .await
        .unwrap();
    assert!(payment.id > 0);

    payment.amount = Pence::new(300);
    manager.update_payment(&payment).await.unwrap();
    assert_eq!(
        manager.payment_by_id(payment.id).await.unwrap().amount,
        Pence::new(300)
    );
    assert_eq!(manager.group_payments(&group).await.unwrap().len(), 1);

    manager.delete_payment(&payment).await.unwrap();
    let err = manager.delete_payment(&payment).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(manager.group_payments(&group).await.unwrap().is_empty());
}

#[tokio::test]
async fn balances_and_settlements() {
    let (manager, _db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;
    let bob = new_user(&manager, "bob@example.com").await;
    let carol = new_user(&manager, "carol@example.com").await;

    manager
        .new_expense(
            &group,
            Pence::new(900),
            alice.id,
            Category::Groceries,
            "",
            &[alice.id, bob.id, carol.id],
        )
        .await
        .unwrap();
    manager
        .insert_payment(&group, bob.id, alice.id, Pence::new(300))
        .await
        .unwrap();

    let balances = manager.group_balances(&group).await.unwrap();
    assert_eq!(balances.of(alice.id), Pence::new(300));
    assert_eq!(balances.of(bob.id), Pence::ZERO);
    assert_eq!(balances.of(carol.id), Pence::new(-300));
    assert_eq!(balances.total(), Pence::ZERO);
    assert_eq!(
        balances.settlements(),
        vec![Settlement {
            from: carol.id,
            to: alice.id,
            amount: Pence::new(300)
        }]
    );
}

#[tokio::test]
async fn deleting_a_group_removes_its_ledger() {
    let (manager, db) = manager_with_db().await;
    let group = manager.new_group("Flat").await.unwrap();
    let other = manager.new_group("Office").await.unwrap();
    let alice = new_user(&manager, "alice@example.com").await;
    let bob = new_user(&manager, "bob@example.com").await;
    manager.add_user_to_group(&group, &alice, true).await.unwrap();

    let expense = manager
        .new_expense(
            &group,
            Pence::new(40),
            alice.id,
            Category::Drugs,
            "",
            &[alice.id, bob.id],
        )
        .await
        .unwrap();
    manager
        .new_expense(&other, Pence::new(7), bob.id, Category::Misc, "", &[alice.id])
        .await
        .unwrap();
    manager
        .insert_payment(&group, bob.id, alice.id, Pence::new(20))
        .await
        .unwrap();

    manager.delete_group(&group).await.unwrap();

    assert!(manager.expense_by_id(expense.id).await.unwrap_err().is_not_found());
    assert!(manager.user_groups(&alice).await.unwrap().is_empty());
    assert_eq!(count_rows::<expenses::Entity>(&db).await, 1);
    assert_eq!(count_rows::<expense_assignments::Entity>(&db).await, 1);
    assert_eq!(manager.group_expenses(&other).await.unwrap().len(), 1);
}
