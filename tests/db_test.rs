//! Integration tests for the on-disk pool, migrations and ledger queries.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use spendwise::db::queries::ledger::{self, LedgerFilter};
use spendwise::db::{create_pool, fetch_entries, migrations};
use spendwise::models::{EntryKind, NewLedgerEntry, OwnerId};
use std::path::Path;

fn new_entry(owner: &OwnerId, kind: EntryKind, label: &str, amount: &str, date: &str) -> NewLedgerEntry {
    NewLedgerEntry {
        owner_id: owner.clone(),
        kind,
        amount: amount.parse().unwrap(),
        label: label.to_string(),
        icon: None,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
    }
}

#[test]
fn test_migrations_apply_once() {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_pool(&dir.path().join("nested/spendwise.db")).unwrap();
    let conn = pool.get().unwrap();

    let first = migrations::run_migrations(&conn, Path::new("migrations")).unwrap();
    let second = migrations::run_migrations(&conn, Path::new("migrations")).unwrap();
    assert!(first >= 1);
    assert_eq!(second, 0);
}

#[tokio::test]
async fn test_amounts_survive_storage_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_pool(&dir.path().join("spendwise.db")).unwrap();
    {
        let conn = pool.get().unwrap();
        migrations::run_migrations(&conn, Path::new("migrations")).unwrap();

        let owner = OwnerId::new("owner-1");
        for (amount, date) in [("0.10", "2024-01-01"), ("0.20", "2024-01-02"), ("19.99", "2024-02-01")] {
            ledger::create_entry(&conn, &new_entry(&owner, EntryKind::Expense, "Food", amount, date))
                .unwrap();
        }
    }

    let owner = OwnerId::new("owner-1");
    let mut january = LedgerFilter::new(&owner, EntryKind::Expense)
        .since(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    january.to_date = NaiveDate::from_ymd_opt(2024, 1, 31);

    let entries = fetch_entries(&pool, january).await.unwrap();
    let total: Decimal = entries.iter().map(|e| e.amount).sum();
    assert_eq!(entries.len(), 2);
    assert_eq!(total, "0.30".parse::<Decimal>().unwrap());
    assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());

    let limited = fetch_entries(&pool, LedgerFilter::new(&owner, EntryKind::Expense).limit(1))
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].label, "Food");
    assert_eq!(limited[0].amount, "19.99".parse::<Decimal>().unwrap());
}

#[test]
fn test_get_and_delete_respect_owner() {
    let dir = tempfile::tempdir().unwrap();
    let pool = create_pool(&dir.path().join("spendwise.db")).unwrap();
    let conn = pool.get().unwrap();
    migrations::run_migrations(&conn, Path::new("migrations")).unwrap();

    let alice = OwnerId::new("alice");
    let bob = OwnerId::new("bob");
    let id = ledger::create_entry(
        &conn,
        &new_entry(&alice, EntryKind::Income, "Salary", "1000", "2024-01-01"),
    )
    .unwrap();

    assert!(ledger::get_entry(&conn, &bob, EntryKind::Income, id).unwrap().is_none());
    assert!(ledger::get_entry(&conn, &alice, EntryKind::Expense, id).unwrap().is_none());
    assert!(!ledger::delete_entry(&conn, &bob, EntryKind::Income, id).unwrap());

    let found = ledger::get_entry(&conn, &alice, EntryKind::Income, id).unwrap().unwrap();
    assert_eq!(found.label, "Salary");
    assert!(ledger::delete_entry(&conn, &alice, EntryKind::Income, id).unwrap());
}
