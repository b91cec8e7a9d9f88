//! PostgreSQL adapter tests
//!
//! Each test starts its own container; run with
//! `cargo test -p infra_db -- --ignored` on a machine with Docker.

use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::{AccountId, HealthCheckable, Money};
use domain_ledger::{LedgerError, LedgerService, LedgerStore, NewEntry, DELETED_ACCOUNT_NAME, DIRECT_ENTRY_LABEL};
use infra_db::PostgresLedgerStore;
use test_utils::{
    assert_balance_matches_entries, assert_newest_first, assert_participants, create_isolated_test_database,
    DateFixtures, SettlementRequestBuilder, TestDatabase,
};

async fn setup() -> (TestDatabase, LedgerService) {
    let db = create_isolated_test_database().await.expect("test database");
    let store = PostgresLedgerStore::new(db.pool().clone());
    (db, LedgerService::new(Arc::new(store)))
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn test_round_trip_settlement() {
    let (_db, service) = setup().await;
    let ali = service.open_account("Ali").await.unwrap();
    let sara = service.open_account("Sara").await.unwrap();

    let receipt = service
        .settle_bill(
            SettlementRequestBuilder::new(ali.id)
                .share(ali.id, Money::new(dec!(6)))
                .share(sara.id, Money::new(dec!(4)))
                .balanced()
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(receipt.entry_ids.len(), 3);

    let ali = service.get_account(ali.id).await.unwrap();
    let sara = service.get_account(sara.id).await.unwrap();
    assert_eq!(ali.balance, Money::new(dec!(6)));
    assert_eq!(sara.balance, Money::new(dec!(-4)));

    let bill = service.reconstruct_bill("Cafe", DateFixtures::new_year()).await.unwrap();
    assert_eq!(bill.payer, "Ali");
    assert_eq!(bill.payer_share, Some(Money::new(dec!(6))));
    assert_eq!(bill.settlement_id, Some(receipt.settlement_id));
    assert_participants(&bill, &[("Sara", Money::new(dec!(4)))]);

    assert!(service.reconcile().await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn test_missing_contributor_rolls_back() {
    let (db, service) = setup().await;
    let ali = service.open_account("Ali").await.unwrap();

    let result = service
        .settle_bill(
            SettlementRequestBuilder::new(ali.id)
                .share(AccountId::new(), Money::new(dec!(10)))
                .build(),
        )
        .await;

    assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
    let counts = db.counts().await.unwrap();
    assert_eq!(counts.accounts, 1);
    assert_eq!(counts.entries, 0);
    assert_eq!(counts.settlement_keys, 0);
    assert_eq!(service.get_account(ali.id).await.unwrap().balance, Money::zero());
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn test_idempotent_resubmission() {
    let (db, service) = setup().await;
    let ali = service.open_account("Ali").await.unwrap();
    let sara = service.open_account("Sara").await.unwrap();
    let request = SettlementRequestBuilder::new(ali.id)
        .share(sara.id, Money::new(dec!(10)))
        .key("pg-key")
        .build();

    let first = service.settle_bill(request.clone()).await.unwrap();
    let second = service.settle_bill(request).await.unwrap();

    assert!(second.replayed);
    assert_eq!(first.entry_ids, second.entry_ids);
    let counts = db.counts().await.unwrap();
    assert_eq!(counts.entries, 2);
    assert_eq!(counts.settlement_keys, 1);

    let conflicting = SettlementRequestBuilder::new(ali.id)
        .share(sara.id, Money::new(dec!(5)))
        .total(Money::new(dec!(5)))
        .key("pg-key")
        .build();
    assert!(matches!(
        service.settle_bill(conflicting).await,
        Err(LedgerError::IdempotencyConflict(_))
    ));
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn test_concurrent_settlements_keep_balances_consistent() {
    let (_db, service) = setup().await;
    let ali = service.open_account("Ali").await.unwrap();
    let sara = service.open_account("Sara").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let service = service.clone();
        let (payer, other) = if i % 2 == 0 { (ali.id, sara.id) } else { (sara.id, ali.id) };
        handles.push(tokio::spawn(async move {
            service
                .settle_bill(
                    SettlementRequestBuilder::new(payer)
                        .share(payer, Money::new(dec!(1)))
                        .share(other, Money::new(dec!(2)))
                        .balanced()
                        .build(),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let entries = service.entries_for(ali.id).await.unwrap();
    // five as payer (credit + own share), five as contributor
    assert_eq!(entries.len(), 15);
    assert_newest_first(&entries);
    assert_balance_matches_entries(&service.get_account(ali.id).await.unwrap(), &entries);
    assert!(service.reconcile().await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn test_soft_delete_keeps_history() {
    let (db, service) = setup().await;
    let ali = service.open_account("Ali").await.unwrap();
    service
        .credit(ali.id, Money::new(dec!(3)), DateFixtures::new_year(), None)
        .await
        .unwrap();

    assert!(service.soft_delete(ali.id).await.unwrap());
    assert!(!service.soft_delete(ali.id).await.unwrap());
    assert!(service.list_active().await.unwrap().is_empty());

    let entries = service.all_entries().await.unwrap();
    assert_eq!(entries[0].account_name, DELETED_ACCOUNT_NAME);

    assert!(matches!(
        service.soft_delete(AccountId::new()).await,
        Err(LedgerError::AccountNotFound(_))
    ));

    let store = PostgresLedgerStore::new(db.pool().clone());
    assert!(store.health_check().await.is_healthy());
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn test_column_overflow_is_a_validation_error() {
    let (db, service) = setup().await;
    let ali = service.open_account("Ali").await.unwrap();
    service
        .credit(ali.id, Money::ledger_max(), DateFixtures::new_year(), None)
        .await
        .unwrap();

    // bypass the service so the column range itself is what refuses
    let store = PostgresLedgerStore::new(db.pool().clone());
    let result = store
        .apply_entry(NewEntry::credit(ali.id, DateFixtures::new_year(), Money::from_minor(1), DIRECT_ENTRY_LABEL))
        .await;

    assert!(matches!(result, Err(LedgerError::Validation(_))));
    assert_eq!(db.counts().await.unwrap().entries, 1);
    assert_eq!(service.get_account(ali.id).await.unwrap().balance, Money::ledger_max());
}
