//! End-to-end upgrade scenarios against real on-disk stores.

use keel::migrate::version::{self, SchemaVersion};
use keel::migrate::{MigrateError, Registry};
use keel::store::{AccessMode, Dataset, Label, StoreError};
use keel::{open_database, Config, DiagnosticScan, UpgradeError, UpgradeState};
use keel_testkit::generators::catalog_with_failure;
use keel_testkit::{recording_registry, seed_blocks, Journal, TestStore, MARKERS};
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config_for(store: &TestStore) -> Config {
    Config::new(store.datadir()).label(store.label())
}

fn applied_names(store: &TestStore, registry: &Registry) -> Vec<String> {
    let handle = store.shared();
    registry
        .migrator(store.label())
        .records(&handle)
        .unwrap()
        .into_iter()
        .filter(|r| r.is_applied())
        .map(|r| r.name)
        .collect()
}

#[test]
fn test_empty_registry_stamps_fresh_store() {
    init_tracing();
    let store = TestStore::new();
    let registry = Registry::new();

    let upgrade = open_database(&config_for(&store), &registry).unwrap();
    assert!(upgrade.upgraded());
    assert!(upgrade.applied.is_empty());
    assert_eq!(upgrade.handle.mode(), AccessMode::Shared);

    let stamped = upgrade.handle.view(|tx| version::read(tx)).unwrap();
    assert_eq!(stamped, Some(SchemaVersion::SUPPORTED));
    let records = upgrade
        .handle
        .view(|tx| tx.count(Dataset::MIGRATIONS))
        .unwrap();
    assert_eq!(records, 0);
}

#[test]
fn test_nothing_pending_returns_shared_handle_without_going_exclusive() {
    init_tracing();
    let store = TestStore::new();
    let registry = Registry::new();
    let config = config_for(&store);
    open_database(&config, &registry).unwrap().handle.close().unwrap();

    let upgrade = open_database(&config, &registry).unwrap();

    assert_eq!(
        upgrade.states,
        vec![UpgradeState::OpenedShared, UpgradeState::Checked, UpgradeState::Done]
    );
    assert!(!upgrade.upgraded());
    assert!(upgrade.applied.is_empty());
    assert_eq!(upgrade.handle.mode(), AccessMode::Shared);
}

#[test]
fn test_store_from_newer_build_is_refused() {
    init_tracing();
    let store = TestStore::new();
    let handle = store.exclusive();
    handle
        .update(|tx| version::write(tx, SchemaVersion::new(2, 0, 0)))
        .unwrap();
    handle.close().unwrap();

    let err = open_database(&config_for(&store), &Registry::new()).unwrap_err();
    assert!(matches!(
        err,
        UpgradeError::Inspect(MigrateError::Downgrade { .. })
    ));
}

#[test]
fn test_pending_catalog_is_applied_in_order() {
    init_tracing();
    let store = TestStore::new();
    let journal = Journal::new();
    let registry = recording_registry(Label::Chain, &["A", "B"], &journal);

    let upgrade = open_database(&config_for(&store), &registry).unwrap();

    assert!(upgrade.upgraded());
    assert_eq!(upgrade.applied, vec!["A", "B"]);
    assert_eq!(journal.ran(), vec!["A", "B"]);
    assert_eq!(upgrade.handle.mode(), AccessMode::Shared);
    assert_eq!(
        upgrade.states.last(),
        Some(&UpgradeState::ReopenedShared)
    );

    let migrator = registry.migrator(Label::Chain);
    assert!(!migrator.has_pending(&upgrade.handle).unwrap());

    let marker = upgrade
        .handle
        .view(|tx| tx.get(MARKERS, b"B"))
        .unwrap();
    assert_eq!(marker, Some(b"chaindata".to_vec()));
}

#[test]
fn test_failing_migration_keeps_earlier_ones_and_returns_no_handle() {
    init_tracing();
    let store = TestStore::new();
    let journal = Journal::new();
    journal.break_migration("B");
    let registry = recording_registry(Label::Chain, &["A", "B"], &journal);

    let err = open_database(&config_for(&store), &registry).unwrap_err();
    assert!(matches!(
        err,
        UpgradeError::Migrate(MigrateError::Failed { ref name, .. }) if name == "B"
    ));

    // The exclusive handle was released.
    store.exclusive().close().unwrap();

    assert_eq!(applied_names(&store, &registry), vec!["A"]);
    let marker = store
        .shared()
        .view(|tx| tx.has(MARKERS, b"B"))
        .unwrap();
    assert!(!marker);
}

#[test]
fn test_rerun_after_fix_applies_only_the_remainder() {
    init_tracing();
    let store = TestStore::new();
    let journal = Journal::new();
    journal.break_migration("m3");
    let registry = recording_registry(Label::Chain, &["m1", "m2", "m3", "m4"], &journal);
    let config = config_for(&store);

    open_database(&config, &registry).unwrap_err();
    assert_eq!(journal.ran(), vec!["m1", "m2"]);

    journal.heal("m3");
    journal.clear();
    let upgrade = open_database(&config, &registry).unwrap();

    assert_eq!(upgrade.applied, vec!["m3", "m4"]);
    assert_eq!(journal.ran(), vec!["m3", "m4"]);
}

#[test]
fn test_second_run_is_a_no_op() {
    init_tracing();
    let store = TestStore::new();
    let journal = Journal::new();
    let registry = recording_registry(Label::Chain, &["A", "B"], &journal);
    let config = config_for(&store);

    let first = open_database(&config, &registry).unwrap();
    assert!(first.upgraded());
    first.handle.close().unwrap();

    journal.clear();
    let second = open_database(&config, &registry).unwrap();
    assert!(!second.upgraded());
    assert!(second.applied.is_empty());
    assert!(journal.ran().is_empty());
}

#[cfg(unix)]
#[test]
fn test_outside_shared_holder_blocks_the_upgrade() {
    init_tracing();
    let store = TestStore::new();
    let journal = Journal::new();
    let registry = recording_registry(Label::Chain, &["A"], &journal);
    let config = config_for(&store);

    let reader = store.shared();
    let err = open_database(&config, &registry).unwrap_err();
    assert!(matches!(
        err,
        UpgradeError::Open(StoreError::Locked { mode: AccessMode::Exclusive, .. })
    ));
    assert!(journal.ran().is_empty());

    reader.close().unwrap();
    let upgrade = open_database(&config, &registry).unwrap();
    assert_eq!(upgrade.applied, vec!["A"]);
}

#[cfg(unix)]
#[test]
fn test_returned_handle_shares_with_other_readers() {
    init_tracing();
    let store = TestStore::new();
    let registry = recording_registry(Label::Chain, &["A"], &Journal::new());

    let upgrade = open_database(&config_for(&store), &registry).unwrap();
    let other = store.shared();
    assert!(matches!(
        store.open(AccessMode::Exclusive),
        Err(StoreError::Locked { .. })
    ));

    other.close().unwrap();
    upgrade.handle.close().unwrap();
    store.exclusive().close().unwrap();
}

#[test]
fn test_catalogs_do_not_leak_across_labels() {
    init_tracing();
    let journal = Journal::new();
    let registry = recording_registry(Label::TxPool, &["pool_only"], &journal);

    let chain = TestStore::new();
    let upgrade = open_database(&config_for(&chain), &registry).unwrap();
    assert!(upgrade.applied.is_empty());
    assert!(!upgrade.handle.view(|tx| tx.has(MARKERS, b"pool_only")).unwrap());

    let pool = TestStore::with_label(Label::TxPool);
    let upgrade = open_database(&config_for(&pool), &registry).unwrap();
    assert_eq!(upgrade.applied, vec!["pool_only"]);
}

#[test]
fn test_disabled_migrations_leave_catalog_pending() {
    init_tracing();
    let store = TestStore::new();
    let journal = Journal::new();
    let registry = recording_registry(Label::Chain, &["A"], &journal);

    let upgrade = open_database(&config_for(&store).apply_migrations(false), &registry).unwrap();
    assert_eq!(
        upgrade.states,
        vec![UpgradeState::OpenedShared, UpgradeState::Done]
    );
    assert!(registry
        .migrator(Label::Chain)
        .has_pending(&upgrade.handle)
        .unwrap());
}

#[test]
fn test_diagnostic_scan_runs_before_migrations() {
    init_tracing();
    let store = TestStore::new();
    let handle = store.shared();
    seed_blocks(&handle, 15_521_060, 20).unwrap();
    handle.close().unwrap();

    let journal = Journal::new();
    let registry = recording_registry(Label::Chain, &["A"], &journal);
    let config = config_for(&store).diagnostics(Some(DiagnosticScan::new(15_521_067, 8)));

    let upgrade = open_database(&config, &registry).unwrap();
    assert_eq!(upgrade.applied, vec!["A"]);

    let report = keel::diagnostics::scan(&upgrade.handle, DiagnosticScan::new(15_521_067, 8)).unwrap();
    assert_eq!(report.headers.len(), 8);
    assert_eq!(report.headers[0].number, 15_521_067);
    assert_eq!(report.canonical.len(), 8);
}

#[test]
fn test_explicit_store_path_overrides_default() {
    init_tracing();
    let store = TestStore::new();
    let elsewhere = store.datadir().join("fast").join("chain");
    let config = Config::new(store.datadir()).store_path(&elsewhere);

    let upgrade = open_database(&config, &Registry::new()).unwrap();
    assert_eq!(upgrade.handle.path(), elsewhere.as_path());
    assert!(!store.store_path().exists());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_failure_at_k_splits_catalog((names, k) in catalog_with_failure(6)) {
        let store = TestStore::new();
        let journal = Journal::new();
        journal.break_migration(&names[k]);
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let registry = recording_registry(Label::Chain, &refs, &journal);
        let config = config_for(&store);

        prop_assert!(open_database(&config, &registry).is_err());
        prop_assert_eq!(applied_names(&store, &registry), names[..k].to_vec());

        journal.heal(&names[k]);
        journal.clear();
        let upgrade = open_database(&config, &registry).unwrap();
        prop_assert_eq!(&upgrade.applied, &names[k..].to_vec());
        prop_assert_eq!(journal.ran(), names[k..].to_vec());
    }
}
