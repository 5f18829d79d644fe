//! Fatal and per-item failure behavior of synchronization runs.

mod common;

use tempfile::TempDir;

use taxsync_core::{NodeId, RemoteError, SchemaRegistry, TaxonomyId};
use taxsync_engine::{state, BatchSize, SyncError, SyncSession};
use taxsync_store::TaxonomyStore;

use common::MockThesaurus;

#[test]
fn unreachable_remote_aborts_update_before_any_local_change() {
    let home = TempDir::new().expect("tempdir");
    let mock = MockThesaurus::new(&["en"]);
    let scheme = mock.add_scheme("Letters");
    mock.seed(&scheme, "http://x/a", "en", "A", &[], true);
    mock.set_unavailable();

    let config = common::connection("letters", &scheme, &[("en", "en")], "en");
    let schema = SchemaRegistry::default();
    let session = SyncSession::new(&config, &schema, &mock, home.path(), "tester");
    let mut store =
        TaxonomyStore::open_at(home.path(), &TaxonomyId::from("letters")).expect("open");

    let err = session
        .update(&mut store, BatchSize::default())
        .err()
        .expect("must abort");
    assert!(matches!(
        err,
        SyncError::Remote(RemoteError::Unavailable { .. })
    ));
    assert!(store.is_empty());
    assert!(!TaxonomyStore::path_at(home.path(), &config.taxonomy).exists());
    assert!(!state::state_path_at(home.path(), &config.taxonomy).exists());
}

#[test]
fn unknown_project_fails_validation() {
    let home = TempDir::new().expect("tempdir");
    let mock = MockThesaurus::new(&["en"]);
    let scheme = mock.add_scheme("Letters");

    let mut config = common::connection("letters", &scheme, &[("en", "en")], "en");
    config.project_id = "nope".to_string();
    let schema = SchemaRegistry::default();
    let session = SyncSession::new(&config, &schema, &mock, home.path(), "tester");

    let err = session.validate_remote().err().expect("must fail");
    assert!(matches!(
        err,
        SyncError::Remote(RemoteError::Validation { .. })
    ));
}

#[test]
fn unknown_scheme_fails_validation() {
    let home = TempDir::new().expect("tempdir");
    let mock = MockThesaurus::new(&["en"]);
    mock.add_scheme("Letters");

    let config = common::connection(
        "letters",
        &taxsync_core::ConceptUri::from("http://mock/scheme/999"),
        &[("en", "en")],
        "en",
    );
    let schema = SchemaRegistry::default();
    let session = SyncSession::new(&config, &schema, &mock, home.path(), "tester");
    let err = session.validate_remote().err().expect("must fail");
    assert!(matches!(
        err,
        SyncError::Remote(RemoteError::Validation { .. })
    ));
}

#[test]
fn unavailable_language_fails_validation() {
    let home = TempDir::new().expect("tempdir");
    let mock = MockThesaurus::new(&["en"]);
    let scheme = mock.add_scheme("Letters");

    let config = common::connection("letters", &scheme, &[("en", "en"), ("fr", "fr")], "en");
    let schema = SchemaRegistry::default();
    let session = SyncSession::new(&config, &schema, &mock, home.path(), "tester");
    let err = session.validate_remote().err().expect("must fail");
    assert!(matches!(
        err,
        SyncError::Remote(RemoteError::Validation { .. })
    ));
}

#[test]
fn per_item_create_failure_skips_the_node_and_continues() {
    let home = TempDir::new().expect("tempdir");
    let mock = MockThesaurus::new(&["en"]);
    let scheme = mock.add_scheme("Fruits");
    mock.fail_create("Banana");

    let mut store =
        TaxonomyStore::open_at(home.path(), &TaxonomyId::from("fruits")).expect("open");
    let fruits = store.create_node("Fruits");
    let apple = store.create_node("Apple");
    let banana = store.create_node("Banana");
    store.set_parents(fruits, vec![NodeId::ROOT]).expect("set");
    store.set_parents(apple, vec![fruits]).expect("set");
    store.set_parents(banana, vec![fruits]).expect("set");
    store.save().expect("save");

    let config = common::connection("fruits", &scheme, &[("en", "en")], "en");
    let schema = SchemaRegistry::default();
    let session = SyncSession::new(&config, &schema, &mock, home.path(), "tester");
    let summary = session
        .export(&mut store, BatchSize::default())
        .expect("start")
        .complete()
        .expect("run");

    assert_eq!(summary.created, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(mock.concept_count(), 2);
    assert!(store.get(banana).expect("banana").uri.is_none());

    let recorded = state::load_at(home.path(), &config.taxonomy).expect("state");
    assert_eq!(recorded.records.len(), 2);
}

#[test]
fn cancelled_run_keeps_committed_batches_and_writes_no_log() {
    let home = TempDir::new().expect("tempdir");
    let mock = MockThesaurus::new(&["en"]);
    let scheme = mock.add_scheme("Letters");
    mock.seed(&scheme, "http://x/a", "en", "A", &[], true);
    mock.seed(&scheme, "http://x/b", "en", "B", &["http://x/a"], false);
    mock.seed(&scheme, "http://x/c", "en", "C", &["http://x/b"], false);

    let config = common::connection("letters", &scheme, &[("en", "en")], "en");
    let schema = SchemaRegistry::default();
    let session = SyncSession::new(&config, &schema, &mock, home.path(), "tester");
    let mut store =
        TaxonomyStore::open_at(home.path(), &TaxonomyId::from("letters")).expect("open");

    {
        let mut run = session
            .update(&mut store, BatchSize::new(1).expect("batch"))
            .expect("start");
        let first = run.next().expect("one batch").expect("batch ok");
        assert_eq!(first.processed, 1);
        // Dropped here: cancelled between batches.
    }

    let recorded = state::load_at(home.path(), &config.taxonomy).expect("state");
    assert_eq!(recorded.records.len(), 1, "first batch must be committed");
    let logs = state::load_logs_at(home.path(), &config.taxonomy).expect("logs");
    assert!(logs.is_empty(), "aborted runs write no log entry");

    // A later full run finishes the job.
    let summary = session
        .update(&mut store, BatchSize::default())
        .expect("start")
        .complete()
        .expect("run");
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.created, 2);
    assert_eq!(store.len(), 3);
}
