//! Export a local tree, then import it into a second taxonomy and check
//! that structure and content survive the round trip.

mod common;

use tempfile::TempDir;

use taxsync_core::{NodeId, SchemaRegistry, TaxonomyId};
use taxsync_engine::{state, BatchSize, SyncSession};
use taxsync_store::TaxonomyStore;

use common::MockThesaurus;

struct Fixture {
    home: TempDir,
    mock: MockThesaurus,
    scheme: taxsync_core::ConceptUri,
}

fn fixture() -> Fixture {
    let mock = MockThesaurus::new(&["en"]);
    let scheme = mock.add_scheme("Fruits");
    Fixture {
        home: TempDir::new().expect("tempdir"),
        mock,
        scheme,
    }
}

/// Fruits (top) with Apple and Banana below it.
fn seed_local_tree(fx: &Fixture, taxonomy: &str) -> (TaxonomyStore, NodeId, NodeId, NodeId) {
    let mut store =
        TaxonomyStore::open_at(fx.home.path(), &TaxonomyId::from(taxonomy)).expect("open");
    let fruits = store.create_node("Fruits");
    let apple = store.create_node("Apple");
    let banana = store.create_node("Banana");
    store.set_parents(fruits, vec![NodeId::ROOT]).expect("set");
    store.set_parents(apple, vec![fruits]).expect("set");
    store.set_parents(banana, vec![fruits]).expect("set");
    store.get_mut(apple).expect("apple").description = "A pomaceous fruit".to_string();
    store.get_mut(apple).expect("apple").alt_labels = vec!["Malus fruit".to_string()];
    store.save().expect("save");
    (store, fruits, apple, banana)
}

#[test]
fn export_creates_all_concepts_with_baseline_hashes() {
    let fx = fixture();
    let (mut store, fruits, apple, _banana) = seed_local_tree(&fx, "fruits");
    let config = common::connection("fruits", &fx.scheme, &[("en", "en")], "en");
    let schema = SchemaRegistry::default();
    let session = SyncSession::new(&config, &schema, &fx.mock, fx.home.path(), "tester");

    let summary = session
        .export(&mut store, BatchSize::new(2).expect("batch"))
        .expect("start export")
        .complete()
        .expect("run export");

    assert_eq!(summary.created, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(fx.mock.concept_count(), 3);

    // Every node now carries its remote URI and a baseline hash record.
    let fruits_uri = store.get(fruits).expect("fruits").uri.clone().expect("uri");
    let apple_uri = store.get(apple).expect("apple").uri.clone().expect("uri");
    assert_eq!(fx.mock.broaders_of(&apple_uri), vec![fruits_uri.0.clone()]);
    assert_eq!(
        fx.mock.pref_label(&apple_uri, "en").as_deref(),
        Some("Apple")
    );

    let recorded = state::load_at(fx.home.path(), &config.taxonomy).expect("state");
    assert_eq!(recorded.records.len(), 3);

    let logs = state::load_logs_at(fx.home.path(), &config.taxonomy).expect("logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].actor, "tester");
}

#[test]
fn export_rerun_does_not_duplicate_concepts() {
    let fx = fixture();
    let (mut store, _fruits, _apple, _banana) = seed_local_tree(&fx, "fruits");
    let config = common::connection("fruits", &fx.scheme, &[("en", "en")], "en");
    let schema = SchemaRegistry::default();
    let session = SyncSession::new(&config, &schema, &fx.mock, fx.home.path(), "tester");

    for _ in 0..2 {
        session
            .export(&mut store, BatchSize::default())
            .expect("start export")
            .complete()
            .expect("run export");
    }
    assert_eq!(fx.mock.concept_count(), 3, "re-run must not re-create");
}

#[test]
fn export_fans_out_multiple_parents_as_relations() {
    let fx = fixture();
    let mut store =
        TaxonomyStore::open_at(fx.home.path(), &TaxonomyId::from("topics")).expect("open");
    let a = store.create_node("A");
    let b = store.create_node("B");
    let c = store.create_node("C");
    store.set_parents(a, vec![NodeId::ROOT]).expect("set");
    store.set_parents(b, vec![NodeId::ROOT]).expect("set");
    store.set_parents(c, vec![a, b]).expect("set");
    store.save().expect("save");

    let config = common::connection("topics", &fx.scheme, &[("en", "en")], "en");
    let schema = SchemaRegistry::default();
    let session = SyncSession::new(&config, &schema, &fx.mock, fx.home.path(), "tester");
    session
        .export(&mut store, BatchSize::default())
        .expect("start export")
        .complete()
        .expect("run export");

    let c_uri = store.get(c).expect("c").uri.clone().expect("uri");
    let mut broaders = fx.mock.broaders_of(&c_uri);
    broaders.sort();
    let a_uri = store.get(a).expect("a").uri.clone().expect("uri").0;
    let b_uri = store.get(b).expect("b").uri.clone().expect("uri").0;
    let mut expected = vec![a_uri, b_uri];
    expected.sort();
    assert_eq!(broaders, expected);
}

#[test]
fn exported_tree_round_trips_into_another_taxonomy() {
    let fx = fixture();
    let (mut store, _fruits, _apple, _banana) = seed_local_tree(&fx, "fruits");
    let config = common::connection("fruits", &fx.scheme, &[("en", "en")], "en");
    let schema = SchemaRegistry::default();
    let session = SyncSession::new(&config, &schema, &fx.mock, fx.home.path(), "tester");
    session
        .export(&mut store, BatchSize::default())
        .expect("start export")
        .complete()
        .expect("run export");

    // Pull the same scheme into a fresh taxonomy.
    let mut mirror =
        TaxonomyStore::open_at(fx.home.path(), &TaxonomyId::from("mirror")).expect("open");
    let mirror_config = common::connection("mirror", &fx.scheme, &[("en", "en")], "en");
    let mirror_session =
        SyncSession::new(&mirror_config, &schema, &fx.mock, fx.home.path(), "tester");
    let summary = mirror_session
        .update(&mut mirror, BatchSize::default())
        .expect("start update")
        .complete()
        .expect("run update");

    assert_eq!(summary.created, 3);
    assert_eq!(mirror.len(), 3);

    let fruits_uri = fx.mock.uri_by_label("en", "Fruits").expect("fruits uri");
    let apple_uri = fx.mock.uri_by_label("en", "Apple").expect("apple uri");
    let fruits_node = mirror.find_by_uri(&fruits_uri).expect("fruits node");
    let apple_node = mirror.find_by_uri(&apple_uri).expect("apple node");
    assert_eq!(mirror.parents(fruits_node), vec![NodeId::ROOT]);
    assert_eq!(mirror.parents(apple_node), vec![fruits_node]);

    let apple = mirror.get(apple_node).expect("apple");
    assert_eq!(apple.description, "A pomaceous fruit");
    assert_eq!(apple.alt_labels, vec!["Malus fruit".to_string()]);

    // A second pull finds nothing to do.
    let summary = mirror_session
        .update(&mut mirror, BatchSize::default())
        .expect("start update")
        .complete()
        .expect("run update");
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.deleted, 0);
    assert_eq!(summary.skipped, 3);
}
