//! End-to-end: load a directory of annotation documents, query the battery

use retina::ingest::{clear_store, load_directory, LoadError, LoadOptions};
use retina::props;
use retina::query::{QueryEngine, TOP_K};
use retina::storage::{GraphStore, MemoryStore, OpenStore, SqliteStore};
use retina::{NodeKey, NodeKind};
use std::fs;
use std::path::Path;

fn write_doc(dir: &Path, name: &str, json: &str) {
    fs::write(dir.join(name), json).unwrap();
}

#[test]
fn loads_directory_and_reports_summary() {
    let dir = tempfile::tempdir().unwrap();
    write_doc(
        dir.path(),
        "01.json",
        r#"{"url": "img-a", "response": {"labelAnnotations": [
            {"mid": "m1", "description": "bridge", "score": 0.9}
        ]}}"#,
    );
    write_doc(dir.path(), "02.json", r#"{"url": "img-b"}"#);
    // Not a .json file, must be ignored
    write_doc(dir.path(), "notes.txt", "not a document");

    let store = MemoryStore::new();
    let summary = load_directory(&store, dir.path(), &LoadOptions::default()).unwrap();

    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.cleared_nodes, 0);
    assert_eq!(store.count_nodes(NodeKind::Image).unwrap(), 2);
    assert_eq!(store.count_nodes(NodeKind::Label).unwrap(), 1);

    let labels = QueryEngine::new(&store).top_labels(TOP_K).unwrap();
    assert_eq!(labels.len(), 1);
    assert_eq!((labels[0].mid.as_str(), labels[0].description.as_str(), labels[0].count),
        ("m1", "bridge", 1));
}

#[test]
fn rejected_document_is_skipped_and_the_rest_load() {
    let dir = tempfile::tempdir().unwrap();
    write_doc(dir.path(), "01.json", r#"{"url": "img-a"}"#);
    // Blank subject url fails client-level validation
    write_doc(dir.path(), "02.json", r#"{"url": "  "}"#);
    write_doc(dir.path(), "03.json", r#"{"url": "img-b"}"#);

    let store = MemoryStore::new();
    let summary = load_directory(&store, dir.path(), &LoadOptions::default()).unwrap();

    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(store.count_nodes(NodeKind::Image).unwrap(), 2);
}

#[test]
fn malformed_document_aborts_the_load() {
    let dir = tempfile::tempdir().unwrap();
    write_doc(dir.path(), "01.json", r#"{"response": {}}"#);
    write_doc(dir.path(), "02.json", r#"{"url": "img-b"}"#);

    let store = MemoryStore::new();
    let result = load_directory(&store, dir.path(), &LoadOptions::default());
    assert!(matches!(result, Err(LoadError::Parse { .. })));
}

#[test]
fn loading_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_doc(
        dir.path(),
        "01.json",
        r#"{"url": "img-a", "response": {
            "labelAnnotations": [{"mid": "m1", "description": "bridge", "score": 0.9}],
            "webDetection": {
                "fullMatchingImages": [{"url": "img-x"}],
                "pagesWithMatchingImages": [{"url": "page-1"}]
            }
        }}"#,
    );

    let store = MemoryStore::new();
    load_directory(&store, dir.path(), &LoadOptions::default()).unwrap();
    let nodes_before = store.node_count();
    let edges_before = store.edge_count();

    load_directory(&store, dir.path(), &LoadOptions::default()).unwrap();
    assert_eq!(store.node_count(), nodes_before);
    assert_eq!(store.edge_count(), edges_before);
}

#[test]
fn matching_image_shared_by_two_documents_is_one_node() {
    let dir = tempfile::tempdir().unwrap();
    write_doc(
        dir.path(),
        "01.json",
        r#"{"url": "img-a", "response": {"webDetection": {
            "fullMatchingImages": [{"url": "img-x"}]
        }}}"#,
    );
    write_doc(
        dir.path(),
        "02.json",
        r#"{"url": "img-b", "response": {"webDetection": {
            "fullMatchingImages": [{"url": "img-x"}]
        }}}"#,
    );

    let store = MemoryStore::new();
    load_directory(&store, dir.path(), &LoadOptions::default()).unwrap();

    assert_eq!(store.count_nodes(NodeKind::Image).unwrap(), 3);
    let shared = store.resolve(&NodeKey::Image { url: "img-x".into() }).unwrap().unwrap();
    let node = store.node(shared).unwrap().unwrap();
    assert_eq!(node.bool_prop(props::IS_DOCUMENT), Some(false));

    let matches = store.edges_of(retina::EdgeKind::Matches).unwrap();
    assert_eq!(matches.len(), 2);
    assert!(matches.iter().all(|e| e.target == shared));
    assert!(matches.iter().all(|e| e.string_prop(props::MATCH_TYPE) == Some("full")));
}

#[test]
fn is_document_promotion_across_files() {
    let dir = tempfile::tempdir().unwrap();
    // 01 introduces img-x as a matching image; 02 ingests it as a subject
    write_doc(
        dir.path(),
        "01.json",
        r#"{"url": "img-a", "response": {"webDetection": {
            "partialMatchingImages": [{"url": "img-x"}]
        }}}"#,
    );
    write_doc(dir.path(), "02.json", r#"{"url": "img-x"}"#);

    let store = MemoryStore::new();
    load_directory(&store, dir.path(), &LoadOptions::default()).unwrap();

    let id = store.resolve(&NodeKey::Image { url: "img-x".into() }).unwrap().unwrap();
    assert_eq!(store.node(id).unwrap().unwrap().bool_prop(props::IS_DOCUMENT), Some(true));

    let engine = QueryEngine::new(&store);
    assert_eq!(engine.image_count().unwrap(), 3);
    assert_eq!(engine.document_count().unwrap(), 2);
}

#[test]
fn clear_and_reload_leaves_only_the_fresh_set() {
    let first = tempfile::tempdir().unwrap();
    write_doc(
        first.path(),
        "01.json",
        r#"{"url": "img-old", "response": {"labelAnnotations": [
            {"mid": "old", "description": "stale", "score": 0.1}
        ]}}"#,
    );
    let second = tempfile::tempdir().unwrap();
    write_doc(second.path(), "01.json", r#"{"url": "img-new"}"#);

    let store = MemoryStore::new();
    load_directory(&store, first.path(), &LoadOptions::default()).unwrap();

    let summary =
        load_directory(&store, second.path(), &LoadOptions { clear_first: true }).unwrap();
    assert_eq!(summary.cleared_nodes, 2);

    assert_eq!(store.count_nodes(NodeKind::Image).unwrap(), 1);
    assert_eq!(store.count_nodes(NodeKind::Label).unwrap(), 0);
    assert!(store.resolve(&NodeKey::Image { url: "img-old".into() }).unwrap().is_none());
    assert!(store.resolve(&NodeKey::Image { url: "img-new".into() }).unwrap().is_some());
}

#[test]
fn clear_store_loops_until_empty() {
    let store = MemoryStore::new();
    for i in 0..120 {
        store
            .merge_node(
                &NodeKey::Image { url: format!("img-{}", i) },
                &Default::default(),
                &Default::default(),
            )
            .unwrap();
    }

    let deleted = clear_store(&store).unwrap();
    assert_eq!(deleted, 120);
    assert_eq!(store.node_count(), 0);
}

#[test]
fn battery_against_loaded_corpus() {
    let dir = tempfile::tempdir().unwrap();
    write_doc(
        dir.path(),
        "01.json",
        r#"{"url": "img-a", "response": {
            "labelAnnotations": [{"mid": "/m/015kr", "description": "bridge", "score": 0.9}],
            "webDetection": {
                "pagesWithMatchingImages": [{"url": "page-1"}],
                "webEntities": [{"entityId": "/g/e1", "description": "Bridge", "score": 1.0}]
            }
        }}"#,
    );
    write_doc(
        dir.path(),
        "02.json",
        r#"{"url": "img-b", "response": {
            "labelAnnotations": [{"mid": "/m/015kr", "description": "bridge", "score": 0.95}],
            "webDetection": {"pagesWithMatchingImages": [{"url": "page-1"}]}
        }}"#,
    );

    let store = MemoryStore::new();
    load_directory(&store, dir.path(), &LoadOptions::default()).unwrap();

    let engine = QueryEngine::new(&store);
    let labels = engine.top_labels(TOP_K).unwrap();
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].mid, "/m/015kr");
    assert_eq!(labels[0].description, "bridge");
    assert_eq!(labels[0].count, 2);

    let pairs = engine.shared_page_pairs(TOP_K).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!((pairs[0].first.as_str(), pairs[0].second.as_str()), ("img-a", "img-b"));

    let reports = engine.run_battery().unwrap();
    assert_eq!(reports.len(), 9);
}

#[test]
fn sqlite_store_round_trips_a_load() {
    let docs = tempfile::tempdir().unwrap();
    write_doc(
        docs.path(),
        "01.json",
        r#"{"url": "img-a", "response": {
            "labelAnnotations": [{"mid": "/m/015kr", "description": "bridge", "score": 0.9}],
            "landmarkAnnotations": [
                {"mid": "/m/gg", "description": "Golden Gate", "score": 0.7,
                 "locations": [{"latLng": {"latitude": 37.8, "longitude": -122.4}}]}
            ]
        }}"#,
    );

    let db = tempfile::tempdir().unwrap();
    let path = db.path().join("retina.db");
    {
        let store = SqliteStore::open(&path).unwrap();
        let summary = load_directory(&store, docs.path(), &LoadOptions::default()).unwrap();
        assert_eq!(summary.loaded, 1);
    }

    // A fresh handle sees the same graph and merges idempotently
    let store = SqliteStore::open(&path).unwrap();
    let summary = load_directory(&store, docs.path(), &LoadOptions::default()).unwrap();
    assert_eq!(summary.loaded, 1);
    assert_eq!(store.count_nodes(NodeKind::Image).unwrap(), 1);
    assert_eq!(store.count_nodes(NodeKind::Landmark).unwrap(), 1);
    assert_eq!(store.count_nodes(NodeKind::Location).unwrap(), 1);

    let engine = QueryEngine::new(&store);
    let rows = engine.label_images("/m/015kr", "bridge").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].url, "img-a");
    assert!(rows[0].is_document);
}
