//! Integration tests for `SqliteStore` against a database in a temporary
//! directory.

use std::{
  collections::HashSet,
  sync::Arc,
  time::{Duration, Instant},
};

use libreta_core::{
  ErrorKind, StoreError as _,
  content::{ContentHash, is_text_mimetype},
  edge::{NewEdge, REL_CHILD, REL_LINK},
  node::{ATTR_KIND, ATTR_KIND_ROOT, NewNode, NodeId},
  store::NoteStore,
};
use rusqlite::functions::FunctionFlags;
use tempfile::TempDir;

use crate::{Error, SCHEMA_VERSION, SqliteStore, StoreConfig};

fn config(dir: &TempDir) -> StoreConfig {
  StoreConfig { read_pool_size: Some(2), ..StoreConfig::new(dir.path()) }
}

async fn store() -> (TempDir, SqliteStore) {
  let dir = TempDir::new().expect("temp dir");
  let store = SqliteStore::open(config(&dir)).await.expect("store");
  (dir, store)
}

/// A plain connection to the store's file, for poking at rows the store API
/// does not expose.
fn raw(dir: &TempDir) -> rusqlite::Connection {
  let conn = rusqlite::Connection::open(dir.path().join("data.db")).unwrap();
  conn
    .create_scalar_function(
      "is_text_mimetype",
      1,
      FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
      |ctx| Ok(is_text_mimetype(&ctx.get::<String>(0)?)),
    )
    .unwrap();
  conn
}

async fn text(s: &SqliteStore, body: &str) -> ContentHash {
  s.content_save(body.as_bytes()).await.unwrap()
}

/// Save a `text/plain` node named `name` with `body` as content.
async fn note(s: &SqliteStore, id: &str, name: &str, body: &str) -> NodeId {
  let hash = text(s, body).await;
  let id = NodeId::from(id);
  s.node_save(NewNode::new(id.clone(), name, hash, "text/plain"))
    .await
    .unwrap();
  id
}

async fn tick() { tokio::time::sleep(Duration::from_millis(5)).await }

// ─── Content ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn content_save_is_idempotent() {
  let (dir, s) = store().await;

  let first = text(&s, "hello").await;
  let second = text(&s, "hello").await;
  assert_eq!(first, second);
  assert_eq!(
    first.as_str(),
    "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
  );
  assert_eq!(s.content_load(&first).await.unwrap(), b"hello");

  let rows: i64 = raw(&dir)
    .query_row("SELECT count(*) FROM node_content", [], |r| r.get(0))
    .unwrap();
  assert_eq!(rows, 1, "no staged copies left behind");
}

#[tokio::test]
async fn content_load_missing_is_not_found() {
  let (_dir, s) = store().await;
  let err = s.content_load(&ContentHash::from("0".repeat(64))).await.unwrap_err();
  assert!(matches!(err, Error::ContentNotFound(_)));
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn empty_content_is_storable() {
  let (_dir, s) = store().await;
  let hash = text(&s, "").await;
  assert_eq!(
    hash.as_str(),
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
  );
  assert!(s.content_load(&hash).await.unwrap().is_empty());

  let id = NodeId::from("empty");
  s.node_save(NewNode::new(id.clone(), "empty", hash, "text/plain"))
    .await
    .unwrap();
  let nodes = s.nodes_load(&[id.clone()]).await.unwrap();
  assert_eq!(nodes[&id].content_length, 0);
}

// ─── Nodes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn node_save_and_load() {
  let (_dir, s) = store().await;
  let hash = text(&s, "hello").await;
  let id = s.generate_id();

  s.node_save(
    NewNode::new(id.clone(), "Greeting", hash.clone(), "text/plain")
      .with_attribute("tag", "b")
      .with_attribute("tag", "a")
      .with_attribute(ATTR_KIND, ATTR_KIND_ROOT),
  )
  .await
  .unwrap();

  let nodes = s.nodes_load(&[id.clone()]).await.unwrap();
  let node = &nodes[&id];
  assert_eq!(node.name, "Greeting");
  assert_eq!(node.content_hash, hash);
  assert_eq!(node.content_mimetype, "text/plain");
  assert_eq!(node.content_length, 5);
  assert_eq!(node.created_at, node.updated_at);
  assert!(!node.is_deleted());

  let pairs: Vec<_> = node
    .attributes
    .iter()
    .map(|a| (a.key.as_str(), a.value.as_str()))
    .collect();
  assert_eq!(pairs, [("sys.kind", "root"), ("tag", "a"), ("tag", "b")]);
  assert_eq!(node.attribute_values("tag").collect::<Vec<_>>(), ["a", "b"]);
}

#[tokio::test]
async fn resave_keeps_created_at() {
  let (_dir, s) = store().await;
  let id = note(&s, "n1", "first", "one").await;
  let before = s.nodes_load(&[id.clone()]).await.unwrap().remove(&id).unwrap();

  tick().await;
  note(&s, "n1", "second", "two").await;
  let after = s.nodes_load(&[id.clone()]).await.unwrap().remove(&id).unwrap();

  assert_eq!(after.name, "second");
  assert_eq!(after.content_length, 3);
  assert_eq!(after.created_at, before.created_at);
  assert!(after.updated_at > before.updated_at);
}

#[tokio::test]
async fn attribute_set_is_replaced() {
  let (_dir, s) = store().await;
  let hash = text(&s, "body").await;
  let id = NodeId::from("n1");

  s.node_save(
    NewNode::new(id.clone(), "n", hash.clone(), "text/plain")
      .with_attribute("a", "1")
      .with_attribute("b", "2"),
  )
  .await
  .unwrap();
  let before = s.nodes_load(&[id.clone()]).await.unwrap().remove(&id).unwrap();
  let b_created = before.attributes[1].created_at;

  tick().await;
  s.node_save(
    NewNode::new(id.clone(), "n", hash.clone(), "text/plain")
      .with_attribute("b", "2")
      .with_attribute("c", "3"),
  )
  .await
  .unwrap();
  let after = s.nodes_load(&[id.clone()]).await.unwrap().remove(&id).unwrap();

  let keys: Vec<_> = after.attributes.iter().map(|a| a.key.as_str()).collect();
  assert_eq!(keys, ["b", "c"]);
  assert_eq!(after.attributes[0].created_at, b_created);
  assert!(after.attributes[1].created_at > b_created);

  s.node_save(NewNode::new(id.clone(), "n", hash, "text/plain"))
    .await
    .unwrap();
  let cleared = s.nodes_load(&[id.clone()]).await.unwrap().remove(&id).unwrap();
  assert!(cleared.attributes.is_empty());
}

#[tokio::test]
async fn separators_in_attributes_do_not_collide() {
  let (_dir, s) = store().await;
  let hash = text(&s, "body").await;
  let id = NodeId::from("n1");

  s.node_save(
    NewNode::new(id.clone(), "n", hash, "text/plain")
      .with_attribute("a=b", "c")
      .with_attribute("a", "b=c"),
  )
  .await
  .unwrap();

  let node = s.nodes_load(&[id.clone()]).await.unwrap().remove(&id).unwrap();
  assert_eq!(node.attributes.len(), 2);
  assert_eq!(s.query_by_attribute("a=b", "c").await.unwrap(), [id.clone()]);
  assert_eq!(s.query_by_attribute("a", "b=c").await.unwrap(), [id]);
  assert!(s.query_by_attribute("a", "b").await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_content_hash_is_a_constraint_violation() {
  let (_dir, s) = store().await;
  let id = NodeId::from("n1");

  let err = s
    .node_save(
      NewNode::new(id.clone(), "n", ContentHash::from("missing"), "text/plain")
        .with_attribute("tag", "x"),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Constraint(_)));
  assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

  assert!(s.nodes_load(&[id]).await.unwrap().is_empty());
  assert!(s.query_by_attribute("tag", "x").await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_resave_leaves_node_untouched() {
  let (_dir, s) = store().await;
  let hash = text(&s, "body").await;
  let id = NodeId::from("n1");
  s.node_save(
    NewNode::new(id.clone(), "kept", hash, "text/plain").with_attribute("k", "v"),
  )
  .await
  .unwrap();

  let result = s
    .node_save(
      NewNode::new(id.clone(), "lost", ContentHash::from("missing"), "text/plain")
        .with_attribute("other", "w"),
    )
    .await;
  assert!(result.is_err());

  let node = s.nodes_load(&[id.clone()]).await.unwrap().remove(&id).unwrap();
  assert_eq!(node.name, "kept");
  assert_eq!(node.attributes.len(), 1);
  assert_eq!(node.attributes[0].key, "k");
}

#[tokio::test]
async fn nodes_load_skips_unknown_ids() {
  let (_dir, s) = store().await;
  let a = note(&s, "a", "A", "x").await;
  let b = note(&s, "b", "B", "y").await;

  let nodes = s
    .nodes_load(&[a.clone(), NodeId::from("ghost"), b.clone()])
    .await
    .unwrap();
  assert_eq!(nodes.len(), 2);
  assert_eq!(nodes[&a].name, "A");
  assert_eq!(nodes[&b].name, "B");
}

// ─── Edges ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn edges_add_remove_and_lookup() {
  let (_dir, s) = store().await;
  let a = note(&s, "a", "A", "x").await;
  let b = note(&s, "b", "B", "x").await;
  let c = note(&s, "c", "C", "x").await;

  let ab = NewEdge::new(a.clone(), b.clone(), REL_CHILD);
  let bc = NewEdge::new(b.clone(), c.clone(), REL_LINK);
  s.edges_add(&[ab.clone(), ab.clone(), bc.clone()]).await.unwrap();
  s.edges_add(&[ab.clone()]).await.unwrap();

  let around_b = s.edges_for_nodes(&[b.clone()]).await.unwrap();
  assert_eq!(around_b.len(), 2);
  assert!(around_b.iter().all(|e| e.touches(&b)));

  let everything = s
    .edges_for_nodes(&[a.clone(), b.clone(), c.clone()])
    .await
    .unwrap();
  assert_eq!(everything.len(), 2, "edges between requested ids appear once");

  let missing = NewEdge::new(c.clone(), a.clone(), REL_LINK);
  s.edges_remove(&[ab, missing]).await.unwrap();

  let left = s.edges_for_nodes(&[a, b, c]).await.unwrap();
  assert_eq!(left.len(), 1);
  assert_eq!(left[0].key(), bc);
}

#[tokio::test]
async fn edge_to_unknown_node_rejects_whole_batch() {
  let (_dir, s) = store().await;
  let a = note(&s, "a", "A", "x").await;
  let b = note(&s, "b", "B", "x").await;

  let err = s
    .edges_add(&[
      NewEdge::new(a.clone(), b, REL_CHILD),
      NewEdge::new(a.clone(), NodeId::from("ghost"), REL_CHILD),
    ])
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
  assert!(s.edges_for_nodes(&[a]).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_batches_are_no_ops() {
  let (_dir, s) = store().await;
  assert!(s.nodes_load(&[]).await.unwrap().is_empty());
  assert!(s.edges_for_nodes(&[]).await.unwrap().is_empty());
  s.edges_add(&[]).await.unwrap();
  s.edges_remove(&[]).await.unwrap();
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn query_by_attribute_matches_exact_pairs() {
  let (_dir, s) = store().await;
  let hash = text(&s, "x").await;
  for (id, kind) in [("r1", ATTR_KIND_ROOT), ("r2", ATTR_KIND_ROOT), ("p1", "page")] {
    s.node_save(
      NewNode::new(NodeId::from(id), id, hash.clone(), "text/plain")
        .with_attribute(ATTR_KIND, kind),
    )
    .await
    .unwrap();
  }

  let mut roots = s.query_by_attribute(ATTR_KIND, ATTR_KIND_ROOT).await.unwrap();
  roots.sort();
  assert_eq!(roots, [NodeId::from("r1"), NodeId::from("r2")]);
  assert!(s.query_by_attribute(ATTR_KIND, "Root").await.unwrap().is_empty());
}

#[tokio::test]
async fn soft_deleted_nodes_are_hidden_from_attribute_queries() {
  let (dir, s) = store().await;
  let hash = text(&s, "x").await;
  let id = NodeId::from("gone");
  s.node_save(
    NewNode::new(id.clone(), "gone", hash, "text/plain").with_attribute("tag", "t"),
  )
  .await
  .unwrap();

  raw(&dir)
    .execute(
      "UPDATE node SET deleted_at = '2024-01-01 00:00:00+00:00' WHERE id = ?1",
      [id.as_str()],
    )
    .unwrap();

  assert!(s.query_by_attribute("tag", "t").await.unwrap().is_empty());
  let node = s.nodes_load(&[id.clone()]).await.unwrap().remove(&id).unwrap();
  assert!(node.is_deleted());
}

#[tokio::test]
async fn full_text_search_covers_name_and_text_content() {
  let (_dir, s) = store().await;
  let list = note(&s, "list", "Groceries", "buy apples and pears").await;

  let png = s.content_save(&b"\x89PNG apples"[..]).await.unwrap();
  let photo = NodeId::from("photo");
  s.node_save(NewNode::new(photo.clone(), "Photo", png, "image/png"))
    .await
    .unwrap();

  assert_eq!(s.query_full_text_search("apples", 10).await.unwrap(), [list.clone()]);
  assert_eq!(s.query_full_text_search("grocer", 10).await.unwrap(), [list.clone()]);
  assert_eq!(s.query_full_text_search("photo", 10).await.unwrap(), [photo]);

  note(&s, "list", "Groceries", "buy bananas").await;
  assert!(s.query_full_text_search("apples", 10).await.unwrap().is_empty());
  assert_eq!(s.query_full_text_search("bananas", 10).await.unwrap(), [list]);
}

#[tokio::test]
async fn full_text_search_respects_limit() {
  let (_dir, s) = store().await;
  for id in ["n1", "n2", "n3"] {
    note(&s, id, "weekly note", id).await;
  }

  assert_eq!(s.query_full_text_search("weekly", 2).await.unwrap().len(), 2);
  assert_eq!(s.query_full_text_search("weekly", 10).await.unwrap().len(), 3);
  assert!(s.query_full_text_search("weekly", 0).await.unwrap().is_empty());
  assert!(s.query_full_text_search("   ", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn full_text_search_orders_by_relevance() {
  let (_dir, s) = store().await;
  let filler = " lorem ipsum dolor sit amet".repeat(20);
  let dense = note(&s, "dense", "alpha", "zebra zebra zebra zebra").await;
  let sparse = note(&s, "sparse", "beta", &format!("zebra{filler}")).await;

  let first = s.query_full_text_search("zebra", 10).await.unwrap();
  assert_eq!(first, [dense, sparse]);
  assert_eq!(s.query_full_text_search("zebra", 10).await.unwrap(), first);

  // Identical documents score the same; the one indexed first wins.
  let older = note(&s, "tie-2", "twin", "okapi field notes").await;
  let newer = note(&s, "tie-1", "twin", "okapi field notes").await;
  assert_eq!(s.query_full_text_search("okapi", 10).await.unwrap(), [older, newer]);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_saves_store_one_blob() {
  let (dir, s) = store().await;
  let body = Arc::new(vec![42u8; 256 * 1024]);

  let tasks: Vec<_> = (0..16)
    .map(|_| {
      let s = s.clone();
      let body = Arc::clone(&body);
      tokio::spawn(async move { s.content_save(body.as_slice()).await.unwrap() })
    })
    .collect();

  let mut hashes = HashSet::new();
  for task in tasks {
    hashes.insert(task.await.unwrap());
  }
  assert_eq!(hashes.len(), 1);

  let rows: i64 = raw(&dir)
    .query_row("SELECT count(*) FROM node_content", [], |r| r.get(0))
    .unwrap();
  assert_eq!(rows, 1);
}

#[tokio::test]
async fn reads_proceed_during_an_open_write() {
  let dir = TempDir::new().unwrap();
  let s = SqliteStore::open(StoreConfig { busy_timeout_ms: 100, ..config(&dir) })
    .await
    .unwrap();
  let id = note(&s, "n1", "before", "body").await;
  let hash = text(&s, "body").await;

  let other = raw(&dir);
  other
    .execute_batch("BEGIN IMMEDIATE; UPDATE node SET name = 'after' WHERE id = 'n1';")
    .unwrap();

  let started = Instant::now();
  let nodes = s.nodes_load(&[id.clone()]).await.unwrap();
  assert_eq!(nodes[&id].name, "before");
  assert!(started.elapsed() < Duration::from_secs(1));

  let err = s
    .node_save(NewNode::new(id.clone(), "mine", hash, "text/plain"))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::ContentionTimeout);

  other.execute_batch("COMMIT").unwrap();
  let nodes = s.nodes_load(&[id.clone()]).await.unwrap();
  assert_eq!(nodes[&id].name, "after");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_half_applied_saves() {
  let (_dir, s) = store().await;
  let hash = text(&s, "body").await;
  let id = NodeId::from("n1");

  let revision = |rev: String| {
    NewNode::new(id.clone(), rev.clone(), hash.clone(), "text/plain")
      .with_attribute("rev", rev.clone())
      .with_attribute("copy", rev)
  };
  s.node_save(revision("v0".into())).await.unwrap();

  let saves: Vec<_> = (1..=30).map(|i| revision(format!("v{i}"))).collect();
  let writer = {
    let s = s.clone();
    tokio::spawn(async move {
      for node in saves {
        s.node_save(node).await.unwrap();
      }
    })
  };

  let mut reads = 0;
  while !writer.is_finished() || reads == 0 {
    let node = s.nodes_load(&[id.clone()]).await.unwrap().remove(&id).unwrap();
    assert_eq!(node.attributes.len(), 2);
    assert!(node.attributes.iter().all(|a| a.value == node.name), "{node:?}");
    reads += 1;
  }
  writer.await.unwrap();

  let node = s.nodes_load(&[id.clone()]).await.unwrap().remove(&id).unwrap();
  assert_eq!(node.name, "v30");
}

// ─── Schema & lifecycle ──────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_store_is_stamped() {
  let (_dir, s) = store().await;
  assert_eq!(s.schema_version().await.unwrap(), SCHEMA_VERSION);
}

#[tokio::test]
async fn reopen_keeps_data() {
  let dir = TempDir::new().unwrap();
  let s = SqliteStore::open(config(&dir)).await.unwrap();
  let id = note(&s, "n1", "persisted", "body").await;
  s.close().await.unwrap();

  let s = SqliteStore::open(config(&dir)).await.unwrap();
  let nodes = s.nodes_load(&[id.clone()]).await.unwrap();
  assert_eq!(nodes[&id].name, "persisted");
}

#[tokio::test]
async fn mismatched_schema_is_refused() {
  let dir = TempDir::new().unwrap();
  let s = SqliteStore::open(config(&dir)).await.unwrap();
  s.close().await.unwrap();

  raw(&dir)
    .execute("UPDATE schema_version SET version = 2", [])
    .unwrap();

  for allow_upgrade in [false, true] {
    let result = SqliteStore::open(StoreConfig { allow_upgrade, ..config(&dir) }).await;
    match result {
      Err(e @ Error::SchemaMismatch { found: 2, expected: 1 }) => {
        assert_eq!(e.kind(), ErrorKind::SchemaMismatch);
      }
      Err(e) => panic!("unexpected error: {e}"),
      Ok(_) => panic!("mismatched schema was accepted"),
    }
  }
}

#[tokio::test]
async fn generated_ids_are_unique() {
  let (_dir, s) = store().await;
  let ids: HashSet<_> = (0..100).map(|_| s.generate_id()).collect();
  assert_eq!(ids.len(), 100);
}

#[tokio::test]
async fn clones_share_the_database() {
  let (_dir, s) = store().await;
  let other = s.clone();
  let id = note(&other, "n1", "shared", "x").await;
  assert_eq!(s.nodes_load(&[id]).await.unwrap().len(), 1);
}
