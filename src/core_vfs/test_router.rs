use std::sync::Arc;

use crate::core_vfs::backend::Backend;
use crate::core_vfs::entry::DetailLevel;
use crate::core_vfs::error::VfsError;
use crate::core_vfs::router::{normalize, MountTable};
use crate::core_vfs::testutil::MemBackend;

fn table(prefixes: &[&str]) -> (MountTable, Vec<Arc<MemBackend>>) {
    let mut backends = Vec::new();
    let mut bindings: Vec<(String, Arc<dyn Backend>)> = Vec::new();
    for prefix in prefixes {
        let backend = Arc::new(MemBackend::new());
        backends.push(Arc::clone(&backend));
        bindings.push((prefix.to_string(), backend));
    }
    (MountTable::build(bindings), backends)
}

#[test]
fn normalize_resolves_dots() {
    assert_eq!(normalize("/", "a/b/../c").unwrap(), "/a/c");
    assert_eq!(normalize("/x/y", "z").unwrap(), "/x/y/z");
    assert_eq!(normalize("/x/y", "..").unwrap(), "/x");
    assert_eq!(normalize("/x", "/abs/./p").unwrap(), "/abs/p");
    assert_eq!(normalize("/", "").unwrap(), "/");
}

#[test]
fn normalize_rejects_root_escape() {
    assert!(matches!(normalize("/", ".."), Err(VfsError::EscapesRoot)));
    assert!(matches!(
        normalize("/a", "../../b"),
        Err(VfsError::EscapesRoot)
    ));
}

#[test]
fn longest_prefix_wins() {
    let (table, backends) = table(&["/a", "/a/b"]);
    let (backend, rel) = table.resolve("/a/b/c").unwrap();
    assert!(Arc::ptr_eq(
        &(backends[1].clone() as Arc<dyn Backend>),
        &backend
    ));
    assert_eq!(rel, "/c");

    let (backend, rel) = table.resolve("/a/x").unwrap();
    assert!(Arc::ptr_eq(
        &(backends[0].clone() as Arc<dyn Backend>),
        &backend
    ));
    assert_eq!(rel, "/x");
}

#[test]
fn prefix_match_respects_segment_boundaries() {
    let (table, backends) = table(&["/a", "/ab"]);
    let (backend, rel) = table.resolve("/ab/file").unwrap();
    assert!(Arc::ptr_eq(
        &(backends[1].clone() as Arc<dyn Backend>),
        &backend
    ));
    assert_eq!(rel, "/file");
}

#[test]
fn mount_root_resolves_to_backend_root() {
    let (table, _) = table(&["/a/b"]);
    let (_, rel) = table.resolve("/a/b").unwrap();
    assert_eq!(rel, "/");
}

#[test]
fn unbound_path_is_rejected() {
    let (table, _) = table(&["/a/b"]);
    assert!(matches!(
        table.resolve("/other"),
        Err(VfsError::NoBackend(_))
    ));
}

#[tokio::test]
async fn synthetic_ancestor_is_listable() {
    let (table, _) = table(&["/a/b"]);
    let entries = table.readdir("/a", DetailLevel::Basic).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "b");
    assert!(entries[0].is_dir);

    let entries = table.readdir("/", DetailLevel::Basic).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "a");
}

#[tokio::test]
async fn synthetic_ancestor_checks_out_as_directory() {
    let (table, _) = table(&["/a/b"]);
    assert_eq!(table.checkdir("/a").await.unwrap(), "/a");
    let entry = table.stat("/a", DetailLevel::Basic).await.unwrap();
    assert!(entry.is_dir);
}

#[tokio::test]
async fn synthetic_entries_merge_with_backend_entries() {
    let backend = Arc::new(MemBackend::new().with_file("/real.txt", b"x"));
    let nested = Arc::new(MemBackend::new());
    let table = MountTable::build(vec![
        ("/".to_string(), backend as Arc<dyn Backend>),
        ("/jobs".to_string(), nested as Arc<dyn Backend>),
    ]);
    let entries = table.readdir("/", DetailLevel::Basic).await.unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["jobs", "real.txt"]);
}

#[tokio::test]
async fn readdir_on_missing_dir_without_nested_mounts_fails() {
    let (table, _) = table(&["/"]);
    assert!(table.readdir("/nope", DetailLevel::Basic).await.is_err());
}
