use std::sync::Arc;

use refcontainer::{
    container::{AccessMode, Container},
    data_type::DataType,
    dataspace::Dataspace,
    storage::store::MemoryStore,
    version::VersionBounds,
};

#[test]
fn hierarchy_tree() {
    let store = Arc::new(MemoryStore::new());
    let mut container = Container::create(store.clone(), VersionBounds::latest()).unwrap();
    let root = container.root().unwrap();
    let a = root.create_group("a").unwrap();
    a.create_dataset("baz", DataType::Float64, Dataspace::new(vec![100, 10]))
        .unwrap();
    a.create_dataset("foo", DataType::Float64, Dataspace::new(vec![100, 10]))
        .unwrap();
    root.create_group("b").unwrap();
    root.link_hard("c", "/a").unwrap();
    root.link_soft("d", "/a/foo").unwrap();
    a.release();
    root.release();
    container.close().unwrap();

    let container = Container::open(store, AccessMode::ReadOnly, VersionBounds::latest()).unwrap();
    let tree = container.hierarchy_tree().unwrap();
    println!("{:?}", tree);
    assert_eq!(
        tree,
        "/
  a
    baz [100, 10] float64
    foo [100, 10] float64
  b
  c
  d -> /a/foo
"
    );
}
