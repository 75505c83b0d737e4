//! Migration through the `object_store` local directory backend.

use stratus_bridge::{
    copy_from_store, copy_to_store, delete_footprint, BlockFetcher, CopyOptions, TableFootprint,
};
use stratus_common::config::{StoreBackend, StoreConfig};
use stratus_common::types::{CompressionAlgorithm, FileKind, PageNumber, TableId};
use stratus_store::{AnyConnector, Connector, ObjectStoreClient};
use stratus_test::TableBuilder;
use tempfile::TempDir;

#[test]
fn test_round_trip_through_local_directory() {
    let objects = TempDir::new().unwrap();
    let tables = TempDir::new().unwrap();
    let config = StoreConfig {
        bucket: "tables".to_string(),
        backend: StoreBackend::Local {
            root: objects.path().to_path_buf(),
        },
    };
    let connector = AnyConnector::from_config(&config).unwrap();
    let footprint = TableFootprint::new("tables", TableId::new("shop", "orders").unwrap());

    let fixture = TableBuilder::new()
        .compressible(true)
        .write(tables.path(), "orders");
    let options = CopyOptions::default()
        .block_size(1024)
        .compression(CompressionAlgorithm::Zlib);

    let conn = connector.connect().unwrap();
    copy_to_store(&conn, &footprint, &fixture.table, &options).unwrap();
    assert!(objects.path().join("tables/shop/orders/aria").is_file());
    assert!(objects.path().join("tables/shop/orders/index/000003").is_file());
    assert_eq!(conn.list_prefix("tables", "shop/orders/data/").unwrap().len(), 2);

    // A fresh connection per miss.
    let fetcher = BlockFetcher::open(&connector.connect().unwrap(), footprint.clone()).unwrap();
    let bytes = fetcher
        .fetch_block(&connector.connect().unwrap(), FileKind::Data, PageNumber::new(1))
        .unwrap();
    assert_eq!(&bytes[..], &fixture.data[1024..]);

    copy_from_store(&conn, &footprint, &fixture.table, &options).unwrap();
    fixture.assert_restored();

    let report = delete_footprint(&conn, &footprint).unwrap();
    assert_eq!(report.total(), 7);
    assert!(conn.list_prefix("tables", "shop/").unwrap().is_empty());
}
