//! Copy-to-store and copy-from-store tests.

use std::fs;

use bytes::Bytes;
use stratus_bridge::header::DescriptorLayout;
use stratus_bridge::{copy_from_store, copy_to_store, BlockFetcher, CopyOptions, TableFootprint};
use stratus_common::config::BridgeConfig;
use stratus_common::constants::{
    BASE_COMPRESSION_OFFSET, BASE_STORE_BLOCK_SIZE_OFFSET, LOCAL_ENGINE_ID, STORE_ENGINE_ID,
};
use stratus_common::types::{CompressionAlgorithm, FileKind, MigrationStep, PageNumber, TableId};
use stratus_common::ErrorKind;
use stratus_store::{MemoryStore, ObjectStoreClient};
use stratus_test::fixtures::FIXTURE_BASE_POS;
use stratus_test::{RecordingStore, TableBuilder};
use tempfile::TempDir;

const BUCKET: &str = "tables";

fn footprint() -> TableFootprint {
    TableFootprint::new(BUCKET, TableId::new("shop", "orders").unwrap())
}

fn options() -> CopyOptions {
    CopyOptions::default().block_size(1024)
}

#[test]
fn test_round_trip_uncompressed() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new().write(dir.path(), "orders");
    let store = MemoryStore::new();

    let report = copy_to_store(&store, &footprint(), &fixture.table, &options()).unwrap();
    assert_eq!(report.block_size, 1024);
    assert_eq!(report.compression, CompressionAlgorithm::None);
    assert_eq!(report.descriptor_bytes, 1024);
    assert_eq!(report.index.blocks, 3);
    assert_eq!(report.data.blocks, 2);
    assert!(report.schema_copied);

    assert_eq!(
        store.names(BUCKET),
        vec![
            "shop/orders/aria",
            "shop/orders/data/000001",
            "shop/orders/data/000002",
            "shop/orders/frm",
            "shop/orders/index/000001",
            "shop/orders/index/000002",
            "shop/orders/index/000003",
        ]
    );

    // Index and data files are gone, the schema file stays.
    assert!(!fixture.table.index_path().exists());
    assert!(!fixture.table.data_path().exists());
    assert!(fixture.table.schema_path().exists());

    // Raw blocks are stored without an envelope.
    let block = store.get(BUCKET, "shop/orders/index/000002").unwrap();
    assert_eq!(&block[..], &fixture.index[2048..3072]);

    let descriptor = store.get(BUCKET, "shop/orders/aria").unwrap();
    let base = usize::from(FIXTURE_BASE_POS);
    assert_eq!(descriptor[base + BASE_COMPRESSION_OFFSET], 0);
    assert_eq!(
        &descriptor[base + BASE_STORE_BLOCK_SIZE_OFFSET..base + BASE_STORE_BLOCK_SIZE_OFFSET + 3],
        &[0x00, 0x04, 0x00]
    );
    let schema = store.get(BUCKET, "shop/orders/frm").unwrap();
    assert_eq!(schema[3], STORE_ENGINE_ID);

    fs::remove_file(fixture.table.schema_path()).unwrap();
    let report = copy_from_store(&store, &footprint(), &fixture.table, &options()).unwrap();
    assert_eq!(report.index.blocks, 3);
    assert_eq!(report.data.blocks, 2);
    assert!(report.schema_copied);
    fixture.assert_restored();

    let schema = fs::read(fixture.table.schema_path()).unwrap();
    assert_eq!(schema[3], LOCAL_ENGINE_ID);
}

#[test]
fn test_round_trip_zlib() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new()
        .compressible(true)
        .write(dir.path(), "orders");
    let store = MemoryStore::new();
    let options = options().compression(CompressionAlgorithm::Zlib);

    let report = copy_to_store(&store, &footprint(), &fixture.table, &options).unwrap();
    assert_eq!(report.compression, CompressionAlgorithm::Zlib);
    assert!(report.data.stored_bytes < report.data.bytes);
    assert!(report.index.stored_bytes < report.index.bytes);

    let block = store.get(BUCKET, "shop/orders/data/000001").unwrap();
    assert_eq!(block[0], 1);
    assert_eq!(&block[1..4], &[0x00, 0x04, 0x00]);

    let descriptor = store.get(BUCKET, "shop/orders/aria").unwrap();
    let layout = DescriptorLayout::validate(&descriptor).unwrap();
    assert_eq!(layout.compression, CompressionAlgorithm::Zlib);
    assert_eq!(layout.store_block_size, 1024);
    assert_eq!(layout.index_length, fixture.index.len() as u64);
    assert_eq!(layout.data_length, fixture.data.len() as u64);

    // The schema object never carries an envelope.
    let schema = store.get(BUCKET, "shop/orders/frm").unwrap();
    assert_eq!(schema.len(), 64);

    copy_from_store(&store, &footprint(), &fixture.table, &CopyOptions::default()).unwrap();
    fixture.assert_restored();
}

#[test]
fn test_round_trip_zlib_incompressible() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new().write(dir.path(), "orders");
    let store = MemoryStore::new();
    let options = options().compression(CompressionAlgorithm::Zlib);

    copy_to_store(&store, &footprint(), &fixture.table, &options).unwrap();

    let block = store.get(BUCKET, "shop/orders/data/000001").unwrap();
    assert_eq!(block.len(), 4 + 1024);
    assert_eq!(&block[..4], &[0, 0, 0, 0]);

    copy_from_store(&store, &footprint(), &fixture.table, &options).unwrap();
    fixture.assert_restored();
}

#[test]
fn test_recorded_settings_are_used() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new()
        .recorded(2048, CompressionAlgorithm::Zlib)
        .write(dir.path(), "orders");
    let store = MemoryStore::new();

    let report =
        copy_to_store(&store, &footprint(), &fixture.table, &CopyOptions::default()).unwrap();
    assert_eq!(report.block_size, 2048);
    assert_eq!(report.compression, CompressionAlgorithm::Zlib);
    assert_eq!(report.index.blocks, 2);
    assert_eq!(report.data.blocks, 1);

    copy_from_store(&store, &footprint(), &fixture.table, &CopyOptions::default()).unwrap();

    // The restored header has the bridge fields cleared and nothing else changed.
    let restored = fs::read(fixture.table.index_path()).unwrap();
    let base = usize::from(FIXTURE_BASE_POS);
    let mut expected = fixture.index.clone();
    expected[base + BASE_COMPRESSION_OFFSET] = 0;
    expected[base + BASE_STORE_BLOCK_SIZE_OFFSET..base + BASE_STORE_BLOCK_SIZE_OFFSET + 3]
        .fill(0);
    assert_eq!(restored, expected);
    assert_eq!(fs::read(fixture.table.data_path()).unwrap(), fixture.data);
}

#[test]
fn test_block_size_aligned_to_local_blocks() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new().write(dir.path(), "orders");
    let store = MemoryStore::new();

    let options = CopyOptions::default().block_size(2500);
    let report = copy_to_store(&store, &footprint(), &fixture.table, &options).unwrap();
    assert_eq!(report.block_size, 2048);
}

#[test]
fn test_recorded_block_size_keeps_recorded_compression() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new()
        .recorded(2048, CompressionAlgorithm::None)
        .write(dir.path(), "orders");
    let store = MemoryStore::new();
    let mut config = BridgeConfig::for_testing();
    config.compression = CompressionAlgorithm::Zlib;

    let report =
        copy_to_store(&store, &footprint(), &fixture.table, &CopyOptions::new(&config)).unwrap();
    assert_eq!(report.block_size, 2048);
    assert_eq!(report.compression, CompressionAlgorithm::None);
    let block = store.get(BUCKET, "shop/orders/data/000001").unwrap();
    assert_eq!(&block[..], &fixture.data[..]);
}

#[test]
fn test_odd_page_count_round_trip_with_zlib() {
    let dir = TempDir::new().unwrap();
    // Random bytes do not compress, so every chunk is stored raw and the
    // last chunk of each file is shorter than the block size.
    let fixture = TableBuilder::new()
        .index_body(5 * 1024)
        .data_len(3 * 1024)
        .write(dir.path(), "orders");
    let store = MemoryStore::new();
    let options = CopyOptions::default()
        .block_size(2048)
        .compression(CompressionAlgorithm::Zlib);

    let report = copy_to_store(&store, &footprint(), &fixture.table, &options).unwrap();
    assert_eq!(report.index.blocks, 3);
    assert_eq!(report.data.blocks, 2);
    let tail = store.get(BUCKET, "shop/orders/data/000002").unwrap();
    assert_eq!(tail.len(), 4 + 1024);
    assert_eq!(tail[0], 0);

    let fetcher = BlockFetcher::open(&store, footprint()).unwrap();
    let bytes = fetcher
        .fetch_block(&store, FileKind::Data, PageNumber::new(2))
        .unwrap();
    assert_eq!(&bytes[..], &fixture.data[2048..]);

    copy_from_store(&store, &footprint(), &fixture.table, &options).unwrap();
    fixture.assert_restored();
}

#[test]
fn test_sub_kilobyte_local_blocks_unsupported() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new()
        .header_size(512)
        .local_block_size(512)
        .data_len(1536)
        .write(dir.path(), "orders");
    let store = RecordingStore::new();
    let options = options().compression(CompressionAlgorithm::Zlib);

    let err = copy_to_store(&store, &footprint(), &fixture.table, &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    assert_eq!(err.step(), Some(MigrationStep::ValidateTable));
    assert!(store.puts().is_empty());
    assert!(fixture.table.index_path().exists());
    assert!(fixture.table.data_path().exists());
}

#[test]
fn test_block_size_below_local_block_rejected() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new().write(dir.path(), "orders");
    let store = RecordingStore::new();

    let options = CopyOptions::default().block_size(256);
    let err = copy_to_store(&store, &footprint(), &fixture.table, &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.step(), Some(MigrationStep::ValidateTable));
    assert!(store.puts().is_empty());
    assert!(fixture.table.index_path().exists());
}

#[test]
fn test_existing_table_rejected_without_put() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new().write(dir.path(), "orders");
    let store = RecordingStore::new();
    store
        .inner()
        .put(BUCKET, "shop/orders/aria", Bytes::from_static(b"old"))
        .unwrap();

    let err = copy_to_store(&store, &footprint(), &fixture.table, &options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(err.step(), Some(MigrationStep::CheckDestination));
    assert!(store.puts().is_empty());
    assert!(fixture.table.index_path().exists());
    assert!(fixture.table.data_path().exists());
}

#[test]
fn test_force_replaces_existing_table() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();

    let old = TableBuilder::new()
        .data_len(4 * 1024)
        .write(dir.path(), "orders");
    copy_to_store(&store, &footprint(), &old.table, &options()).unwrap();
    assert_eq!(store.list_prefix(BUCKET, "shop/orders/data/").unwrap().len(), 4);
    fs::remove_file(old.table.schema_path()).unwrap();

    let new = TableBuilder::new()
        .seed(9)
        .data_len(1024)
        .schema_len(None)
        .write(dir.path(), "orders");
    let report = copy_to_store(&store, &footprint(), &new.table, &options().force(true)).unwrap();
    assert!(!report.schema_copied);

    assert_eq!(
        store.list_prefix(BUCKET, "shop/orders/data/").unwrap(),
        vec!["shop/orders/data/000001"]
    );
    // The old schema object went with the old table.
    assert!(!store.exists(BUCKET, "shop/orders/frm").unwrap());

    copy_from_store(&store, &footprint(), &new.table, &options()).unwrap();
    new.assert_restored();
    assert!(!new.table.schema_path().exists());
}

#[test]
fn test_transactional_table_unsupported() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new()
        .transactional(true)
        .write(dir.path(), "orders");
    let store = RecordingStore::new();

    let err = copy_to_store(&store, &footprint(), &fixture.table, &options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    assert_eq!(err.step(), Some(MigrationStep::ValidateTable));
    assert!(store.puts().is_empty());
    assert!(fixture.table.index_path().exists());
}

#[test]
fn test_row_format_table_unsupported() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new()
        .data_file_type(2)
        .write(dir.path(), "orders");
    let store = MemoryStore::new();

    let err = copy_to_store(&store, &footprint(), &fixture.table, &options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
    assert_eq!(store.object_count(BUCKET), 0);
}

#[test]
fn test_missing_local_table() {
    let dir = TempDir::new().unwrap();
    let table = stratus_bridge::LocalTable::new(dir.path().join("absent"));
    let store = MemoryStore::new();

    let err = copy_to_store(&store, &footprint(), &table, &options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LocalIo);
    assert_eq!(err.step(), Some(MigrationStep::ValidateTable));
}

#[test]
fn test_large_schema_not_copied() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new()
        .schema_len(Some(2000))
        .write(dir.path(), "orders");
    let store = MemoryStore::new();

    let report = copy_to_store(&store, &footprint(), &fixture.table, &options()).unwrap();
    assert!(!report.schema_copied);
    assert!(!store.exists(BUCKET, "shop/orders/frm").unwrap());
    assert!(fixture.table.schema_path().exists());
}

#[test]
fn test_copy_from_existing_local_table() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new().write(dir.path(), "orders");
    let store = MemoryStore::new();
    copy_to_store(&store, &footprint(), &fixture.table, &options()).unwrap();

    fs::write(fixture.table.index_path(), b"stale").unwrap();
    let err = copy_from_store(&store, &footprint(), &fixture.table, &options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(err.step(), Some(MigrationStep::CheckDestination));
    assert_eq!(fs::read(fixture.table.index_path()).unwrap(), b"stale");

    copy_from_store(&store, &footprint(), &fixture.table, &options().force(true)).unwrap();
    fixture.assert_restored();
}

#[test]
fn test_copy_from_missing_table() {
    let dir = TempDir::new().unwrap();
    let table = stratus_bridge::LocalTable::new(dir.path().join("orders"));
    let store = MemoryStore::new();

    let err = copy_from_store(&store, &footprint(), &table, &options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.step(), Some(MigrationStep::FetchDescriptor));
    assert!(!table.index_path().exists());
}

#[test]
fn test_copy_from_short_descriptor() {
    let dir = TempDir::new().unwrap();
    let table = stratus_bridge::LocalTable::new(dir.path().join("orders"));
    let store = MemoryStore::new();
    store
        .put(BUCKET, "shop/orders/aria", Bytes::from(vec![0u8; 50]))
        .unwrap();

    let err = copy_from_store(&store, &footprint(), &table, &options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);
    assert_eq!(err.step(), Some(MigrationStep::FetchDescriptor));
}

#[test]
fn test_copy_from_corrupt_block() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new()
        .compressible(true)
        .write(dir.path(), "orders");
    let store = MemoryStore::new();
    let options = options().compression(CompressionAlgorithm::Zlib);
    copy_to_store(&store, &footprint(), &fixture.table, &options).unwrap();

    store
        .put(
            BUCKET,
            "shop/orders/data/000002",
            Bytes::from_static(&[2, 0, 4, 0, 1, 2, 3]),
        )
        .unwrap();

    let err = copy_from_store(&store, &footprint(), &fixture.table, &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);
    assert_eq!(err.step(), Some(MigrationStep::FetchData));
    assert!(err.to_string().contains("shop/orders/data/000002"));

    // The index file was completed before the data file failed.
    assert_eq!(fs::read(fixture.table.index_path()).unwrap(), fixture.index);
}

#[test]
fn test_copy_from_missing_block() {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new().write(dir.path(), "orders");
    let store = MemoryStore::new();
    copy_to_store(&store, &footprint(), &fixture.table, &options()).unwrap();
    store.delete(BUCKET, "shop/orders/index/000002").unwrap();

    let err = copy_from_store(&store, &footprint(), &fixture.table, &options()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.step(), Some(MigrationStep::FetchIndex));
}
