//! Block fetch tests against stored tables.

use std::io;
use std::thread;

use bytes::Bytes;
use stratus_bridge::{copy_to_store, BigBlockRead, BlockFetcher, CopyOptions, TableFootprint};
use stratus_common::types::{BlockNumber, CompressionAlgorithm, FileKind, PageNumber, TableId};
use stratus_common::ErrorKind;
use stratus_store::{Connector, MemoryStore, ObjectStoreClient};
use stratus_test::{LocalFixture, TableBuilder};
use tempfile::TempDir;

const BUCKET: &str = "tables";

fn footprint() -> TableFootprint {
    TableFootprint::new(BUCKET, TableId::new("shop", "orders").unwrap())
}

fn stored_table(store: &MemoryStore, compression: CompressionAlgorithm) -> LocalFixture {
    let dir = TempDir::new().unwrap();
    let fixture = TableBuilder::new()
        .compressible(true)
        .write(dir.path(), "orders");
    let options = CopyOptions::default()
        .block_size(1024)
        .compression(compression);
    copy_to_store(store, &footprint(), &fixture.table, &options).unwrap();
    fixture
}

#[test]
fn test_fetch_pages_after_copy() {
    for compression in [CompressionAlgorithm::None, CompressionAlgorithm::Zlib] {
        let store = MemoryStore::new();
        let fixture = stored_table(&store, compression);

        let fetcher = BlockFetcher::open(&store, footprint()).unwrap();
        assert_eq!(fetcher.compression(), compression);
        let index = fetcher.geometry(FileKind::Index);
        assert_eq!(index.head_blocks, 1);
        assert_eq!(index.page_shift, 10);
        assert_eq!(index.pages_per_block(), 1);

        // Index page 0 is the header; pages 1, 2 and 3 are blocks 1, 2 and 3.
        for (page, start) in [(1, 1024), (2, 2048), (3, 3072)] {
            let bytes = fetcher
                .fetch_block(&store, FileKind::Index, PageNumber::new(page))
                .unwrap();
            assert_eq!(&bytes[..], &fixture.index[start..start + 1024]);
        }
        for (page, start) in [(0, 0), (1, 1024)] {
            let bytes = fetcher
                .fetch_block(&store, FileKind::Data, PageNumber::new(page))
                .unwrap();
            assert_eq!(&bytes[..], &fixture.data[start..start + 1024]);
        }

        let stats = fetcher.stats();
        assert_eq!(stats.requests(), 5);
        assert_eq!(stats.objects_read(), 5);
        assert_eq!(stats.bytes_returned(), 5 * 1024);
        assert_eq!(stats.failures(), 0);
        if compression == CompressionAlgorithm::Zlib {
            assert!(stats.bytes_stored() < stats.bytes_returned());
        }
    }
}

#[test]
fn test_read_block_by_number() {
    let store = MemoryStore::new();
    let fixture = stored_table(&store, CompressionAlgorithm::Zlib);
    let fetcher = BlockFetcher::open(&store, footprint()).unwrap();

    let bytes = fetcher
        .read_block(&store, FileKind::Index, BlockNumber::new(3))
        .unwrap();
    assert_eq!(&bytes[..], &fixture.index[3072..]);
    assert_eq!(
        fetcher.geometry(FileKind::Index).first_page(BlockNumber::new(3)),
        PageNumber::new(3)
    );
}

#[test]
fn test_concurrent_misses_use_own_connections() {
    let store = MemoryStore::new();
    let fixture = stored_table(&store, CompressionAlgorithm::Zlib);
    let fetcher = BlockFetcher::open(&store, footprint()).unwrap();

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let conn = store.connect().unwrap();
                for (page, start) in [(0u64, 0usize), (1, 1024)] {
                    let bytes = fetcher
                        .read_big_block(&conn, FileKind::Data, PageNumber::new(page))
                        .unwrap();
                    assert_eq!(&bytes[..], &fixture.data[start..start + 1024]);
                }
            });
        }
    });

    assert_eq!(fetcher.stats().requests(), 8);
    assert_eq!(fetcher.stats().objects_read(), 8);
}

#[test]
fn test_failures_reach_the_cache_as_io_errors() {
    let store = MemoryStore::new();
    stored_table(&store, CompressionAlgorithm::Zlib);
    let fetcher = BlockFetcher::open(&store, footprint()).unwrap();

    store.delete(BUCKET, "shop/orders/data/000002").unwrap();
    let err = fetcher
        .read_big_block(&store, FileKind::Data, PageNumber::new(1))
        .unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::Other);

    store
        .put(BUCKET, "shop/orders/data/000001", Bytes::from_static(&[1, 0, 4, 0, 9]))
        .unwrap();
    let err = fetcher
        .fetch_block(&store, FileKind::Data, PageNumber::new(0))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);
    assert_eq!(fetcher.stats().failures(), 2);
}

#[test]
fn test_open_local_format_descriptor() {
    let store = MemoryStore::new();
    let header = TableBuilder::new().header();
    store
        .put(BUCKET, "shop/orders/aria", Bytes::from(header))
        .unwrap();

    let err = BlockFetcher::open(&store, footprint()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);
}
