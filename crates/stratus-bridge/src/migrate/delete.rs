//! Footprint deletion.

use std::fmt;

use stratus_common::error::{StratusError, StratusResult};
use stratus_common::types::FileKind;
use stratus_store::{ObjectStoreClient, StoreError};
use tracing::{debug, info, warn};

use crate::address::TableFootprint;

/// Objects removed by a delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Index block objects deleted.
    pub index_objects: u64,
    /// Data block objects deleted.
    pub data_objects: u64,
    /// True if a schema object was deleted.
    pub schema_deleted: bool,
    /// True if the descriptor was deleted.
    pub descriptor_deleted: bool,
}

impl DeleteReport {
    /// Total number of objects deleted.
    pub fn total(&self) -> u64 {
        self.index_objects
            + self.data_objects
            + u64::from(self.schema_deleted)
            + u64::from(self.descriptor_deleted)
    }

    fn count_mut(&mut self, kind: FileKind) -> &mut u64 {
        match kind {
            FileKind::Index => &mut self.index_objects,
            FileKind::Data => &mut self.data_objects,
        }
    }
}

impl fmt::Display for DeleteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} index objects, {} data objects, schema {}, descriptor {}",
            self.index_objects,
            self.data_objects,
            if self.schema_deleted { "deleted" } else { "absent" },
            if self.descriptor_deleted { "deleted" } else { "kept" }
        )
    }
}

/// Failures seen so far; only the first is kept in full.
#[derive(Default)]
struct Failures {
    count: usize,
    first: Option<StratusError>,
}

impl Failures {
    fn push(&mut self, err: StratusError) {
        warn!(error = %err, "delete failure");
        self.count += 1;
        if self.first.is_none() {
            self.first = Some(err);
        }
    }
}

/// Removes every object of a table footprint.
///
/// Block objects go first, then the schema object, and the descriptor last:
/// as long as the descriptor exists the table is still visible in the store.
/// A missing object is not an error. Other failures do not stop the
/// sequence, the descriptor delete included; `IncompleteDelete` then reports
/// how many occurred and the first of them.
pub fn delete_footprint<C>(conn: &C, footprint: &TableFootprint) -> StratusResult<DeleteReport>
where
    C: ObjectStoreClient + ?Sized,
{
    let bucket = footprint.bucket();
    let descriptor = footprint.descriptor();
    if !conn.exists(bucket, descriptor.as_str())? {
        return Err(StratusError::TableNotFound {
            bucket: bucket.to_string(),
            table: footprint.table().clone(),
        });
    }

    info!(table = %footprint, "deleting table from store");
    let mut report = DeleteReport::default();
    let mut failures = Failures::default();

    for kind in [FileKind::Index, FileKind::Data] {
        let prefix = footprint.block_prefix(kind);
        let names = match conn.list_prefix(bucket, &prefix) {
            Ok(names) => names,
            Err(err) => {
                failures.push(err.into());
                continue;
            }
        };
        for name in names {
            match conn.delete(bucket, &name) {
                Ok(()) => {
                    *report.count_mut(kind) += 1;
                    debug!(object = %name, "deleted");
                }
                Err(err) if err.is_not_found() => debug!(object = %name, "already gone"),
                Err(err) => failures.push(err.into()),
            }
        }
    }

    let schema = footprint.schema();
    match conn.delete(bucket, schema.as_str()) {
        Ok(()) => report.schema_deleted = true,
        Err(err) if err.is_not_found() => {}
        Err(err) => failures.push(err.into()),
    }

    match conn.delete(bucket, descriptor.as_str()) {
        Ok(()) | Err(StoreError::NotFound { .. }) => report.descriptor_deleted = true,
        Err(err) => failures.push(err.into()),
    }

    if let Some(first) = failures.first {
        return Err(StratusError::IncompleteDelete {
            table: footprint.table().clone(),
            failures: failures.count,
            first: Box::new(first),
        });
    }

    info!(table = %footprint, objects = report.total(), "table deleted from store");
    Ok(report)
}
