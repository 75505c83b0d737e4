//! Store to local table.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use stratus_common::constants::SCHEMA_ENGINE_OFFSET;
use stratus_common::error::{StratusError, StratusResult};
use stratus_common::types::{BlockNumber, CompressionAlgorithm, FileKind, MigrationStep};
use stratus_store::ObjectStoreClient;
use tracing::{debug, info};

use super::{CopyOptions, CopyReport, LocalTable};
use crate::address::TableFootprint;
use crate::envelope;
use crate::header::{self, DescriptorLayout};

/// Recreates a local table from its store footprint.
///
/// Blocks are fetched in order until the file lengths recorded in the
/// descriptor are reached. A failure leaves partially written files behind.
pub fn copy_from_store<C>(
    conn: &C,
    footprint: &TableFootprint,
    local: &LocalTable,
    options: &CopyOptions,
) -> StratusResult<CopyReport>
where
    C: ObjectStoreClient + ?Sized,
{
    let index_path = local.index_path();
    if !options.force && index_path.exists() {
        return Err(StratusError::LocalFileExists { path: index_path }
            .in_step(MigrationStep::CheckDestination));
    }

    let bucket = footprint.bucket();
    let mut descriptor = conn
        .get(bucket, footprint.descriptor().as_str())
        .map_err(|err| {
            if err.is_not_found() {
                StratusError::TableNotFound {
                    bucket: bucket.to_string(),
                    table: footprint.table().clone(),
                }
            } else {
                err.into()
            }
        })
        .map_err(|e| e.in_step(MigrationStep::FetchDescriptor))?
        .to_vec();
    let layout = DescriptorLayout::validate(&descriptor)
        .map_err(|e| e.in_step(MigrationStep::FetchDescriptor))?;

    info!(
        table = %footprint,
        index_length = layout.index_length,
        data_length = layout.data_length,
        compression = %layout.compression,
        "copying table from store"
    );
    let mut report = CopyReport::new(layout.store_block_size, layout.compression);
    report.descriptor_bytes = descriptor.len() as u64;

    header::to_local_format(&mut descriptor);
    let mut index_file = create(&index_path).map_err(|e| e.in_step(MigrationStep::FetchIndex))?;
    index_file
        .write_all(&descriptor)
        .map_err(|e| StratusError::local_io(&index_path, e).in_step(MigrationStep::FetchIndex))?;

    let reader = BlockReader {
        conn,
        footprint,
        compression: layout.compression,
    };
    reader
        .copy(
            FileKind::Index,
            &mut index_file,
            &index_path,
            descriptor.len() as u64,
            layout.index_length,
            &mut report,
        )
        .and_then(|()| flush(index_file, &index_path))
        .map_err(|e| e.in_step(MigrationStep::FetchIndex))?;

    let data_path = local.data_path();
    let mut data_file = create(&data_path).map_err(|e| e.in_step(MigrationStep::FetchData))?;
    reader
        .copy(
            FileKind::Data,
            &mut data_file,
            &data_path,
            0,
            layout.data_length,
            &mut report,
        )
        .and_then(|()| flush(data_file, &data_path))
        .map_err(|e| e.in_step(MigrationStep::FetchData))?;

    report.schema_copied = fetch_schema(conn, footprint, &local.schema_path())
        .map_err(|e| e.in_step(MigrationStep::FetchSchema))?;

    info!(table = %footprint, %report, "table copied from store");
    Ok(report)
}

fn create(path: &Path) -> StratusResult<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| StratusError::local_io(path, e))
}

fn flush(file: BufWriter<File>, path: &Path) -> StratusResult<()> {
    file.into_inner()
        .map_err(|e| e.into_error())
        .and_then(|f| f.sync_all())
        .map_err(|e| StratusError::local_io(path, e))
}

struct BlockReader<'a, C: ?Sized> {
    conn: &'a C,
    footprint: &'a TableFootprint,
    compression: CompressionAlgorithm,
}

impl<C> BlockReader<'_, C>
where
    C: ObjectStoreClient + ?Sized,
{
    /// Appends blocks 1.. of `kind` to `out` until it holds `end` bytes.
    fn copy<W: Write>(
        &self,
        kind: FileKind,
        out: &mut W,
        path: &Path,
        start: u64,
        end: u64,
        report: &mut CopyReport,
    ) -> StratusResult<()> {
        let mut written = start;
        let mut block = BlockNumber::FIRST;
        while written < end {
            let name = self.footprint.block(kind, block);
            let raw = self.conn.get(self.footprint.bucket(), name.as_str())?;
            let stored = raw.len();
            let bytes = envelope::decode(raw, self.compression.uses_envelope())
                .map_err(|e| StratusError::corruption(format!("{name}: {e}")))?;
            if bytes.is_empty() {
                return Err(StratusError::corruption(format!(
                    "{name} is empty at offset {written} of {end}"
                )));
            }

            out.write_all(&bytes)
                .map_err(|e| StratusError::local_io(path, e))?;
            written += bytes.len() as u64;
            report.file_mut(kind).record(bytes.len(), stored);
            debug!(object = %name, size = bytes.len(), written, "block fetched");
            block = block.next();
        }
        Ok(())
    }
}

fn fetch_schema<C>(conn: &C, footprint: &TableFootprint, path: &Path) -> StratusResult<bool>
where
    C: ObjectStoreClient + ?Sized,
{
    let name = footprint.schema();
    let mut schema = match conn.get(footprint.bucket(), name.as_str()) {
        Ok(bytes) => bytes.to_vec(),
        Err(err) if err.is_not_found() => return Ok(false),
        Err(err) => return Err(err.into()),
    };
    if schema.len() <= SCHEMA_ENGINE_OFFSET {
        return Err(StratusError::corruption(format!(
            "{name} is only {} bytes",
            schema.len()
        )));
    }

    header::mark_local_engine(&mut schema);
    fs::write(path, &schema).map_err(|e| StratusError::local_io(path, e))?;
    debug!(object = %name, "schema restored");
    Ok(true)
}
