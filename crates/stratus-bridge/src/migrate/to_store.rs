//! Local table to store.

use std::fs::{self, File};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use bytes::Bytes;
use stratus_common::constants::{MAX_U24, SCHEMA_ENGINE_OFFSET};
use stratus_common::error::{StratusError, StratusResult};
use stratus_common::types::{BlockNumber, CompressionAlgorithm, FileKind, MigrationStep};
use stratus_store::ObjectStoreClient;
use tracing::{debug, info, warn};

use super::{delete_footprint, read_chunk, CopyOptions, CopyReport, LocalTable};
use crate::address::TableFootprint;
use crate::envelope;
use crate::header::{self, read_capabilities, DescriptorLayout, TableCapabilities};

/// Copies a local table into the store.
///
/// On success the local index and data files are removed; the schema file is
/// left to the caller.
pub fn copy_to_store<C>(
    conn: &C,
    footprint: &TableFootprint,
    local: &LocalTable,
    options: &CopyOptions,
) -> StratusResult<CopyReport>
where
    C: ObjectStoreClient + ?Sized,
{
    let bucket = footprint.bucket();
    let descriptor_name = footprint.descriptor();

    let occupied = conn
        .exists(bucket, descriptor_name.as_str())
        .map_err(|e| StratusError::from(e).in_step(MigrationStep::CheckDestination))?;
    if occupied {
        if !options.force {
            return Err(StratusError::ObjectExists {
                bucket: bucket.to_string(),
                object: descriptor_name.to_string(),
            }
            .in_step(MigrationStep::CheckDestination));
        }
        info!(table = %footprint, "replacing existing table in store");
        delete_footprint(conn, footprint).map_err(|e| e.in_step(MigrationStep::DeleteExisting))?;
    }

    let index_path = local.index_path();
    let mut index_file = open(&index_path).map_err(|e| e.in_step(MigrationStep::ValidateTable))?;
    let caps = read_capabilities(BufReader::new(&index_file), &index_path)
        .and_then(|caps| caps.check_migratable().map(|()| caps))
        .map_err(|e| e.in_step(MigrationStep::ValidateTable))?;
    let (block_size, compression) =
        resolve_settings(&caps, options).map_err(|e| e.in_step(MigrationStep::ValidateTable))?;

    info!(
        table = %footprint,
        block_size,
        %compression,
        "copying table to store"
    );
    let mut report = CopyReport::new(block_size, compression);

    let mut descriptor = read_header(&mut index_file, &index_path, &caps)
        .map_err(|e| e.in_step(MigrationStep::ValidateTable))?;
    header::to_store_format(&mut descriptor, block_size, compression);
    report.descriptor_bytes = descriptor.len() as u64;
    conn.put(bucket, descriptor_name.as_str(), Bytes::from(descriptor))
        .map_err(|e| StratusError::from(e).in_step(MigrationStep::PutDescriptor))?;

    let mut buf = vec![0u8; block_size as usize];
    let index_blocks = BlockWriter {
        conn,
        footprint,
        kind: FileKind::Index,
        compression,
    };
    index_blocks
        .copy(&mut index_file, &index_path, &mut buf, &mut report)
        .map_err(|e| e.in_step(MigrationStep::CopyIndex))?;
    drop(index_file);

    let data_path = local.data_path();
    let mut data_file = open(&data_path).map_err(|e| e.in_step(MigrationStep::CopyData))?;
    let data_blocks = BlockWriter {
        conn,
        footprint,
        kind: FileKind::Data,
        compression,
    };
    data_blocks
        .copy(&mut data_file, &data_path, &mut buf, &mut report)
        .map_err(|e| e.in_step(MigrationStep::CopyData))?;
    drop(data_file);

    report.schema_copied = copy_schema(conn, footprint, &local.schema_path(), block_size)
        .map_err(|e| e.in_step(MigrationStep::CopySchema))?;

    for path in [&index_path, &data_path] {
        fs::remove_file(path)
            .map_err(|e| StratusError::local_io(path, e).in_step(MigrationStep::RemoveLocal))?;
    }

    info!(table = %footprint, %report, "table copied to store");
    Ok(report)
}

fn resolve_settings(
    caps: &TableCapabilities,
    options: &CopyOptions,
) -> StratusResult<(u32, CompressionAlgorithm)> {
    let (requested, compression) =
        options.effective_settings(caps.store_block_size, caps.compression);
    let block_size = caps.align_block_size(requested)?;
    if block_size > MAX_U24 {
        return Err(StratusError::invalid_argument(format!(
            "block size {block_size} does not fit the header field"
        )));
    }
    Ok((block_size, compression))
}

fn open(path: &Path) -> StratusResult<File> {
    File::open(path).map_err(|e| StratusError::local_io(path, e))
}

/// Reads the index header and checks it holds every field the conversion
/// touches.
fn read_header(file: &mut File, path: &Path, caps: &TableCapabilities) -> StratusResult<Vec<u8>> {
    let header_size = usize::try_from(caps.header_size).map_err(|_| {
        StratusError::unsupported(format!("header size {} is too large", caps.header_size))
    })?;
    let mut header = vec![0u8; header_size];
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_exact(&mut header))
        .map_err(|e| StratusError::local_io(path, e))?;
    DescriptorLayout::validate(&header)
        .map_err(|e| StratusError::unsupported(format!("{}: {e}", path.display())))?;
    Ok(header)
}

/// Streams one local file into numbered block objects.
struct BlockWriter<'a, C: ?Sized> {
    conn: &'a C,
    footprint: &'a TableFootprint,
    kind: FileKind,
    compression: CompressionAlgorithm,
}

impl<C> BlockWriter<'_, C>
where
    C: ObjectStoreClient + ?Sized,
{
    /// Copies from the current position of `file` to its end.
    fn copy(
        &self,
        file: &mut File,
        path: &Path,
        buf: &mut [u8],
        report: &mut CopyReport,
    ) -> StratusResult<()> {
        let mut block = BlockNumber::FIRST;
        loop {
            let len = read_chunk(file, buf).map_err(|e| StratusError::local_io(path, e))?;
            if len == 0 {
                break;
            }
            let name = self.footprint.block(self.kind, block);
            let object = envelope::encode(
                Bytes::copy_from_slice(&buf[..len]),
                self.compression.uses_envelope(),
            );
            let stored = object.len();
            self.conn
                .put(self.footprint.bucket(), name.as_str(), object)
                .map_err(StratusError::from)?;
            debug!(object = %name, len, stored, "block stored");
            report.file_mut(self.kind).record(len, stored);

            if len < buf.len() {
                break;
            }
            block = block.next();
        }
        Ok(())
    }
}

/// Stores the schema file when there is one small enough to fit a block.
fn copy_schema<C>(
    conn: &C,
    footprint: &TableFootprint,
    path: &Path,
    block_size: u32,
) -> StratusResult<bool>
where
    C: ObjectStoreClient + ?Sized,
{
    let mut schema = match fs::read(path) {
        Ok(schema) => schema,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(StratusError::local_io(path, e)),
    };
    if schema.len() >= block_size as usize {
        warn!(
            path = %path.display(),
            size = schema.len(),
            block_size,
            "schema file is not smaller than the block size, not copied"
        );
        return Ok(false);
    }
    if schema.len() <= SCHEMA_ENGINE_OFFSET {
        warn!(path = %path.display(), size = schema.len(), "schema file too short, not copied");
        return Ok(false);
    }

    header::mark_store_engine(&mut schema);
    let name = footprint.schema();
    conn.put(footprint.bucket(), name.as_str(), Bytes::from(schema))?;
    debug!(object = %name, "schema stored");
    Ok(true)
}
