//! Subcommand execution.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use stratus_bridge::{
    copy_from_store, copy_to_store, delete_footprint, BlockFetcher, CopyOptions, LocalTable,
    TableFootprint,
};
use stratus_common::config::StoreBackend;
use stratus_common::types::{BlockNumber, FileKind, TableId};
use stratus_common::{ErrorKind, StratusError};
use stratus_store::{AnyConnector, Connector, ObjectStoreClient};
use tracing::info;

use crate::config::CliConfig;
use crate::Command;

/// Runs one subcommand.
pub fn execute(config: &CliConfig, command: Command) -> Result<()> {
    if let Command::Config { save } = &command {
        return show_config(config, save.as_deref());
    }

    check_backend(config, &command)?;

    let connector = AnyConnector::from_config(&config.bridge.store)
        .context("cannot set up the object store")?;
    let conn = connector
        .connect()
        .context("cannot connect to the object store")?;
    let bucket = config.bridge.store.bucket.as_str();

    match command {
        Command::CopyTo {
            table,
            force,
            block_size,
            compression,
        } => {
            let footprint = TableFootprint::new(bucket, table.table_id()?);
            let local = LocalTable::new(table.local_base(config));
            let mut options = CopyOptions::new(&config.bridge).force(force);
            if let Some(size) = block_size {
                options = options.block_size(size);
            }
            if let Some(compression) = compression {
                options = options.compression(compression.into());
            }

            let report = copy_to_store(&conn, &footprint, &local, &options)
                .with_context(|| format!("copy of {} to the store failed", footprint))?;
            println!("{footprint}: {report}");
        }

        Command::CopyFrom { table, force } => {
            let footprint = TableFootprint::new(bucket, table.table_id()?);
            let local = LocalTable::new(table.local_base(config));
            let options = CopyOptions::new(&config.bridge).force(force);

            let report = copy_from_store(&conn, &footprint, &local, &options)
                .with_context(|| format!("copy of {} from the store failed", footprint))?;
            println!("{footprint}: {report}");
        }

        Command::Delete { database, table } => {
            let footprint = TableFootprint::new(bucket, TableId::new(database, table)?);
            let report = delete_footprint(&conn, &footprint)
                .with_context(|| format!("delete of {footprint} failed"))?;
            println!("{footprint}: {report}");
        }

        Command::Ls { database, table } => {
            let prefix = list_prefix(database.as_deref(), table.as_deref())?;
            let names = conn
                .list_prefix(bucket, &prefix)
                .with_context(|| format!("cannot list {bucket}:{prefix}"))?;
            for line in summarize(&names) {
                println!("{line}");
            }
        }

        Command::Fetch {
            database,
            table,
            kind,
            block,
            output,
        } => {
            let footprint = TableFootprint::new(bucket, TableId::new(database, table)?);
            let kind = FileKind::from(kind);
            let block = BlockNumber::new(block);
            if !block.is_valid() {
                anyhow::bail!("block numbers start at 1");
            }

            let fetcher = BlockFetcher::open(&conn, footprint)?;
            let bytes = fetcher.read_block(&conn, kind, block)?;
            let name = fetcher.footprint().block(kind, block);
            match output {
                Some(path) => {
                    std::fs::write(&path, &bytes)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    info!(object = %name, path = %path.display(), "block written");
                    println!("{name}: {} bytes written to {}", bytes.len(), path.display());
                }
                None => println!("{name}: {} bytes, {}", bytes.len(), fetcher.stats()),
            }
        }

        Command::Config { .. } => {}
    }

    Ok(())
}

/// Rejects commands that would lose a table on a store that dies with the
/// process.
fn check_backend(config: &CliConfig, command: &Command) -> Result<()> {
    let destructive = match command {
        Command::CopyTo { .. } => Some("copy-to"),
        Command::Delete { .. } => Some("delete"),
        _ => None,
    };
    match (&config.bridge.store.backend, destructive) {
        (StoreBackend::Memory, Some(name)) => Err(StratusError::invalid_argument(format!(
            "{name} needs a persistent store; the memory backend is discarded on exit"
        ))
        .into()),
        _ => Ok(()),
    }
}

fn show_config(config: &CliConfig, save: Option<&Path>) -> Result<()> {
    if let Some(path) = CliConfig::default_config_path() {
        println!("# default location: {}", path.display());
    }
    print!("{}", toml::to_string_pretty(config)?);
    if let Some(path) = save {
        config.save(path)?;
        println!("# saved to {}", path.display());
    }
    Ok(())
}

/// Listing prefix for an optional database and table.
fn list_prefix(database: Option<&str>, table: Option<&str>) -> Result<String> {
    match (database, table) {
        (None, None) => Ok(String::new()),
        (Some(db), None) => Ok(format!("{db}/")),
        (Some(db), Some(table)) => {
            let id = TableId::new(db, table)?;
            Ok(format!("{}/{}/", id.database(), id.table()))
        }
        (None, Some(_)) => anyhow::bail!("a table needs a database"),
    }
}

/// One line per table: descriptor, block counts per kind and schema.
fn summarize(names: &[String]) -> Vec<String> {
    #[derive(Default)]
    struct Entry {
        descriptor: bool,
        schema: bool,
        index: usize,
        data: usize,
        other: usize,
    }

    let mut tables: BTreeMap<(&str, &str), Entry> = BTreeMap::new();
    let mut stray = Vec::new();
    for name in names {
        let mut parts = name.splitn(3, '/');
        let (Some(db), Some(table), Some(rest)) = (parts.next(), parts.next(), parts.next()) else {
            stray.push(name.clone());
            continue;
        };
        let entry = tables.entry((db, table)).or_default();
        match rest {
            "aria" => entry.descriptor = true,
            "frm" => entry.schema = true,
            r if r.starts_with("index/") => entry.index += 1,
            r if r.starts_with("data/") => entry.data += 1,
            _ => entry.other += 1,
        }
    }

    let mut lines: Vec<String> = tables
        .into_iter()
        .map(|((db, table), e)| {
            let mut line = format!(
                "{db}.{table}: {} index blocks, {} data blocks, schema {}",
                e.index,
                e.data,
                if e.schema { "yes" } else { "no" }
            );
            if !e.descriptor {
                line.push_str(", no descriptor");
            }
            if e.other > 0 {
                line.push_str(&format!(", {} other objects", e.other));
            }
            line
        })
        .collect();
    lines.extend(stray);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_prefix() {
        assert_eq!(list_prefix(None, None).unwrap(), "");
        assert_eq!(list_prefix(Some("shop"), None).unwrap(), "shop/");
        assert_eq!(list_prefix(Some("shop"), Some("orders")).unwrap(), "shop/orders/");
        assert!(list_prefix(None, Some("orders")).is_err());
        assert!(list_prefix(Some("shop"), Some("a/b")).is_err());
    }

    #[test]
    fn test_summarize() {
        let names: Vec<String> = [
            "shop/orders/aria",
            "shop/orders/data/000001",
            "shop/orders/frm",
            "shop/orders/index/000001",
            "shop/orders/index/000002",
            "shop/users/index/000001",
            "loose",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let lines = summarize(&names);
        assert_eq!(
            lines,
            vec![
                "shop.orders: 2 index blocks, 1 data blocks, schema yes".to_string(),
                "shop.users: 1 index blocks, 0 data blocks, schema no, no descriptor".to_string(),
                "loose".to_string(),
            ]
        );
    }

    fn kind_of(err: &anyhow::Error) -> Option<ErrorKind> {
        err.downcast_ref::<StratusError>().map(StratusError::kind)
    }

    #[test]
    fn test_memory_backend_refuses_copy_to_and_delete() {
        let dir = tempfile::TempDir::new().unwrap();
        let base = dir.path().join("orders");
        std::fs::write(base.with_extension("MAI"), b"index").unwrap();
        std::fs::write(base.with_extension("MAD"), b"data").unwrap();

        let mut config = CliConfig::default();
        config.bridge.store.backend = StoreBackend::Memory;

        let err = execute(
            &config,
            Command::CopyTo {
                table: crate::TableArgs {
                    database: "shop".to_string(),
                    table: "orders".to_string(),
                    path: Some(base.clone()),
                },
                force: false,
                block_size: None,
                compression: None,
            },
        )
        .unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::InvalidArgument));
        assert!(err.to_string().contains("copy-to"));
        assert!(base.with_extension("MAI").exists());
        assert!(base.with_extension("MAD").exists());

        let err = execute(
            &config,
            Command::Delete {
                database: "shop".to_string(),
                table: "orders".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn test_memory_backend_allows_reads() {
        let mut config = CliConfig::default();
        config.bridge.store.backend = StoreBackend::Memory;

        let err = execute(
            &config,
            Command::Fetch {
                database: "shop".to_string(),
                table: "orders".to_string(),
                kind: crate::FileKindArg::Data,
                block: 1,
                output: None,
            },
        )
        .unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::NotFound));

        execute(
            &config,
            Command::Ls {
                database: None,
                table: None,
            },
        )
        .unwrap();
    }
}
