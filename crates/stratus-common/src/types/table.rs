//! Table identity and file classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::NAME_SEPARATOR;
use crate::error::{StratusError, StratusResult};

/// Identity of a table inside a bucket: `(database, table)`.
///
/// Both names become object-name path segments, so they must be non-empty
/// and must not contain the name separator.
///
/// # Example
///
/// ```rust
/// use stratus_common::types::TableId;
///
/// let id = TableId::new("shop", "orders").unwrap();
/// assert_eq!(id.database(), "shop");
/// assert!(TableId::new("shop", "a/b").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId {
    database: String,
    table: String,
}

impl TableId {
    /// Creates a table identity, validating both names.
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> StratusResult<Self> {
        let database = database.into();
        let table = table.into();
        validate_segment("database", &database)?;
        validate_segment("table", &table)?;
        Ok(Self { database, table })
    }

    /// Returns the database name.
    #[inline]
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Returns the table name.
    #[inline]
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

fn validate_segment(what: &str, name: &str) -> StratusResult<()> {
    if name.is_empty() {
        return Err(StratusError::invalid_argument(format!(
            "{what} name must not be empty"
        )));
    }
    if name.contains(NAME_SEPARATOR) {
        return Err(StratusError::invalid_argument(format!(
            "{what} name '{name}' must not contain '{NAME_SEPARATOR}'"
        )));
    }
    Ok(())
}

impl fmt::Debug for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({}.{})", self.database, self.table)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// Which local file a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// The index file (blocks start after the header).
    Index,
    /// The data file (blocks start at offset 0).
    Data,
}

impl FileKind {
    /// Returns the object-name segment for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = StratusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "index" => Ok(Self::Index),
            "data" => Ok(Self::Data),
            other => Err(StratusError::invalid_argument(format!(
                "unknown file kind '{other}', expected 'index' or 'data'"
            ))),
        }
    }
}

/// Table-level compression setting, recorded in the header as one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CompressionAlgorithm {
    /// Blocks are stored without an envelope.
    #[default]
    None = 0,
    /// Blocks carry an envelope and may be zlib-compressed.
    Zlib = 1,
}

impl CompressionAlgorithm {
    /// Returns the header byte for this algorithm.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a header byte.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Zlib),
            _ => None,
        }
    }

    /// Returns true if blocks of this table carry a compression envelope.
    #[inline]
    #[must_use]
    pub const fn uses_envelope(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Zlib => f.write_str("zlib"),
        }
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = StratusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "zlib" => Ok(Self::Zlib),
            other => Err(StratusError::invalid_argument(format!(
                "unknown compression algorithm '{other}', expected 'none' or 'zlib'"
            ))),
        }
    }
}

/// Steps of the migration and delete state machines, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationStep {
    /// Checking whether the destination is free.
    CheckDestination,
    /// Reading and validating the local table header.
    ValidateTable,
    /// Writing the descriptor object.
    PutDescriptor,
    /// Copying index blocks to the store.
    CopyIndex,
    /// Copying data blocks to the store.
    CopyData,
    /// Copying the schema file to the store.
    CopySchema,
    /// Removing local files after a successful copy.
    RemoveLocal,
    /// Fetching the descriptor object.
    FetchDescriptor,
    /// Fetching index blocks.
    FetchIndex,
    /// Fetching data blocks.
    FetchData,
    /// Fetching the schema object.
    FetchSchema,
    /// Deleting the previous footprint before a forced copy.
    DeleteExisting,
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CheckDestination => "check destination",
            Self::ValidateTable => "validate table",
            Self::PutDescriptor => "put descriptor",
            Self::CopyIndex => "copy index blocks",
            Self::CopyData => "copy data blocks",
            Self::CopySchema => "copy schema",
            Self::RemoveLocal => "remove local files",
            Self::FetchDescriptor => "fetch descriptor",
            Self::FetchIndex => "fetch index blocks",
            Self::FetchData => "fetch data blocks",
            Self::FetchSchema => "fetch schema",
            Self::DeleteExisting => "delete existing footprint",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_table_id_validation() {
        assert!(TableId::new("db", "t").is_ok());
        assert_eq!(
            TableId::new("", "t").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert!(TableId::new("db", "").is_err());
        assert!(TableId::new("a/b", "t").is_err());
    }

    #[test]
    fn test_table_id_display() {
        let id = TableId::new("shop", "orders").unwrap();
        assert_eq!(id.to_string(), "shop.orders");
        assert_eq!(format!("{id:?}"), "TableId(shop.orders)");
    }

    #[test]
    fn test_file_kind() {
        assert_eq!(FileKind::Index.as_str(), "index");
        assert_eq!("data".parse::<FileKind>().unwrap(), FileKind::Data);
        assert!("frm".parse::<FileKind>().is_err());
    }

    #[test]
    fn test_compression_algorithm() {
        assert_eq!(CompressionAlgorithm::from_u8(0), Some(CompressionAlgorithm::None));
        assert_eq!(CompressionAlgorithm::from_u8(1), Some(CompressionAlgorithm::Zlib));
        assert_eq!(CompressionAlgorithm::from_u8(2), None);
        assert!(CompressionAlgorithm::Zlib.uses_envelope());
        assert!(!CompressionAlgorithm::None.uses_envelope());
        assert_eq!("ZLIB".parse::<CompressionAlgorithm>().unwrap(), CompressionAlgorithm::Zlib);
        assert_eq!(CompressionAlgorithm::default(), CompressionAlgorithm::None);
    }
}
