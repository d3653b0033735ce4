//! Error types for archive and map decoding.

use thiserror::Error;

/// Result alias used by every decoder in this crate.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Errors that can occur while decoding archives, maps and models.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The byte source ended before the expected data.
    #[error("truncated input: needed {needed} bytes at offset {offset}, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// The archive header carries a version this decoder does not support.
    #[error("unsupported archive version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The data does not follow the expected layout.
    #[error("invalid format: {0}")]
    InvalidFormat(#[from] InvalidFormat),

    /// A row refers to a table entry that does not exist.
    #[error("unresolved {kind} reference {index}")]
    UnresolvedReference { kind: ReferenceKind, index: u32 },

    /// A model name is absent from the archive's model catalog.
    #[error("missing asset: {0}")]
    MissingAsset(String),

    /// Reading a file from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Whether the error only affects a single row and the load can go on
    /// without it.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedReference { .. } | Self::MissingAsset(_)
        )
    }

    pub(crate) fn unresolved(kind: ReferenceKind, index: impl Into<u32>) -> Self {
        Self::UnresolvedReference {
            kind,
            index: index.into(),
        }
    }
}

/// The specific way in which a file failed to match its format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidFormat {
    #[error("bad map signature {0:?}")]
    Signature([u8; 4]),

    #[error("unsupported map version {found} (expected {expected})")]
    MapVersion { found: u32, expected: u32 },

    #[error("unknown map item type tag {tag:#x} in record {record}")]
    UnknownItemTag { tag: u32, record: u32 },

    #[error("more than {max} terrain cells")]
    TooManyTerrainCells { max: usize },

    #[error("{table} table is not terminated within {max} entries")]
    UnterminatedTable { table: &'static str, max: usize },

    #[error("debug name table count {count} exceeds {total}")]
    DebugTableCount { count: u32, total: u32 },
}

/// What an unresolved reference was pointing at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Bitmap,
    TexturePage,
    TextureDef,
    BlockDef,
    ModelName,
    ModelVertex,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bitmap => "bitmap",
            Self::TexturePage => "texture page",
            Self::TextureDef => "texture definition",
            Self::BlockDef => "block definition",
            Self::ModelName => "model name",
            Self::ModelVertex => "model vertex",
        };
        f.write_str(name)
    }
}
