use std::io;
use thiserror::Error;

/// Fatal level loading errors. Any of these aborts the load; the caller keeps
/// whatever world was active before.
///
/// Recoverable conditions (dangling references, unknown floor-data opcodes,
/// underivable sector geometry) are *not* errors - they are accumulated as
/// warnings by the world builder and returned alongside a successful world.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unrecognized level format")]
    UnrecognizedFormat,

    #[error("truncated level file in section {section} at offset {offset:#x}: {source}")]
    TruncatedFile {
        section: &'static str,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("malformed {section} record at offset {offset:#x}: {detail}")]
    MalformedRecord {
        section: &'static str,
        offset: u64,
        detail: String,
    },
}

impl LoadError {
    /// Converts an arbitrary decode failure into the typed taxonomy, keeping
    /// the section name and file offset for diagnostics. An unexpected EOF
    /// anywhere in the chain means the file ended mid-record.
    pub fn from_decode(section: &'static str, offset: u64, error: anyhow::Error) -> Self {
        match error.downcast::<io::Error>() {
            Ok(io_error) if io_error.kind() == io::ErrorKind::UnexpectedEof => {
                LoadError::TruncatedFile {
                    section,
                    offset,
                    source: io_error,
                }
            }
            Ok(io_error) => LoadError::MalformedRecord {
                section,
                offset,
                detail: io_error.to_string(),
            },
            Err(other) => LoadError::MalformedRecord {
                section,
                offset,
                detail: other.to_string(),
            },
        }
    }
}
