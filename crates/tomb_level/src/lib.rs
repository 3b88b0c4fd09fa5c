//! Reader of legacy binary level files.
//!
//! Five generations of the on-disk format are supported (TR1 through TR5,
//! including the TR1 "Unfinished Business" build). The crate is split into:
//!
//!  * [`format`] - extension + signature based format detection
//!  * [`data`] - the format-agnostic intermediate representation, with raw
//!    cross-reference indices still unresolved
//!  * [`decode`] - the version-parameterized section decoders
//!
//! The decode result is *not* a world model; it is handed to `tomb_world`,
//! which resolves indices into owned collections and derives collision.

pub mod data;
pub mod decode;
pub mod error;
pub mod format;
pub mod profile;

mod room;

pub use data::LevelData;
pub use error::LoadError;
pub use format::{detect_format, LevelFormat};

use std::{fs::File, io::BufReader, path::Path};

/// Detects the format of the file at `path` and decodes it into the
/// intermediate representation. Any failure here is fatal, partial decode
/// state is discarded.
pub fn read_level_file(path: &Path) -> Result<(LevelFormat, LevelData), LoadError> {
    let format = format::detect_format(path)?;
    let file = File::open(path).map_err(|e| LoadError::TruncatedFile {
        section: "open",
        offset: 0,
        source: e,
    })?;
    let mut reader = BufReader::new(file);
    let data = decode::read_level(&mut reader, format)?;
    Ok((format, data))
}
