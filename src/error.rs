use std::io;
use std::path::PathBuf;
use thiserror::Error;

//===========================================================================//

/// Errors raised while extracting icons.
///
/// Only [`Error::ModuleLoadFailed`] is fatal to a whole extraction run, and
/// even that one is reported by the extractor as an absent result rather
/// than as an error.  The others are confined to the single candidate (or
/// group) they were raised for.
#[derive(Debug, Error)]
pub enum Error {
    /// The module or file could not be opened by the resource provider.
    #[error("Failed to load module {path:?}: {reason}")]
    ModuleLoadFailed {
        /// The path that was being opened.
        path: PathBuf,
        /// Why it could not be opened.
        reason: String,
    },

    /// A group directory entry names an icon resource that does not exist.
    #[error("Icon resource {0} not found")]
    IconResourceNotFound(u16),

    /// A fixed-size record ran off the end of its buffer.
    #[error(
        "Truncated buffer (needed {needed} bytes at offset {offset}, \
         but only {available} available)"
    )]
    TruncatedBuffer {
        /// Where the record was supposed to start.
        offset: usize,
        /// How many bytes the record needs.
        needed: usize,
        /// How many bytes were left from `offset`.
        available: usize,
    },

    /// A numeric type hint that is neither a raw image nor a PNG.
    #[error("Unsupported icon type hint ({0})")]
    UnsupportedTypeHint(u8),

    /// An underlying I/O or format error.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A specialized `Result` type for icon extraction.
pub type Result<T> = std::result::Result<T, Error>;

//===========================================================================//


//===========================================================================//
