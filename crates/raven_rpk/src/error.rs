//! Error types that can be emitted from this library

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// the input directory does not exist
    #[error("input {0} does not exist")]
    InputMissing(PathBuf),

    /// the input path is not a directory
    #[error("input {0} is not a directory")]
    InputNotDirectory(PathBuf),

    /// the output target already exists
    #[error("output {0} already exists")]
    OutputExists(PathBuf),

    /// a directory holds more children than a header can count
    #[error("directory '{name}' holds {count} entries, at most 65535 are allowed")]
    TooManyEntries {
        /// Name of the offending directory, empty for the archive root
        name: String,
        /// Number of immediate children
        count: usize,
    },

    /// the archive would not contain a single entry
    #[error("archive would contain no entries")]
    EmptyArchive,

    /// the archive does not exist
    #[error("archive {0} does not exist")]
    ArchiveMissing(PathBuf),

    /// the archive path points at a directory
    #[error("archive {0} is a directory")]
    InputIsDirectory(PathBuf),

    /// file is not a raven package
    #[error("file is not a raven package")]
    NotAnArchive,

    /// the version byte is not one this library can read
    #[error("unsupported package version {0}")]
    UnsupportedVersion(u8),

    /// a logical path could not be used
    #[error("invalid path")]
    InvalidPath(#[from] InvalidPathError),

    /// unable to find requested entry
    #[error("unable to find requested entry {0}")]
    PathNotFound(String),

    /// the archive structure is inconsistent
    #[error("archive is corrupt: {0}")]
    CorruptArchive(String),

    /// an entry name does not fit into the one byte length field
    #[error("entry name '{0}' is longer than 255 bytes")]
    NameTooLong(String),

    /// two entries with the same name were added to one directory
    #[error("entry '{0}' already exists")]
    DuplicateEntry(String),

    /// the content of an entry could not be read while writing
    #[error("unable to read entry '{name}'")]
    EntryIo {
        /// Logical name of the entry
        name: String,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// the content of an entry shrank after it was measured
    #[error("entry '{name}' provided {actual} bytes, expected {expected}")]
    LengthMismatch {
        /// Logical name of the entry
        name: String,
        /// Length recorded in the index
        expected: u64,
        /// Bytes that could actually be read
        actual: u64,
    },
}

/// Error type to provide further information when a path is invalid
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum InvalidPathError {
    /// segment {0} is longer than 255 bytes
    #[error("segment '{0}' is longer than 255 bytes")]
    SegmentTooLong(String),

    /// segment {0} is reserved
    #[error("segment '{0}' is reserved")]
    Reserved(String),

    /// segment contains a NUL byte
    #[error("segment '{0}' contains a NUL byte")]
    Nul(String),

    /// the path does not name an entry
    #[error("path does not name an entry")]
    Root,
}

/// Outcome kind of an archive operation
///
/// Every [`Error`] maps onto exactly one status, which is what callers such as the CLI report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    InputMissing,
    InputNotDirectory,
    OutputExists,
    IoError,
    TooManyEntries,
    EmptyArchive,
    ArchiveMissing,
    InputIsDirectory,
    NotAnArchive,
    UnsupportedVersion,
    InvalidPath,
    PathNotFound,
    CorruptArchive,
}

impl Error {
    /// The status kind this error reports as
    pub fn status(&self) -> Status {
        match self {
            Error::IOError(_) | Error::EntryIo { .. } | Error::LengthMismatch { .. } => {
                Status::IoError
            }
            Error::InputMissing(_) => Status::InputMissing,
            Error::InputNotDirectory(_) => Status::InputNotDirectory,
            Error::OutputExists(_) => Status::OutputExists,
            Error::TooManyEntries { .. } => Status::TooManyEntries,
            Error::EmptyArchive => Status::EmptyArchive,
            Error::ArchiveMissing(_) => Status::ArchiveMissing,
            Error::InputIsDirectory(_) => Status::InputIsDirectory,
            Error::NotAnArchive => Status::NotAnArchive,
            Error::UnsupportedVersion(_) => Status::UnsupportedVersion,
            Error::InvalidPath(_) | Error::NameTooLong(_) | Error::DuplicateEntry(_) => {
                Status::InvalidPath
            }
            Error::PathNotFound(_) => Status::PathNotFound,
            Error::CorruptArchive(_) => Status::CorruptArchive,
        }
    }

    /// Treat a short read as a truncated archive rather than an I/O failure
    pub(crate) fn from_read(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::CorruptArchive("unexpected end of archive".into())
        } else {
            Error::IOError(error)
        }
    }
}

impl From<binrw::Error> for Error {
    fn from(error: binrw::Error) -> Self {
        match error {
            binrw::Error::Io(e) => Error::from_read(e),
            // Field errors arrive wrapped in a backtrace
            other => match other.root_cause() {
                binrw::Error::BadMagic { .. } => Error::NotAnArchive,
                binrw::Error::Io(e) => {
                    Error::from_read(std::io::Error::new(e.kind(), e.to_string()))
                }
                _ => Error::CorruptArchive(other.to_string()),
            },
        }
    }
}

/// Status of a whole operation result
pub fn status_of<T>(result: &Result<T>) -> Status {
    match result {
        Ok(_) => Status::Ok,
        Err(e) => e.status(),
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use std::io;

    use crate::error::{status_of, Error, InvalidPathError, Result, Status};

    #[test]
    fn truncated_reads_are_corruption() {
        let error = Error::from_read(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert_eq!(error.status(), Status::CorruptArchive);

        let error = Error::from_read(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(error.status(), Status::IoError);
    }

    #[test]
    fn construction_errors_report_invalid_path() {
        assert_eq!(
            Error::NameTooLong("x".repeat(256)).status(),
            Status::InvalidPath
        );
        assert_eq!(
            Error::from(InvalidPathError::Root).status(),
            Status::InvalidPath
        );
    }

    #[test]
    fn ok_results_report_ok() {
        let ok: Result<()> = Ok(());
        assert_eq!(status_of(&ok), Status::Ok);

        let err: Result<()> = Err(Error::EmptyArchive);
        assert_eq!(status_of(&err), Status::EmptyArchive);
    }
}
