//! This library handles reading from and creating **RPK** packages used by the *Raven* engine.
//!
//! # RPK Package Format Documentation
//!
//! An RPK package bundles a tree of files and directories into a single file. Data is stored
//! uncompressed, and every entry knows the absolute offsets of its content, so a single file can
//! be found and streamed out without reading anything else. Packages are typically identified
//! with the `.rpk` extension.
//!
//! ## File Structure
//!
//! A package starts with a short prelude, followed by the header of the root directory. Every
//! directory header is immediately followed by the bytes of its files and then by its
//! subdirectories, each of which repeats the same layout.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic                  | 14 bytes: `"RavenGameFile"` followed by a NUL byte        |
//! | 0x000E         | Version                | 1 byte: Fixed value 0x01                                   |
//! | 0x000F         | Root directory header  | See below                                                  |
//!
//! ### Directory Header
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Child Count            | 2 bytes: Number of immediate children                      |
//! | 0x0002         | Entries                | One entry per child, files first, then directories        |
//!
//! Each entry has the following structure:
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Traits                 | 1 byte: bit 0 set for files, clear for directories      |
//! | 0x0001         | Name Length            | 1 byte: Length of the name, 1 to 255                    |
//! | 0x0002         | Name                   | Name Length bytes, no terminator                        |
//! | 0x0002 + n     | Begin                  | 8 bytes: Absolute offset of the content                 |
//! | 0x000A + n     | End                    | 8 bytes: Absolute offset one past the content, files only |
//!
//! - **Begin** of a file points at its first data byte, **End** one past its last. A file with
//!   `Begin == End` is empty.
//! - **Begin** of a directory points at that directory's own header.
//!
//! A file entry therefore costs `18 + n` bytes, a directory entry `10 + n` bytes, and the child
//! count another 2 bytes per header.
//!
//! ### Data Blocks
//!
//! After a directory header come the contents of its files, in the order the entries list
//! them, followed by every subdirectory (header and contents) in entry order. Nothing separates
//! two blocks and there is no trailing index.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.rpk`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Names**: Raw bytes, unique among the children of one directory
//!

mod block;
pub mod codec;
pub mod error;
pub mod package;
pub mod read;
pub mod tree;
pub mod types;
pub mod write;

pub use error::{Error, Status};
pub use package::{
    create_archive_from_directory, create_archive_from_entries, extract_file, list_entries,
};
pub use read::{EntryKind, EntryMeta, RpkArchive, RpkFile};
pub use tree::{ContentSource, Tree};
pub use write::{RpkWriter, RpkWriterOptions};
