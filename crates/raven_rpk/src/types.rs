//! Base types for structure of RPK file.

use binrw::{binrw, BinRead, BinWrite};

/// Magic number every package starts with
pub const MAGIC: &[u8; 14] = b"RavenGameFile\0";

/// Format version written by this library
pub const VERSION_1: u8 = 0x01;

/// Versions this library is able to read
pub const SUPPORTED_VERSIONS: &[u8] = &[VERSION_1];

/// Offset of the root directory header from the start of the file
pub const ROOT_OFFSET: u64 = MAGIC.len() as u64 + 1;

/// Size of the child count preceding every directory index
pub const CHILD_COUNT_LENGTH: u64 = 2;

/// Fixed cost of a file index entry: traits, name length, begin and end offsets
pub const FILE_ENTRY_LENGTH: u64 = 18;

/// Fixed cost of a directory index entry: traits, name length and begin offset
pub const DIRECTORY_ENTRY_LENGTH: u64 = 10;

/// Longest name a single entry may carry
pub const MAX_NAME_LENGTH: usize = u8::MAX as usize;

/// Most children a single directory may hold
pub const MAX_CHILDREN: usize = u16::MAX as usize;

/// Chunk size used when streaming payload bytes
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Trait bit marking an index entry as a file
pub const TRAIT_IS_FILE: u8 = 1;

/// RPK file prelude
///
/// Every package starts with "RavenGameFile\0" followed by a single version byte.
/// All data is stored in little endian format
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(magic = b"RavenGameFile\0", little)]
pub struct RpkHeader {
    /// The format version of the index that follows
    pub version: u8,
}

impl Default for RpkHeader {
    fn default() -> Self {
        Self { version: VERSION_1 }
    }
}

/// Leading part of an index entry, everything up to the offsets
///
/// A reader walking a directory only needs this much to decide whether to skip an entry.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryName {
    /// Bit field, bit 0 is set for files
    pub traits: u8,

    #[br(temp)]
    #[bw(try_calc = u8::try_from(name.len()))]
    name_len: u8,

    /// Raw name of the entry
    #[br(count = name_len)]
    pub name: Vec<u8>,
}

impl EntryName {
    pub fn file(name: impl Into<Vec<u8>>) -> Self {
        Self {
            traits: TRAIT_IS_FILE,
            name: name.into(),
        }
    }

    pub fn directory(name: impl Into<Vec<u8>>) -> Self {
        Self {
            traits: 0,
            name: name.into(),
        }
    }

    pub fn is_file(&self) -> bool {
        self.traits & TRAIT_IS_FILE != 0
    }

    /// Number of offset bytes following the name
    pub fn offsets_length(&self) -> i64 {
        if self.is_file() {
            16
        } else {
            8
        }
    }

    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

/// Entry in a directory index
///
/// Files record where their bytes begin and end, directories only where their own header begins.
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: EntryName,

    /// Absolute offset of the file bytes or the directory header
    pub begin: u64,

    /// Absolute offset one past the last file byte
    #[br(if(name.is_file()))]
    pub end: Option<u64>,
}

impl IndexEntry {
    pub fn file(name: impl Into<Vec<u8>>, begin: u64, end: u64) -> Self {
        Self {
            name: EntryName::file(name),
            begin,
            end: Some(end),
        }
    }

    pub fn directory(name: impl Into<Vec<u8>>, begin: u64) -> Self {
        Self {
            name: EntryName::directory(name),
            begin,
            end: None,
        }
    }
}
