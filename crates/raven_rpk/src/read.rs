//! Types for reading RPK archives
//!
//! Nothing is cached between lookups: every call walks the directory headers from the root,
//! following the recorded offsets and skipping over entries that do not match.

use binrw::BinRead;
use std::{
    fmt::{self, Debug, Display},
    io::{self, Read, Seek, SeekFrom, Write},
};
use tracing::{debug, instrument, trace};

use crate::{
    block::{copy_chunked, RpkBlockReader},
    codec::{bytes_to_u16, bytes_to_u64, format_size, normalize_path},
    error::{Error, InvalidPathError, Result},
    types::{
        EntryName, IndexEntry, RpkHeader, DEFAULT_BUFFER_SIZE, MAGIC, ROOT_OFFSET,
        SUPPORTED_VERSIONS,
    },
};

/// A struct for reading a file out of an RPK archive
pub struct RpkFile<'a, R: Read + Seek> {
    name: String,
    begin: u64,
    end: u64,
    reader: RpkBlockReader<'a, R>,
}

impl<R: Read + Seek> Debug for RpkFile<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("RpkFile")
            .field("name", &self.name)
            .field("begin", &self.begin)
            .field("end", &self.end)
            .finish()
    }
}

/// Methods for retrieving information on RPK file entries
impl<R: Read + Seek> RpkFile<'_, R> {
    /// Get the name of the file, without its parent directories
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the size of the file, in bytes
    pub fn size(&self) -> u64 {
        self.end - self.begin
    }

    /// Get the starting offset of the data of the file
    pub fn data_start(&self) -> u64 {
        self.begin
    }

    /// Get the offset one past the last byte of the file
    pub fn data_end(&self) -> u64 {
        self.end
    }
}

impl<R: Read + Seek> Read for RpkFile<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

/// Kind of a directory child
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Listing information for one directory child
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMeta {
    /// Name of the entry
    pub name: String,
    /// Whether this is a file or a directory
    pub kind: EntryKind,
    /// Length in bytes, files only
    pub size: Option<u64>,
}

impl EntryMeta {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    /// The size rendered with a binary unit, files only
    pub fn human_size(&self) -> Option<String> {
        self.size.map(format_size)
    }
}

impl Display for EntryMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.human_size()) {
            (EntryKind::File, Some(size)) => write!(f, "{} ({})", self.name, size),
            _ => write!(f, "{}/", self.name),
        }
    }
}

/// RPK archive reader
///
/// Reading from a package that is still being written is not supported.
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn print_readme(reader: impl Read + Seek) -> raven_rpk::error::Result<()> {
///     let mut rpk = raven_rpk::RpkArchive::new(reader)?;
///
///     for entry in rpk.list("")? {
///         println!("{}", entry);
///     }
///
///     let mut file = rpk.by_path("docs/readme.txt")?;
///     std::io::copy(&mut file, &mut std::io::stdout())?;
///
///     Ok(())
/// }
/// ```
pub struct RpkArchive<R> {
    reader: R,
    version: u8,
    length: u64,
}

impl<R> RpkArchive<R> {
    /// Format version of the package
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Total length of the package in bytes
    pub fn archive_len(&self) -> u64 {
        self.length
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> RpkArchive<R> {
    /// Open a package, validating its magic number and version.
    #[instrument(skip_all, err)]
    pub fn new(mut reader: R) -> Result<RpkArchive<R>> {
        let length = reader.seek(SeekFrom::End(0))?;
        reader.rewind()?;

        // Too short to even hold the magic number
        if length < MAGIC.len() as u64 {
            return Err(Error::NotAnArchive);
        }

        let header = RpkHeader::read(&mut reader)?;

        if !SUPPORTED_VERSIONS.contains(&header.version) {
            return Err(Error::UnsupportedVersion(header.version));
        }

        debug!(version = header.version, length, "opened package");

        Ok(RpkArchive {
            reader,
            version: header.version,
            length,
        })
    }

    /// Open a file by its logical path for streaming
    #[instrument(skip(self))]
    pub fn by_path(&mut self, path: &str) -> Result<RpkFile<'_, R>> {
        let segments = normalize_path(path)?;
        let Some((name, parents)) = segments.split_last() else {
            return Err(InvalidPathError::Root.into());
        };

        let dir = self.resolve_directory(parents, path)?;
        let entry = self
            .find_child(dir, name, true)?
            .ok_or_else(|| Error::PathNotFound(path.to_owned()))?;

        let begin = entry.begin;
        let end = entry.end.unwrap_or(begin);
        if begin > end || end > self.length {
            return Err(Error::CorruptArchive(format!(
                "file '{}' spans {begin}..{end} past the end of the package",
                name
            )));
        }

        Ok(RpkFile {
            name: name.clone(),
            begin,
            end,
            reader: RpkBlockReader::new(&mut self.reader, begin, end - begin)?,
        })
    }

    /// Copy the bytes of the file at `path` into `sink`, returning how many were written.
    #[instrument(skip(self, sink), err)]
    pub fn extract_to<W: Write + ?Sized>(&mut self, path: &str, sink: &mut W) -> Result<u64> {
        let mut file = self.by_path(path)?;
        let expected = file.size();
        let copied = copy_chunked(&mut file, sink, DEFAULT_BUFFER_SIZE)?;

        if copied != expected {
            return Err(Error::CorruptArchive(format!(
                "file '{path}' holds {copied} of {expected} bytes"
            )));
        }

        Ok(copied)
    }

    /// Read the whole file at `path` into memory
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.extract_to(path, &mut buffer)?;
        Ok(buffer)
    }

    /// List the immediate children of the directory at `path`; an empty path lists the root.
    #[instrument(skip(self), err)]
    pub fn list(&mut self, path: &str) -> Result<Vec<EntryMeta>> {
        let segments = normalize_path(path)?;
        let dir = self.resolve_directory(&segments, path)?;

        let count = self.read_child_count(dir)?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let entry = IndexEntry::read(&mut self.reader)?;
            let (kind, size) = match entry.end {
                Some(end) if entry.name.is_file() => {
                    if entry.begin > end || end > self.length {
                        return Err(Error::CorruptArchive(format!(
                            "file '{}' spans {}..{} past the end of the package",
                            entry.name.name_lossy(),
                            entry.begin,
                            end
                        )));
                    }
                    (EntryKind::File, Some(end - entry.begin))
                }
                _ => (EntryKind::Directory, None),
            };

            entries.push(EntryMeta {
                name: entry.name.name_lossy(),
                kind,
                size,
            });
        }

        Ok(entries)
    }

    /// Follow `segments` from the root, returning the offset of the last directory's header
    fn resolve_directory(&mut self, segments: &[String], path: &str) -> Result<u64> {
        let mut begin = ROOT_OFFSET;
        for segment in segments {
            let entry = self
                .find_child(begin, segment, false)?
                .ok_or_else(|| Error::PathNotFound(path.to_owned()))?;
            begin = entry.begin;
        }
        Ok(begin)
    }

    /// Scan the header at `dir` for a child called `name` of the requested kind
    fn find_child(&mut self, dir: u64, name: &str, want_file: bool) -> Result<Option<IndexEntry>> {
        let count = self.read_child_count(dir)?;
        trace!(dir, count, name, "scanning directory");

        for _ in 0..count {
            let entry_name = EntryName::read(&mut self.reader)?;

            if entry_name.name != name.as_bytes() || entry_name.is_file() != want_file {
                let position = self
                    .reader
                    .seek(SeekFrom::Current(entry_name.offsets_length()))?;
                if position > self.length {
                    return Err(Error::CorruptArchive(format!(
                        "directory header at {dir} ends past the package"
                    )));
                }
                continue;
            }

            let begin = self.read_offset()?;
            let end = if entry_name.is_file() {
                Some(self.read_offset()?)
            } else {
                None
            };

            return Ok(Some(IndexEntry {
                name: entry_name,
                begin,
                end,
            }));
        }

        Ok(None)
    }

    fn read_child_count(&mut self, dir: u64) -> Result<u16> {
        if dir < ROOT_OFFSET || dir > self.length {
            return Err(Error::CorruptArchive(format!(
                "directory header at {dir} lies outside the package"
            )));
        }
        self.reader.seek(SeekFrom::Start(dir))?;

        let mut bytes = [0u8; 2];
        self.reader.read_exact(&mut bytes).map_err(Error::from_read)?;
        Ok(bytes_to_u16(bytes))
    }

    fn read_offset(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        self.reader.read_exact(&mut bytes).map_err(Error::from_read)?;
        Ok(bytes_to_u64(bytes))
    }
}

#[cfg(test)]
mod test {
    use std::io::prelude::*;

    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::read::{EntryKind, EntryMeta, RpkArchive};
    use std::io::Cursor;

    #[rustfmt::skip]
    const NESTED: [u8; 88] = [
        // Magic + version
        0x52, 0x61, 0x76, 0x65, 0x6E, 0x47, 0x61, 0x6D,
        0x65, 0x46, 0x69, 0x6C, 0x65, 0x00,
        0x01,
        // Root header
        0x02, 0x00,
        0x01, 0x05, 0x61, 0x2E, 0x74, 0x78, 0x74,
        0x35, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x3A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x03, 0x73, 0x75, 0x62,
        0x3A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        // a.txt
        0x68, 0x65, 0x6C, 0x6C, 0x6F,
        // sub header
        0x01, 0x00,
        0x01, 0x05, 0x62, 0x2E, 0x74, 0x78, 0x74,
        0x53, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x58, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        // sub/b.txt
        0x77, 0x6F, 0x72, 0x6C, 0x64,
    ];

    #[test]
    fn read_invalid_magic() {
        let mut input = NESTED;
        input[0] = 0x40;

        let archive = RpkArchive::new(Cursor::new(input));
        assert!(matches!(archive, Err(Error::NotAnArchive)));
    }

    #[test]
    fn read_too_short_for_magic() {
        let archive = RpkArchive::new(Cursor::new(b"Raven".to_vec()));
        assert!(matches!(archive, Err(Error::NotAnArchive)));
    }

    #[test]
    fn read_unsupported_version() {
        let mut input = NESTED;
        input[14] = 0x02;

        let archive = RpkArchive::new(Cursor::new(input));
        assert!(matches!(archive, Err(Error::UnsupportedVersion(2))));
    }

    #[test]
    fn read_nested_files() -> Result<()> {
        let mut archive = RpkArchive::new(Cursor::new(NESTED))?;
        assert_eq!(archive.version(), 1);
        assert_eq!(archive.archive_len(), 88);

        assert_eq!(archive.read_file("a.txt")?, b"hello");
        assert_eq!(archive.read_file("sub/b.txt")?, b"world");
        assert_eq!(archive.read_file("\\sub\\b.txt")?, b"world");

        let mut file = archive.by_path("sub//b.txt")?;
        assert_eq!(file.name(), "b.txt");
        assert_eq!(file.data_start(), 83);
        assert_eq!(file.size(), 5);

        let mut buffer = String::new();
        file.read_to_string(&mut buffer)?;
        assert_eq!(buffer, "world");

        Ok(())
    }

    #[test]
    fn read_missing_paths() -> Result<()> {
        let mut archive = RpkArchive::new(Cursor::new(NESTED))?;

        assert!(matches!(archive.read_file("b.txt"), Err(Error::PathNotFound(_))));
        assert!(matches!(archive.read_file("nope/b.txt"), Err(Error::PathNotFound(_))));
        // Directories are never extracted as files
        assert!(matches!(archive.read_file("sub"), Err(Error::PathNotFound(_))));
        // Files are never traversed as directories
        assert!(matches!(archive.read_file("a.txt/b.txt"), Err(Error::PathNotFound(_))));
        assert!(matches!(archive.read_file(""), Err(Error::InvalidPath(_))));

        Ok(())
    }

    #[test]
    fn list_root_and_nested() -> Result<()> {
        let mut archive = RpkArchive::new(Cursor::new(NESTED))?;

        assert_eq!(
            archive.list("")?,
            vec![
                EntryMeta {
                    name: "a.txt".into(),
                    kind: EntryKind::File,
                    size: Some(5),
                },
                EntryMeta {
                    name: "sub".into(),
                    kind: EntryKind::Directory,
                    size: None,
                },
            ]
        );

        let sub = archive.list("/sub/")?;
        assert_eq!(sub.len(), 1);
        assert_eq!(sub[0].to_string(), "b.txt (5 B)");

        assert!(matches!(archive.list("a.txt"), Err(Error::PathNotFound(_))));

        Ok(())
    }

    #[test]
    fn extract_streams_into_sink() -> Result<()> {
        let mut archive = RpkArchive::new(Cursor::new(NESTED))?;

        let mut sink = Vec::new();
        assert_eq!(archive.extract_to("a.txt", &mut sink)?, 5);
        assert_eq!(sink, b"hello");

        Ok(())
    }

    #[test]
    fn read_truncated_header() -> Result<()> {
        let mut archive = RpkArchive::new(Cursor::new(NESTED[..30].to_vec()))?;

        assert!(matches!(archive.list(""), Err(Error::CorruptArchive(_))));
        assert!(matches!(archive.read_file("sub/b.txt"), Err(Error::CorruptArchive(_))));

        Ok(())
    }

    #[test]
    fn read_header_cut_inside_skipped_entry() -> Result<()> {
        #[rustfmt::skip]
        let input = vec![
            0x52, 0x61, 0x76, 0x65, 0x6E, 0x47, 0x61, 0x6D,
            0x65, 0x46, 0x69, 0x6C, 0x65, 0x00,
            0x01,
            // One file entry "z" without its offsets
            0x01, 0x00,
            0x01, 0x01, 0x7A,
        ];

        let mut archive = RpkArchive::new(Cursor::new(input))?;
        assert!(matches!(archive.read_file("q"), Err(Error::CorruptArchive(_))));
        assert!(matches!(archive.list("q"), Err(Error::CorruptArchive(_))));

        Ok(())
    }

    #[test]
    fn read_truncated_payload() -> Result<()> {
        let mut archive = RpkArchive::new(Cursor::new(NESTED[..86].to_vec()))?;

        assert_eq!(archive.read_file("a.txt")?, b"hello");
        assert!(matches!(archive.read_file("sub/b.txt"), Err(Error::CorruptArchive(_))));

        Ok(())
    }

    #[test]
    fn read_offsets_past_the_end() -> Result<()> {
        let mut input = NESTED;
        // Point "sub" far beyond the package
        input[49] = 0xFF;

        let mut archive = RpkArchive::new(Cursor::new(input))?;
        assert!(matches!(archive.read_file("sub/b.txt"), Err(Error::CorruptArchive(_))));

        Ok(())
    }
}
