//! Types for writing RPK archives
//!

use binrw::BinWrite;
use bon::Builder;
use std::io::{Cursor, Read, Write};
use tracing::{debug, instrument, trace};

use crate::block::copy_chunked;
use crate::codec::u16_to_bytes;
use crate::error::{Error, Result};
use crate::tree::{DirectoryEntry, FileEntry, Tree};
use crate::types::{IndexEntry, RpkHeader, DEFAULT_BUFFER_SIZE, MAX_CHILDREN};

/// Options for how the RPK file should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct RpkWriterOptions {
    /// Size of the chunks payload bytes are streamed in
    #[builder(default = DEFAULT_BUFFER_SIZE)]
    pub buffer_size: usize,
}

impl Default for RpkWriterOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// RPK archive generator
///
/// The writer only appends to its sink; every offset is derived from the finalized [`Tree`].
///
/// ```
/// # fn doit() -> raven_rpk::error::Result<()>
/// # {
/// use raven_rpk::tree::{ContentSource, Tree};
/// use raven_rpk::write::{RpkWriter, RpkWriterOptions};
///
/// let tree = Tree::from_entries([
///     ("hello_world.txt", Some(ContentSource::from(b"Hello, World!".to_vec()))),
/// ])?;
///
/// // We use a buffer here, though you'd normally use a `File`
/// let writer = RpkWriter::new(Vec::new(), RpkWriterOptions::builder().buffer_size(4096).build());
/// let bytes = writer.write(tree)?;
/// assert_eq!(bytes.len(), 15 + 2 + 18 + 15 + 13);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct RpkWriter<W: Write> {
    inner: W,
    options: RpkWriterOptions,
    position: u64,
}

impl<W: Write> RpkWriter<W> {
    pub fn new(inner: W, options: RpkWriterOptions) -> RpkWriter<W> {
        RpkWriter {
            inner,
            options,
            position: 0,
        }
    }

    /// Serialize `tree` into the sink and hand the sink back.
    ///
    /// On error the sink may hold a truncated package which the caller has to discard.
    #[instrument(skip_all, err)]
    pub fn write(mut self, mut tree: Tree) -> Result<W> {
        if !tree.is_finalized() {
            tree.finalize_lengths()?;
        }

        let root = tree.root();
        if root.is_empty() {
            return Err(Error::EmptyArchive);
        }
        if root.len() > MAX_CHILDREN {
            return Err(Error::TooManyEntries {
                name: String::new(),
                count: root.len(),
            });
        }

        let mut header = Cursor::new(Vec::new());
        RpkHeader::default().write(&mut header)?;
        self.emit(&header.into_inner())?;

        self.write_directory(root)?;
        self.inner.flush()?;

        debug!(bytes = self.position, "finished package");
        debug_assert_eq!(self.position, tree.archive_length());

        Ok(self.inner)
    }

    /// Write the index of `dir` at the current position followed by everything it contains.
    ///
    /// Offsets are handed out in the same order the payload is emitted afterwards: files first,
    /// then directories, each in insertion order.
    #[instrument(skip_all, fields(name = dir.name()), err)]
    fn write_directory(&mut self, dir: &DirectoryEntry) -> Result<()> {
        let start = self.position;
        let mut current = start + dir.header_length();

        let mut header = Cursor::new(Vec::with_capacity(dir.header_length() as usize));
        header.write_all(&u16_to_bytes(dir.len() as u16))?;

        for file in dir.files() {
            let begin = current;
            current += file_length(file)?;
            IndexEntry::file(file.name(), begin, current).write(&mut header)?;
        }
        for child in dir.directories() {
            IndexEntry::directory(child.name(), current).write(&mut header)?;
            current += child.header_length() + child.payload_length();
        }

        let header = header.into_inner();
        debug_assert_eq!(header.len() as u64, dir.header_length());
        self.emit(&header)?;

        for file in dir.files() {
            self.write_file(file)?;
        }
        for child in dir.directories() {
            self.write_directory(child)?;
        }

        debug_assert_eq!(self.position, current);
        Ok(())
    }

    fn write_file(&mut self, file: &FileEntry) -> Result<()> {
        let expected = file_length(file)?;
        trace!(name = file.name(), expected, "writing file");

        let entry_error = |source| Error::EntryIo {
            name: file.name().to_owned(),
            source,
        };

        let reader = file.source().open().map_err(entry_error)?;
        let copied = copy_chunked(
            &mut reader.take(expected),
            &mut self.inner,
            self.options.buffer_size,
        )
        .map_err(entry_error)?;

        self.position += copied;
        if copied != expected {
            return Err(Error::LengthMismatch {
                name: file.name().to_owned(),
                expected,
                actual: copied,
            });
        }

        Ok(())
    }

    fn emit(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }
}

fn file_length(file: &FileEntry) -> Result<u64> {
    file.length()
        .ok_or_else(|| Error::CorruptArchive(format!("length of '{}' was never measured", file.name())))
}
