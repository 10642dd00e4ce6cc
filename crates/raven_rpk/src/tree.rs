//! In-memory model of the contents of a package before it is written.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::codec::normalize_path;
use crate::error::{Error, InvalidPathError, Result};
use crate::types::{
    CHILD_COUNT_LENGTH, DIRECTORY_ENTRY_LENGTH, FILE_ENTRY_LENGTH, MAX_CHILDREN, MAX_NAME_LENGTH,
};

/// Where the bytes of a file entry come from
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// A file on disk, opened only while its bytes are written
    Path(PathBuf),

    /// A shared, read-only buffer
    Memory(Arc<[u8]>),
}

impl ContentSource {
    /// Current length of the content in bytes
    pub fn len(&self) -> io::Result<u64> {
        match self {
            ContentSource::Path(path) => Ok(std::fs::metadata(path)?.len()),
            ContentSource::Memory(data) => Ok(data.len() as u64),
        }
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Open the content for streaming
    pub fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        match self {
            ContentSource::Path(path) => Ok(Box::new(File::open(path)?)),
            ContentSource::Memory(data) => Ok(Box::new(Cursor::new(data.as_ref()))),
        }
    }
}

impl From<PathBuf> for ContentSource {
    fn from(value: PathBuf) -> Self {
        ContentSource::Path(value)
    }
}

impl From<Vec<u8>> for ContentSource {
    fn from(value: Vec<u8>) -> Self {
        ContentSource::Memory(value.into())
    }
}

impl From<&[u8]> for ContentSource {
    fn from(value: &[u8]) -> Self {
        ContentSource::Memory(value.into())
    }
}

impl From<Arc<[u8]>> for ContentSource {
    fn from(value: Arc<[u8]>) -> Self {
        ContentSource::Memory(value)
    }
}

/// A file inside the tree
#[derive(Debug, Clone)]
pub struct FileEntry {
    name: String,
    source: ContentSource,
    length: Option<u64>,
}

impl FileEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &ContentSource {
        &self.source
    }

    /// Length measured by the last [`Tree::finalize_lengths`], if any
    pub fn length(&self) -> Option<u64> {
        self.length
    }
}

/// A child of a directory
#[derive(Debug, Clone)]
pub enum Entry {
    File(FileEntry),
    Directory(DirectoryEntry),
}

/// A directory inside the tree
///
/// Children keep their insertion order. The two lengths are caches filled by
/// [`Tree::finalize_lengths`] and are stale after any mutation.
#[derive(Debug, Clone, Default)]
pub struct DirectoryEntry {
    name: String,
    entries: IndexMap<String, Entry>,
    header_length: u64,
    payload_length: u64,
}

impl DirectoryEntry {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of immediate children
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Immediate file children in insertion order
    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.values().filter_map(|entry| match entry {
            Entry::File(file) => Some(file),
            Entry::Directory(_) => None,
        })
    }

    /// Immediate directory children in insertion order
    pub fn directories(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.values().filter_map(|entry| match entry {
            Entry::File(_) => None,
            Entry::Directory(dir) => Some(dir),
        })
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Bytes taken by this directory's own index
    pub fn header_length(&self) -> u64 {
        self.header_length
    }

    /// Bytes following this directory's own index: its files and every nested directory
    pub fn payload_length(&self) -> u64 {
        self.payload_length
    }

    fn directory_mut(&mut self, name: &str) -> Result<&mut DirectoryEntry> {
        let entry = self
            .entries
            .entry(name.to_owned())
            .or_insert_with(|| Entry::Directory(DirectoryEntry::new(name)));

        match entry {
            Entry::Directory(dir) => Ok(dir),
            Entry::File(_) => Err(Error::DuplicateEntry(name.to_owned())),
        }
    }

    fn insert_file(&mut self, name: &str, source: ContentSource) -> Result<()> {
        if self.entries.contains_key(name) {
            return Err(Error::DuplicateEntry(name.to_owned()));
        }
        self.entries.insert(
            name.to_owned(),
            Entry::File(FileEntry {
                name: name.to_owned(),
                source,
                length: None,
            }),
        );
        Ok(())
    }

    fn read_filesystem(&mut self, path: &Path) -> Result<()> {
        let children = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        for child in children {
            let child = child.map_err(io::Error::from)?;
            let name = child.file_name().to_string_lossy().into_owned();
            validate_name(&name)?;

            let file_type = child.file_type();
            if file_type.is_dir() {
                self.directory_mut(&name)?.read_filesystem(child.path())?;
            } else if file_type.is_file() {
                self.insert_file(&name, ContentSource::Path(child.path().to_owned()))?;
            } else {
                warn!(path = %child.path().display(), "unsupported file type, skipping");
            }
        }

        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if self.entries.len() > MAX_CHILDREN {
            return Err(Error::TooManyEntries {
                name: self.name.clone(),
                count: self.entries.len(),
            });
        }

        let mut header_length = CHILD_COUNT_LENGTH;
        let mut payload_length = 0u64;

        for entry in self.entries.values_mut() {
            match entry {
                Entry::File(file) => {
                    let length = file.source.len().map_err(|source| Error::EntryIo {
                        name: file.name.clone(),
                        source,
                    })?;
                    file.length = Some(length);
                    header_length += FILE_ENTRY_LENGTH + file.name.len() as u64;
                    payload_length += length;
                }
                Entry::Directory(dir) => {
                    dir.finalize()?;
                    header_length += DIRECTORY_ENTRY_LENGTH + dir.name.len() as u64;
                    payload_length += dir.header_length + dir.payload_length;
                }
            }
        }

        self.header_length = header_length;
        self.payload_length = payload_length;

        Ok(())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(Error::NameTooLong(name.to_owned()));
    }
    Ok(())
}

/// Contents of a package to be written
///
/// ```
/// # fn doit() -> raven_rpk::error::Result<()>
/// # {
/// use raven_rpk::tree::{ContentSource, Tree};
///
/// let mut tree = Tree::new();
/// tree.insert("readme.txt", Some(ContentSource::from(b"hello".to_vec())))?;
/// tree.insert("textures/empty", None)?;
/// tree.finalize_lengths()?;
///
/// assert_eq!(tree.root().len(), 2);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct Tree {
    root: DirectoryEntry,
    finalized: bool,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from logical paths.
    ///
    /// A `None` source declares an (empty) directory rather than a file. Intermediate directories are
    /// created on demand; naming an existing directory again merges into it.
    #[instrument(skip_all, err)]
    pub fn from_entries<I, P>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (P, Option<ContentSource>)>,
        P: AsRef<str>,
    {
        let mut tree = Tree::new();
        for (path, source) in entries {
            tree.insert(path.as_ref(), source)?;
        }
        Ok(tree)
    }

    /// Build a tree mirroring a directory on disk.
    ///
    /// Regular files become file entries read lazily from disk, directories recurse and anything
    /// else (symlinks, devices, ...) is skipped. Siblings are ordered by file name.
    #[instrument(skip_all, fields(root = %root.as_ref().display()), err)]
    pub fn from_filesystem(root: impl AsRef<Path>) -> Result<Self> {
        let mut tree = Tree::new();
        tree.root.read_filesystem(root.as_ref())?;
        debug!(entries = tree.root.len(), "read directory structure");
        Ok(tree)
    }

    /// Add a file (`Some`) or directory (`None`) at a logical path
    pub fn insert(&mut self, path: &str, source: Option<ContentSource>) -> Result<()> {
        let segments = normalize_path(path)?;
        let Some((last, parents)) = segments.split_last() else {
            return Err(InvalidPathError::Root.into());
        };

        let mut dir = &mut self.root;
        for segment in parents {
            validate_name(segment)?;
            dir = dir.directory_mut(segment)?;
        }

        validate_name(last)?;
        match source {
            Some(source) => dir.insert_file(last, source)?,
            None => {
                dir.directory_mut(last)?;
            }
        }

        self.finalized = false;
        Ok(())
    }

    /// Recompute every directory's header and payload length, children before parents.
    ///
    /// File lengths are measured here; sources must not change between this call and writing.
    #[instrument(skip(self), err)]
    pub fn finalize_lengths(&mut self) -> Result<()> {
        self.root.finalize()?;
        self.finalized = true;
        Ok(())
    }

    /// Whether the cached lengths reflect the current contents
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The unnamed top level directory
    pub fn root(&self) -> &DirectoryEntry {
        &self.root
    }

    /// Total size of the package this tree produces
    pub fn archive_length(&self) -> u64 {
        crate::types::ROOT_OFFSET + self.root.header_length + self.root.payload_length
    }
}
