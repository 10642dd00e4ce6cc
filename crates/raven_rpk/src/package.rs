//! Whole-file operations on packages.
//!
//! Every precondition is checked before anything is written. If an operation fails after it
//! started writing, the output may be left truncated and has to be discarded by the caller.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::block::copy_chunked;
use crate::codec::normalize_path;
use crate::error::{Error, InvalidPathError, Result};
use crate::read::{EntryMeta, RpkArchive};
use crate::tree::{ContentSource, Tree};
use crate::types::DEFAULT_BUFFER_SIZE;
use crate::write::{RpkWriter, RpkWriterOptions};

/// Archive the directory at `dir_path` into a new package at `archive_path`.
#[instrument(skip_all, fields(dir = %dir_path.as_ref().display(), archive = %archive_path.as_ref().display()), err)]
pub fn create_archive_from_directory(
    dir_path: impl AsRef<Path>,
    archive_path: impl AsRef<Path>,
    overwrite: bool,
) -> Result<()> {
    let dir_path = dir_path.as_ref();
    let archive_path = archive_path.as_ref();

    if !dir_path.exists() {
        return Err(Error::InputMissing(dir_path.to_owned()));
    }
    if !dir_path.is_dir() {
        return Err(Error::InputNotDirectory(dir_path.to_owned()));
    }
    check_output(archive_path, overwrite)?;

    let tree = Tree::from_filesystem(dir_path)?;
    write_tree(tree, archive_path, overwrite)
}

/// Archive a list of logical paths into a new package at `archive_path`.
///
/// A `None` source declares an empty directory.
#[instrument(skip_all, fields(archive = %archive_path.as_ref().display()), err)]
pub fn create_archive_from_entries<I, P>(
    entries: I,
    archive_path: impl AsRef<Path>,
    overwrite: bool,
) -> Result<()>
where
    I: IntoIterator<Item = (P, Option<ContentSource>)>,
    P: AsRef<str>,
{
    let archive_path = archive_path.as_ref();
    check_output(archive_path, overwrite)?;

    let tree = Tree::from_entries(entries)?;
    write_tree(tree, archive_path, overwrite)
}

/// Extract the file at `logical_path` from a package.
///
/// Without a `target` the file lands in the working directory under its own name. Returns the
/// path that was written.
#[instrument(skip_all, fields(archive = %archive_path.as_ref().display(), path = logical_path), err)]
pub fn extract_file(
    archive_path: impl AsRef<Path>,
    logical_path: &str,
    target: Option<&Path>,
) -> Result<PathBuf> {
    let archive_path = archive_path.as_ref();
    if !archive_path.exists() {
        return Err(Error::ArchiveMissing(archive_path.to_owned()));
    }

    let segments = normalize_path(logical_path)?;
    let target = match (target, segments.last()) {
        (Some(target), _) => target.to_owned(),
        (None, Some(name)) => PathBuf::from(name),
        (None, None) => return Err(InvalidPathError::Root.into()),
    };
    if target.exists() {
        return Err(Error::OutputExists(target));
    }
    if archive_path.is_dir() {
        return Err(Error::InputIsDirectory(archive_path.to_owned()));
    }

    let mut rpk = RpkArchive::new(BufReader::new(File::open(archive_path)?))?;
    // Locate the entry before touching the target
    let mut file = rpk.by_path(logical_path)?;

    info!("writing {}", target.display());
    let mut out = BufWriter::new(File::create_new(&target)?);
    let copied = copy_chunked(&mut file, &mut out, DEFAULT_BUFFER_SIZE)?;
    out.flush()?;

    if copied != file.size() {
        return Err(Error::CorruptArchive(format!(
            "file '{logical_path}' holds {copied} of {} bytes",
            file.size()
        )));
    }

    Ok(target)
}

/// List the immediate children of the directory at `logical_path` inside a package.
#[instrument(skip_all, fields(archive = %archive_path.as_ref().display(), path = logical_path), err)]
pub fn list_entries(archive_path: impl AsRef<Path>, logical_path: &str) -> Result<Vec<EntryMeta>> {
    let archive_path = archive_path.as_ref();
    check_archive(archive_path)?;

    let mut rpk = RpkArchive::new(BufReader::new(File::open(archive_path)?))?;
    rpk.list(logical_path)
}

fn check_output(archive_path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && archive_path.exists() {
        return Err(Error::OutputExists(archive_path.to_owned()));
    }
    Ok(())
}

fn check_archive(archive_path: &Path) -> Result<()> {
    if !archive_path.exists() {
        return Err(Error::ArchiveMissing(archive_path.to_owned()));
    }
    if archive_path.is_dir() {
        return Err(Error::InputIsDirectory(archive_path.to_owned()));
    }
    Ok(())
}

fn write_tree(mut tree: Tree, archive_path: &Path, overwrite: bool) -> Result<()> {
    // Reject empty or oversized trees before the output is created
    tree.finalize_lengths()?;
    if tree.root().is_empty() {
        return Err(Error::EmptyArchive);
    }

    info!("creating {}", archive_path.display());
    let out = if overwrite {
        File::create(archive_path)?
    } else {
        File::create_new(archive_path)?
    };

    let mut out = RpkWriter::new(BufWriter::new(out), RpkWriterOptions::default()).write(tree)?;
    out.flush()?;

    Ok(())
}

#[cfg(test)]
mod test {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    use crate::error::{Result, Status};
    use crate::package::{create_archive_from_entries, extract_file, list_entries};
    use crate::tree::ContentSource;

    fn memory(data: &str) -> Option<ContentSource> {
        Some(ContentSource::from(data.as_bytes()))
    }

    #[traced_test]
    #[test]
    fn extract_writes_to_explicit_target() -> Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("data.rpk");
        create_archive_from_entries([("sub/b.txt", memory("world"))], &archive, false)?;

        let target = dir.path().join("out.txt");
        let written = extract_file(&archive, "sub/b.txt", Some(target.as_path()))?;

        assert_eq!(written, target);
        assert_eq!(fs::read(&target)?, b"world");

        Ok(())
    }

    #[test]
    fn missing_entries_do_not_create_target() -> Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("data.rpk");
        create_archive_from_entries([("a.txt", memory("hello"))], &archive, false)?;

        let target = dir.path().join("out.txt");
        let result = extract_file(&archive, "b.txt", Some(target.as_path()));

        assert_eq!(result.unwrap_err().status(), Status::PathNotFound);
        assert!(!target.exists());

        Ok(())
    }

    #[test]
    fn existing_targets_are_left_alone() -> Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("data.rpk");
        create_archive_from_entries([("a.txt", memory("hello"))], &archive, false)?;

        let target = dir.path().join("keep.txt");
        fs::write(&target, b"keep")?;

        let result = extract_file(&archive, "a.txt", Some(target.as_path()));

        assert_eq!(result.unwrap_err().status(), Status::OutputExists);
        assert_eq!(fs::read(&target)?, b"keep");

        Ok(())
    }

    #[test]
    fn extract_reports_existing_target_before_directory_archive() -> Result<()> {
        let dir = tempdir()?;
        let target = dir.path().join("keep.txt");
        fs::write(&target, b"keep")?;

        let result = extract_file(dir.path(), "a.txt", Some(target.as_path()));
        assert_eq!(result.unwrap_err().status(), Status::OutputExists);

        let result = extract_file(dir.path(), "a.txt", Some(dir.path().join("new.txt").as_path()));
        assert_eq!(result.unwrap_err().status(), Status::InputIsDirectory);

        Ok(())
    }

    #[test]
    fn empty_trees_leave_no_output() -> Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("data.rpk");

        let entries: Vec<(&str, Option<ContentSource>)> = Vec::new();
        let result = create_archive_from_entries(entries, &archive, false);

        assert_eq!(result.unwrap_err().status(), Status::EmptyArchive);
        assert!(!archive.exists());

        Ok(())
    }

    #[test]
    fn list_checks_archive_preconditions() -> Result<()> {
        let dir = tempdir()?;

        let missing = list_entries(dir.path().join("missing.rpk"), "");
        assert_eq!(missing.unwrap_err().status(), Status::ArchiveMissing);

        let directory = list_entries(dir.path(), "");
        assert_eq!(directory.unwrap_err().status(), Status::InputIsDirectory);

        Ok(())
    }
}
