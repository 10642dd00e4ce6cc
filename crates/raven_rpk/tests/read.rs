use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use raven_rpk::{
    create_archive_from_directory, error::Result, extract_file, list_entries, EntryKind,
    RpkArchive, Status,
};
use tempfile::tempdir;
use tracing::info;
use tracing_test::traced_test;
use walkdir::WalkDir;

fn sample_dir() -> PathBuf {
    PathBuf::from(format!("{}/resources/sample", env!("CARGO_MANIFEST_DIR")))
}

/// Logical archive path of `path` relative to `root`
fn logical_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap()
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn expected_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

fn count_files<R: Read + std::io::Seek>(rpk: &mut RpkArchive<R>, path: &str) -> Result<usize> {
    let mut count = 0;
    for entry in rpk.list(path)? {
        match entry.kind {
            EntryKind::File => count += 1,
            EntryKind::Directory => count += count_files(rpk, &format!("{path}/{}", entry.name))?,
        }
    }
    Ok(count)
}

#[traced_test]
#[test]
fn validate_rpk_parsing() -> Result<()> {
    let root = sample_dir();
    let scratch = tempdir()?;
    let archive = scratch.path().join("sample.rpk");

    create_archive_from_directory(&root, &archive, false)?;

    let mut rpk = RpkArchive::new(BufReader::new(File::open(&archive)?))?;
    assert_eq!(rpk.version(), 1);
    assert_eq!(rpk.archive_len(), fs::metadata(&archive)?.len());

    let expected = expected_files(&root);
    assert_eq!(count_files(&mut rpk, "")?, expected.len());

    for path in expected {
        let name = logical_path(&root, &path);
        info!("comparing {}", name);

        let expected = fs::read(&path)?;

        let mut actual = Vec::new();
        let mut file = rpk.by_path(&name)?;
        assert_eq!(file.size(), expected.len() as u64);
        file.read_to_end(&mut actual)?;

        assert_eq!(expected, actual);
    }

    Ok(())
}

#[traced_test]
#[test]
fn list_sample_root() -> Result<()> {
    let scratch = tempdir()?;
    let archive = scratch.path().join("sample.rpk");
    create_archive_from_directory(sample_dir(), &archive, false)?;

    let root = list_entries(&archive, "")?;
    let names = root.iter().map(|e| e.to_string()).collect::<Vec<_>>();

    // Files are listed before directories
    assert_eq!(names[0], "readme.txt (106 B)");
    assert_eq!(&names[1..], ["data/", "scripts/"]);

    let nested = list_entries(&archive, "data/nested")?;
    let nested = nested
        .iter()
        .map(|e| (e.name.as_str(), e.size))
        .collect::<Vec<_>>();
    assert_eq!(nested, [("deep.txt", Some(18)), ("empty.bin", Some(0))]);

    // Trailing and doubled separators name the same directory
    assert_eq!(list_entries(&archive, "/data//nested/")?.len(), 2);

    Ok(())
}

#[traced_test]
#[test]
fn extract_sample_files() -> Result<()> {
    let root = sample_dir();
    let scratch = tempdir()?;
    let archive = scratch.path().join("sample.rpk");
    create_archive_from_directory(&root, &archive, false)?;

    for (i, path) in expected_files(&root).into_iter().enumerate() {
        let name = logical_path(&root, &path);
        let target = scratch.path().join(format!("out-{i}"));

        let written = extract_file(&archive, &name, Some(target.as_path()))?;
        assert_eq!(fs::read(written)?, fs::read(&path)?);
    }

    Ok(())
}

#[test]
fn lookups_report_their_status() -> Result<()> {
    let scratch = tempdir()?;
    let archive = scratch.path().join("sample.rpk");
    create_archive_from_directory(sample_dir(), &archive, false)?;
    let target = scratch.path().join("out");

    let status = |path: &str| {
        extract_file(&archive, path, Some(target.as_path()))
            .unwrap_err()
            .status()
    };

    assert_eq!(status("data"), Status::PathNotFound);
    assert_eq!(status("data/missing.txt"), Status::PathNotFound);
    assert_eq!(status("readme.txt/child"), Status::PathNotFound);
    assert_eq!(status(""), Status::InvalidPath);
    assert_eq!(status("data/../readme.txt"), Status::InvalidPath);
    assert!(!target.exists());

    assert_eq!(
        list_entries(&archive, "readme.txt").unwrap_err().status(),
        Status::PathNotFound
    );

    Ok(())
}

#[test]
fn foreign_files_are_rejected() -> Result<()> {
    let scratch = tempdir()?;

    let junk = scratch.path().join("junk.rpk");
    fs::write(&junk, b"this is certainly not a package")?;
    assert_eq!(
        list_entries(&junk, "").unwrap_err().status(),
        Status::NotAnArchive
    );

    let short = scratch.path().join("short.rpk");
    fs::write(&short, b"Raven")?;
    assert_eq!(
        list_entries(&short, "").unwrap_err().status(),
        Status::NotAnArchive
    );

    assert_eq!(
        list_entries(scratch.path().join("missing.rpk"), "")
            .unwrap_err()
            .status(),
        Status::ArchiveMissing
    );

    Ok(())
}
