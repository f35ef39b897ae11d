mod common;
use _cbmeta_core::codec::{self, METADATA_FILE_NAME};
use _cbmeta_core::{
    ArchiveEntry, ArchiveError, ArchiveHandle, ArchiveKind, Archives, Field, MetadataRecord,
    ReadOnlyBackend,
};
use common::{
    comic_info, entry_names, make_archive, make_comic, read_archive, ZipAsReadOnly, PAGE_ONE,
    PAGE_TWO,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn with_fake_rar() -> Archives {
    Archives::new(Some(Arc::new(ZipAsReadOnly)))
}

fn new_document() -> Vec<u8> {
    let record: MetadataRecord = [(Field::Series, "Saga"), (Field::Number, "7")]
        .into_iter()
        .collect();
    codec::encode(&record)
}

#[test]
fn test_rewrite_preserves_other_entries() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let old = comic_info("<Series>Old</Series>");
    let path = make_comic(dir.path(), "saga.cbz", Some(&old))?;
    let handle = ArchiveHandle::new(&path)?;
    let archives = Archives::writable_only();

    let document = new_document();
    let rewritten = archives.rewrite(&handle, Some(&document))?;
    assert_eq!(rewritten, handle);

    let entries = read_archive(&path)?;
    assert_eq!(
        entries,
        vec![
            ("page01.png".to_string(), PAGE_ONE.to_vec()),
            ("page02.jpg".to_string(), PAGE_TWO.to_vec()),
            (METADATA_FILE_NAME.to_string(), document),
        ]
    );
    assert_eq!(archives.read_record(&handle)?.get(Field::Number), Some("7"));
    Ok(())
}

#[test]
fn test_rewrite_without_document_removes_metadata() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let old = comic_info("<Series>Old</Series>");
    let path = make_comic(dir.path(), "saga.cbz", Some(&old))?;
    let handle = ArchiveHandle::new(&path)?;
    let archives = Archives::writable_only();

    archives.rewrite(&handle, None)?;
    assert_eq!(entry_names(&path)?, ["page01.png", "page02.jpg"]);
    assert_eq!(archives.metadata_entry_name(&handle)?, None);
    assert!(archives.read_record(&handle)?.is_empty());
    Ok(())
}

#[test]
fn test_rewrite_leaves_no_staging_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = make_comic(dir.path(), "saga.cbz", None)?;
    let handle = ArchiveHandle::new(&path)?;
    Archives::writable_only().rewrite(&handle, Some(&new_document()))?;

    let names: Vec<String> = fs::read_dir(dir.path())?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    assert_eq!(names, ["saga.cbz"]);
    Ok(())
}

#[test]
fn test_nested_metadata_entry_is_found_and_replaced() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let nested = comic_info("<Title>Nested</Title>");
    let path = make_archive(
        dir.path(),
        "nested.cbz",
        &[("pages/01.png", PAGE_ONE), ("meta/COMICINFO.XML", nested.as_slice())],
    )?;
    let handle = ArchiveHandle::new(&path)?;
    let archives = Archives::writable_only();

    assert_eq!(
        archives.metadata_entry_name(&handle)?.as_deref(),
        Some("meta/COMICINFO.XML")
    );
    assert_eq!(archives.read_record(&handle)?.get(Field::Title), Some("Nested"));

    archives.rewrite(&handle, Some(&new_document()))?;
    assert_eq!(entry_names(&path)?, ["pages/01.png", METADATA_FILE_NAME]);
    Ok(())
}

#[test]
fn test_shallowest_metadata_entry_wins() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let deep = comic_info("<Title>Deep</Title>");
    let b = comic_info("<Title>B</Title>");
    let a = comic_info("<Title>A</Title>");
    let path = make_archive(
        dir.path(),
        "many.cbz",
        &[
            ("x/y/ComicInfo.xml", deep.as_slice()),
            ("b/ComicInfo.xml", b.as_slice()),
            ("a/comicinfo.xml", a.as_slice()),
        ],
    )?;
    let handle = ArchiveHandle::new(&path)?;
    let archives = Archives::writable_only();
    assert_eq!(archives.read_record(&handle)?.get(Field::Title), Some("A"));

    archives.rewrite(&handle, None)?;
    assert_eq!(entry_names(&path)?, ["x/y/ComicInfo.xml"]);
    Ok(())
}

#[test]
fn test_delete_removes_case_variants_at_the_root() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let upper = comic_info("<Title>Upper</Title>");
    let lower = comic_info("<Title>Lower</Title>");
    let deep = comic_info("<Title>Deep</Title>");
    let path = make_archive(
        dir.path(),
        "variants.cbz",
        &[
            ("page01.png", PAGE_ONE),
            ("comicinfo.xml", lower.as_slice()),
            ("ComicInfo.xml", upper.as_slice()),
            ("extras/ComicInfo.xml", deep.as_slice()),
        ],
    )?;
    let handle = ArchiveHandle::new(&path)?;
    let archives = Archives::writable_only();
    assert_eq!(archives.read_record(&handle)?.get(Field::Title), Some("Upper"));

    archives.rewrite(&handle, None)?;
    assert_eq!(entry_names(&path)?, ["page01.png", "extras/ComicInfo.xml"]);
    assert_eq!(archives.read_record(&handle)?.get(Field::Title), Some("Deep"));

    archives.rewrite(&handle, Some(&new_document()))?;
    assert_eq!(entry_names(&path)?, ["page01.png", METADATA_FILE_NAME]);
    Ok(())
}

#[test]
fn test_malformed_document_reads_as_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let broken = b"<ComicInfo><Title>x</Series>".as_slice();
    let path = make_comic(dir.path(), "broken.cbz", Some(broken))?;
    let handle = ArchiveHandle::new(&path)?;
    let archives = Archives::writable_only();

    assert!(archives.read_record(&handle)?.is_empty());
    assert!(archives.metadata_digest(&handle)?.is_some());
    Ok(())
}

#[test]
fn test_digest_tracks_metadata_bytes() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let bare = make_comic(dir.path(), "bare.cbz", None)?;
    let tagged = make_comic(dir.path(), "tagged.cbz", Some(&new_document()))?;
    let archives = Archives::writable_only();

    assert_eq!(archives.metadata_digest(&ArchiveHandle::new(&bare)?)?, None);
    let digest = archives
        .metadata_digest(&ArchiveHandle::new(&tagged)?)?
        .unwrap();
    assert_eq!(digest.len(), 64);
    assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    Ok(())
}

#[test]
fn test_read_entry_reports_missing_names() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = make_comic(dir.path(), "saga.cbz", None)?;
    let handle = ArchiveHandle::new(&path)?;
    let archives = Archives::writable_only();

    assert_eq!(archives.read_entry(&handle, "page01.png")?, PAGE_ONE);
    assert!(matches!(
        archives.read_entry(&handle, "page99.png"),
        Err(ArchiveError::EntryNotFound { .. })
    ));
    Ok(())
}

#[test]
fn test_handles_are_classified_before_io() {
    assert_eq!(
        ArchiveHandle::new("/nowhere/a.cbz").unwrap().kind(),
        ArchiveKind::Writable
    );
    assert_eq!(
        ArchiveHandle::new("/nowhere/a.Cbr").unwrap().kind(),
        ArchiveKind::ReadOnly
    );
    assert!(matches!(
        ArchiveHandle::new("/nowhere/a.cb7"),
        Err(ArchiveError::InvalidHandle(_))
    ));
    assert!(matches!(
        ArchiveHandle::new("/nowhere/cbz"),
        Err(ArchiveError::InvalidHandle(_))
    ));
}

#[test]
fn test_corrupt_archive_is_a_bad_archive() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("corrupt.cbz");
    fs::write(&path, b"this is not a zip file")?;
    let handle = ArchiveHandle::new(&path)?;
    let archives = Archives::writable_only();

    assert!(matches!(
        archives.read_record(&handle),
        Err(ArchiveError::BadArchive { .. })
    ));
    assert!(matches!(
        archives.rewrite(&handle, Some(&new_document())),
        Err(ArchiveError::BadArchive { .. })
    ));
    assert_eq!(fs::read(&path)?, b"this is not a zip file");
    Ok(())
}

#[test]
fn test_read_only_archive_without_decoder_is_unsupported() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = make_comic(dir.path(), "saga.cbr", None)?;
    let handle = ArchiveHandle::new(&path)?;
    let archives = Archives::writable_only();

    assert!(!archives.read_only_available());
    assert!(matches!(
        archives.list_entries(&handle),
        Err(ArchiveError::UnsupportedFormat { .. })
    ));
    assert!(matches!(
        archives.rewrite(&handle, None),
        Err(ArchiveError::UnsupportedFormat { .. })
    ));
    assert!(path.exists());
    Ok(())
}

#[test]
fn test_migration_produces_writable_sibling() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let old = comic_info("<Series>Old</Series>");
    let path = make_comic(dir.path(), "saga.cbr", Some(&old))?;
    let handle = ArchiveHandle::new(&path)?;
    let archives = with_fake_rar();
    assert_eq!(archives.read_record(&handle)?.get(Field::Series), Some("Old"));

    let document = new_document();
    let migrated = archives.rewrite(&handle, Some(&document))?;

    assert_eq!(migrated.kind(), ArchiveKind::Writable);
    assert_eq!(migrated.path(), dir.path().join("saga.cbz"));
    assert!(!path.exists());
    assert_eq!(
        read_archive(migrated.path())?,
        vec![
            ("page01.png".to_string(), PAGE_ONE.to_vec()),
            ("page02.jpg".to_string(), PAGE_TWO.to_vec()),
            (METADATA_FILE_NAME.to_string(), document),
        ]
    );
    Ok(())
}

#[test]
fn test_migration_replaces_existing_sibling() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = make_comic(dir.path(), "saga.cbr", None)?;
    make_archive(dir.path(), "saga.cbz", &[("stale.txt", b"stale".as_slice())])?;
    let handle = ArchiveHandle::new(&path)?;

    let migrated = with_fake_rar().rewrite(&handle, None)?;
    assert_eq!(entry_names(migrated.path())?, ["page01.png", "page02.jpg"]);
    assert!(!path.exists());
    Ok(())
}

/// Yields two entries under the same name, which the zip writer refuses.
struct DuplicateEntries;

impl ReadOnlyBackend for DuplicateEntries {
    fn format_name(&self) -> &'static str {
        "duplicate RAR"
    }

    fn list_names(&self, _path: &Path) -> Result<Vec<String>, ArchiveError> {
        Ok(vec!["a.png".to_string(), "a.png".to_string()])
    }

    fn read_all(&self, _path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let page = |data: &[u8]| ArchiveEntry {
            name: "a.png".to_string(),
            data: data.to_vec(),
        };
        Ok(vec![page(PAGE_ONE), page(PAGE_TWO)])
    }
}

#[test]
fn test_failed_migration_leaves_original_untouched() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("x.cbr");
    fs::write(&path, b"original")?;
    let handle = ArchiveHandle::new(&path)?;
    let archives = Archives::new(Some(Arc::new(DuplicateEntries)));

    assert!(matches!(
        archives.rewrite(&handle, Some(&new_document())),
        Err(ArchiveError::WriteFailure { .. })
    ));
    assert_eq!(fs::read(&path)?, b"original");
    let names: Vec<String> = fs::read_dir(dir.path())?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    assert_eq!(names, ["x.cbr"]);
    Ok(())
}

/// Serves single entries only; extracting the whole archive fails.
struct SingleEntryOnly;

impl ReadOnlyBackend for SingleEntryOnly {
    fn format_name(&self) -> &'static str {
        "single-entry RAR"
    }

    fn list_names(&self, _path: &Path) -> Result<Vec<String>, ArchiveError> {
        Ok(vec!["page01.png".to_string(), METADATA_FILE_NAME.to_string()])
    }

    fn read_all(&self, path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        Err(ArchiveError::BadArchive {
            path: path.to_path_buf(),
            reason: "full extraction".to_string(),
        })
    }

    fn read_entry(&self, path: &Path, name: &str) -> Result<Vec<u8>, ArchiveError> {
        if name == METADATA_FILE_NAME {
            Ok(new_document())
        } else {
            Err(ArchiveError::EntryNotFound {
                path: path.to_path_buf(),
                name: name.to_string(),
            })
        }
    }
}

#[test]
fn test_metadata_reads_extract_a_single_entry() -> anyhow::Result<()> {
    let handle = ArchiveHandle::new("/comics/saga.cbr")?;
    let archives = Archives::new(Some(Arc::new(SingleEntryOnly)));

    assert_eq!(archives.read_record(&handle)?.get(Field::Series), Some("Saga"));
    assert!(archives.metadata_digest(&handle)?.is_some());
    assert!(matches!(
        archives.rewrite(&handle, None),
        Err(ArchiveError::BadArchive { .. })
    ));
    Ok(())
}
