#[path = "../src/backup.rs"]
mod backup;

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("schoold-backup-src");
    let workspace2 = temp_dir("schoold-backup-dst");
    let out_dir = temp_dir("schoold-backup-out");

    let db_src = workspace.join("school.sqlite3");
    let bytes = b"sqlite-test-payload";
    std::fs::write(&db_src, bytes).expect("write source db");
    // identity and cache files are not part of the bundle
    std::fs::write(workspace.join("identity.sqlite3"), b"secret").expect("write identity db");

    let counts = vec![("students".to_string(), 12), ("fees".to_string(), 3)];
    let bundle_path = out_dir.join("nested").join("workspace.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path, &counts)
        .expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT);
    assert_eq!(export.entry_count, 3);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    assert_eq!(archive.len(), 3);
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    let manifest: serde_json::Value = serde_json::from_str(&manifest).expect("manifest json");
    assert_eq!(manifest["format"], backup::BUNDLE_FORMAT);
    assert_eq!(manifest["collections"]["students"], 12);
    archive
        .by_name("db/school.sqlite3")
        .expect("database entry in bundle");
    archive
        .by_name("meta/workspace.json")
        .expect("workspace meta entry");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT);
    assert_eq!(import.collections["fees"], 3);

    let restored = std::fs::read(workspace2.join("school.sqlite3")).expect("read restored db");
    assert_eq!(restored, bytes);
    assert!(!workspace2.join("identity.sqlite3").exists());
    assert!(!workspace2.join("school.sqlite3.importing").exists());

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn raw_sqlite_file_is_imported_as_is() {
    let workspace = temp_dir("schoold-backup-raw");
    let source = temp_dir("schoold-backup-raw-src").join("old.sqlite3");
    std::fs::write(&source, b"SQLite format 3\0rest").expect("write raw db");
    std::fs::write(workspace.join("school.sqlite3"), b"old contents").expect("write existing db");

    let import = backup::import_workspace_bundle(&source, &workspace).expect("import raw");
    assert_eq!(import.bundle_format_detected, backup::RAW_SQLITE_FORMAT);
    assert!(import.collections.is_empty());
    let restored = std::fs::read(workspace.join("school.sqlite3")).expect("read restored db");
    assert_eq!(restored, b"SQLite format 3\0rest");

    let _ = std::fs::remove_dir_all(workspace);
    if let Some(dir) = source.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn export_requires_an_existing_store() {
    let workspace = temp_dir("schoold-backup-empty");
    let err = backup::export_workspace_bundle(&workspace, &workspace.join("out.zip"), &[])
        .expect_err("missing database");
    assert!(err.to_string().contains("workspace database not found"));

    let bogus = workspace.join("bogus.zip");
    std::fs::write(&bogus, b"PK\x03\x04not really a zip").expect("write bogus zip");
    assert!(backup::import_workspace_bundle(&bogus, &workspace.join("dst")).is_err());

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn tampered_store_and_unknown_files_are_refused() {
    let workspace = temp_dir("schoold-backup-tamper");
    let restore_to = temp_dir("schoold-backup-tamper-dst");
    std::fs::write(workspace.join("school.sqlite3"), b"current store").expect("write db");
    std::fs::write(restore_to.join("school.sqlite3"), b"keep me").expect("write existing db");

    let bundle = workspace.join("good.zip");
    backup::export_workspace_bundle(&workspace, &bundle, &[]).expect("export");

    // same manifest, different store bytes
    let mut manifest = String::new();
    zip::ZipArchive::new(File::open(&bundle).expect("open bundle"))
        .expect("zip")
        .by_name("manifest.json")
        .expect("manifest")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    let tampered = workspace.join("tampered.zip");
    let mut zip = zip::ZipWriter::new(File::create(&tampered).expect("create tampered"));
    let opts = zip::write::FileOptions::default();
    zip.start_file("manifest.json", opts).expect("manifest entry");
    zip.write_all(manifest.as_bytes()).expect("write manifest");
    zip.start_file("db/school.sqlite3", opts).expect("db entry");
    zip.write_all(b"swapped store").expect("write db");
    zip.finish().expect("finish tampered");

    let err = backup::import_workspace_bundle(&tampered, &restore_to).expect_err("checksum");
    assert!(err.to_string().contains("checksum mismatch"));

    let notes = workspace.join("notes.txt");
    std::fs::write(&notes, b"just some text").expect("write notes");
    assert!(backup::import_workspace_bundle(&notes, &restore_to).is_err());

    let kept = std::fs::read(restore_to.join("school.sqlite3")).expect("read db");
    assert_eq!(kept, b"keep me");

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(restore_to);
}
