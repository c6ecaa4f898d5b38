//! Workspace bundles: a zip holding the collection store, a manifest with
//! per-collection counts and a checksum of the store bytes.

use anyhow::{bail, Context};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const BUNDLE_FORMAT: &str = "school-workspace-v1";
pub const RAW_SQLITE_FORMAT: &str = "raw-sqlite3";

const STORE_FILE: &str = "school.sqlite3";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const SQLITE_MAGIC: &[u8] = b"SQLite format 3\0";

mod entry {
    pub const MANIFEST: &str = "manifest.json";
    pub const STORE: &str = "db/school.sqlite3";
    pub const WORKSPACE: &str = "meta/workspace.json";
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    format: String,
    #[serde(default)]
    app_version: String,
    #[serde(default)]
    exported_at: String,
    /// Hex sha256 of the store entry; older bundles may lack it.
    #[serde(default)]
    store_sha256: Option<String>,
    #[serde(default)]
    collections: BTreeMap<String, i64>,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub collections: BTreeMap<String, i64>,
}

fn hex_sha256(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn starts_with(path: &Path, magic: &[u8]) -> anyhow::Result<bool> {
    let mut head = vec![0u8; magic.len()];
    let mut f = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    match f.read_exact(&mut head) {
        Ok(()) => Ok(head == magic),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
    }
}

/// Zips the collection store of `workspace`. Identity and cache databases
/// are never bundled.
pub fn export_workspace_bundle(
    workspace: &Path,
    out_path: &Path,
    collection_counts: &[(String, i64)],
) -> anyhow::Result<ExportSummary> {
    let store_path = workspace.join(STORE_FILE);
    if !store_path.is_file() {
        bail!("workspace database not found: {}", store_path.display());
    }
    let store = fs::read(&store_path)
        .with_context(|| format!("cannot read {}", store_path.display()))?;
    let manifest = Manifest {
        format: BUNDLE_FORMAT.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        store_sha256: Some(hex_sha256(&store)),
        collections: collection_counts.iter().cloned().collect(),
    };
    let workspace_meta = serde_json::json!({ "sourceWorkspace": workspace.display().to_string() });

    let entries: [(&str, Vec<u8>); 3] = [
        (entry::MANIFEST, serde_json::to_vec_pretty(&manifest)?),
        (entry::STORE, store),
        (entry::WORKSPACE, serde_json::to_vec_pretty(&workspace_meta)?),
    ];

    if let Some(dir) = out_path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    let file = File::create(out_path)
        .with_context(|| format!("cannot create bundle {}", out_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in &entries {
        zip.start_file(*name, opts)
            .with_context(|| format!("cannot add {name}"))?;
        zip.write_all(bytes)
            .with_context(|| format!("cannot write {name}"))?;
    }
    zip.finish().context("cannot finish bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT.to_string(),
        entry_count: entries.len(),
    })
}

fn read_entry<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    archive
        .by_name(name)
        .with_context(|| format!("bundle has no {name}"))?
        .read_to_end(&mut bytes)
        .with_context(|| format!("cannot read {name}"))?;
    Ok(bytes)
}

/// Writes next to `dst` first so a failed import leaves the old store.
fn replace_store(dst: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let staged = PathBuf::from(format!("{}.importing", dst.display()));
    let mut out = File::create(&staged)
        .with_context(|| format!("cannot create {}", staged.display()))?;
    out.write_all(bytes)
        .and_then(|_| out.sync_all())
        .with_context(|| format!("cannot write {}", staged.display()))?;
    drop(out);
    if let Err(e) = fs::rename(&staged, dst) {
        let _ = fs::remove_file(&staged);
        return Err(e).with_context(|| format!("cannot replace {}", dst.display()));
    }
    Ok(())
}

/// Replaces the collection store of `workspace` from a bundle, or from a bare
/// sqlite file. Nothing may hold the store open while this runs.
pub fn import_workspace_bundle(in_path: &Path, workspace: &Path) -> anyhow::Result<ImportSummary> {
    fs::create_dir_all(workspace)
        .with_context(|| format!("cannot create workspace {}", workspace.display()))?;
    let dst = workspace.join(STORE_FILE);

    if !starts_with(in_path, ZIP_MAGIC)? {
        if !starts_with(in_path, SQLITE_MAGIC)? {
            bail!("{} is neither a bundle nor a sqlite file", in_path.display());
        }
        let bytes = fs::read(in_path).with_context(|| format!("cannot read {}", in_path.display()))?;
        replace_store(&dst, &bytes)?;
        return Ok(ImportSummary {
            bundle_format_detected: RAW_SQLITE_FORMAT.to_string(),
            collections: BTreeMap::new(),
        });
    }

    let file = File::open(in_path).with_context(|| format!("cannot open {}", in_path.display()))?;
    let mut archive = ZipArchive::new(file).context("invalid zip archive")?;
    let manifest: Manifest = serde_json::from_slice(&read_entry(&mut archive, entry::MANIFEST)?)
        .context("manifest.json is invalid")?;
    if manifest.format != BUNDLE_FORMAT {
        bail!("unsupported bundle format: {}", manifest.format);
    }
    let store = read_entry(&mut archive, entry::STORE)?;
    if let Some(expected) = &manifest.store_sha256 {
        let actual = hex_sha256(&store);
        if !expected.eq_ignore_ascii_case(&actual) {
            bail!("store checksum mismatch: manifest {expected}, bundle {actual}");
        }
    }
    replace_store(&dst, &store)?;

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT.to_string(),
        collections: manifest.collections,
    })
}
