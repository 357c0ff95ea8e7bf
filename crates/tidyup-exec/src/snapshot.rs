use std::fs::Metadata;
use std::path::Path;

use chrono::DateTime;
use chrono::Local;
use tidyup_core::DirectoryEntry;
use tidyup_core::Snapshot;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::ListingError;

/// Lists `root` down to `depth` levels below the top (0 = top level only),
/// siblings sorted by file name.
pub fn read_snapshot(root: &Path, depth: usize) -> Result<Snapshot, ListingError> {
    let mut top: Vec<DirectoryEntry> = Vec::new();
    let mut open: Vec<DirectoryEntry> = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(depth + 1)
        .sort_by_file_name();

    for item in walker {
        let item = item.map_err(|source| ListingError::Walk {
            path: source
                .path()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| root.display().to_string()),
            source,
        })?;
        let level = item.depth();

        while open.len() >= level {
            match open.pop() {
                Some(done) => attach(&mut open, &mut top, done),
                None => break,
            }
        }

        let metadata = item.metadata().map_err(|source| ListingError::Walk {
            path: item.path().display().to_string(),
            source,
        })?;
        let entry = to_entry(root, item.path(), &metadata)?;

        if entry.is_dir && level <= depth {
            open.push(entry);
        } else {
            attach(&mut open, &mut top, entry);
        }
    }

    while let Some(done) = open.pop() {
        attach(&mut open, &mut top, done);
    }

    let snapshot = Snapshot::new(depth, top);
    debug!(root = %root.display(), depth, entries = snapshot.len(), "snapshot read");
    Ok(snapshot)
}

fn attach(open: &mut [DirectoryEntry], top: &mut Vec<DirectoryEntry>, entry: DirectoryEntry) {
    match open.last_mut() {
        Some(parent) => parent.children.push(entry),
        None => top.push(entry),
    }
}

fn to_entry(root: &Path, path: &Path, metadata: &Metadata) -> Result<DirectoryEntry, ListingError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let display = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let modified = metadata.modified().map_err(|source| ListingError::Metadata {
        path: display.clone(),
        source,
    })?;

    Ok(DirectoryEntry {
        path: display,
        is_dir: metadata.is_dir(),
        size: metadata.len(),
        modified_at: DateTime::<Local>::from(modified),
        mode: mode_string(metadata),
        children: Vec::new(),
    })
}

fn mode_string(metadata: &Metadata) -> String {
    let file_type = metadata.file_type();
    let kind = if file_type.is_dir() {
        'd'
    } else if file_type.is_symlink() {
        'l'
    } else {
        '-'
    };

    let bits = permission_bits(metadata);
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6u32, 3, 0] {
        let triple = (bits >> shift) & 0o7;
        out.push(if triple & 0o4 != 0 { 'r' } else { '-' });
        out.push(if triple & 0o2 != 0 { 'w' } else { '-' });
        out.push(if triple & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    match (metadata.permissions().readonly(), metadata.is_dir()) {
        (true, true) => 0o555,
        (true, false) => 0o444,
        (false, true) => 0o755,
        (false, false) => 0o644,
    }
}
