use std::fmt::Write;

use super::state::DirectoryEntry;
use super::state::Snapshot;

const MODIFIED_FORMAT: &str = "%b %e  %Y";

/// One entry per line, sized and dated the way `ls -l` lays them out.
pub fn render_listing(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for entry in snapshot.flatten() {
        let _ = writeln!(out, "{}", render_entry(entry));
    }
    out
}

pub fn render_entry(entry: &DirectoryEntry) -> String {
    format!(
        "{:>8} {} {} {}",
        entry.size,
        entry.mode,
        entry.modified_at.format(MODIFIED_FORMAT),
        entry.display_path()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn entry(path: &str, is_dir: bool, size: u64, children: Vec<DirectoryEntry>) -> DirectoryEntry {
        DirectoryEntry {
            path: path.to_string(),
            is_dir,
            size,
            modified_at: Local
                .with_ymd_and_hms(2024, 3, 7, 12, 0, 0)
                .single()
                .expect("unambiguous time"),
            mode: if is_dir { "drwxr-xr-x" } else { "-rw-r--r--" }.to_string(),
            children,
        }
    }

    #[test]
    fn listing_is_pre_order_with_directory_suffix() {
        let snapshot = Snapshot::new(
            1,
            vec![
                entry("a.txt", false, 12, Vec::new()),
                entry("notes", true, 4096, vec![entry("notes/b.txt", false, 7, Vec::new())]),
            ],
        );

        assert_eq!(
            render_listing(&snapshot),
            concat!(
                "      12 -rw-r--r-- Mar  7  2024 a.txt\n",
                "    4096 drwxr-xr-x Mar  7  2024 notes/\n",
                "       7 -rw-r--r-- Mar  7  2024 notes/b.txt\n",
            )
        );
    }

    #[test]
    fn empty_snapshot_renders_nothing() {
        assert_eq!(render_listing(&Snapshot::new(0, Vec::new())), "");
    }
}
