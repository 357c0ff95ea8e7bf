use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use tidyup_core::ApplyReport;
use tidyup_core::ItemKind;
use tidyup_core::ReviewItem;
use tracing::debug;
use tracing::info;

use crate::error::ApplyError;

/// The two filesystem primitives a plan needs, plus the lookups used to
/// guard them.
pub trait PlanFs {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn create_dir_all(&mut self, path: &Path) -> io::Result<()>;
    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl PlanFs for RealFs {
    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

/// Records what a plan would do without touching the disk. Lookups replay the
/// recorded steps newest first on top of the real filesystem, so entries
/// under a moved directory follow it.
#[derive(Debug, Default, Clone)]
pub struct DryRunFs {
    steps: Vec<Step>,
    pub log: Vec<String>,
}

#[derive(Debug, Clone)]
enum Step {
    Created(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Missing,
    Directory,
    Other,
}

impl DryRunFs {
    fn presence(&self, path: &Path) -> Presence {
        let mut current = path.to_path_buf();
        for step in self.steps.iter().rev() {
            match step {
                Step::Created(dir) => {
                    if current == *dir {
                        return Presence::Directory;
                    }
                    // Fresh directories start out empty.
                    if current.starts_with(dir) {
                        return Presence::Missing;
                    }
                }
                Step::Renamed { from, to } => {
                    if let Ok(rest) = current.strip_prefix(to) {
                        current = if rest.as_os_str().is_empty() {
                            from.clone()
                        } else {
                            from.join(rest)
                        };
                    } else if current.starts_with(from) {
                        return Presence::Missing;
                    }
                }
            }
        }

        match fs::symlink_metadata(&current) {
            Ok(_) if current.is_dir() => Presence::Directory,
            Ok(_) => Presence::Other,
            Err(_) => Presence::Missing,
        }
    }
}

impl PlanFs for DryRunFs {
    fn exists(&self, path: &Path) -> bool {
        self.presence(path) != Presence::Missing
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.presence(path) == Presence::Directory
    }

    fn create_dir_all(&mut self, path: &Path) -> io::Result<()> {
        let mut missing = Vec::new();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            match self.presence(ancestor) {
                Presence::Directory => break,
                Presence::Missing => missing.push(ancestor.to_path_buf()),
                Presence::Other => {
                    return Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} exists and is not a directory", ancestor.display()),
                    ));
                }
            }
        }
        if missing.is_empty() {
            return Ok(());
        }

        self.log.push(format!("mkdir -p {}", path.display()));
        self.steps
            .extend(missing.into_iter().rev().map(Step::Created));
        Ok(())
    }

    fn rename(&mut self, from: &Path, to: &Path) -> io::Result<()> {
        self.log
            .push(format!("mv {} {}", from.display(), to.display()));
        self.steps.push(Step::Renamed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        Ok(())
    }
}

/// Runs the plan in its stored order and stops at the first failure. Work
/// already done stays done.
pub fn apply_plan<F: PlanFs>(
    disk: &mut F,
    root: &Path,
    items: &[ReviewItem],
) -> Result<ApplyReport, ApplyError> {
    let mut report = ApplyReport::default();

    for item in items {
        match item.kind {
            ItemKind::Create if !item.rejected => {
                let path = resolve(root, &item.target);
                disk.create_dir_all(&path).map_err(|source| ApplyError::Io {
                    action: "create",
                    path: item.target.clone(),
                    source,
                })?;
                debug!(destination = %item.target, "directory ready");
                report.created += 1;
            }
            ItemKind::Move if !item.rejected => {
                move_entry(disk, root, item)?;
                report.moved += 1;
            }
            _ => report.skipped += 1,
        }
    }

    info!(
        created = report.created,
        moved = report.moved,
        skipped = report.skipped,
        "plan applied"
    );
    Ok(report)
}

fn move_entry<F: PlanFs>(disk: &mut F, root: &Path, item: &ReviewItem) -> Result<(), ApplyError> {
    let from = resolve(root, &item.source);
    let to = resolve(root, &item.target);

    if !disk.exists(&from) {
        return Err(ApplyError::MissingSource(item.source.clone()));
    }
    if disk.exists(&to) {
        return Err(ApplyError::DestinationExists(item.target.clone()));
    }
    if let Some(parent) = to.parent() {
        if !disk.is_dir(parent) {
            return Err(ApplyError::MissingParent(item.target.clone()));
        }
    }

    disk.rename(&from, &to).map_err(|source| ApplyError::Io {
        action: "move",
        path: item.source.clone(),
        source,
    })?;
    debug!(source = %item.source, destination = %item.target, "moved");
    Ok(())
}

fn resolve(root: &Path, relative: &str) -> PathBuf {
    root.join(relative.trim_end_matches('/'))
}
