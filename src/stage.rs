//! Copying a fetched work tree into its install directory.

use std::fs;
use std::path::Path;

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Counts of what [`copy_tree`] created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopySummary {
    pub directories: usize,
    pub files: usize,
    pub links: usize,
}

/// Recursively copy `source` into `destination`, creating it if needed.
///
/// Symbolic links are recreated as links rather than followed.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<CopySummary> {
    let mut summary = CopySummary::default();
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(|e| {
            Error::Io(e.into_io_error().unwrap_or_else(|| {
                std::io::Error::other("filesystem loop while copying")
            }))
        })?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| Error::config(format!("{} is outside {}", entry.path().display(), source.display())))?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            summary.directories += 1;
        } else if file_type.is_symlink() {
            copy_link(entry.path(), &target)?;
            summary.links += 1;
        } else {
            fs::copy(entry.path(), &target)?;
            summary.files += 1;
        }
    }
    debug!(
        "Copied {} files, {} links and {} directories to {}",
        summary.files,
        summary.links,
        summary.directories,
        destination.display()
    );
    Ok(summary)
}

#[cfg(unix)]
fn copy_link(link: &Path, target: &Path) -> Result<()> {
    let points_to = fs::read_link(link)?;
    std::os::unix::fs::symlink(points_to, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_link(link: &Path, target: &Path) -> Result<()> {
    fs::copy(link, target)?;
    Ok(())
}

/// Move the work tree into `install`, keeping the work tree if `keep`.
pub fn stage(work: &Path, install: &Path, keep: bool) -> Result<()> {
    if work == install {
        return Ok(());
    }
    info!("Installing {} into {}", work.display(), install.display());
    copy_tree(work, install)?;
    if keep {
        info!("Keeping working directory {}", work.display());
    } else {
        fs::remove_dir_all(work)?;
        debug!("Removed {}", work.display());
    }
    Ok(())
}
