//! Walking a world directory and applying a per-file action to a copy of it.
use std::{
    fs::{self, File},
    path::Path,
    time::SystemTime,
};

use walkdir::WalkDir;

use crate::error::MapperError;

pub mod map;
pub mod merge;

pub use map::{MapOptions, WorldMapper, run_map};
pub use merge::{WorldMerger, run_merge};

/// Totals for one run over a world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub files_copied: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub regions_processed: usize,
    pub regions_removed: usize,
    pub regions_failed: usize,
    pub regions_skipped: usize,
}

impl BatchReport {
    fn record(&mut self, region: bool, outcome: FileOutcome) {
        match (region, outcome) {
            (_, FileOutcome::Copied) => self.files_copied += 1,
            (true, FileOutcome::Skipped) => self.regions_skipped += 1,
            (false, FileOutcome::Skipped) => self.files_skipped += 1,
            (_, FileOutcome::Processed) => self.regions_processed += 1,
            (_, FileOutcome::Removed) => self.regions_removed += 1,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.files_failed > 0 || self.regions_failed > 0
    }

    pub fn log(&self) {
        log::info!(
            "{} regions processed, {} removed, {} skipped, {} failed; {} files copied, {} skipped, {} failed",
            self.regions_processed,
            self.regions_removed,
            self.regions_skipped,
            self.regions_failed,
            self.files_copied,
            self.files_skipped,
            self.files_failed
        );
    }
}

/// What happened to one file of the walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    /// Copied verbatim.
    Copied,
    /// Left alone because the destination is already current.
    Skipped,
    /// Region rewritten chunk by chunk.
    Processed,
    /// Region ended up without chunks and was deleted.
    Removed,
}

/// Per-file actions of a walk. Errors are confined to the file at hand.
pub trait WorldVisitor {
    fn visit_region(&mut self, src: &Path, dest: &Path) -> Result<FileOutcome, MapperError>;

    fn visit_file(&mut self, src: &Path, dest: &Path) -> Result<FileOutcome, MapperError>;

    /// Called after a visit failed, before the walk moves on.
    fn discard(&mut self, _dest: &Path) {}
}

pub fn is_region_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "mca")
}

/// Mirrors `src` into `dest`: directories are recreated, `.mca` files go to
/// [`WorldVisitor::visit_region`], anything else to
/// [`WorldVisitor::visit_file`]. Entries are visited in name order, and an
/// entry that cannot be listed or stat'ed counts as a failed file.
pub fn walk(src: &Path, dest: &Path, visitor: &mut impl WorldVisitor, report: &mut BatchReport) {
    let mut entries = WalkDir::new(src)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(src).display().to_string();
                log::error!("Couldn't read {path}: {err}");
                report.files_failed += 1;
                continue;
            }
        };
        let path = entry.path();
        let Ok(relative) = path.strip_prefix(src) else {
            continue;
        };
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            if let Err(err) = fs::create_dir_all(&target) {
                log::error!("Couldn't create {}: {err}", target.display());
                report.files_failed += 1;
                entries.skip_current_dir();
            }
            continue;
        }

        let region = is_region_file(path);
        let result = if region {
            visitor.visit_region(path, &target)
        } else {
            visitor.visit_file(path, &target)
        };
        match result {
            Ok(outcome) => report.record(region, outcome),
            Err(err) => {
                log::error!("Error processing {}: {err}", path.display());
                visitor.discard(&target);
                if region {
                    report.regions_failed += 1;
                } else {
                    report.files_failed += 1;
                }
            }
        }
    }
}

/// Creates `dest` when missing and rejects it when it is not a directory or
/// is the source itself.
pub(crate) fn prepare_destination(src: &Path, dest: &Path) -> Result<(), MapperError> {
    if !src.is_dir() {
        return Err(MapperError::InvalidArguments(format!(
            "Source '{}' must be existing world directory.",
            src.display()
        )));
    }
    if !dest.exists() {
        fs::create_dir_all(dest).map_err(|err| {
            MapperError::InvalidArguments(format!(
                "Couldn't create destination '{}': {err}",
                dest.display()
            ))
        })?;
    }
    if !dest.is_dir() {
        return Err(MapperError::InvalidArguments(format!(
            "Destination '{}' is not directory.",
            dest.display()
        )));
    }

    let same = match (src.canonicalize(), dest.canonicalize()) {
        (Ok(src), Ok(dest)) => src == dest,
        _ => true,
    };
    if same {
        return Err(MapperError::InvalidArguments(
            "Destination directory cannot be same as source directory.".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn copy_file(src: &Path, dest: &Path) -> Result<(), MapperError> {
    fs::copy(src, dest)
        .map(|_| ())
        .map_err(MapperError::io("Couldn't copy to", dest))
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

/// The destination exists and carries the source's modification time.
pub(crate) fn is_up_to_date(src: &Path, dest: &Path) -> bool {
    match (modified(src), modified(dest)) {
        (Some(src), Some(dest)) => src == dest,
        _ => false,
    }
}

pub(crate) fn sync_modified(src: &Path, dest: &Path) -> Result<(), MapperError> {
    let time = fs::metadata(src)
        .and_then(|meta| meta.modified())
        .map_err(MapperError::io("Couldn't stat", src))?;
    File::options()
        .write(true)
        .open(dest)
        .and_then(|file| file.set_modified(time))
        .map_err(MapperError::io("Couldn't set modification time of", dest))
}
