use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, error};
use rayon::prelude::*;

use crate::pathgen::DestFormat;
use crate::resolve::{DestResolver, Resolution};
use crate::select::oldest_timestamp;
use crate::tags::TagFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move,
    Copy,
}

/// Per-file state with explicit terminal states. Planning leaves each
/// record in `Planned`, `SkippedDuplicate`, or one of the error states;
/// execution advances `Planned` to `Executed` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Planned(PathBuf),
    SkippedDuplicate(PathBuf),
    NoTimestamp,
    ExtractionFailed(String),
    ResolveFailed(String),
    Executed(PathBuf),
    Failed { dest: PathBuf, error: String },
}

#[derive(Debug, Clone)]
pub struct TransferRecord {
    pub source: PathBuf,
    pub action: Action,
    pub outcome: Outcome,
}

/// Serial planning pass: classifies one file at a time, reserving
/// destination paths as it goes. Never touches the filesystem beyond
/// reads, so dry runs and real runs plan identically.
pub struct Planner {
    dest_root: PathBuf,
    format: DestFormat,
    filter: TagFilter,
    resolver: DestResolver,
    day_begins: u32,
    action: Action,
    renamed: u64,
}

impl Planner {
    pub fn new(
        dest_root: &Path,
        format: DestFormat,
        filter: TagFilter,
        resolver: DestResolver,
        day_begins: u32,
        action: Action,
    ) -> Self {
        Self {
            dest_root: dest_root.to_path_buf(),
            format,
            filter,
            resolver,
            day_begins,
            action,
            renamed: 0,
        }
    }

    pub fn plan_file(
        &mut self,
        source: &Path,
        metadata: &BTreeMap<String, String>,
    ) -> TransferRecord {
        let outcome = self.plan_outcome(source, metadata);
        TransferRecord {
            source: source.to_path_buf(),
            action: self.action,
            outcome,
        }
    }

    /// Files that needed a collision suffix so far.
    pub fn renamed_count(&self) -> u64 {
        self.renamed
    }

    fn plan_outcome(&mut self, source: &Path, metadata: &BTreeMap<String, String>) -> Outcome {
        let Some(selected) = oldest_timestamp(metadata, &self.filter, self.day_begins) else {
            debug!("{}: no valid dates found using the specified tags", source.display());
            return Outcome::NoTimestamp;
        };
        debug!(
            "{}: {} (from {})",
            source.display(),
            selected.datetime.local,
            selected.tags.join(", ")
        );

        let dir = self.dest_root.join(self.format.dir_for(&selected.datetime));
        let original = source
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file");
        let filename = self.format.filename_for(&selected.datetime, original);

        match self.resolver.resolve(&dir, &filename, source) {
            Ok(Resolution::Unique(dest)) => {
                if dest.file_name().and_then(|n| n.to_str()) != Some(filename.as_str()) {
                    self.renamed += 1;
                }
                debug!("{}: destination {}", source.display(), dest.display());
                Outcome::Planned(dest)
            }
            Ok(Resolution::Duplicate(dest)) => Outcome::SkippedDuplicate(dest),
            Err(e) => Outcome::ResolveFailed(e.to_string()),
        }
    }
}

/// Execute every planned record, serially or on a dedicated pool of
/// `jobs` workers. Outcomes are updated in place; callers tally
/// statistics once all workers have finished.
pub fn execute(records: &mut [TransferRecord], jobs: usize) -> anyhow::Result<()> {
    if jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
        pool.install(|| records.par_iter_mut().for_each(execute_one));
    } else {
        records.iter_mut().for_each(execute_one);
    }
    Ok(())
}

fn execute_one(record: &mut TransferRecord) {
    let Outcome::Planned(dest) = &record.outcome else {
        return;
    };
    let dest = dest.clone();
    match transfer(&record.source, &dest, record.action) {
        Ok(()) => record.outcome = Outcome::Executed(dest),
        Err(e) => {
            error!("Error: {} -> {}: {}", record.source.display(), dest.display(), e);
            record.outcome = Outcome::Failed {
                dest,
                error: e.to_string(),
            };
        }
    }
}

fn transfer(source: &Path, dest: &Path, action: Action) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    match action {
        Action::Copy => copy_preserving_mtime(source, dest),
        Action::Move => match fs::rename(source, dest) {
            Ok(()) => Ok(()),
            // rename cannot cross filesystems
            Err(_) => {
                copy_preserving_mtime(source, dest)?;
                fs::remove_file(source)
            }
        },
    }
}

fn copy_preserving_mtime(source: &Path, dest: &Path) -> io::Result<()> {
    let mtime = filetime::FileTime::from_last_modification_time(&fs::metadata(source)?);
    fs::copy(source, dest)?;
    filetime::set_file_mtime(dest, mtime)
}
