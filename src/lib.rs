pub mod date;
pub mod error;
pub mod exiftool;
pub mod pathgen;
pub mod resolve;
pub mod select;
pub mod tags;
pub mod transfer;

use std::path::PathBuf;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::exiftool::ExifTool;
use crate::pathgen::DestFormat;
use crate::resolve::DestResolver;
use crate::tags::TagFilter;
use crate::transfer::{execute, Action, Outcome, Planner, TransferRecord};

/// Files per exiftool request. Keeps single responses bounded while
/// amortizing the per-request overhead of the persistent process.
const EXTRACT_BATCH: usize = 256;

/// Configuration for one sorting run; fields mirror the CLI surface.
#[derive(Debug, Clone)]
pub struct SortOptions {
    pub src_dir: PathBuf,
    pub dest_dir: PathBuf,
    pub sort_format: String,
    pub rename_format: Option<String>,
    pub recursive: bool,
    pub copy_files: bool,
    pub dry_run: bool,
    pub remove_duplicates: bool,
    pub keep_filename: bool,
    pub day_begins: u32,
    pub ignore_groups: Vec<String>,
    pub ignore_tags: Vec<String>,
    pub use_only_groups: Vec<String>,
    pub use_only_tags: Vec<String>,
    pub exclude: Vec<String>,
    pub jobs: usize,
    pub exiftool: String,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::new(),
            dest_dir: PathBuf::new(),
            sort_format: "%Y/%m-%b".to_string(),
            rename_format: None,
            recursive: false,
            copy_files: false,
            dry_run: false,
            remove_duplicates: true,
            keep_filename: false,
            day_begins: 0,
            ignore_groups: Vec::new(),
            ignore_tags: Vec::new(),
            use_only_groups: Vec::new(),
            use_only_tags: Vec::new(),
            exclude: Vec::new(),
            jobs: 1,
            exiftool: "exiftool".to_string(),
        }
    }
}

/// Aggregate counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub scanned: u64,
    pub processed: u64,
    pub skipped_no_date: u64,
    pub skipped_hidden: u64,
    pub skipped_duplicate: u64,
    pub skipped_excluded: u64,
    pub renamed_collision: u64,
    pub errors: u64,
}

/// Run the full pipeline: enumerate, extract, plan, execute.
///
/// Per-file failures are tallied in the returned stats; only fatal
/// configuration errors (bad format string, bad glob, missing source
/// directory, exiftool unavailable) return `Err`.
pub fn run(options: &SortOptions) -> anyhow::Result<RunStats> {
    if !options.src_dir.is_dir() {
        bail!("source directory {} does not exist", options.src_dir.display());
    }

    let format = DestFormat::new(&options.sort_format, options.rename_format.as_deref())?;
    let filter = TagFilter::new(
        &options.ignore_groups,
        &options.ignore_tags,
        &options.use_only_groups,
        &options.use_only_tags,
    );
    let resolver = DestResolver::new(options.remove_duplicates, options.keep_filename);
    let action = if options.copy_files { Action::Copy } else { Action::Move };
    let mut planner = Planner::new(
        &options.dest_dir,
        format,
        filter,
        resolver,
        options.day_begins,
        action,
    );
    let patterns = compile_patterns(&options.exclude)?;

    let mut stats = RunStats::default();
    let files = enumerate(options, &patterns, &mut stats);
    if files.is_empty() {
        info!("No files to process.");
        return Ok(stats);
    }

    info!("Preprocessing with ExifTool.  May take a while for a large number of files.");
    let mut extractor = ExifTool::open(&options.exiftool)
        .with_context(|| format!("cannot start metadata extractor {:?}", options.exiftool))?;

    let progress = planning_progress(files.len() as u64);
    let mut records: Vec<TransferRecord> = Vec::with_capacity(files.len());
    for chunk in files.chunks(EXTRACT_BATCH) {
        let mut batch = extractor
            .metadata(chunk)
            .context("metadata extractor failed")?;
        for path in chunk {
            match batch.remove(path) {
                Some(metadata) => records.push(planner.plan_file(path, &metadata)),
                None => {
                    debug!("{}: no metadata record returned", path.display());
                    records.push(TransferRecord {
                        source: path.clone(),
                        action,
                        outcome: Outcome::ExtractionFailed("no metadata record returned".into()),
                    });
                }
            }
            progress.inc(1);
        }
    }
    progress.finish_and_clear();
    drop(extractor);

    stats.renamed_collision = planner.renamed_count();
    for record in &records {
        match &record.outcome {
            Outcome::Planned(_) => stats.processed += 1,
            Outcome::SkippedDuplicate(_) => stats.skipped_duplicate += 1,
            Outcome::NoTimestamp => stats.skipped_no_date += 1,
            Outcome::ExtractionFailed(reason) => {
                warn!("{}: {}", record.source.display(), reason);
                stats.errors += 1;
            }
            Outcome::ResolveFailed(reason) => {
                warn!("{}: {}", record.source.display(), reason);
                stats.errors += 1;
            }
            Outcome::Executed(_) | Outcome::Failed { .. } => {}
        }
    }

    if options.dry_run {
        return Ok(stats);
    }

    execute(&mut records, options.jobs)?;
    for record in &records {
        if let Outcome::Failed { .. } = record.outcome {
            stats.errors += 1;
            stats.processed = stats.processed.saturating_sub(1);
        }
    }

    Ok(stats)
}

/// Collect candidate files: dotfiles are skipped unconditionally,
/// exclusion globs match either the file name or the full path. Sorted
/// so planning order (and therefore collision numbering) is stable.
fn enumerate(
    options: &SortOptions,
    patterns: &[glob::Pattern],
    stats: &mut RunStats,
) -> Vec<PathBuf> {
    let depth = if options.recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();

    for entry in WalkDir::new(&options.src_dir).max_depth(depth) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("scan error: {e}");
                stats.errors += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        stats.scanned += 1;

        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') {
            debug!("{}: hidden file, skipped", entry.path().display());
            stats.skipped_hidden += 1;
            continue;
        }
        if patterns
            .iter()
            .any(|p| p.matches(&name) || p.matches_path(entry.path()))
        {
            debug!("{}: excluded by pattern", entry.path().display());
            stats.skipped_excluded += 1;
            continue;
        }
        files.push(entry.path().to_path_buf());
    }

    files.sort();
    files
}

fn compile_patterns(globs: &[String]) -> anyhow::Result<Vec<glob::Pattern>> {
    globs
        .iter()
        .map(|g| glob::Pattern::new(g).with_context(|| format!("invalid exclude pattern {g:?}")))
        .collect()
}

fn planning_progress(total: u64) -> ProgressBar {
    // debug logging and the bar would fight over the terminal
    if log::log_enabled!(log::Level::Debug) || !log::log_enabled!(log::Level::Info) {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40}] {pos}/{len} classifying files")
            .unwrap(),
    );
    pb
}
