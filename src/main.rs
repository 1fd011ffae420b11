use std::io::Write as _;
use std::path::PathBuf;

use clap::Parser;
use log::{info, LevelFilter};

use mediasort::{run, RunStats, SortOptions};

#[derive(Parser)]
#[command(
    name = "mediasort",
    version,
    about = "Sort files (primarily photos and videos) into folders by date using EXIF and other metadata"
)]
struct Cli {
    /// Source directory
    src_dir: PathBuf,

    /// Destination directory
    dest_dir: PathBuf,

    /// Search src_dir recursively
    #[arg(short, long)]
    recursive: bool,

    /// Copy files instead of move
    #[arg(short, long)]
    copy: bool,

    /// Dry run: report what would happen without moving or copying anything
    #[arg(short = 't', long = "test")]
    test: bool,

    /// Show detailed file processing information
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, visible_alias = "quiet")]
    silent: bool,

    /// Destination folder structure as a strftime format; forward slashes
    /// separate subdirectories regardless of your OS convention
    #[arg(long, default_value = "%Y/%m-%b")]
    sort: String,

    /// Rename files using a strftime format (default keeps the original name)
    #[arg(long)]
    rename: Option<String>,

    /// On collisions, append the original filename as well as a number
    #[arg(long)]
    keep_filename: bool,

    /// Keep duplicate files anyway (after renaming)
    #[arg(long)]
    keep_duplicates: bool,

    /// Hour of day that a new day begins (0-23); groups early-morning
    /// files with the previous day
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=23))]
    day_begins: u32,

    /// Tag groups to ignore for date information (File is always ignored)
    #[arg(long, num_args = 1..)]
    ignore_groups: Vec<String>,

    /// Full tag names to ignore for date information (e.g. EXIF:CreateDate)
    #[arg(long, num_args = 1..)]
    ignore_tags: Vec<String>,

    /// Restrict the date search to these tag groups (e.g. EXIF)
    #[arg(long, num_args = 1..)]
    use_only_groups: Vec<String>,

    /// Restrict the date search to these full tag names (e.g. EXIF:CreateDate)
    #[arg(long, num_args = 1..)]
    use_only_tags: Vec<String>,

    /// Glob patterns for files to exclude (e.g. "*.raw" "backup/*")
    #[arg(long, num_args = 1..)]
    exclude: Vec<String>,

    /// Number of parallel workers for file transfers
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// exiftool executable to run
    #[arg(long, default_value = "exiftool")]
    exiftool: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.silent {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let options = SortOptions {
        src_dir: cli.src_dir,
        dest_dir: cli.dest_dir,
        sort_format: cli.sort,
        rename_format: cli.rename,
        recursive: cli.recursive,
        copy_files: cli.copy,
        dry_run: cli.test,
        remove_duplicates: !cli.keep_duplicates,
        keep_filename: cli.keep_filename,
        day_begins: cli.day_begins,
        ignore_groups: cli.ignore_groups,
        ignore_tags: cli.ignore_tags,
        use_only_groups: cli.use_only_groups,
        use_only_tags: cli.use_only_tags,
        exclude: cli.exclude,
        jobs: cli.jobs.max(1),
        exiftool: cli.exiftool,
    };

    let stats = run(&options)?;
    print_summary(&stats, options.copy_files, options.dry_run);
    Ok(())
}

fn print_summary(stats: &RunStats, copy: bool, dry_run: bool) {
    let action = if copy { "copy" } else { "move" };
    let prefix = if dry_run { "Would " } else { "" };
    info!("");
    info!("--- {}Summary ---", if dry_run { "Dry Run " } else { "" });
    info!("{}{}: {} files", prefix, action, stats.processed);
    if stats.skipped_no_date > 0 {
        info!("Skipped (no date): {}", stats.skipped_no_date);
    }
    if stats.skipped_hidden > 0 {
        info!("Skipped (hidden): {}", stats.skipped_hidden);
    }
    if stats.skipped_duplicate > 0 {
        info!("Skipped (duplicate): {}", stats.skipped_duplicate);
    }
    if stats.skipped_excluded > 0 {
        info!("Skipped (excluded): {}", stats.skipped_excluded);
    }
    if stats.renamed_collision > 0 {
        info!("Renamed (collision): {}", stats.renamed_collision);
    }
    if stats.errors > 0 {
        info!("Errors: {}", stats.errors);
    }
}
