use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use log::{error, info, warn, Level};

use censtats::config::{
    AllowList, EntropyConfig, LengthConfig, NonredundantConfig, RepeatTypeCollapser, StatusConfig,
};
use censtats::entropy::shannon_entropy_windows;
use censtats::error::Result;
use censtats::flatten::FlattenPolicy;
use censtats::length::hor_array_lengths;
use censtats::nonredundant::nonredundant_cens;
use censtats::reader::{read_hor_rows, read_length_rows, read_repeatmasker};
use censtats::status::{build_references, check_cens_status};
use censtats::writer::{
    entropy_frame, length_frame, length_rows_frame, paired_frame, status_frame, write_tsv,
};

/// Centromere statistics from RepeatMasker and HOR annotations.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Worker threads; 0 lets rayon decide.
    #[arg(short = 't', long, global = true, default_value_t = 0)]
    threads: usize,

    /// Log per-contig progress.
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate HOR array lengths.
    Length(LengthArgs),
    /// Classify centromeres as correct, partial or mismapped.
    Status(StatusArgs),
    /// Shannon index of repeat composition in fixed windows.
    Entropy(EntropyArgs),
    /// Pair length calls from two assemblies.
    Nonredundant(NonredundantArgs),
}

#[derive(Args, Debug)]
struct LengthArgs {
    /// HOR structural-variation rows.
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// RepeatMasker track used to veto merges across non-satellite repeats.
    #[arg(short = 'r', long)]
    input_rm: Option<PathBuf>,

    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Also write arrays split by strand.
    #[arg(long)]
    output_strand: Option<PathBuf>,

    #[arg(long, default_value_t = 256)]
    bp_merge_units: i64,

    #[arg(long, default_value_t = 7000)]
    bp_merge_blks: i64,

    #[arg(long, default_value_t = 2)]
    min_hor_mons: i64,

    #[arg(long, default_value_t = 2)]
    min_grp_hor_units: usize,

    #[arg(long, default_value_t = 10)]
    min_arr_hor_units: u32,

    /// Repeat classes that may be merged across; defaults to satellites and
    /// simple repeats.
    #[arg(long, value_delimiter = ',')]
    allow_rclasses: Vec<String>,
}

#[derive(Args, Debug)]
struct StatusArgs {
    /// Query RepeatMasker track.
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Reference RepeatMasker track.
    #[arg(short = 'r', long)]
    reference: PathBuf,

    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Flatten with a sliding-window majority instead of the neighbor rule.
    #[arg(long)]
    window_size: Option<usize>,

    #[arg(long, default_value_t = 0.3)]
    dst_perc_thr: f64,

    #[arg(long, default_value_t = 100_000)]
    edge_len: i64,

    #[arg(long, default_value_t = 0.7)]
    edge_perc_alr_thr: f64,

    #[arg(long, default_value_t = 200_000)]
    hor_len_thr: i64,

    /// Only compare chr13 and chr21 against each other.
    #[arg(long)]
    restrict_13_21: bool,
}

#[derive(Args, Debug)]
struct EntropyArgs {
    /// RepeatMasker track.
    #[arg(short = 'i', long)]
    input: PathBuf,

    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    #[arg(short = 'w', long, default_value_t = 5000)]
    window: i64,

    /// Repeat types left out; defaults to HSat1A and Simple_repeat.
    #[arg(long, value_delimiter = ',')]
    filter_repeats: Vec<String>,
}

#[derive(Args, Debug)]
struct NonredundantArgs {
    #[arg(short = 'l', long)]
    left: PathBuf,

    #[arg(short = 'r', long)]
    right: PathBuf,

    /// Directory for `both.tsv`, `left.tsv`, `right.tsv` and the dupe tables.
    #[arg(short = 'o', long)]
    outdir: PathBuf,

    #[arg(long, default_value_t = 1000)]
    bp_diff: i64,
}

fn main() {
    let start = Instant::now();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::Debug } else { Level::Info };
    if let Err(e) = simple_logger::init_with_level(level) {
        eprintln!("Failed to initialize logger: {e}");
    }

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build_global()
    {
        warn!("Could not configure thread pool: {e}");
    }

    if let Err(e) = run(cli.command) {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("Elapsed time: {:?}", start.elapsed());
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Length(args) => length(args),
        Command::Status(args) => status(args),
        Command::Entropy(args) => entropy(args),
        Command::Nonredundant(args) => nonredundant(args),
    }
}

fn length(args: LengthArgs) -> Result<()> {
    let config = LengthConfig {
        bp_merge_units: args.bp_merge_units,
        bp_merge_blks: args.bp_merge_blks,
        min_hor_mons: args.min_hor_mons,
        min_grp_hor_units: args.min_grp_hor_units,
        min_arr_hor_units: args.min_arr_hor_units,
        merge_rclasses: if args.allow_rclasses.is_empty() {
            AllowList::default()
        } else {
            AllowList::new(args.allow_rclasses)
        },
        ..LengthConfig::default()
    };

    let rows = read_hor_rows(&args.input)?;
    let repeats = args
        .input_rm
        .as_deref()
        .map(|path| read_repeatmasker(path, &RepeatTypeCollapser::identity()))
        .transpose()?;

    let lengths = hor_array_lengths(rows, repeats, &config, args.output_strand.is_some())?;
    write_tsv(&mut length_frame(&lengths.arrays, false)?, args.output.as_deref())?;
    if let Some(path) = args.output_strand.as_deref() {
        write_tsv(&mut length_frame(&lengths.stranded, true)?, Some(path))?;
    }
    Ok(())
}

fn status(args: StatusArgs) -> Result<()> {
    let config = StatusConfig {
        flatten: args
            .window_size
            .map_or(FlattenPolicy::Neighbor, |window_size| FlattenPolicy::WindowMajority {
                window_size,
            }),
        dst_perc_thr: args.dst_perc_thr,
        edge_len: args.edge_len,
        edge_perc_alr_thr: args.edge_perc_alr_thr,
        hor_len_thr: args.hor_len_thr,
        restrict_13_21: args.restrict_13_21,
        ..StatusConfig::default()
    };
    let collapser = RepeatTypeCollapser::default();

    let references = build_references(read_repeatmasker(&args.reference, &collapser)?, &config)?;
    let query = read_repeatmasker(&args.input, &collapser)?;
    let calls = check_cens_status(query, &references, &config)?;
    write_tsv(&mut status_frame(&calls)?, args.output.as_deref())
}

fn entropy(args: EntropyArgs) -> Result<()> {
    let mut config = EntropyConfig {
        window_size: args.window,
        ..EntropyConfig::default()
    };
    if !args.filter_repeats.is_empty() {
        config.filter_repeats = args.filter_repeats.into_iter().collect();
    }

    let records = read_repeatmasker(&args.input, &RepeatTypeCollapser::default())?;
    let windows = shannon_entropy_windows(records, &config)?;
    write_tsv(&mut entropy_frame(&windows)?, args.output.as_deref())
}

fn nonredundant(args: NonredundantArgs) -> Result<()> {
    let config = NonredundantConfig {
        bp_diff: args.bp_diff,
    };
    let left = read_length_rows(&args.left)?;
    let right = read_length_rows(&args.right)?;
    let out = nonredundant_cens(left, right, &config)?;

    std::fs::create_dir_all(&args.outdir)?;
    let dir = args.outdir.as_path();
    write_tsv(&mut paired_frame(&out.both)?, Some(&dir.join("both.tsv")))?;
    write_tsv(&mut length_rows_frame(&out.left_only)?, Some(&dir.join("left.tsv")))?;
    write_tsv(&mut length_rows_frame(&out.right_only)?, Some(&dir.join("right.tsv")))?;
    write_tsv(&mut length_rows_frame(&out.left_dupes)?, Some(&dir.join("dupes_left.tsv")))?;
    write_tsv(&mut length_rows_frame(&out.right_dupes)?, Some(&dir.join("dupes_right.tsv")))?;
    Ok(())
}
