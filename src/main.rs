use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use webp_batch::batch::{BatchContext, convert_batch};
use webp_batch::config::{self, ConverterConfig, Overrides};
use webp_batch::export::{self, ExportError};
use webp_batch::imaging::{QualitySetting, RustBackend, heic};
use webp_batch::output;
use webp_batch::results::Results;
use webp_batch::types::Candidate;

/// Flags for the convert command.
#[derive(clap::Args)]
struct ConvertArgs {
    /// Image files or directories (directories are walked recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(long, short, default_value = "webp")]
    out: PathBuf,

    /// WebP quality in percent (clamped to 70-100)
    #[arg(long, short)]
    quality: Option<u32>,

    /// Longest allowed edge in pixels
    #[arg(long)]
    max_dimension: Option<u32>,

    /// Also bundle all converted images into a zip archive
    #[arg(long)]
    archive: bool,

    /// Filename of the zip archive
    #[arg(long)]
    archive_name: Option<String>,

    /// Do not write individual .webp files
    #[arg(long)]
    no_files: bool,

    /// Write report.json with per-image statistics
    #[arg(long)]
    report: bool,
}

#[derive(Parser)]
#[command(name = "webp-batch")]
#[command(about = "Convert batches of images to size-constrained WebP")]
#[command(long_about = "\
Convert batches of images to size-constrained WebP

Accepts JPEG, PNG, GIF, BMP and AVIF directly. HEIC/HEIF files are
pre-converted when the build includes HEIC support. Images larger than the
maximum dimension are scaled down keeping their aspect ratio; smaller images
keep their size.

  webp-batch convert photos/ extra.heic --quality 90 --archive

Settings are read from ./webp-batch.toml when present.
Run 'webp-batch gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./webp-batch.toml, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert images to WebP
    Convert(ConvertArgs),
    /// Print a stock webp-batch.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Convert(args) => {
            let base = match &cli.config {
                Some(path) => config::load_config_file(path)?,
                None => config::load_config(Path::new(config::DEFAULT_CONFIG_FILE))?,
            };
            let config = base.with_overrides(Overrides {
                quality: args.quality,
                max_dimension: args.max_dimension,
                archive_name: args.archive_name.clone(),
            })?;
            run_convert(&args, &config)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run_convert(args: &ConvertArgs, config: &ConverterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let files = collect_inputs(&args.inputs);

    let quality = QualitySetting::new(config.conversion.quality());
    let heic_codec = heic::default_codec();
    let ctx = BatchContext {
        heic: heic_codec.as_ref(),
        quality: &quality,
        max_dimension: config.conversion.max_dimension,
    };
    let mut results = Results::new();

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_batch_event(&event) {
                println!("{}", line);
            }
        }
    });
    convert_batch(&RustBackend::new(), &ctx, files, &mut results, Some(tx));
    printer.join().map_err(|_| "output thread panicked")?;

    if !results.is_empty() {
        println!();
        output::print_record_table(results.all());
    }
    println!();
    output::print_summary(&results);

    if !args.no_files && !results.is_empty() {
        let paths = export::write_files(&results, &args.out)?;
        println!("Wrote {} files to {}", paths.len(), args.out.display());
    }

    if args.archive {
        let archiver = export::default_archiver();
        match export::write_archive(
            &results,
            archiver.as_ref(),
            &args.out,
            &config.export.archive_name,
        ) {
            Ok(path) => println!("Archive: {}", path.display()),
            Err(ExportError::Empty) => println!("Archive: nothing to export"),
            // The archive is one export action; its failure leaves the
            // converted files in place.
            Err(e) => {
                tracing::warn!("archive export failed: {e}");
                eprintln!("Archive export failed: {e}");
            }
        }
    }

    if args.report {
        std::fs::create_dir_all(&args.out)?;
        let path = args.out.join("report.json");
        std::fs::write(&path, serde_json::to_string_pretty(&results.report())?)?;
        println!("Report: {}", path.display());
    }

    Ok(())
}

/// Expand the input arguments into candidate files, in a deterministic order.
///
/// Directories are walked recursively and their files sorted by path; plain
/// file arguments keep their command-line position. Nothing is read here:
/// the batch reads each file when it gets to it. Entries the walk cannot
/// reach are reported and skipped.
fn collect_inputs(inputs: &[PathBuf]) -> Vec<Candidate> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        files.push(Candidate::on_disk(entry.path()));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("skipping unreadable entry: {e}");
                        eprintln!("Skipping: {e}");
                    }
                }
            }
        } else {
            files.push(Candidate::on_disk(input));
        }
    }
    files
}
