//! xlsxmeta command line tool
//!
//! Usage:
//!   xlsxmeta extract [-o out.json|out.rs] [-p] [-m N] [--no-styles] [--no-images] <file>
//!   xlsxmeta compare [-d] <file1> <file2>
//!   xlsxmeta search -p <pattern> [-r] <dir>
//!   xlsxmeta version

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;
use xlsxmeta::{quick_extract, Extractor, Metadata, Options};

#[derive(Parser)]
#[command(name = "xlsxmeta", about = "Extract metadata from Excel workbooks.")]
struct Cli {
    /// Log extraction details to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract metadata from a workbook.
    Extract {
        /// Write to a file instead of stdout; `.json` or `.rs` picks the format.
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Indent JSON output.
        #[arg(short, long)]
        pretty: bool,

        /// Maximum cells per sheet (0 for unlimited).
        #[arg(short, long, env = "XLSXMETA_MAX_CELLS", default_value_t = 0)]
        max_cells: usize,

        /// Leave out the style table.
        #[arg(long)]
        no_styles: bool,

        /// Leave out images.
        #[arg(long)]
        no_images: bool,

        file: PathBuf,
    },

    /// Compare sheet and cell counts of two workbooks.
    Compare {
        /// Show per-sheet names and cell counts.
        #[arg(short, long)]
        detail: bool,

        file1: PathBuf,
        file2: PathBuf,
    },

    /// Find workbooks whose sheet names or cell text contain a pattern.
    Search {
        #[arg(short, long)]
        pattern: String,

        /// Search subdirectories too.
        #[arg(short, long)]
        recursive: bool,

        dir: PathBuf,
    },

    /// Print the version.
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Extract {
            output,
            pretty,
            max_cells,
            no_styles,
            no_images,
            file,
        } => {
            let options = Options::default()
                .with_styles(!no_styles)
                .with_images(!no_images)
                .with_max_cells_per_sheet(max_cells);
            extract(&file, output.as_deref(), pretty, options)
        }
        Command::Compare {
            detail,
            file1,
            file2,
        } => compare(&file1, &file2, detail),
        Command::Search {
            pattern,
            recursive,
            dir,
        } => search(&dir, &pattern, recursive),
        Command::Version => {
            println!("xlsxmeta version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn extract(file: &Path, output: Option<&Path>, pretty: bool, options: Options) -> Result<()> {
    let mut extractor = Extractor::open(file, options)
        .with_context(|| format!("failed to open {}", file.display()))?;

    match output {
        None => {
            let json = extractor
                .extract_to_json(pretty)
                .context("failed to extract metadata")?;
            println!("{json}");
        }
        Some(path) => {
            extractor
                .extract_to_file(path, pretty)
                .context("failed to save to file")?;
            println!("Metadata saved to {}", path.display());
        }
    }

    extractor.close().context("failed to close workbook")?;
    Ok(())
}

fn compare(file1: &Path, file2: &Path, detail: bool) -> Result<()> {
    let first = quick_extract(file1)
        .with_context(|| format!("failed to extract metadata from {}", file1.display()))?;
    let second = quick_extract(file2)
        .with_context(|| format!("failed to extract metadata from {}", file2.display()))?;

    println!("Comparing {} with {}:", file1.display(), file2.display());
    println!("Sheets: {} vs {}", first.sheets.len(), second.sheets.len());

    if detail {
        for (i, (a, b)) in first.sheets.iter().zip(&second.sheets).enumerate() {
            println!();
            println!("Sheet {}:", i + 1);
            println!("  Name: {} vs {}", a.name, b.name);
            println!("  Cells: {} vs {}", a.cells.len(), b.cells.len());
        }
    }
    Ok(())
}

fn search(dir: &Path, pattern: &str, recursive: bool) -> Result<()> {
    if pattern.is_empty() {
        bail!("please provide a search pattern");
    }

    let walker = WalkDir::new(dir).sort_by_file_name();
    let walker = if recursive {
        walker
    } else {
        walker.max_depth(1)
    };

    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        let path = entry.path();
        let is_xlsx = path
            .to_str()
            .is_some_and(|p| p.to_lowercase().ends_with(".xlsx"));
        if !entry.file_type().is_file() || !is_xlsx {
            continue;
        }

        match quick_extract(path) {
            Ok(metadata) if contains_pattern(&metadata, pattern) => {
                println!("Match found in: {}", path.display());
            }
            Ok(_) => {}
            Err(e) => println!("Error processing {}: {e}", path.display()),
        }
    }
    Ok(())
}

/// Substring match against sheet names and cell text.
fn contains_pattern(metadata: &Metadata, pattern: &str) -> bool {
    metadata.sheets.iter().any(|sheet| {
        sheet.name.contains(pattern)
            || sheet
                .cells
                .iter()
                .any(|cell| cell.value.as_str().contains(pattern))
    })
}
