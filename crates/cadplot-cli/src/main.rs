//! cadplot CLI
//!
//! Usage:
//!   cadplot convert <INPUT> <OUTPUT> [CELL] [--config FILE] [--format svg|json]
//!   cadplot cells <INPUT> [--config FILE] [--format text|json]
//!   cadplot layers [--config FILE]

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;

use cadplot_core::{LayoutDatabase, Resolver, StyleResolver, UnknownLayers};
use cadplot_io::{DumpReader, PlotConfig, SvgWriter};
use cadplot_renderer::RenderFrame;

#[derive(Parser)]
#[command(name = "cadplot")]
#[command(about = "Convert Cadence layout ASCII stream dumps into SVG drawings", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten a dump and write it as a layer-ordered drawing
    Convert {
        /// ASCII stream dump to read
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        /// Output file, or `-` for stdout
        output: PathBuf,

        /// Cell to draw (defaults to the last cell in the dump)
        cell: Option<String>,

        /// JSON plot configuration (layer styles, page size, scale)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "svg")]
        format: OutputFormat,
    },

    /// List the cells defined in a dump
    Cells {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: PathBuf,

        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        config: Option<PathBuf>,

        /// `json` dumps the whole database, primitives included
        #[arg(short, long, default_value = "text")]
        format: ListFormat,
    },

    /// Print the effective layer style table as editable JSON
    Layers {
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        config: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum OutputFormat {
    Svg,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ListFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Convert {
            input,
            output,
            cell,
            config,
            format,
        } => convert(&input, &output, cell.as_deref(), config.as_deref(), format),
        Commands::Cells {
            input,
            config,
            format,
        } => list_cells(&input, config.as_deref(), format),
        Commands::Layers { config } => print_layers(config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<PlotConfig> {
    match path {
        Some(path) => PlotConfig::from_file(path)
            .with_context(|| format!("Error loading config '{}'", path.display())),
        None => Ok(PlotConfig::default()),
    }
}

fn read_dump(input: &Path, config: &PlotConfig) -> Result<LayoutDatabase> {
    let file =
        File::open(input).with_context(|| format!("Error reading file '{}'", input.display()))?;
    let library = config.name.clone().unwrap_or_else(|| {
        input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "imported".to_string())
    });
    DumpReader::new(BufReader::new(file))
        .with_scale(config.scale)
        .with_library_name(&library)
        .read()
        .with_context(|| format!("Error parsing dump '{}'", input.display()))
}

fn open_output(output: &Path) -> Result<Box<dyn Write>> {
    if output == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout().lock())));
    }
    let file = File::create(output)
        .with_context(|| format!("Error creating file '{}'", output.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn convert(
    input: &Path,
    output: &Path,
    cell: Option<&str>,
    config_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config_path)?;
    let db = read_dump(input, &config)?;

    let root = match cell.or(config.root_cell.as_deref()).or(db.top_cell()) {
        Some(root) => root.to_string(),
        None => anyhow::bail!("'{}' does not define any cells", input.display()),
    };

    log::info!("Resolving cell '{}' from library '{}'", root, db.name);
    let resolved = Resolver::new(&db)
        .resolve(&root)
        .with_context(|| format!("Error resolving cell '{}'", root))?;

    let mut styles = StyleResolver::new(config.style_table());
    let frame = RenderFrame::build(&root, resolved, &mut styles);

    let mut out = open_output(output)?;
    match format {
        OutputFormat::Svg => {
            SvgWriter::with_config(&mut out, config.svg.clone())
                .write(&frame)
                .with_context(|| format!("Error writing '{}'", output.display()))?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &frame)
                .with_context(|| format!("Error writing '{}'", output.display()))?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    eprintln!("Finished writing {} polygons to file.", frame.path_count());
    report_unknown_layers(&frame.unknown_layers);
    Ok(())
}

fn report_unknown_layers(unknown: &UnknownLayers) {
    if unknown.is_empty() {
        return;
    }
    let layers: Vec<String> = unknown
        .layers()
        .map(|layer| format!("{} ({} polygons)", layer, unknown.records_on(layer)))
        .collect();
    eprintln!(
        "There were {} undefined layers, drawn as black: {}",
        unknown.len(),
        layers.join(", ")
    );
    eprintln!("Add them to the \"layers\" table of a --config file to give them colors.");
}

fn list_cells(input: &Path, config_path: Option<&Path>, format: ListFormat) -> Result<()> {
    let config = load_config(config_path)?;
    let db = read_dump(input, &config)?;

    if let ListFormat::Json = format {
        println!("{}", db.to_json()?);
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for cell in db.all_cells() {
        let marker = if db.top_cell() == Some(cell.name.as_str()) {
            " (default root)"
        } else {
            ""
        };
        writeln!(
            out,
            "{}{}: {} primitives, {} instances",
            cell.name,
            marker,
            cell.primitive_count(),
            cell.instance_count()
        )?;
    }
    Ok(())
}

fn print_layers(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let json = serde_json::to_string_pretty(&config.style_table())?;
    println!("{}", json);
    Ok(())
}
