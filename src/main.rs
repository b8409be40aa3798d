mod commands;
mod tui;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use chromatty::pipeline::{LengthPolicy, MissingPolicy, Mode, SelectionPolicy};
use chromatty::shared::{NoteName, Symbol};

#[derive(Parser)]
#[command(name = "chromatty", version)]
#[command(about = "Build chromatic scales out of tagged vocal samples")]
struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show how a sample folder sorts into symbol buckets
    Scan {
        folder: PathBuf,
        /// Print the scan as json
        #[arg(long)]
        json: bool,
    },
    /// Show which sample each note would use, without writing anything
    Preview {
        folder: PathBuf,
        #[command(flatten)]
        template: TemplateArgs,
        /// Print the preview as json
        #[arg(long)]
        json: bool,
    },
    /// Render every note and the chromatic scale into an output directory
    Generate {
        folder: PathBuf,
        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
        #[command(flatten)]
        template: TemplateArgs,
    },
    /// Write a default template to edit
    Init {
        file: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// List built-in presets and the ones saved with a folder
    Presets { folder: PathBuf },
    /// Copy a preset file into a folder's preset library
    SavePreset { folder: PathBuf, file: PathBuf },
}

// Where the template comes from, plus per-field overrides
#[derive(Args)]
pub struct TemplateArgs {
    /// Template json to start from
    #[arg(long, conflicts_with = "preset")]
    template: Option<PathBuf>,

    /// Preset id (folder library first, then built-ins) on default settings
    #[arg(long)]
    preset: Option<String>,

    /// Tokens, comma separated (A,E,I,O,U,AY)
    #[arg(long, value_delimiter = ',')]
    tokens: Option<Vec<Symbol>>,

    #[arg(long)]
    selection: Option<SelectionPolicy>,

    #[arg(long)]
    length: Option<LengthPolicy>,

    #[arg(long)]
    missing: Option<MissingPolicy>,

    #[arg(long)]
    mode: Option<Mode>,

    /// First note, e.g. C or F#
    #[arg(long)]
    base_note: Option<NoteName>,

    #[arg(long)]
    octave: Option<i32>,

    /// Number of notes to render
    #[arg(long)]
    semitones: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Seconds of silence after each note in chromatic.wav
    #[arg(long)]
    gap: Option<f64>,

    #[arg(long)]
    normalize: bool,

    /// Keep every note at the sample's own pitch
    #[arg(long)]
    unpitched: bool,

    /// Pick numbered samples at random (normal mode)
    #[arg(long)]
    randomize: bool,

    /// Embed cue markers per note in chromatic.wav
    #[arg(long)]
    slice_markers: bool,

    /// Seconds to wait for an answer under the ask policy (default: forever)
    #[arg(long)]
    ask_timeout: Option<u64>,
}

fn init_logging(verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Warn,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    SimpleLogger::new().with_level(level).without_timestamps().env().init()?;
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet)?;

    match cli.command {
        Command::Scan { folder, json } => commands::scan(&folder, json),
        Command::Preview { folder, template, json } => commands::preview(&folder, &template, json),
        Command::Generate { folder, out, template } => commands::generate(&folder, &out, &template),
        Command::Init { file, force } => commands::init(&file, force),
        Command::Presets { folder } => commands::presets(&folder),
        Command::SavePreset { folder, file } => commands::save_preset(&folder, &file),
    }
}
