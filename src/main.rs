//! # Unicode Probe CLI
//!
//! Runs the code page demonstration and the file-open probes, and converts
//! ad-hoc text between UTF-16 and a chosen code page.

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use serde::Serialize;
#[cfg(feature = "cli")]
use tracing::Level;

#[cfg(feature = "cli")]
use unicode_probe::demo::{self, DemoReport, hex_narrow, hex_wide};
#[cfg(feature = "cli")]
use unicode_probe::probe::{self, ProbeReport};
#[cfg(feature = "cli")]
use unicode_probe::{CodePage, Converter, Facility, Native, Policy, Portable};

/// Directory holding the probe files unless `--dir` says otherwise
#[cfg(feature = "cli")]
const DEFAULT_DIR: &str = ".";

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features disabled. Enable with --features cli");
    std::process::exit(1);
}

/// Unicode Probe: watch code pages and path encodings at work
#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "unicode-probe")]
#[command(version, about, long_about = None)]
struct Cli {
    /// What to run (defaults to `demo`)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Fail on unmappable characters instead of substituting them
    #[arg(long, global = true)]
    strict: bool,

    /// Use the encoding_rs tables even where native conversion exists
    #[arg(long, global = true)]
    portable: bool,
}

#[cfg(feature = "cli")]
impl Cli {
    fn policy(&self) -> Policy {
        if self.strict {
            Policy::Strict
        } else {
            Policy::Substitute
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Convert the sample name under several code pages, then run the probes
    Demo(DemoArgs),

    /// Try to open non-ASCII file names through narrow and wide primitives
    Probe(ProbeArgs),

    /// Convert text between UTF-16 and a code page
    Convert(ConvertArgs),

    /// List the named code pages
    List,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct DemoArgs {
    /// Skip the file-open probes
    #[arg(long)]
    skip_probes: bool,

    /// Directory holding the probe files
    #[arg(short, long, default_value = DEFAULT_DIR)]
    dir: PathBuf,
}

#[cfg(feature = "cli")]
impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            skip_probes: false,
            dir: PathBuf::from(DEFAULT_DIR),
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ProbeArgs {
    /// Directory holding the probe files
    #[arg(short, long, default_value = DEFAULT_DIR)]
    dir: PathBuf,

    /// Create the probe files before opening them
    #[arg(long)]
    create: bool,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ConvertArgs {
    /// Code page of the narrow side (name, `cp1253`, or a number)
    #[arg(short = 'c', long = "code-page")]
    code_page: CodePage,

    /// Decode narrow bytes to UTF-16 instead of encoding text
    #[arg(long)]
    to_wide: bool,

    /// Input file (stdin if neither this nor TEXT is given)
    #[arg(short, long, conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Text to convert
    text: Option<String>,
}

#[cfg(feature = "cli")]
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct ConversionResult {
    facility: &'static str,
    code_page: String,
    code_page_id: u32,
    strict: bool,
    to_wide: bool,
    input_units: usize,
    output_units: usize,
    hex: String,
    text: Option<String>,
}

#[cfg(feature = "cli")]
#[derive(Serialize)]
struct CodePageInfo {
    name: String,
    id: u32,
    description: &'static str,
    supported: bool,
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.portable {
        dispatch(&Portable, &cli)
    } else {
        dispatch(&Native::default(), &cli)
    }
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

#[cfg(feature = "cli")]
fn dispatch<F: Facility + Clone>(facility: &F, cli: &Cli) -> Result<()> {
    match cli.command {
        None => demo_command(&DemoArgs::default(), cli, facility),
        Some(Commands::Demo(ref args)) => demo_command(args, cli, facility),
        Some(Commands::Probe(ref args)) => probe_command(args, cli, facility),
        Some(Commands::Convert(ref args)) => convert_command(args, cli, facility),
        Some(Commands::List) => list_command(cli, facility),
    }
}

#[cfg(feature = "cli")]
fn demo_command<F: Facility + Clone>(args: &DemoArgs, cli: &Cli, facility: &F) -> Result<()> {
    let report = demo::run(facility, cli.policy());

    let probes = if args.skip_probes {
        Vec::new()
    } else {
        probe::run_all(facility, &args.dir).context("Failed to encode probe paths")?
    };

    match cli.format {
        OutputFormat::Json => {
            let result = serde_json::json!({
                "demo": report,
                "probes": probes,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            print_demo(&report);
            if !probes.is_empty() {
                println!();
                print_probes(&probes);
            }
        }
    }

    if !report.utf8_round_trip {
        anyhow::bail!("UTF-8 round trip did not reproduce {:?}", report.input);
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn probe_command<F: Facility + Clone>(args: &ProbeArgs, cli: &Cli, facility: &F) -> Result<()> {
    if args.create {
        probe::create_targets(&args.dir).with_context(|| {
            format!("Failed to create probe files in {}", args.dir.display())
        })?;
        if cli.verbose {
            eprintln!("Created probe files in {}", args.dir.display());
        }
    }

    let probes = probe::run_all(facility, &args.dir).context("Failed to encode probe paths")?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&probes)?),
        OutputFormat::Text => print_probes(&probes),
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn convert_command<F: Facility + Clone>(
    args: &ConvertArgs,
    cli: &Cli,
    facility: &F,
) -> Result<()> {
    let converter =
        Converter::with_facility(facility.clone(), args.code_page).with_policy(cli.policy());

    let input = if let Some(ref text) = args.text {
        text.clone().into_bytes()
    } else if let Some(ref input_path) = args.input {
        if cli.verbose {
            eprintln!("Reading from: {}", input_path.display());
        }
        fs::read(input_path)
            .with_context(|| format!("Failed to read input file: {}", input_path.display()))?
    } else {
        if cli.verbose {
            eprintln!("Reading from stdin");
        }
        let mut buffer = Vec::new();
        io::stdin()
            .read_to_end(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    };

    let result = if args.to_wide {
        let wide = converter.to_wide(&input).with_context(|| {
            format!("Failed to decode {} bytes under {}", input.len(), converter.code_page())
        })?;
        ConversionResult {
            facility: facility.name(),
            code_page: converter.code_page().to_string(),
            code_page_id: converter.code_page().id(),
            strict: converter.policy() == Policy::Strict,
            to_wide: true,
            input_units: input.len(),
            output_units: wide.len(),
            hex: hex_wide(&wide),
            text: Some(String::from_utf16_lossy(&wide)),
        }
    } else {
        let text = String::from_utf8(input).context("Input text is not valid UTF-8")?;
        let wide: Vec<u16> = text.encode_utf16().collect();
        let narrow = converter
            .to_narrow(&wide)
            .with_context(|| format!("Failed to encode text under {}", converter.code_page()))?;
        ConversionResult {
            facility: facility.name(),
            code_page: converter.code_page().to_string(),
            code_page_id: converter.code_page().id(),
            strict: converter.policy() == Policy::Strict,
            to_wide: false,
            input_units: wide.len(),
            output_units: narrow.len(),
            hex: hex_narrow(&narrow),
            text: None,
        }
    };

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            println!("{}", result.hex);
            if let Some(ref text) = result.text {
                println!("{}", text);
            }
            if cli.verbose {
                eprintln!(
                    "{} units -> {} units under {} via {}",
                    result.input_units, result.output_units, result.code_page, result.facility
                );
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn list_command<F: Facility + Clone>(cli: &Cli, facility: &F) -> Result<()> {
    let probe: Vec<u16> = "A".encode_utf16().collect();
    let code_pages: Vec<_> = CodePage::NAMED
        .iter()
        .map(|&code_page| CodePageInfo {
            name: code_page.to_string(),
            id: code_page.id(),
            description: code_page.description(),
            supported: Converter::with_facility(facility.clone(), code_page)
                .to_narrow(&probe)
                .is_ok(),
        })
        .collect();

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&code_pages)?),
        OutputFormat::Text => {
            println!(
                "Named code pages ({} total, via {}):",
                code_pages.len(),
                facility.name()
            );
            println!();
            for info in &code_pages {
                println!(
                    "{:8} {:>6}  {}{}",
                    info.name,
                    info.id,
                    info.description,
                    if info.supported { "" } else { " (unsupported)" }
                );
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn print_demo(report: &DemoReport) {
    println!(
        "Input: {} ({} UTF-16 units, via {})",
        report.input, report.wide_units, report.facility
    );
    println!();
    for row in &report.rows {
        match (&row.bytes, &row.error) {
            (Some(bytes), _) => {
                println!("{:8} {}", row.code_page, bytes);
                if let Some(ref read_back) = row.read_back {
                    println!("{:8} reads back as: {}", "", read_back);
                }
                if let Some(ref error) = row.read_back_error {
                    println!("{:8} read-back failed: {}", "", error);
                }
            }
            (None, Some(error)) => println!("{:8} failed: {}", row.code_page, error),
            (None, None) => println!("{:8} (no output)", row.code_page),
        }
    }
    println!();
    println!(
        "UTF-8 -> UTF-16 round trip: {}",
        if report.utf8_round_trip { "ok" } else { "MISMATCH" }
    );
}

#[cfg(feature = "cli")]
fn print_probes(probes: &[ProbeReport]) {
    for report in probes {
        println!("{}", report.summary());
    }
}
