use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use cutlist_optimizer::error::{OptimizerError, Result};
use cutlist_optimizer::render;
use cutlist_optimizer::types::{Bar, BarOptimizationResult, Panel, PanelOptimizationResult, Part, Sheet};
use cutlist_optimizer::{BarJob, OptimizerConfig, PanelJob, StockMode};
use serde::de::DeserializeOwned;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "cutlist_optimizer",
    about = "Bar cutting and sheet nesting optimizer"
)]
struct Cli {
    /// JSON config file with defaults (kerf, blade width, search ranges)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Cut linear parts from stock bars
    Bars(BarsArgs),
    /// Nest rectangular panels on stock sheets
    Panels(PanelsArgs),
}

#[derive(Args)]
struct OutputArgs {
    /// Read the whole job from a JSON file instead of inline values
    #[arg(long)]
    input: Option<PathBuf>,

    /// Search for optimal stock sizes
    #[arg(long)]
    auto: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Show an ASCII layout of each bar or sheet
    #[arg(long)]
    layout: bool,
}

#[derive(Args)]
struct BarsArgs {
    /// Parts as LENGTH:QTY[:MARK[:PART_NO]] (e.g. 96.5:4:B1:W8x31)
    #[arg(long = "part", num_args = 1..)]
    parts: Vec<String>,

    /// Stock bars as LENGTH:QTY[:PART_NO] (e.g. 240:10)
    #[arg(long = "bar", num_args = 1..)]
    bars: Vec<String>,

    /// Saw kerf in inches
    #[arg(long)]
    kerf: Option<f64>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct PanelsArgs {
    /// Panels as WxH:QTY[:MARK] (e.g. 23.5x47:4:P1)
    #[arg(long = "panel", num_args = 1..)]
    panels: Vec<String>,

    /// Stock sheets as WxH:QTY (e.g. 48x96:10)
    #[arg(long = "sheet", num_args = 1..)]
    sheets: Vec<String>,

    /// Blade width in inches
    #[arg(long)]
    blade_width: Option<f64>,

    /// Disable panel rotation
    #[arg(long)]
    no_rotate: bool,

    #[command(flatten)]
    output: OutputArgs,
}

fn parse_number(kind: &'static str, input: &str, field: &str) -> Result<f64> {
    let value = field
        .trim()
        .parse::<f64>()
        .map_err(|_| OptimizerError::parse(kind, input, format!("'{field}' is not a number")))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(OptimizerError::parse(kind, input, "dimensions must be positive"));
    }
    Ok(value)
}

fn parse_qty(kind: &'static str, input: &str, field: &str) -> Result<u32> {
    let qty = field
        .trim()
        .parse::<u32>()
        .map_err(|_| OptimizerError::parse(kind, input, format!("invalid quantity '{field}'")))?;
    if qty == 0 {
        return Err(OptimizerError::parse(kind, input, "quantity must be non-zero"));
    }
    Ok(qty)
}

fn parse_dimensions(kind: &'static str, input: &str, s: &str) -> Result<(f64, f64)> {
    let Some((w, h)) = s.split_once('x') else {
        return Err(OptimizerError::parse(kind, input, "expected WxH"));
    };
    Ok((parse_number(kind, input, w)?, parse_number(kind, input, h)?))
}

fn non_empty(field: Option<&&str>) -> Option<String> {
    field.filter(|s| !s.is_empty()).map(|s| s.to_string())
}

fn parse_part(id: u32, s: &str) -> Result<Part> {
    let fields: Vec<&str> = s.split(':').collect();
    if !(2..=4).contains(&fields.len()) {
        return Err(OptimizerError::parse("part", s, "expected LENGTH:QTY[:MARK[:PART_NO]]"));
    }
    Ok(Part {
        id,
        part_no: non_empty(fields.get(3)),
        length: parse_number("part", s, fields[0])?,
        mark_no: non_empty(fields.get(2)).unwrap_or_default(),
        finish: None,
        fab: None,
        qty: parse_qty("part", s, fields[1])?,
    })
}

fn parse_bar(id: u32, s: &str) -> Result<Bar> {
    let fields: Vec<&str> = s.split(':').collect();
    if !(2..=3).contains(&fields.len()) {
        return Err(OptimizerError::parse("bar", s, "expected LENGTH:QTY[:PART_NO]"));
    }
    let length = parse_number("bar", s, fields[0])?;
    Ok(Bar {
        id,
        length,
        qty: parse_qty("bar", s, fields[1])?,
        part_no: non_empty(fields.get(2)),
        description: format!("{length}\" stock"),
    })
}

fn parse_panel(id: u32, s: &str) -> Result<Panel> {
    let fields: Vec<&str> = s.split(':').collect();
    if !(2..=3).contains(&fields.len()) {
        return Err(OptimizerError::parse("panel", s, "expected WxH:QTY[:MARK]"));
    }
    let (width, height) = parse_dimensions("panel", s, fields[0])?;
    let panel = Panel::new(id, width, height, parse_qty("panel", s, fields[1])?);
    Ok(match fields.get(2) {
        Some(mark) => panel.with_mark(*mark),
        None => panel,
    })
}

fn parse_sheet(id: u32, s: &str) -> Result<Sheet> {
    let Some((dims, qty)) = s.split_once(':') else {
        return Err(OptimizerError::parse("sheet", s, "expected WxH:QTY"));
    };
    let (width, height) = parse_dimensions("sheet", s, dims)?;
    Ok(Sheet::new(id, width, height, parse_qty("sheet", s, qty)?))
}

/// Parses each inline value, numbering them from 1 in order.
fn parse_all<T>(values: &[String], parse: fn(u32, &str) -> Result<T>) -> Result<Vec<T>> {
    values
        .iter()
        .zip(1u32..)
        .map(|(s, id)| parse(id, s))
        .collect()
}

fn read_job<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|source| OptimizerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

fn run_bars(args: BarsArgs, config: &OptimizerConfig) -> Result<()> {
    let mut job: BarJob = match &args.output.input {
        Some(path) => read_job(path)?,
        None => BarJob {
            parts: parse_all(&args.parts, parse_part)?,
            bars: parse_all(&args.bars, parse_bar)?,
            ..BarJob::default()
        },
    };
    if args.output.auto {
        job.mode = StockMode::Auto;
    }
    if args.kerf.is_some() {
        job.kerf = args.kerf;
    }

    let result = job.run(config)?;
    if args.output.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_bars(&result, args.output.layout);
    }
    Ok(())
}

fn print_bars(result: &BarOptimizationResult, layout: bool) {
    for bar in &result.bars {
        let label = if bar.description.is_empty() {
            format!("{}\"", bar.length)
        } else {
            bar.description.clone()
        };
        println!("Bar {}#{} ({label}):", bar.bar_id, bar.bar_no);
        for cut in &bar.cuts {
            let mark = if cut.mark_no.is_empty() { "-" } else { cut.mark_no.as_str() };
            println!("  {mark} {}\" @ {}", cut.length, cut.position);
        }
        if layout {
            print!("{}", render::render_bar(bar));
        }
        println!("  {:.1}% waste", bar.waste_percentage);
        println!();
    }

    let summary = &result.summary;
    println!(
        "Summary: {} bar{} used, {}/{} parts placed, {:.1}% waste ({:.1}% yield)",
        summary.total_bars,
        if summary.total_bars == 1 { "" } else { "s" },
        summary.total_parts_placed,
        summary.total_parts_needed,
        summary.waste_percentage,
        summary.yield_percentage(),
    );
    for item in &result.unplaced {
        println!("Unplaced: part {} {} x{}", item.id, item.mark_no, item.qty);
    }
}

fn run_panels(args: PanelsArgs, config: &OptimizerConfig) -> Result<()> {
    let mut job: PanelJob = match &args.output.input {
        Some(path) => read_job(path)?,
        None => PanelJob {
            panels: parse_all(&args.panels, parse_panel)?,
            sheets: parse_all(&args.sheets, parse_sheet)?,
            ..PanelJob::default()
        },
    };
    if args.output.auto {
        job.mode = StockMode::Auto;
    }
    if args.blade_width.is_some() {
        job.blade_width = args.blade_width;
    }
    if args.no_rotate {
        job.allow_rotation = Some(false);
    }

    let result = job.run(config)?;
    if args.output.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_panels(&result, args.output.layout);
    }
    Ok(())
}

fn print_panels(result: &PanelOptimizationResult, layout: bool) {
    for sheet in &result.sheets {
        println!(
            "Sheet {}#{} ({}x{}):",
            sheet.sheet_id, sheet.sheet_no, sheet.width, sheet.height
        );
        let placements = result.placements_on(sheet);
        for p in &placements {
            let rot = if p.rotated { " [rotated]" } else { "" };
            let mark = if p.mark.is_empty() { "-" } else { p.mark.as_str() };
            println!("  {mark} {}x{} @ ({}, {}){rot}", p.width, p.height, p.x, p.y);
        }
        if layout {
            print!("{}", render::render_sheet(sheet, &placements));
        }
        println!("  {:.1}% waste", sheet.waste_percentage);
        println!();
    }

    let summary = &result.summary;
    println!(
        "Summary: {} sheet{} used, {}/{} panels placed, {:.1}% waste ({:.1}% yield)",
        summary.total_sheets,
        if summary.total_sheets == 1 { "" } else { "s" },
        summary.total_panels_placed,
        summary.total_panels_needed,
        summary.waste_percentage,
        summary.yield_percentage(),
    );
    for item in &result.unplaced {
        println!("Unplaced: panel {} {} x{}", item.id, item.mark_no, item.qty);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => OptimizerConfig::from_json_file(path)?,
        None => OptimizerConfig::default(),
    };

    match cli.command {
        Command::Bars(args) => run_bars(args, &config),
        Command::Panels(args) => run_panels(args, &config),
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
