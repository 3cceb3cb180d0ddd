//! CLI Tool Example
//!
//! This example demonstrates how to build a command-line tool
//! using unitsheet for listing units, previewing records and exporting reports.
//!
//! Set `RUST_LOG=unitsheet=debug` to see boundary and footer detection logs.

use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;
use unitsheet::{ExtractorBuilder, MergeInput, UnitSelector, UnitSheetError, MERGED_FILE_NAME};

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [arguments] [options]", program);
    eprintln!("\nCommands:");
    eprintln!("  list <input.xlsx>                 List the units found in the first sheet");
    eprintln!("  preview <input.xlsx>              Print the first records as JSON");
    eprintln!("  filter <input.xlsx>               Export the selected unit as a report");
    eprintln!("  merge <input.xlsx[=unit]>...      Merge several documents into one report");
    eprintln!("\nOptions:");
    eprintln!("  --unit <name>        Select a unit (default: all units)");
    eprintln!("  --output <path>      Output file (default: suggested file name)");
    eprintln!("\nExamples:");
    eprintln!("  {} list planilha.xlsx", program);
    eprintln!("  {} preview planilha.xlsx --unit \"SESC - Unidade A\"", program);
    eprintln!("  {} filter planilha.xlsx --unit \"SESC - Unidade A\"", program);
    eprintln!(
        "  {} merge janeiro.xlsx=\"SESC - Unidade A\" fevereiro.xlsx --output total.xlsx",
        program
    );
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let command = args[1].as_str();

    // Parse options
    let mut positional: Vec<String> = Vec::new();
    let mut unit: Option<String> = None;
    let mut output: Option<String> = None;
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--unit" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --unit requires a value");
                    process::exit(1);
                }
                unit = Some(args[i + 1].clone());
                i += 2;
            }
            "--output" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --output requires a value");
                    process::exit(1);
                }
                output = Some(args[i + 1].clone());
                i += 2;
            }
            other if other.starts_with("--") => {
                eprintln!("Error: Unknown option: {}", other);
                process::exit(1);
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    if positional.is_empty() {
        eprintln!("Error: {} requires at least one input file", command);
        process::exit(1);
    }

    let result = match command {
        "list" => run_list(&positional[0]),
        "preview" => run_preview(&positional[0], unit.as_deref()),
        "filter" => run_filter(&positional[0], unit.as_deref(), output.as_deref()),
        "merge" => run_merge(&positional, output.as_deref()),
        _ => {
            eprintln!("Error: Unknown command: {}", command);
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    if let Err(e) = result {
        handle_error(e);
        process::exit(1);
    }
}

fn run_list(input_path: &str) -> Result<(), UnitSheetError> {
    let extractor = ExtractorBuilder::new().build()?;
    let sheet = extractor.open_sheet_from_path(input_path)?;

    let units = extractor.list_units(&sheet);
    if units.is_empty() {
        println!("No units found in {}", input_path);
    }
    for unit in units {
        println!("{}", unit);
    }

    Ok(())
}

fn run_preview(input_path: &str, unit: Option<&str>) -> Result<(), UnitSheetError> {
    let extractor = ExtractorBuilder::new().build()?;
    let sheet = extractor.open_sheet_from_path(input_path)?;
    let selector = unit.map_or(UnitSelector::All, |name| extractor.selector(name));

    println!("{}", extractor.preview_json(&sheet, &selector)?);

    Ok(())
}

fn run_filter(
    input_path: &str,
    unit: Option<&str>,
    output_path: Option<&str>,
) -> Result<(), UnitSheetError> {
    let extractor = ExtractorBuilder::new().build()?;
    let sheet = extractor.open_sheet_from_path(input_path)?;
    let selector = unit.map_or(UnitSelector::All, |name| extractor.selector(name));

    let report = extractor.export_filtered(&sheet, &selector)?;
    let output_path = output_path
        .map(str::to_string)
        .unwrap_or_else(|| extractor.suggested_file_name(&selector));
    std::fs::write(&output_path, report)?;

    println!("Export completed: {} -> {}", input_path, output_path);
    Ok(())
}

fn run_merge(entries: &[String], output_path: Option<&str>) -> Result<(), UnitSheetError> {
    let extractor = ExtractorBuilder::new().build()?;

    // `path=unit` の形式でユニットを指定できる
    let mut inputs = Vec::with_capacity(entries.len());
    for entry in entries {
        let (path, unit) = match entry.split_once('=') {
            Some((path, unit)) => (path, extractor.selector(unit)),
            None => (entry.as_str(), UnitSelector::All),
        };
        let label = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());

        inputs.push(MergeInput {
            label,
            unit,
            data: std::fs::read(path)?,
        });
    }

    let report = extractor.merge(&inputs)?;
    let output_path = output_path.unwrap_or(MERGED_FILE_NAME);
    std::fs::write(output_path, report)?;

    println!("Merge completed: {} documents -> {}", inputs.len(), output_path);
    Ok(())
}

fn handle_error(error: UnitSheetError) {
    match error {
        UnitSheetError::Io(io_err) => {
            eprintln!("I/O Error: {}", io_err);
            eprintln!("Please check that the file exists and you have permission to access it.");
        }
        UnitSheetError::Read(read_err) => {
            eprintln!("Read Error: {}", read_err);
            eprintln!("The file may not be a valid Excel file or may be corrupted.");
        }
        UnitSheetError::Write(write_err) => {
            eprintln!("Write Error: {}", write_err);
            eprintln!("The report workbook could not be generated.");
        }
        UnitSheetError::Json(json_err) => {
            eprintln!("JSON Error: {}", json_err);
        }
        UnitSheetError::Config(msg) => {
            eprintln!("Configuration Error: {}", msg);
            eprintln!("Please check the unit prefix and keyword settings.");
        }
        UnitSheetError::NoSheet => {
            eprintln!("The workbook does not contain any worksheet.");
        }
        UnitSheetError::NothingToExport => {
            eprintln!("No data to export.");
            eprintln!("The selected unit has no records. Use the list command to see available units.");
        }
        UnitSheetError::InputLimit(msg) => {
            eprintln!("Input Limit Exceeded: {}", msg);
            eprintln!("The file violates size constraints (e.g., file size or row count limit).");
        }
    }
}
