//! Sheetflow - natural-language table transformations for CSV files

mod config;
mod generator;

use anyhow::{bail, Context};
use sheetflow_core::{
    apply_to_file, join_files, run_batch, BatchOptions, BatchStatus, Instruction,
};
use std::env;
use std::path::PathBuf;

fn print_usage() {
    eprintln!("Usage: sheetflow [OPTIONS] <FILE>...");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <FILE>...                    CSV files to transform");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -i, --instruction <FILE>     Apply an instruction JSON file");
    eprintln!("  -r, --requirement <TEXT>     Generate instructions from a requirement");
    eprintln!("  -g, --generator <CMD>        Shell command that turns requirements into");
    eprintln!("                               instruction JSON (overrides config)");
    eprintln!("  -j, --join <FILE>            Run a multi-table script over all files");
    eprintln!("  -d, --output-dir <DIR>       Write outputs here instead of next to sources");
    eprintln!("  --report <FILE>              Write per-file batch results as JSON");
    eprintln!("  -h, --help                   Print help");
}

struct Args {
    files: Vec<PathBuf>,
    instruction: Option<PathBuf>,
    requirement: Option<String>,
    generator: Option<String>,
    join: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    report: Option<PathBuf>,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();

    let mut parsed = Args {
        files: Vec::new(),
        instruction: None,
        requirement: None,
        generator: None,
        join: None,
        output_dir: None,
        report: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "-i" | "--instruction" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --instruction requires a file path");
                    std::process::exit(1);
                }
                parsed.instruction = Some(PathBuf::from(&args[i]));
            }
            "-r" | "--requirement" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --requirement requires a value");
                    std::process::exit(1);
                }
                parsed.requirement = Some(args[i].to_string());
            }
            "-g" | "--generator" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --generator requires a command");
                    std::process::exit(1);
                }
                parsed.generator = Some(args[i].to_string());
            }
            "-j" | "--join" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --join requires a script file");
                    std::process::exit(1);
                }
                parsed.join = Some(PathBuf::from(&args[i]));
            }
            "-d" | "--output-dir" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --output-dir requires a directory");
                    std::process::exit(1);
                }
                parsed.output_dir = Some(PathBuf::from(&args[i]));
            }
            "--report" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --report requires a file path");
                    std::process::exit(1);
                }
                parsed.report = Some(PathBuf::from(&args[i]));
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => parsed.files.push(PathBuf::from(&args[i])),
        }
        i += 1;
    }

    parsed
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(parse_args()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    if args.files.is_empty() {
        print_usage();
        bail!("no input files");
    }

    let config = config::Config::load()?;
    let output_dir = args.output_dir.or(config.output_dir);

    if let Some(script_path) = args.join {
        let script = std::fs::read_to_string(&script_path)
            .with_context(|| format!("reading {}", script_path.display()))?;
        let output = join_files(&args.files, &script, output_dir.as_deref())?;
        println!("{}", output.display());
        return Ok(());
    }

    if let Some(instruction_path) = args.instruction {
        let contents = std::fs::read_to_string(&instruction_path)
            .with_context(|| format!("reading {}", instruction_path.display()))?;
        let instruction: Instruction = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", instruction_path.display()))?;
        instruction.validate()?;

        for file in &args.files {
            let output = apply_to_file(file, &instruction, output_dir.as_deref())
                .with_context(|| format!("processing {}", file.display()))?;
            println!("{} -> {}", file.display(), output.display());
        }
        return Ok(());
    }

    let Some(requirement) = args.requirement else {
        print_usage();
        bail!("one of --instruction, --requirement or --join is required");
    };
    let Some(command) = args.generator.or(config.generator) else {
        bail!("--requirement needs a generator command (flag or config file)");
    };

    let mut options = BatchOptions {
        output_dir,
        ..BatchOptions::default()
    };
    if let Some(n) = config.sample_rows {
        options.sample_rows = n;
    }

    let generator = generator::CommandGenerator::new(command);
    let entries = run_batch(&args.files, &requirement, &generator, &options);

    let mut failures = 0;
    for entry in &entries {
        match &entry.status {
            BatchStatus::Success {
                output,
                explanation,
            } => {
                println!("{} -> {}", entry.source.display(), output.display());
                if !explanation.is_empty() {
                    println!("  {}", explanation);
                }
            }
            BatchStatus::Failed { error } => {
                failures += 1;
                eprintln!("{}: failed: {}", entry.source.display(), error);
            }
            BatchStatus::Skipped { error } => {
                failures += 1;
                eprintln!("{}: skipped: {}", entry.source.display(), error);
            }
        }
    }

    if let Some(report_path) = args.report {
        let json = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&report_path, json)
            .with_context(|| format!("writing {}", report_path.display()))?;
    }

    if failures > 0 {
        bail!("{failures} of {} files did not succeed", entries.len());
    }
    Ok(())
}
