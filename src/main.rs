use anyhow::{bail, Context, Result};
use log::info;
use std::env;
use std::fs::File;
use std::path::PathBuf;

use housing_accessibility::{run, CsvSource, PipelineConfig, RecordSource};

const USAGE: &str = "Usage: housing-accessibility <data-dir> [--config <file.json>] [--json] [--output <unified.csv>]";

struct Args {
    data_dir: PathBuf,
    config: Option<PathBuf>,
    json: bool,
    output: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut data_dir = None;
    let mut config = None;
    let mut json = false;
    let mut output = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(args.next().context("--config needs a path")?)),
            "--output" => output = Some(PathBuf::from(args.next().context("--output needs a path")?)),
            "--json" => json = true,
            "-h" | "--help" => {
                println!("{}", USAGE);
                std::process::exit(0);
            }
            other if data_dir.is_none() && !other.starts_with("--") => data_dir = Some(PathBuf::from(other)),
            other => bail!("Unexpected argument: {}\n{}", other, USAGE),
        }
    }

    Ok(Args {
        data_dir: data_dir.context(USAGE)?,
        config,
        json,
        output,
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    info!("Loading records from {}", args.data_dir.display());
    let records = CsvSource::new(&args.data_dir).load()?;

    let output = run(&records, &config).context("Pipeline run failed")?;

    if let Some(path) = &args.output {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        output.unified.write_csv(file)?;
        info!("Wrote {} dwellings to {}", output.unified.len(), path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output.report)?);
    } else {
        for sentence in output.report.sentences() {
            println!("{}\n", sentence);
        }
        for limitation in &output.report.limitations {
            println!("Note: {}", limitation);
        }
    }

    Ok(())
}
