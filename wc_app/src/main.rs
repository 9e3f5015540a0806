use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use wc::source::DEFAULT_MIN_SPLIT_BYTES;
use wc::{Coordinator, JobConfig, JobReport, OutputFormat, WordCountError};

mod telemetry;

/// Count word occurrences in a text file or a directory of text files.
#[derive(Parser, Debug)]
#[command(name = "wordcount", version)]
struct Cli {
    /// Input file or directory
    input: PathBuf,
    /// Output directory, must not exist yet unless --force is given
    output: PathBuf,
    /// Replace the output directory if it already exists
    #[arg(short, long, env = "WORDCOUNT_FORCE")]
    force: bool,
    /// Number of input partitions and output part files [default: number of CPUs]
    #[arg(short, long, env = "WORDCOUNT_PARTITIONS")]
    partitions: Option<usize>,
    /// Number of partitions processed at the same time [default: number of CPUs]
    #[arg(short = 'j', long, env = "WORDCOUNT_PARALLELISM")]
    parallelism: Option<usize>,
    /// Record format: text, tsv, tuple or json
    #[arg(long, env = "WORDCOUNT_FORMAT", default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Smallest input split in bytes
    #[arg(long, env = "WORDCOUNT_MIN_SPLIT_BYTES", default_value_t = DEFAULT_MIN_SPLIT_BYTES)]
    min_split_bytes: u64,
    /// Print the run report as JSON after the timing line
    #[arg(long)]
    report: bool,
}

impl Cli {
    fn to_config(&self) -> JobConfig {
        let mut config = JobConfig::new(&self.input, &self.output)
            .with_overwrite(self.force)
            .with_format(self.format)
            .with_min_split_bytes(self.min_split_bytes);
        if let Some(partitions) = self.partitions {
            config = config.with_partitions(partitions);
        }
        if let Some(parallelism) = self.parallelism {
            config = config.with_parallelism(parallelism);
        }
        config
    }
}

async fn run(cli: &Cli) -> anyhow::Result<JobReport> {
    let config = cli.to_config();
    tracing::debug!(config = ?config, "starting job");

    let mut coordinator = Coordinator::from_config(&config).context("failed to set up job")?;
    let cancel = coordinator.cancel_handle();
    let job = coordinator.run();
    tokio::pin!(job);

    let result = tokio::select! {
        res = &mut job => res,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, cancelling job");
            cancel.cancel();
            job.await
        }
    };
    let report = result.context("word count failed")?;
    Ok(report)
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<WordCountError>()
        .map(WordCountError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not errors
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    if let Err(e) = telemetry::init_tracing() {
        eprintln!("failed to initialize logging: {:#}", e);
    }

    match run(&cli).await {
        Ok(report) => {
            println!("Execution time (ms): {}", report.elapsed_ms);
            if cli.report {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => tracing::warn!(error = %e, "failed to render report"),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
