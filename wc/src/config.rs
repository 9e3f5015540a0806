use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, WordCountError};
use crate::source::DEFAULT_MIN_SPLIT_BYTES;

/// How each (word, count) record is rendered in the output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// `word count`
    #[default]
    Text,
    /// `word<TAB>count`
    Tsv,
    /// `(word,count)`
    Tuple,
    /// `{"word":"...","count":n}`
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "tsv" => Ok(OutputFormat::Tsv),
            "tuple" => Ok(OutputFormat::Tuple),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "unknown output format '{}' (expected text, tsv, tuple or json)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Tuple => "tuple",
            OutputFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Everything one run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub partition_count: usize,
    /// Maximum number of partitions processed at the same time.
    pub parallelism: usize,
    /// Replace an existing output instead of failing.
    pub overwrite: bool,
    pub format: OutputFormat,
    pub min_split_bytes: u64,
}

impl JobConfig {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        let cores = default_parallelism();
        JobConfig {
            input_path: input_path.into(),
            output_path: output_path.into(),
            partition_count: cores,
            parallelism: cores,
            overwrite: false,
            format: OutputFormat::default(),
            min_split_bytes: DEFAULT_MIN_SPLIT_BYTES,
        }
    }

    pub fn with_partitions(mut self, partition_count: usize) -> Self {
        self.partition_count = partition_count;
        self
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_min_split_bytes(mut self, min_split_bytes: u64) -> Self {
        self.min_split_bytes = min_split_bytes;
        self
    }

    /// Rejects configurations that cannot run. Touches no files.
    pub fn validate(&self) -> Result<()> {
        if self.input_path.as_os_str().is_empty() {
            return Err(WordCountError::Argument("input path is empty".to_string()));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(WordCountError::Argument("output path is empty".to_string()));
        }
        if self.partition_count == 0 {
            return Err(WordCountError::Argument(
                "partition count must be at least 1".to_string(),
            ));
        }
        if self.parallelism == 0 {
            return Err(WordCountError::Argument(
                "parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
