pub mod aggregate;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod sink;
pub mod source;
pub mod task;
pub mod tokenizer;
pub mod worker;

#[cfg(test)]
mod test_utils;

pub use aggregate::{count_words, WordCounts};
pub use config::{JobConfig, OutputFormat};
pub use coordinator::{CancelHandle, Coordinator, JobReport, JobState};
pub use error::{Result, WordCountError};
pub use sink::TextSink;
pub use source::{MemoryInput, PartitionedInput, TextInput};
