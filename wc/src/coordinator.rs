use futures::{stream, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::aggregate::WordCounts;
use crate::config::JobConfig;
use crate::error::{Result, WordCountError};
use crate::sink::TextSink;
use crate::source::{PartitionedInput, TextInput};
use crate::task::{Task, TaskOutput, TaskStatus};
use crate::worker::Worker;

/// Shared flag that asks a running job to stop before it commits output.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        CancelHandle::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum JobState {
    Init,
    Reading,
    Aggregating,
    Writing,
    Done,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }

    fn can_become(self, next: JobState) -> bool {
        match (self, next) {
            (from, JobState::Failed) => !from.is_terminal(),
            (JobState::Init, JobState::Reading)
            | (JobState::Reading, JobState::Aggregating)
            | (JobState::Aggregating, JobState::Writing)
            | (JobState::Writing, JobState::Done) => true,
            _ => false,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub partitions: usize,
    pub lines: u64,
    pub words: u64,
    pub distinct_words: usize,
    pub output: PathBuf,
    pub parts: usize,
    pub elapsed_ms: u64,
}

/// Drives one run: fans the partitions out to workers, merges their partial
/// counts once all of them are back, then hands the result to the sink.
#[derive(Debug)]
pub struct Coordinator<I> {
    input: Arc<I>,
    sink: TextSink,
    parallelism: usize,
    tasks: Vec<Task>,
    state: JobState,
    cancel: CancelHandle,
}

impl Coordinator<TextInput> {
    /// Validates the configuration, resolves the input and checks that the
    /// destination is free, in that order.
    pub fn from_config(config: &JobConfig) -> Result<Self> {
        config.validate()?;
        let input = TextInput::open(
            &config.input_path,
            config.partition_count,
            config.min_split_bytes,
        )?;
        tracing::info!(
            input = %config.input_path.display(),
            files = input.files().len(),
            splits = input.split_count(),
            partitions = config.partition_count,
            "input resolved"
        );
        let sink = TextSink::from_config(config);
        sink.check_destination()?;
        Ok(Coordinator::new(input, sink, config.parallelism))
    }
}

impl<I: PartitionedInput + 'static> Coordinator<I> {
    pub fn new(input: I, sink: TextSink, parallelism: usize) -> Self {
        Coordinator {
            input: Arc::new(input),
            sink,
            parallelism: parallelism.max(1),
            tasks: vec![],
            state: JobState::Init,
            cancel: CancelHandle::new(),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn transition(&mut self, next: JobState) {
        debug_assert!(
            self.state.can_become(next),
            "illegal job transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::info!(from = ?self.state, to = ?next, "job state changed");
        self.state = next;
    }

    // one task per partition
    fn slice(&mut self) {
        self.tasks = (0..self.input.partition_count()).map(Task::new).collect();
    }

    pub async fn run(&mut self) -> Result<JobReport> {
        if self.state != JobState::Init {
            return Err(WordCountError::Argument(format!(
                "job already ran (state {:?})",
                self.state
            )));
        }
        let started = Instant::now();
        match self.execute(started).await {
            Ok(report) => {
                self.transition(JobState::Done);
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, state = ?self.state, "job failed");
                self.transition(JobState::Failed);
                Err(e)
            }
        }
    }

    async fn execute(&mut self, started: Instant) -> Result<JobReport> {
        self.transition(JobState::Reading);
        self.sink.check_destination()?;
        self.slice();

        self.transition(JobState::Aggregating);
        let (counts, lines, words) = self.aggregate().await?;
        let distinct_words = counts.len();

        if self.cancel.is_cancelled() {
            return Err(WordCountError::Cancelled);
        }
        self.transition(JobState::Writing);
        let sink = self.sink.clone();
        let cancel = self.cancel.clone();
        let summary = tokio::task::spawn_blocking(move || sink.write(counts, &cancel))
            .await
            .map_err(|e| WordCountError::TaskFailed {
                task: "write".to_string(),
                reason: e.to_string(),
            })??;

        Ok(JobReport {
            partitions: self.tasks.len(),
            lines,
            words,
            distinct_words,
            output: summary.path,
            parts: summary.parts,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Runs every task, at most `parallelism` at a time, and merges the
    /// partial tables as they come back.
    async fn aggregate(&mut self) -> Result<(WordCounts, u64, u64)> {
        let worker = Worker::new(Arc::clone(&self.input), self.cancel.clone());
        for task in &mut self.tasks {
            task.set_status(TaskStatus::Ongoing);
        }
        let mut results = stream::iter(self.tasks.clone())
            .map(|task| {
                let worker = worker.clone();
                async move {
                    let name = task.name();
                    let id = task.get_task_id();
                    let joined = tokio::task::spawn_blocking(move || worker.do_task(&task)).await;
                    let result = joined.unwrap_or_else(|e| {
                        Err(WordCountError::TaskFailed {
                            task: name,
                            reason: e.to_string(),
                        })
                    });
                    (id, result)
                }
            })
            .buffer_unordered(self.parallelism);

        let mut total = WordCounts::new();
        let (mut lines, mut words) = (0, 0);
        while let Some((id, result)) = results.next().await {
            match result {
                Ok(TaskOutput {
                    counts,
                    lines: task_lines,
                    words: task_words,
                    ..
                }) => {
                    self.tasks[id].set_status(TaskStatus::Done);
                    total.merge(counts);
                    lines += task_lines;
                    words += task_words;
                }
                Err(e) => {
                    self.tasks[id].set_status(TaskStatus::Failed);
                    // stop the tasks that are still running
                    self.cancel.cancel();
                    return Err(e);
                }
            }
        }
        tracing::info!(
            tasks = self.tasks.len(),
            lines,
            words,
            distinct = total.len(),
            "aggregation finished"
        );
        Ok((total, lines, words))
    }
}
