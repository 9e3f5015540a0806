use std::sync::Arc;

use crate::aggregate::WordCounts;
use crate::coordinator::CancelHandle;
use crate::error::{Result, WordCountError};
use crate::source::PartitionedInput;
use crate::task::{Task, TaskOutput};

/// How many lines a worker reads between cancellation checks.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

// Worker runs one Task at a time on a blocking thread. It owns its partial
// aggregate; nothing is shared with other workers until the coordinator merges.
pub struct Worker<I> {
    input: Arc<I>,
    cancel: CancelHandle,
}

impl<I> Clone for Worker<I> {
    fn clone(&self) -> Self {
        Worker {
            input: Arc::clone(&self.input),
            cancel: self.cancel.clone(),
        }
    }
}

impl<I: PartitionedInput> Worker<I> {
    pub fn new(input: Arc<I>, cancel: CancelHandle) -> Self {
        Worker { input, cancel }
    }

    /// Reads the task's partition, tokenizes every line and combines the
    /// words into a local table.
    #[tracing::instrument(skip_all, fields(task = task.get_task_id()))]
    pub fn do_task(&self, task: &Task) -> Result<TaskOutput> {
        let mut counts = WordCounts::new();
        let mut lines = 0u64;
        let mut words = 0u64;
        for line in self.input.read(task.get_task_id())? {
            if lines % CANCEL_CHECK_INTERVAL == 0 && self.cancel.is_cancelled() {
                return Err(WordCountError::Cancelled);
            }
            words += counts.add_line(&line?);
            lines += 1;
        }
        if self.cancel.is_cancelled() {
            return Err(WordCountError::Cancelled);
        }
        tracing::debug!(lines, words, distinct = counts.len(), "task finished");
        Ok(TaskOutput {
            task_id: task.get_task_id(),
            counts,
            lines,
            words,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryInput, TextInput};
    use crate::test_utils::ScratchDir;
    use claims::assert_matches;

    #[test]
    fn test_worker_do_task() {
        let input = MemoryInput::new(vec![
            vec!["the quick fox".to_string(), "  ".to_string()],
            vec!["the lazy fox".to_string()],
        ]);
        let worker = Worker::new(Arc::new(input), CancelHandle::new());

        let output = worker.do_task(&Task::new(0)).unwrap();
        assert_eq!(output.task_id, 0);
        assert_eq!(output.lines, 2);
        assert_eq!(output.words, 3);
        assert_eq!(output.counts.get("fox"), Some(1));

        let output = worker.do_task(&Task::new(1)).unwrap();
        assert_eq!(output.counts.get("lazy"), Some(1));
    }

    #[test]
    fn test_worker_reads_text_partition() {
        let dir = ScratchDir::new();
        let path = dir.write("input.txt", "a b\nb c\n");
        let input = TextInput::open(&path, 1, 1).unwrap();
        let worker = Worker::new(Arc::new(input), CancelHandle::new());

        let output = worker.do_task(&Task::new(0)).unwrap();
        assert_eq!(output.counts.get("b"), Some(2));
        assert_eq!(output.lines, 2);
    }

    #[test]
    fn test_worker_stops_when_cancelled() {
        let input = MemoryInput::from_lines(["a", "b"], 1);
        let cancel = CancelHandle::new();
        cancel.cancel();
        let worker = Worker::new(Arc::new(input), cancel);
        assert_matches!(worker.do_task(&Task::new(0)), Err(WordCountError::Cancelled));
    }

    #[test]
    fn test_worker_reports_read_failure() {
        let dir = ScratchDir::new();
        let path = dir.write("input.txt", "a\n");
        let input = TextInput::open(&path, 1, 1).unwrap();
        std::fs::remove_file(&path).unwrap();
        let worker = Worker::new(Arc::new(input), CancelHandle::new());
        assert_matches!(
            worker.do_task(&Task::new(0)),
            Err(WordCountError::InputRead { .. })
        );
    }
}
