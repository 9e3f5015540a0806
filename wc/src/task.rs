use crate::aggregate::WordCounts;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum TaskStatus {
    Init,
    Ongoing,
    Done,
    Failed,
}

/// Tokenize + local aggregation over one input partition. The task id is the
/// partition index.
#[derive(Debug, Clone)]
pub struct Task {
    id: usize,
    status: TaskStatus,
}

impl Task {
    pub fn new(id: usize) -> Task {
        Task {
            id,
            status: TaskStatus::Init,
        }
    }

    pub fn get_task_id(&self) -> usize {
        self.id
    }

    pub fn get_task_status(&self) -> TaskStatus {
        self.status
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub fn name(&self) -> String {
        format!("map-{}", self.id)
    }
}

/// Partial result of one task.
#[derive(Debug, Clone)]
pub struct TaskOutput {
    pub task_id: usize,
    pub counts: WordCounts,
    pub lines: u64,
    pub words: u64,
}
