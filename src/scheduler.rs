use crate::dom::NodeId;

/// Deferred work the virtual clock can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskAction {
    RemoveNode(NodeId),
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduledTask {
    pub(crate) id: i64,
    pub(crate) due_at: i64,
    pub(crate) order: i64,
    pub(crate) action: TaskAction,
}

/// Snapshot of a timer still waiting on the virtual clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
    pub order: i64,
    /// The node this timer removes when it fires.
    pub node: NodeId,
}

#[derive(Debug)]
pub(crate) struct Scheduler {
    task_queue: Vec<ScheduledTask>,
    pub(crate) now_ms: i64,
    next_timer_id: i64,
    next_task_order: i64,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self {
            task_queue: Vec::new(),
            now_ms: 0,
            next_timer_id: 1,
            next_task_order: 0,
        }
    }

    /// Queues `action` to run `delay_ms` from now. Negative delays run at
    /// the current instant.
    pub(crate) fn schedule_timeout(&mut self, action: TaskAction, delay_ms: i64) -> ScheduledTask {
        let delay_ms = delay_ms.max(0);
        let due_at = self.now_ms.saturating_add(delay_ms);
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        let task = ScheduledTask {
            id,
            due_at,
            order,
            action,
        };
        self.task_queue.push(task.clone());
        task
    }

    pub(crate) fn clear(&mut self, id: i64) -> bool {
        let before = self.task_queue.len();
        self.task_queue.retain(|task| task.id != id);
        before != self.task_queue.len()
    }

    pub(crate) fn clear_all(&mut self) -> usize {
        let cleared = self.task_queue.len();
        self.task_queue.clear();
        cleared
    }

    /// Cancels every pending task whose action matches, returning their ids.
    pub(crate) fn clear_matching(&mut self, action: TaskAction) -> Vec<i64> {
        let mut cleared = Vec::new();
        self.task_queue.retain(|task| {
            if task.action == action {
                cleared.push(task.id);
                false
            } else {
                true
            }
        });
        cleared
    }

    pub(crate) fn len(&self) -> usize {
        self.task_queue.len()
    }

    pub(crate) fn pending(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .task_queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
                node: match task.action {
                    TaskAction::RemoveNode(node) => node,
                },
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    fn next_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.task_queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    pub(crate) fn has_due(&self, due_limit: Option<i64>) -> bool {
        self.next_index(due_limit).is_some()
    }

    /// Removes and returns the earliest task, limited to tasks due at or
    /// before `due_limit` when one is given.
    pub(crate) fn pop_next(&mut self, due_limit: Option<i64>) -> Option<ScheduledTask> {
        let idx = self.next_index(due_limit)?;
        Some(self.task_queue.remove(idx))
    }
}
