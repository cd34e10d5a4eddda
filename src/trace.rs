use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TraceKind {
    Event,
    Timer,
    Behavior,
}

/// In-memory trace buffer. Every buffered line is also emitted through
/// `tracing` so a subscriber sees the same stream.
#[derive(Debug)]
pub(crate) struct TraceState {
    pub(crate) enabled: bool,
    pub(crate) events: bool,
    pub(crate) timers: bool,
    logs: VecDeque<String>,
    limit: usize,
}

impl TraceState {
    pub(crate) fn new(enabled: bool, limit: usize) -> Self {
        Self {
            enabled,
            events: true,
            timers: true,
            logs: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub(crate) fn record(&mut self, kind: TraceKind, line: String) {
        let wanted = self.enabled
            && match kind {
                TraceKind::Event => self.events,
                TraceKind::Timer => self.timers,
                TraceKind::Behavior => true,
            };
        if !wanted {
            return;
        }
        tracing::debug!(target: "page_behaviors::trace", "{line}");
        if self.logs.len() >= self.limit {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    pub(crate) fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        while self.logs.len() > self.limit {
            self.logs.pop_front();
        }
    }

    pub(crate) fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.logs).into()
    }
}
