use crate::behaviors::column_map::{self, ColumnMapBinding};
use crate::behaviors::skip_link;
use crate::behaviors::toast::{self, ScheduledToast};
use crate::config::PageConfig;
use crate::dom::{Dom, NodeId};
use crate::events::{EventState, Handler, ListenerStore};
use crate::html::parse_html;
use crate::scheduler::{PendingTimer, ScheduledTask, Scheduler, TaskAction};
use crate::timeout::TimeoutParser;
use crate::trace::{TraceKind, TraceState};
use crate::{Error, Result, truncate_chars};

const STACK_GROW_BYTES: usize = 32 * 1024 * 1024;

/// What [`Page::load`] installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub column_maps: Vec<ColumnMapBinding>,
    pub toasts: Vec<ScheduledToast>,
    pub skip_links: usize,
}

/// One isolated document with its listeners, focus and virtual clock.
#[derive(Debug)]
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) scheduler: Scheduler,
    pub(crate) timeout_parser: TimeoutParser,
    pub(crate) trace: TraceState,
    active_element: Option<NodeId>,
    location_hash: String,
    timer_step_limit: usize,
    loaded: bool,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Self::from_html_with_config(html, PageConfig::default())
    }

    pub fn from_html_with_config(html: &str, config: PageConfig) -> Result<Self> {
        config.validate()?;
        let dom = parse_html(html)?;
        let timeout_parser =
            TimeoutParser::new(config.timeout_parse, config.default_toast_timeout_ms)?;
        Ok(Self {
            dom,
            listeners: ListenerStore::default(),
            scheduler: Scheduler::new(),
            timeout_parser,
            trace: TraceState::new(config.trace, config.trace_log_limit),
            active_element: None,
            location_hash: String::new(),
            timer_step_limit: config.timer_step_limit,
            loaded: false,
        })
    }

    /// Runs the page-ready pass: toast dismissal and skip links first, then
    /// `DOMContentLoaded`, then the column-mapping updater.
    pub fn load(&mut self) -> Result<LoadReport> {
        if self.loaded {
            return Err(Error::AlreadyLoaded);
        }
        self.loaded = true;

        let toasts = toast::install_toasts(self)?;
        let skip_links = skip_link::install_skip_links(self)?;
        // Nothing native listens for this; it marks the point in the trace.
        let root = self.dom.root;
        self.dispatch_event(root, "DOMContentLoaded")?;
        let column_maps = column_map::install_column_map(self)?;

        tracing::debug!(
            toasts = toasts.len(),
            skip_links,
            column_maps = column_maps.len(),
            "page behaviors loaded"
        );
        Ok(LoadReport {
            column_maps,
            toasts,
            skip_links,
        })
    }

    /// Attaches `binding` to the control, replacing any column-mapping
    /// binding already on it.
    pub fn bind_column_map(&mut self, selector: &str, binding: ColumnMapBinding) -> Result<()> {
        let control = self.select_one(selector)?;
        for existing in self.listeners.get(control, "change") {
            if matches!(existing, Handler::ColumnMap(_)) {
                self.listeners.remove(control, "change", &existing);
            }
        }
        self.listeners
            .add(control, "change", Handler::ColumnMap(binding));
        Ok(())
    }

    pub fn listener_count(&self, selector: &str, event: &str) -> Result<usize> {
        let target = self.select_one(selector)?;
        Ok(self.listeners.count(target, event))
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace.enabled = enabled;
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace.take()
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace.events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace.timers = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Config(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace.set_limit(max_entries);
        Ok(())
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        if max_steps == 0 {
            return Err(Error::Config(
                "set_timer_step_limit requires at least 1 step".into(),
            ));
        }
        self.timer_step_limit = max_steps;
        Ok(())
    }

    pub fn timeout_parser(&self) -> &TimeoutParser {
        &self.timeout_parser
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.disabled(target) {
            return Ok(());
        }
        stacker::grow(STACK_GROW_BYTES, || self.click_node(target))
    }

    /// Sets a `<select>` value the way a user would, then fires `input` and
    /// `change`. A value with no matching option leaves nothing selected.
    pub fn select_value(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let is_select = self
            .dom
            .tag_name(target)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("select"));
        if !is_select {
            return Err(Error::Dom(format!("{selector} is not a <select>")));
        }
        if self.dom.disabled(target) {
            return Ok(());
        }
        stacker::grow(STACK_GROW_BYTES, || {
            self.dom.set_value(target, value)?;
            self.dispatch_event(target, "input")?;
            self.dispatch_event(target, "change")?;
            Ok(())
        })
    }

    pub fn dispatch(&mut self, selector: &str, event: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(STACK_GROW_BYTES, || {
            self.dispatch_event(target, event)?;
            Ok(())
        })
    }

    pub fn focus(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(STACK_GROW_BYTES, || self.focus_node(target))
    }

    pub fn blur(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        stacker::grow(STACK_GROW_BYTES, || self.blur_node(target))
    }

    /// Removes an element now and cancels any removal still scheduled for
    /// it. Returns whether the element was attached.
    pub fn dismiss(&mut self, selector: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        let cancelled = self
            .scheduler
            .clear_matching(TaskAction::RemoveNode(target));
        let label = self.trace_node_label(target);
        self.trace_line(
            TraceKind::Timer,
            format!("[timer] dismiss target={label} cancelled={cancelled:?}"),
        );
        self.remove_node(target)
    }

    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms
    }

    pub fn clear_timer(&mut self, timer_id: i64) -> bool {
        let existed = self.scheduler.clear(timer_id);
        self.trace_line(
            TraceKind::Timer,
            format!("[timer] clear id={timer_id} removed={existed}"),
        );
        existed
    }

    pub fn clear_all_timers(&mut self) -> usize {
        let cleared = self.scheduler.clear_all();
        self.trace_line(
            TraceKind::Timer,
            format!("[timer] clear_all cleared={cleared}"),
        );
        cleared
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.scheduler.pending()
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Clock(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let from = self.scheduler.now_ms;
        self.scheduler.now_ms = from.saturating_add(delta_ms);
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms), false)?;
        self.trace_line(
            TraceKind::Timer,
            format!(
                "[timer] advance delta_ms={delta_ms} from={from} to={} ran_due={ran}",
                self.scheduler.now_ms
            ),
        );
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        let from = self.scheduler.now_ms;
        if target_ms < from {
            return Err(Error::Clock(format!(
                "advance_time_to requires target >= now_ms (target={target_ms}, now_ms={from})"
            )));
        }
        self.scheduler.now_ms = target_ms;
        let ran = self.run_timer_queue(Some(target_ms), false)?;
        self.trace_line(
            TraceKind::Timer,
            format!("[timer] advance_to from={from} to={target_ms} ran_due={ran}"),
        );
        Ok(())
    }

    /// Runs every pending task, moving the clock forward to each due time.
    pub fn flush(&mut self) -> Result<()> {
        let from = self.scheduler.now_ms;
        let ran = self.run_timer_queue(None, true)?;
        self.trace_line(
            TraceKind::Timer,
            format!(
                "[timer] flush from={from} to={} ran={ran}",
                self.scheduler.now_ms
            ),
        );
        Ok(())
    }

    pub fn run_next_timer(&mut self) -> Result<bool> {
        let Some(task) = self.scheduler.pop_next(None) else {
            self.trace_line(TraceKind::Timer, "[timer] run_next none".into());
            return Ok(false);
        };
        if task.due_at > self.scheduler.now_ms {
            self.scheduler.now_ms = task.due_at;
        }
        self.execute_task(task)?;
        Ok(true)
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        let ran = self.run_timer_queue(Some(self.scheduler.now_ms), false)?;
        self.trace_line(
            TraceKind::Timer,
            format!(
                "[timer] run_due now_ms={} ran={ran}",
                self.scheduler.now_ms
            ),
        );
        Ok(ran)
    }

    pub fn text(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.text_content(target))
    }

    pub fn value(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.value(target)
    }

    pub fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let target = self.select_one(selector)?;
        Ok(self.dom.attr(target, name))
    }

    pub fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.dom.query_selector(selector)?.is_some())
    }

    /// Finds the first element matching `selector`.
    pub fn query(&self, selector: &str) -> Result<Option<NodeId>> {
        self.dom.query_selector(selector)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.dom.is_connected(node)
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    pub fn active_element_id(&self) -> Option<String> {
        self.active_element.and_then(|node| self.dom.attr(node, "id"))
    }

    /// Fragment of the last in-page navigation, without the `#`.
    pub fn location_hash(&self) -> &str {
        &self.location_hash
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_attr(&self, selector: &str, name: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.attr(target, name);
        if actual.as_deref() != Some(expected) {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: format!("{name}={expected}"),
                actual: match actual {
                    Some(value) => format!("{name}={value}"),
                    None => format!("no {name} attribute"),
                },
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn assert_exists(&self, selector: &str) -> Result<()> {
        let _ = self.select_one(selector)?;
        Ok(())
    }

    pub fn assert_absent(&self, selector: &str) -> Result<()> {
        if let Some(found) = self.dom.query_selector(selector)? {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: "no match".into(),
                actual: "element present".into(),
                dom_snippet: self.node_snippet(found),
            });
        }
        Ok(())
    }

    pub fn assert_focused(&self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.active_element != Some(target) {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: "focused".into(),
                actual: match self.active_element {
                    Some(node) => format!("focus on {}", self.trace_node_label(node)),
                    None => "no focused element".into(),
                },
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    fn node_snippet(&self, node_id: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node_id), 200)
    }

    fn click_node(&mut self, target: NodeId) -> Result<()> {
        self.dispatch_event(target, "click")?;

        // Native handlers never cancel, so the anchor default action always
        // runs: in-page navigation updates the hash.
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            let is_anchor = self
                .dom
                .tag_name(node)
                .is_some_and(|tag| tag.eq_ignore_ascii_case("a"));
            if is_anchor {
                if let Some(href) = self.dom.attr(node, "href") {
                    if let Some((_, fragment)) = href.split_once('#') {
                        self.location_hash = fragment.to_string();
                        self.trace_line(
                            TraceKind::Event,
                            format!("[event] navigate hash=#{fragment}"),
                        );
                    }
                }
                break;
            }
            cursor = self.dom.parent(node);
        }
        Ok(())
    }

    pub(crate) fn attach(&mut self, node: NodeId, event: &str, handler: Handler) {
        let label = self.trace_node_label(node);
        self.trace_line(
            TraceKind::Behavior,
            format!("[behavior] attach {} on={label} event={event}", handler.label()),
        );
        self.listeners.add(node, event, handler);
    }

    pub(crate) fn schedule(&mut self, action: TaskAction, delay_ms: i64) -> ScheduledTask {
        let task = self.scheduler.schedule_timeout(action, delay_ms);
        self.trace_line(
            TraceKind::Timer,
            format!(
                "[timer] schedule timeout id={} due_at={} delay_ms={delay_ms}",
                task.id, task.due_at
            ),
        );
        task
    }

    pub(crate) fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Result<()> {
        let mut event = EventState::new(event_type, target);

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            if !bubbles(event_type) {
                break;
            }
            cursor = self.dom.parent(node);
        }

        // Target phase, then bubble phase.
        for node in path {
            event.current_target = node;
            self.invoke_listeners(node, &mut event)?;
        }

        self.trace_event_done(&event);
        Ok(())
    }

    fn invoke_listeners(&mut self, node_id: NodeId, event: &mut EventState) -> Result<()> {
        let handlers = self.listeners.get(node_id, &event.event_type);
        for handler in handlers {
            if self.trace.enabled {
                let phase = if event.current_target == event.target {
                    "target"
                } else {
                    "bubble"
                };
                let target_label = self.trace_node_label(event.target);
                let current_label = self.trace_node_label(event.current_target);
                self.trace_line(
                    TraceKind::Event,
                    format!(
                        "[event] {} target={target_label} current={current_label} phase={phase} handler={}",
                        event.event_type,
                        handler.label()
                    ),
                );
            }
            self.run_handler(&handler, event)?;
        }
        Ok(())
    }

    fn run_handler(&mut self, handler: &Handler, event: &EventState) -> Result<()> {
        match handler {
            Handler::ColumnMap(binding) => {
                column_map::on_change(self, event.current_target, binding)
            }
            Handler::SkipLink => skip_link::on_click(self, event.current_target),
        }
    }

    pub(crate) fn focus_node(&mut self, node: NodeId) -> Result<()> {
        if self.dom.disabled(node) || !self.dom.is_connected(node) {
            return Ok(());
        }

        if self.active_element == Some(node) {
            return Ok(());
        }

        if let Some(current) = self.active_element {
            self.blur_node(current)?;
        }

        self.active_element = Some(node);
        self.dispatch_event(node, "focusin")?;
        self.dispatch_event(node, "focus")?;
        Ok(())
    }

    fn blur_node(&mut self, node: NodeId) -> Result<()> {
        if self.active_element != Some(node) {
            return Ok(());
        }

        self.dispatch_event(node, "focusout")?;
        self.dispatch_event(node, "blur")?;
        self.active_element = None;
        Ok(())
    }

    fn remove_node(&mut self, node: NodeId) -> Result<bool> {
        let removed = self.dom.remove_node(node)?;
        // Focus fixup: a detached element cannot stay focused.
        if self
            .active_element
            .is_some_and(|active| !self.dom.is_connected(active))
        {
            self.active_element = None;
        }
        Ok(removed)
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        while self.scheduler.has_due(due_limit) {
            // Checked before popping so the task that trips the limit stays queued.
            if steps >= self.timer_step_limit {
                return Err(Error::TimerStepLimit {
                    limit: self.timer_step_limit,
                    now_ms: self.scheduler.now_ms,
                    pending: self.scheduler.len(),
                });
            }
            let Some(task) = self.scheduler.pop_next(due_limit) else {
                break;
            };
            steps += 1;
            if advance_clock && task.due_at > self.scheduler.now_ms {
                self.scheduler.now_ms = task.due_at;
            }
            self.execute_task(task)?;
        }
        Ok(steps)
    }

    fn execute_task(&mut self, task: ScheduledTask) -> Result<()> {
        self.trace_line(
            TraceKind::Timer,
            format!(
                "[timer] run id={} due_at={} now_ms={}",
                task.id, task.due_at, self.scheduler.now_ms
            ),
        );
        match task.action {
            TaskAction::RemoveNode(node) => {
                let removed = self.remove_node(node)?;
                let label = self.trace_node_label(node);
                if removed {
                    self.trace_line(
                        TraceKind::Behavior,
                        format!("[behavior] toast removed target={label}"),
                    );
                } else {
                    tracing::debug!(timer_id = task.id, "toast already detached");
                    self.trace_line(
                        TraceKind::Behavior,
                        format!("[behavior] toast already detached target={label}"),
                    );
                }
            }
        }
        Ok(())
    }

    fn trace_event_done(&mut self, event: &EventState) {
        if !self.trace.enabled {
            return;
        }
        let target_label = self.trace_node_label(event.target);
        self.trace_line(
            TraceKind::Event,
            format!("[event] done {} target={target_label}", event.event_type),
        );
    }

    pub(crate) fn trace_line(&mut self, kind: TraceKind, line: String) {
        self.trace.record(kind, line);
    }

    pub(crate) fn trace_node_label(&self, node: NodeId) -> String {
        if node == self.dom.root {
            return "document".into();
        }
        match self.dom.attr(node, "id").filter(|id| !id.is_empty()) {
            Some(id) => format!("#{id}"),
            None => self
                .dom
                .tag_name(node)
                .map(str::to_string)
                .unwrap_or_else(|| "#text".into()),
        }
    }
}

fn bubbles(event_type: &str) -> bool {
    !matches!(event_type, "focus" | "blur" | "load")
}
