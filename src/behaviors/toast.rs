//! Timed toast dismissal.
//!
//! Each `.toast` gets one removal task on the page clock. Removal of an
//! element that is already gone is a no-op.

use crate::dom::NodeId;
use crate::scheduler::TaskAction;
use crate::trace::TraceKind;
use crate::{Page, Result};

pub const TOAST_SELECTOR: &str = ".toast";
pub const TIMEOUT_ATTR: &str = "data-timeout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledToast {
    pub node: NodeId,
    /// Pass to [`Page::clear_timer`] to keep the toast.
    pub timer_id: i64,
    pub delay_ms: i64,
    pub due_at: i64,
}

pub fn install_toasts(page: &mut Page) -> Result<Vec<ScheduledToast>> {
    let toasts = page.dom.query_selector_all(TOAST_SELECTOR)?;
    let mut scheduled = Vec::with_capacity(toasts.len());
    for node in toasts {
        let raw = page.dom.attr(node, TIMEOUT_ATTR);
        let delay_ms = match page.timeout_parser.parse(raw.as_deref()) {
            Some(delay_ms) => delay_ms,
            None => {
                let delay_ms = page.timeout_parser.default_ms();
                if let Some(raw) = raw.as_deref().filter(|raw| !raw.is_empty()) {
                    tracing::debug!(raw, delay_ms, "unparseable toast timeout, using default");
                    let label = page.trace_node_label(node);
                    page.trace_line(
                        TraceKind::Behavior,
                        format!("[behavior] toast timeout default target={label} raw={raw:?}"),
                    );
                }
                delay_ms
            }
        };

        let task = page.schedule(TaskAction::RemoveNode(node), delay_ms);
        scheduled.push(ScheduledToast {
            node,
            timer_id: task.id,
            delay_ms,
            due_at: task.due_at,
        });
    }
    Ok(scheduled)
}
