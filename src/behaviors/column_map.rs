//! Column-mapping label updater.
//!
//! Every `select.col-map` control mirrors its value into the element named
//! by its `data-target`. An empty value shows the binding's fallback text.

use crate::dom::{Dom, NodeId};
use crate::events::Handler;
use crate::trace::TraceKind;
use crate::{Page, Result};

pub const COLUMN_MAP_SELECTOR: &str = "select.col-map";

/// A selector control's link to its display element.
///
/// The display element is looked up by id on every change, so it may come
/// and go. The fallback is fixed when the binding is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapBinding {
    target_id: Option<String>,
    fallback: String,
}

impl ColumnMapBinding {
    pub fn new(target_id: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            target_id: Some(target_id.into()),
            fallback: fallback.into(),
        }
    }

    /// Reads `data-target` from the control and `data-original` from the
    /// target as it is right now. An unresolved target gets an empty
    /// fallback.
    pub(crate) fn from_markup(dom: &Dom, control: NodeId) -> Self {
        let target_id = dom
            .dataset_get(control, "target")
            .filter(|id| !id.is_empty());
        let fallback = target_id
            .as_deref()
            .and_then(|id| dom.by_id(id))
            .and_then(|target| dom.dataset_get(target, "original"))
            .unwrap_or_default();
        Self {
            target_id,
            fallback,
        }
    }

    pub fn target_id(&self) -> Option<&str> {
        self.target_id.as_deref()
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Text the display element should show for a control value.
    pub fn display_text<'a>(&'a self, value: &'a str) -> &'a str {
        if value.is_empty() {
            &self.fallback
        } else {
            value
        }
    }
}

pub fn install_column_map(page: &mut Page) -> Result<Vec<ColumnMapBinding>> {
    let controls = page.dom.query_selector_all(COLUMN_MAP_SELECTOR)?;
    let mut bindings = Vec::with_capacity(controls.len());
    for control in controls {
        let binding = ColumnMapBinding::from_markup(&page.dom, control);
        page.attach(control, "change", Handler::ColumnMap(binding.clone()));
        bindings.push(binding);
    }
    Ok(bindings)
}

pub(crate) fn on_change(page: &mut Page, control: NodeId, binding: &ColumnMapBinding) -> Result<()> {
    let Some(target) = binding.target_id().and_then(|id| page.dom.by_id(id)) else {
        tracing::debug!(target_id = ?binding.target_id(), "column-map target not found");
        let label = page.trace_node_label(control);
        page.trace_line(
            TraceKind::Behavior,
            format!(
                "[behavior] column-map skip control={label} target={}",
                binding.target_id().unwrap_or("<none>")
            ),
        );
        return Ok(());
    };

    let value = page.dom.value(control)?;
    let text = binding.display_text(&value).to_string();
    page.dom.set_text_content(target, &text)?;

    let label = page.trace_node_label(target);
    page.trace_line(
        TraceKind::Behavior,
        format!("[behavior] column-map update target={label} text={text:?}"),
    );
    Ok(())
}
