//! Skip-link focus.
//!
//! Clicking a `.skip-link` focuses the element its href fragment names,
//! making it programmatically focusable with `tabindex="-1"`. The click's
//! default navigation is left alone.

use crate::dom::NodeId;
use crate::events::Handler;
use crate::trace::TraceKind;
use crate::{Page, Result};

pub const SKIP_LINK_SELECTOR: &str = ".skip-link";

pub fn install_skip_links(page: &mut Page) -> Result<usize> {
    let links = page.dom.query_selector_all(SKIP_LINK_SELECTOR)?;
    for link in &links {
        page.attach(*link, "click", Handler::SkipLink);
    }
    Ok(links.len())
}

/// The part of `href` after the first `#`, if it is non-empty.
pub fn fragment_of(href: &str) -> Option<&str> {
    href.split_once('#')
        .map(|(_, fragment)| fragment)
        .filter(|fragment| !fragment.is_empty())
}

pub(crate) fn on_click(page: &mut Page, link: NodeId) -> Result<()> {
    let href = page.dom.attr(link, "href");
    let Some(fragment) = href.as_deref().and_then(fragment_of) else {
        tracing::debug!(href = ?href, "skip link has no fragment");
        let label = page.trace_node_label(link);
        page.trace_line(
            TraceKind::Behavior,
            format!("[behavior] skip-link no fragment link={label}"),
        );
        return Ok(());
    };

    let Some(target) = page.dom.by_id(fragment) else {
        tracing::debug!(fragment, "skip link target not found");
        page.trace_line(
            TraceKind::Behavior,
            format!("[behavior] skip-link missing target=#{fragment}"),
        );
        return Ok(());
    };

    page.dom.set_attr(target, "tabindex", "-1")?;
    page.focus_node(target)?;
    page.trace_line(
        TraceKind::Behavior,
        format!("[behavior] skip-link focus target=#{fragment}"),
    );
    Ok(())
}
