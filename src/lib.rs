//! Page behaviors for the exam generator front end, run over a deterministic
//! page model.
//!
//! A [`Page`] is built from markup and owns an isolated document, an event
//! listener store, a focus pointer and a virtual clock. The behaviors in
//! [`behaviors`] install themselves onto a page explicitly:
//!
//! - the column-mapping label updater (`select.col-map`),
//! - timed toast dismissal (`.toast`),
//! - skip-link focus (`.skip-link`).
//!
//! ```
//! use page_behaviors::Page;
//!
//! # fn main() -> page_behaviors::Result<()> {
//! let mut page = Page::from_html(r##"
//!   <div class="toast" data-timeout="1000">Saved</div>
//!   <a class="skip-link" href="#main">Skip</a>
//!   <main id="main"></main>
//! "##)?;
//! page.load()?;
//!
//! page.advance_time(999)?;
//! page.assert_exists(".toast")?;
//! page.advance_time(2)?;
//! page.assert_absent(".toast")?;
//!
//! page.click(".skip-link")?;
//! page.assert_focused("#main")?;
//! page.assert_attr("#main", "tabindex", "-1")?;
//! # Ok(())
//! # }
//! ```

pub mod behaviors;
mod config;
mod dom;
mod events;
mod html;
mod page;
mod scheduler;
mod selector;
mod timeout;
mod trace;

pub use behaviors::column_map::ColumnMapBinding;
pub use behaviors::toast::ScheduledToast;
pub use config::{PageConfig, TimeoutParseMode};
pub use dom::NodeId;
pub use page::{LoadReport, Page};
pub use scheduler::PendingTimer;
pub use timeout::TimeoutParser;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("dom error: {0}")]
    Dom(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("clock error: {0}")]
    Clock(String),
    #[error(
        "timer queue exceeded max task steps: limit={limit}, now_ms={now_ms}, pending_tasks={pending}"
    )]
    TimerStepLimit {
        limit: usize,
        now_ms: i64,
        pending: usize,
    },
    #[error("page behaviors are already loaded")]
    AlreadyLoaded,
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("timeout pattern error: {0}")]
    Pattern(String),
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = chars.next() else {
            return out;
        };
        out.push(ch);
    }
    if chars.next().is_some() {
        out.push_str("...");
    }
    out
}
