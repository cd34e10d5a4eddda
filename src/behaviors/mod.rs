//! The page behaviors. Each installer is an explicit pass over a [`Page`]:
//! it queries the document once and attaches listeners or schedules tasks.
//! The behaviors are independent of one another.
//!
//! [`Page`]: crate::Page

pub mod column_map;
pub mod skip_link;
pub mod toast;

pub use column_map::install_column_map;
pub use skip_link::install_skip_links;
pub use toast::install_toasts;
