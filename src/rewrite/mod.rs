//! Reference rewriting for the two asset kinds whose content is modified before packaging.
//!
//! Stylesheets get their `url(...)` references inlined as data URIs, HTML documents get the
//! runtime scripts injected. Both are pattern based and operate on decoded text.

pub mod css;
mod filters;
pub mod html;

pub use css::{embed_css_resources, normalize_imports};
pub use filters::{should_ignore_reference, strip_query_and_fragment};
pub use html::inject_scripts;
