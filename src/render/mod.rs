//! Module JSON to HTML.
//!
//! Rendering happens in two steps: a [`Module`] is reshaped into a
//! [`PageView`] (typedef matching, prototypes, sorting), which is then
//! written out as a standalone page.

pub mod html;
pub mod markdown;
pub mod view;

use crate::model::Module;

pub use html::{render_index, render_page, IndexEntry};
pub use view::PageView;

/// Renders one module as a complete HTML page.
pub fn render_module(module: &Module, project: &str) -> String {
    render_page(&PageView::build(module, project))
}
