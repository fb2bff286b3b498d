pub mod render;
pub mod static_check;

pub use render::{render_count, render_select, CountScope, RenderedSql};
