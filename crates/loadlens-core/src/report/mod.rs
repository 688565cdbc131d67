pub mod html;
pub mod render;

pub use html::html_escape;
pub use render::{
    export_json, fill_placeholders, render, Placeholder, Report, DEFAULT_TEMPLATE, NOT_AVAILABLE,
};
