//! Report rendering for adaptilearn.

pub mod html;

pub use html::{generate_analytics_html, generate_session_html, write_html_report};
