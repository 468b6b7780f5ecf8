//! Markdown-to-plain-text sanitation.
//!
//! Generated text is asked to avoid Markdown, but models leak it anyway.
//! [`strip_markdown`] removes the syntax and keeps the readable text, so
//! evolved articles match the plain style of ingested ones.

mod sanitize;

pub use sanitize::strip_markdown;
