//! Markup rendering for assistant replies.
//!
//! Assistant content is treated as Markdown for display; rendering failures
//! degrade to plain text rather than losing content. A separate plain-text
//! projection feeds speech playback.

use pulldown_cmark::{html, Event, Options, Parser, TagEnd};

/// A markup-rendering failure, carried as a plain description.
#[derive(Debug, thiserror::Error)]
#[error("markup rendering failed: {0}")]
pub struct RenderError(pub String);

/// Renders assistant markup to display HTML.
pub trait MarkupRenderer: Send + Sync {
    fn render(&self, source: &str) -> Result<String, RenderError>;
}

/// CommonMark renderer with strikethrough and tables enabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownRenderer;

impl MarkupRenderer for MarkdownRenderer {
    fn render(&self, source: &str) -> Result<String, RenderError> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        let parser = Parser::new_ext(source, options);
        let mut output = String::with_capacity(source.len() * 2);
        html::push_html(&mut output, parser);
        Ok(output)
    }
}

/// Displayable form of a piece of assistant content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderedContent {
    /// Rendered markup (HTML).
    Rich(String),
    /// The raw source, shown as-is because rendering failed.
    Plain(String),
}

impl RenderedContent {
    pub fn as_str(&self) -> &str {
        match self {
            RenderedContent::Rich(s) | RenderedContent::Plain(s) => s,
        }
    }
}

/// Render `source` for display, falling back to the raw text on failure.
pub fn render_with_fallback(renderer: &dyn MarkupRenderer, source: &str) -> RenderedContent {
    match renderer.render(source) {
        Ok(html) => RenderedContent::Rich(html),
        Err(err) => {
            tracing::warn!(error = %err, "Markup rendering failed, showing plain text");
            RenderedContent::Plain(source.to_string())
        }
    }
}

/// Project markup to the plain text used for speech playback.
///
/// Keeps text and inline code, turns breaks and block boundaries into single
/// spaces, and drops all other markup.
pub fn strip_markup(source: &str) -> String {
    let parser = Parser::new(source);
    let mut text = String::with_capacity(source.len());
    for event in parser {
        match event {
            Event::Text(t) => text.push_str(&t),
            Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item) => {
                if !text.ends_with(' ') {
                    text.push(' ');
                }
            }
            _ => {}
        }
    }
    text.trim().to_string()
}

// =============================================================================
// Tests
// =============================================================================
