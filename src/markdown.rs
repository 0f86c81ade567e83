//! Markdown to HTML for timeline entries
//!
//! Replies are written in Markdown (bold quotes, headers, `[ ]` action
//! items). Raw HTML in the source is escaped rather than passed through.

use pulldown_cmark::{html, Event, Options, Parser};

pub fn render_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
