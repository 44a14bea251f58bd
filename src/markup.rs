//! Rendered page markup (HTML) to Markdown.
//!
//! The remote serves each page body as rendered HTML. This module turns it
//! into Markdown for the archive. Conversion never fails: empty input gives
//! empty output, and markup the tokenizer cannot follow is converted up to
//! the point where it stopped making sense.
//!
//! Supported structure: headings, paragraphs, line breaks, bold/italic,
//! inline code and `<pre>` blocks, links, images, nested lists, block
//! quotes, simple tables and horizontal rules. Page-layout wrapper `<div>`s
//! (`contentLayout2`, `columnLayout`, `cell`, `innerCell`) are dropped
//! without leaving blank lines. Lines are never wrapped.

use quick_xml::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::traits::Transform;

/// Layout-only wrapper classes. Their `<div>`s carry no meaning.
const LAYOUT_CLASSES: &[&str] = &["contentLayout2", "columnLayout", "cell", "innerCell"];

/// The built-in [`Transform`]: HTML in, Markdown out.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlToMarkdown;

impl Transform for HtmlToMarkdown {
    fn transform(&self, markup: &str) -> String {
        html_to_markdown(markup)
    }
}

pub fn html_to_markdown(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.check_comments = false;

    let mut conv = Converter::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => conv.start(&e),
            Ok(Event::Empty(e)) => {
                conv.start(&e);
                let name = tag_name(e.local_name().as_ref());
                if !is_void(&name) {
                    conv.end(&name);
                }
            }
            Ok(Event::End(e)) => conv.end(&tag_name(e.local_name().as_ref())),
            Ok(Event::Text(t)) => {
                let text = match t.unescape_with(resolve_html_entity) {
                    Ok(s) => s.into_owned(),
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                conv.text(&text);
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c).into_owned();
                conv.text(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(error = %e, "markup conversion stopped early");
                break;
            }
        }
    }

    tidy(&conv.finish())
}

fn tag_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_ascii_lowercase()
}

fn is_void(name: &str) -> bool {
    matches!(name, "br" | "hr" | "img" | "input" | "meta" | "link" | "col")
}

/// Named entity lookup for text and attribute values.
///
/// `&nbsp;` becomes a plain space so it collapses with surrounding
/// whitespace; everything else follows the XML predefined set and then the
/// HTML5 named character references.
fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "nbsp" => Some(" "),
        _ => escape::resolve_predefined_entity(entity)
            .or_else(|| escape::resolve_html5_entity(entity)),
    }
}

fn attr(e: &BytesStart, key: &str) -> Option<String> {
    e.html_attributes()
        .flatten()
        .find(|a| a.key.as_ref().eq_ignore_ascii_case(key.as_bytes()))
        .map(|a| {
            let raw = String::from_utf8_lossy(&a.value).into_owned();
            escape::unescape_with(&raw, resolve_html_entity)
                .map(|s| s.into_owned())
                .unwrap_or(raw)
        })
}

enum Frame {
    Link(Option<String>),
    Quote,
}

#[derive(Clone, Copy)]
enum ListKind {
    Unordered,
    Ordered(u32),
}

#[derive(Default)]
struct TableState {
    cells: usize,
    row_has_header: bool,
    header_done: bool,
}

#[derive(Default)]
struct Converter {
    root: String,
    frames: Vec<(Frame, String)>,
    lists: Vec<ListKind>,
    divs: Vec<bool>,
    tables: Vec<TableState>,
    pre: usize,
    skip: usize,
}

impl Converter {
    fn buf(&mut self) -> &mut String {
        match self.frames.last_mut() {
            Some((_, buf)) => buf,
            None => &mut self.root,
        }
    }

    fn push(&mut self, s: &str) {
        if self.skip == 0 {
            self.buf().push_str(s);
        }
    }

    fn block_break(&mut self) {
        let buf = self.buf();
        if buf.is_empty() {
            return;
        }
        let trailing = buf.len() - buf.trim_end_matches('\n').len();
        for _ in trailing..2 {
            buf.push('\n');
        }
    }

    fn line_break(&mut self) {
        let buf = self.buf();
        if !buf.is_empty() && !buf.ends_with('\n') {
            buf.push('\n');
        }
    }

    fn text(&mut self, raw: &str) {
        if self.skip > 0 {
            return;
        }
        if self.pre > 0 {
            self.buf().push_str(raw);
            return;
        }

        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let leading = raw.starts_with(char::is_whitespace);
        let trailing = raw.ends_with(char::is_whitespace) && !collapsed.is_empty();

        let buf = self.buf();
        if leading && !buf.is_empty() && !buf.ends_with(char::is_whitespace) {
            buf.push(' ');
        }
        buf.push_str(&collapsed);
        if trailing {
            buf.push(' ');
        }
    }

    fn start(&mut self, e: &BytesStart) {
        let name = tag_name(e.local_name().as_ref());
        match name.as_str() {
            "script" | "style" | "head" | "title" => self.skip += 1,
            _ if self.skip > 0 => {}
            "p" => self.block_break(),
            "div" => {
                let wrapper = attr(e, "class")
                    .map(|c| c.split_whitespace().any(|c| LAYOUT_CLASSES.contains(&c)))
                    .unwrap_or(false);
                if !wrapper {
                    self.block_break();
                }
                self.divs.push(wrapper);
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                self.block_break();
                self.push(&format!("{} ", "#".repeat(level)));
            }
            "br" => self.push("\n"),
            "hr" => {
                self.block_break();
                self.push("* * *");
                self.block_break();
            }
            "strong" | "b" => self.push("**"),
            "em" | "i" => self.push("_"),
            "code" | "tt" if self.pre == 0 => self.push("`"),
            "pre" => {
                self.block_break();
                self.push("```\n");
                self.pre += 1;
            }
            "a" => self
                .frames
                .push((Frame::Link(attr(e, "href")), String::new())),
            "img" => {
                let src = attr(e, "src").unwrap_or_default();
                if !src.is_empty() {
                    let alt = attr(e, "alt").unwrap_or_default();
                    self.push(&format!("![{}]({})", alt, src));
                }
            }
            "ul" | "ol" => {
                if self.lists.is_empty() {
                    self.block_break();
                } else {
                    self.line_break();
                }
                let kind = if name == "ol" {
                    let first = attr(e, "start")
                        .and_then(|s| s.trim().parse::<u32>().ok())
                        .unwrap_or(1);
                    ListKind::Ordered(first)
                } else {
                    ListKind::Unordered
                };
                self.lists.push(kind);
            }
            "li" => {
                self.line_break();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(ListKind::Ordered(n)) => {
                        let m = format!("{}. ", n);
                        *n += 1;
                        m
                    }
                    _ => "* ".to_string(),
                };
                self.push(&format!("{}{}", indent, marker));
            }
            "blockquote" => self.frames.push((Frame::Quote, String::new())),
            "table" => {
                self.block_break();
                self.tables.push(TableState::default());
            }
            "tr" => {
                self.line_break();
                self.push("|");
                if let Some(t) = self.tables.last_mut() {
                    t.cells = 0;
                    t.row_has_header = false;
                }
            }
            "th" | "td" => {
                self.push(" ");
                if name == "th" {
                    if let Some(t) = self.tables.last_mut() {
                        t.row_has_header = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &str) {
        match name {
            "script" | "style" | "head" | "title" => self.skip = self.skip.saturating_sub(1),
            _ if self.skip > 0 => {}
            "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.block_break(),
            "div" => {
                if self.divs.pop() != Some(true) {
                    self.block_break();
                }
            }
            "strong" | "b" => self.push("**"),
            "em" | "i" => self.push("_"),
            "code" | "tt" if self.pre == 0 => self.push("`"),
            "pre" if self.pre > 0 => {
                self.pre -= 1;
                self.line_break();
                self.push("```");
                self.block_break();
            }
            "a" => {
                if matches!(self.frames.last(), Some((Frame::Link(_), _))) {
                    if let Some((Frame::Link(href), inner)) = self.frames.pop() {
                        let text = inner.trim();
                        let rendered = match href.filter(|h| !h.is_empty()) {
                            Some(h) if text.is_empty() => format!("<{}>", h),
                            Some(h) => format!("[{}]({})", text, h),
                            None => text.to_string(),
                        };
                        self.push(&rendered);
                    }
                }
            }
            "ul" | "ol" => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.block_break();
                } else {
                    self.line_break();
                }
            }
            "li" => self.line_break(),
            "blockquote" => {
                if matches!(self.frames.last(), Some((Frame::Quote, _))) {
                    if let Some((_, inner)) = self.frames.pop() {
                        let quoted = inner
                            .trim()
                            .lines()
                            .map(|l| {
                                if l.trim().is_empty() {
                                    ">".to_string()
                                } else {
                                    format!("> {}", l)
                                }
                            })
                            .collect::<Vec<_>>()
                            .join("\n");
                        self.block_break();
                        self.push(&quoted);
                        self.block_break();
                    }
                }
            }
            "th" | "td" => {
                self.push(" |");
                if let Some(t) = self.tables.last_mut() {
                    t.cells += 1;
                }
            }
            "tr" => {
                let separator = match self.tables.last_mut() {
                    Some(t) if t.row_has_header && !t.header_done => {
                        t.header_done = true;
                        Some(format!("\n|{}", " --- |".repeat(t.cells)))
                    }
                    _ => None,
                };
                if let Some(sep) = separator {
                    self.push(&sep);
                }
            }
            "table" => {
                self.tables.pop();
                self.block_break();
            }
            _ => {}
        }
    }

    /// Fold any unclosed frames back into their parents.
    fn finish(mut self) -> String {
        while let Some((_, inner)) = self.frames.pop() {
            self.buf().push_str(&inner);
        }
        self.root
    }
}

/// Strip trailing whitespace from every line, collapse runs of blank lines
/// outside fenced code, and trim the result.
fn tidy(markdown: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_fence = false;
    let mut blank_run = 0;

    for line in markdown.lines() {
        let line = line.trim_end();
        if line.starts_with("```") {
            in_fence = !in_fence;
        }
        if line.is_empty() && !in_fence {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(line);
    }

    out.join("\n").trim().to_string()
}
