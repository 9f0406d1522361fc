// ABOUTME: Converts markdown bodies into Notion blocks
// ABOUTME: Hand-rolled line scanner plus a pulldown-cmark based rich converter

use crate::block::{normalize_runs, split_text, Annotations, Block, RichText};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Converter {
    /// Paragraphs and `#`..`###` headings only
    Simple,
    /// CommonMark: lists, quotes, code, images, inline styles
    #[default]
    Rich,
}

impl Converter {
    pub fn convert(&self, markdown: &str) -> Vec<Block> {
        let blocks = match self {
            Converter::Simple => simple_blocks(markdown),
            Converter::Rich => rich_blocks(markdown),
        };
        blocks.into_iter().flat_map(Block::split_oversized).collect()
    }
}

/// Notion only accepts absolute targets for text links and external images.
fn is_absolute_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn is_link_target(url: &str) -> bool {
    is_absolute_url(url) || url.starts_with("mailto:")
}

fn plain_runs(text: &str) -> Vec<RichText> {
    split_text(text).into_iter().map(RichText::plain).collect()
}

fn heading_line(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=3).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    if rest.is_empty() {
        return Some((hashes as u8, ""));
    }
    rest.strip_prefix(' ')
        .or_else(|| rest.strip_prefix('\t'))
        .map(|text| (hashes as u8, text.trim()))
}

/// Line scanner: blank lines end paragraphs, `#`/`##`/`###` lines are headings.
pub fn simple_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    fn flush(paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>) {
        if !paragraph.is_empty() {
            blocks.push(Block::paragraph(plain_runs(&paragraph.join("\n"))));
            paragraph.clear();
        }
    }

    for line in markdown.lines() {
        if line.trim().is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else if let Some((level, text)) = heading_line(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::heading(level, plain_runs(text)));
        } else {
            paragraph.push(line);
        }
    }
    flush(&mut paragraph, &mut blocks);

    blocks
}

/// Languages the Notion code block accepts, keyed by common fence aliases.
fn notion_language(fence: &str) -> &'static str {
    let lang = fence.split_whitespace().next().unwrap_or("").to_lowercase();
    match lang.as_str() {
        "bash" | "sh" | "zsh" | "shell" | "console" => "shell",
        "c" => "c",
        "cpp" | "c++" | "cc" => "c++",
        "cs" | "csharp" | "c#" => "c#",
        "css" => "css",
        "diff" => "diff",
        "dockerfile" | "docker" => "docker",
        "go" | "golang" => "go",
        "graphql" => "graphql",
        "html" | "xml" | "svg" => "html",
        "java" => "java",
        "js" | "javascript" | "jsx" | "mjs" => "javascript",
        "json" | "jsonc" => "json",
        "kotlin" | "kt" => "kotlin",
        "lua" => "lua",
        "makefile" | "make" => "makefile",
        "markdown" | "md" => "markdown",
        "php" => "php",
        "py" | "python" => "python",
        "rb" | "ruby" => "ruby",
        "rs" | "rust" => "rust",
        "scala" => "scala",
        "sql" => "sql",
        "swift" => "swift",
        "toml" => "toml",
        "ts" | "typescript" | "tsx" => "typescript",
        "yaml" | "yml" => "yaml",
        _ => "plain text",
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Pending {
    Paragraph,
    Heading(u8),
    Item { ordered: bool, checked: Option<bool> },
}

#[derive(Default)]
struct RichBuilder {
    blocks: Vec<Block>,
    runs: Vec<RichText>,
    pending: Option<Pending>,
    lists: Vec<bool>,
    quote_depth: usize,
    bold: usize,
    italic: usize,
    strike: usize,
    link: Option<String>,
    code: Option<(String, String)>,
    image: Option<String>,
}

impl RichBuilder {
    fn annotations(&self, code: bool) -> Annotations {
        Annotations {
            bold: self.bold > 0,
            italic: self.italic > 0,
            strikethrough: self.strike > 0,
            code,
        }
    }

    fn push_text(&mut self, text: &str, code: bool) {
        if let Some((_, buf)) = self.code.as_mut() {
            buf.push_str(text);
            return;
        }
        if self.pending.is_none() {
            self.pending = Some(Pending::Paragraph);
        }
        let run = RichText::styled(text, self.annotations(code), self.link.clone());
        self.runs.push(run);
    }

    fn flush(&mut self) {
        let runs = normalize_runs(std::mem::take(&mut self.runs));
        let pending = self.pending.take();
        if runs.is_empty() {
            return;
        }
        let block = match pending.unwrap_or(Pending::Paragraph) {
            Pending::Heading(level) => Block::heading(level, runs),
            Pending::Item {
                checked: Some(checked),
                ..
            } => Block::to_do(checked, runs),
            Pending::Item { ordered, .. } => Block::list_item(ordered, runs),
            Pending::Paragraph if self.quote_depth > 0 => Block::quote(runs),
            Pending::Paragraph => Block::paragraph(runs),
        };
        self.blocks.push(block);
    }

    fn in_item(&self) -> bool {
        matches!(self.pending, Some(Pending::Item { .. }))
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.in_item() {
                    // Loose list items wrap their text in paragraphs
                    if !self.runs.is_empty() {
                        self.runs.push(RichText::plain("\n"));
                    }
                } else {
                    self.flush();
                    self.pending = Some(Pending::Paragraph);
                }
            }
            Tag::Heading { level, .. } => {
                self.flush();
                let level = match level {
                    HeadingLevel::H1 => 1,
                    HeadingLevel::H2 => 2,
                    _ => 3,
                };
                self.pending = Some(Pending::Heading(level));
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => notion_language(&info),
                    CodeBlockKind::Indented => "plain text",
                };
                self.code = Some((lang.to_string(), String::new()));
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start.is_some());
            }
            Tag::Item => {
                self.flush();
                let ordered = self.lists.last().copied().unwrap_or(false);
                self.pending = Some(Pending::Item {
                    ordered,
                    checked: None,
                });
            }
            Tag::Emphasis => self.italic += 1,
            Tag::Strong => self.bold += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Link { dest_url, .. } => {
                // Relative paths and anchors stay as plain text
                if is_link_target(&dest_url) {
                    self.link = Some(dest_url.to_string());
                }
            }
            Tag::Image { dest_url, .. } => {
                if is_absolute_url(&dest_url) {
                    self.flush();
                    self.image = Some(dest_url.to_string());
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if !self.in_item() {
                    self.flush();
                }
            }
            TagEnd::Heading(_) | TagEnd::Item => self.flush(),
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                if let Some((lang, mut text)) = self.code.take() {
                    if text.ends_with('\n') {
                        text.pop();
                    }
                    self.blocks.push(Block::code(lang, plain_runs(&text)));
                }
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Strikethrough => self.strike = self.strike.saturating_sub(1),
            TagEnd::Link => self.link = None,
            TagEnd::Image => {
                if let Some(url) = self.image.take() {
                    // Alt text collected while inside the image is dropped
                    self.runs.clear();
                    self.pending = None;
                    self.blocks.push(Block::image(url));
                }
            }
            _ => {}
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push_text(&text, false),
            Event::Code(text) => self.push_text(&text, true),
            Event::Html(text) | Event::InlineHtml(text) => self.push_text(&text, false),
            Event::SoftBreak | Event::HardBreak => self.push_text("\n", false),
            Event::Rule => {
                self.flush();
                self.blocks.push(Block::divider());
            }
            Event::TaskListMarker(checked) => {
                if let Some(Pending::Item { checked: c, .. }) = self.pending.as_mut() {
                    *c = Some(checked);
                }
            }
            _ => {}
        }
    }
}

/// CommonMark conversion; nested lists are flattened in document order.
pub fn rich_blocks(markdown: &str) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = RichBuilder::default();
    for event in Parser::new_ext(markdown, options) {
        builder.event(event);
    }
    builder.flush();
    builder.blocks
}
