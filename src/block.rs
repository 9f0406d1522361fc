// ABOUTME: Outgoing Notion block and rich-text types
// ABOUTME: Serializes to the JSON shapes accepted by block append and page create

use serde::{Deserialize, Serialize};

/// Notion rejects text content longer than this in a single rich-text object.
pub const MAX_TEXT_LEN: usize = 2000;

/// Notion rejects a block whose `rich_text` array holds more entries than this.
pub const MAX_RICH_TEXT_RUNS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Annotations {
    pub fn is_plain(&self) -> bool {
        *self == Annotations::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: TextContent,
    #[serde(default, skip_serializing_if = "Annotations::is_plain")]
    pub annotations: Annotations,
}

impl RichText {
    pub fn plain(content: impl Into<String>) -> Self {
        Self::styled(content, Annotations::default(), None)
    }

    pub fn styled(content: impl Into<String>, annotations: Annotations, link: Option<String>) -> Self {
        RichText {
            kind: "text".into(),
            text: TextContent {
                content: content.into(),
                link: link.map(|url| Link { url }),
            },
            annotations,
        }
    }

    pub fn content(&self) -> &str {
        &self.text.content
    }

    fn same_style(&self, other: &RichText) -> bool {
        self.annotations == other.annotations && self.text.link == other.text.link
    }
}

/// Splits `text` into runs of at most [`MAX_TEXT_LEN`] characters.
pub fn split_text(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        if count == MAX_TEXT_LEN {
            parts.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }

    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Merges adjacent runs with identical styling, then enforces the per-run length limit.
pub fn normalize_runs(runs: Vec<RichText>) -> Vec<RichText> {
    let mut merged: Vec<RichText> = Vec::new();
    for run in runs {
        if run.text.content.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.same_style(&run) => last.text.content.push_str(&run.text.content),
            _ => merged.push(run),
        }
    }

    let mut out = Vec::with_capacity(merged.len());
    for run in merged {
        if run.text.content.chars().count() <= MAX_TEXT_LEN {
            out.push(run);
            continue;
        }
        for part in split_text(&run.text.content) {
            out.push(RichText {
                kind: run.kind.clone(),
                text: TextContent {
                    content: part,
                    link: run.text.link.clone(),
                },
                annotations: run.annotations.clone(),
            });
        }
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub rich_text: Vec<RichText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToDoBlock {
    pub rich_text: Vec<RichText>,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub rich_text: Vec<RichText>,
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(rename = "type")]
    pub kind: String,
    pub external: ExternalUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockContent {
    Paragraph {
        paragraph: TextBlock,
    },
    #[serde(rename = "heading_1")]
    Heading1 {
        heading_1: TextBlock,
    },
    #[serde(rename = "heading_2")]
    Heading2 {
        heading_2: TextBlock,
    },
    #[serde(rename = "heading_3")]
    Heading3 {
        heading_3: TextBlock,
    },
    BulletedListItem {
        bulleted_list_item: TextBlock,
    },
    NumberedListItem {
        numbered_list_item: TextBlock,
    },
    ToDo {
        to_do: ToDoBlock,
    },
    Quote {
        quote: TextBlock,
    },
    Code {
        code: CodeBlock,
    },
    Divider {
        divider: Empty,
    },
    Image {
        image: ImageBlock,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub object: String,
    #[serde(flatten)]
    pub content: BlockContent,
}

impl Block {
    pub fn new(content: BlockContent) -> Self {
        Block {
            object: "block".into(),
            content,
        }
    }

    pub fn paragraph(rich_text: Vec<RichText>) -> Self {
        Self::new(BlockContent::Paragraph {
            paragraph: TextBlock { rich_text },
        })
    }

    /// Levels past 3 collapse to heading 3, the deepest Notion offers.
    pub fn heading(level: u8, rich_text: Vec<RichText>) -> Self {
        let text = TextBlock { rich_text };
        Self::new(match level {
            0 | 1 => BlockContent::Heading1 { heading_1: text },
            2 => BlockContent::Heading2 { heading_2: text },
            _ => BlockContent::Heading3 { heading_3: text },
        })
    }

    pub fn list_item(ordered: bool, rich_text: Vec<RichText>) -> Self {
        let text = TextBlock { rich_text };
        Self::new(if ordered {
            BlockContent::NumberedListItem {
                numbered_list_item: text,
            }
        } else {
            BlockContent::BulletedListItem {
                bulleted_list_item: text,
            }
        })
    }

    pub fn to_do(checked: bool, rich_text: Vec<RichText>) -> Self {
        Self::new(BlockContent::ToDo {
            to_do: ToDoBlock { rich_text, checked },
        })
    }

    pub fn quote(rich_text: Vec<RichText>) -> Self {
        Self::new(BlockContent::Quote {
            quote: TextBlock { rich_text },
        })
    }

    pub fn code(language: impl Into<String>, rich_text: Vec<RichText>) -> Self {
        Self::new(BlockContent::Code {
            code: CodeBlock {
                rich_text,
                language: language.into(),
            },
        })
    }

    pub fn divider() -> Self {
        Self::new(BlockContent::Divider { divider: Empty {} })
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::new(BlockContent::Image {
            image: ImageBlock {
                kind: "external".into(),
                external: ExternalUrl { url: url.into() },
            },
        })
    }

    /// The Notion block type name, e.g. `heading_2`.
    pub fn type_name(&self) -> &'static str {
        match &self.content {
            BlockContent::Paragraph { .. } => "paragraph",
            BlockContent::Heading1 { .. } => "heading_1",
            BlockContent::Heading2 { .. } => "heading_2",
            BlockContent::Heading3 { .. } => "heading_3",
            BlockContent::BulletedListItem { .. } => "bulleted_list_item",
            BlockContent::NumberedListItem { .. } => "numbered_list_item",
            BlockContent::ToDo { .. } => "to_do",
            BlockContent::Quote { .. } => "quote",
            BlockContent::Code { .. } => "code",
            BlockContent::Divider { .. } => "divider",
            BlockContent::Image { .. } => "image",
        }
    }

    pub fn rich_text(&self) -> &[RichText] {
        match &self.content {
            BlockContent::Paragraph { paragraph: t }
            | BlockContent::Heading1 { heading_1: t }
            | BlockContent::Heading2 { heading_2: t }
            | BlockContent::Heading3 { heading_3: t }
            | BlockContent::BulletedListItem {
                bulleted_list_item: t,
            }
            | BlockContent::NumberedListItem {
                numbered_list_item: t,
            }
            | BlockContent::Quote { quote: t } => &t.rich_text,
            BlockContent::ToDo { to_do } => &to_do.rich_text,
            BlockContent::Code { code } => &code.rich_text,
            BlockContent::Divider { .. } | BlockContent::Image { .. } => &[],
        }
    }

    fn rich_text_mut(&mut self) -> Option<&mut Vec<RichText>> {
        match &mut self.content {
            BlockContent::Paragraph { paragraph: t }
            | BlockContent::Heading1 { heading_1: t }
            | BlockContent::Heading2 { heading_2: t }
            | BlockContent::Heading3 { heading_3: t }
            | BlockContent::BulletedListItem {
                bulleted_list_item: t,
            }
            | BlockContent::NumberedListItem {
                numbered_list_item: t,
            }
            | BlockContent::Quote { quote: t } => Some(&mut t.rich_text),
            BlockContent::ToDo { to_do } => Some(&mut to_do.rich_text),
            BlockContent::Code { code } => Some(&mut code.rich_text),
            BlockContent::Divider { .. } | BlockContent::Image { .. } => None,
        }
    }

    /// Spills runs past [`MAX_RICH_TEXT_RUNS`] into following blocks of the same type.
    pub fn split_oversized(self) -> Vec<Block> {
        if self.rich_text().len() <= MAX_RICH_TEXT_RUNS {
            return vec![self];
        }

        let chunks: Vec<Vec<RichText>> = self
            .rich_text()
            .chunks(MAX_RICH_TEXT_RUNS)
            .map(<[RichText]>::to_vec)
            .collect();
        chunks
            .into_iter()
            .map(|chunk| {
                let mut block = self.clone();
                if let Some(runs) = block.rich_text_mut() {
                    *runs = chunk;
                }
                block
            })
            .collect()
    }

    /// Concatenated text of all runs.
    pub fn plain_text(&self) -> String {
        self.rich_text().iter().map(|r| r.content()).collect()
    }
}
