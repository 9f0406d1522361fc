// ABOUTME: Renders listed Notion blocks back into markdown
// ABOUTME: Used by pull; unsupported block types are skipped

use crate::model::{RemoteBlock, RemoteRichText};

fn render_run(run: &RemoteRichText) -> String {
    let text = &run.plain_text;
    if text.is_empty() {
        return String::new();
    }

    let a = &run.annotations;
    let mut out = if a.code {
        format!("`{}`", text)
    } else {
        text.clone()
    };
    if a.strikethrough {
        out = format!("~~{}~~", out);
    }
    if a.italic {
        out = format!("_{}_", out);
    }
    if a.bold {
        out = format!("**{}**", out);
    }
    if let Some(href) = &run.href {
        out = format!("[{}]({})", out, href);
    }
    out
}

pub fn render_rich_text(runs: &[RemoteRichText]) -> String {
    runs.iter().map(render_run).collect()
}

fn prefix_lines(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(block: &RemoteBlock) -> Option<String> {
    let text = || render_rich_text(&block.rich_text());
    let body = block.body();

    let rendered = match block.kind.as_str() {
        "paragraph" => text(),
        "heading_1" => format!("# {}", text()),
        "heading_2" => format!("## {}", text()),
        "heading_3" => format!("### {}", text()),
        "bulleted_list_item" => format!("- {}", text()),
        "numbered_list_item" => format!("1. {}", text()),
        "to_do" => {
            let checked = body
                .and_then(|b| b.get("checked"))
                .and_then(|c| c.as_bool())
                .unwrap_or(false);
            format!("- [{}] {}", if checked { "x" } else { " " }, text())
        }
        "quote" => prefix_lines(&text(), "> "),
        "code" => {
            let language = body
                .and_then(|b| b.get("language"))
                .and_then(|l| l.as_str())
                .filter(|l| *l != "plain text")
                .unwrap_or("");
            // Code content is literal, annotations do not apply
            let code: String = block
                .rich_text()
                .iter()
                .map(|r| r.plain_text.as_str())
                .collect();
            format!("```{}\n{}\n```", language, code)
        }
        "divider" => "---".to_string(),
        "image" => {
            let url = body.and_then(|b| {
                let kind = b.get("type")?.as_str()?;
                b.get(kind)?.get("url")?.as_str()
            })?;
            format!("![]({})", url)
        }
        other => {
            log::debug!("Skipping unsupported block type {} ({})", other, block.id);
            return None;
        }
    };

    if rendered.trim().is_empty() {
        None
    } else {
        Some(rendered)
    }
}

fn is_list_item(block: &RemoteBlock) -> bool {
    matches!(
        block.kind.as_str(),
        "bulleted_list_item" | "numbered_list_item" | "to_do"
    )
}

/// Consecutive list items are joined by single newlines, other blocks by blank lines.
pub fn render_markdown(blocks: &[RemoteBlock]) -> String {
    let mut out = String::new();
    let mut prev_list = false;

    for block in blocks {
        let Some(rendered) = render_block(block) else {
            continue;
        };
        let list = is_list_item(block);
        if !out.is_empty() {
            out.push_str(if list && prev_list { "\n" } else { "\n\n" });
        }
        out.push_str(&rendered);
        prev_list = list;
    }

    if !out.is_empty() {
        out.push('\n');
    }
    out
}
