//! HTML transcript export: re-creates the conversation as a static page.
//!
//! User text and error text are entity-escaped; bot replies go through the
//! Markdown renderer, which escapes all literal text itself. Nothing that
//! arrived over the wire can inject markup into the exported page.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::app::{Bubble, BubbleKind};
use crate::markdown;

const STYLE: &str = "\
body { font-family: sans-serif; background: #1e1e28; color: #e8e8e8; }
.chat-box { max-width: 640px; margin: 2em auto; }
.message { display: flex; gap: 0.5em; margin: 0.75em 0; }
.message.user { justify-content: flex-end; }
.message .content { background: #2d2d3a; border-radius: 8px; padding: 0.25em 0.75em; }
.message.user .content { background: #1d4ed8; }
.message.error .content { background: #7f1d1d; }
";

pub fn export(path: &Path, bubbles: &[Bubble]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(path, render_page(bubbles))
        .with_context(|| format!("failed to write transcript to {}", path.display()))?;
    Ok(())
}

fn render_page(bubbles: &[Bubble]) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<title>Gamebot conversation</title>\n<style>\n");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<div class=\"chat-box\">\n");

    for bubble in bubbles {
        match bubble.kind {
            // User bubbles mirror the chat layout: content first, avatar last.
            BubbleKind::User => {
                html.push_str(&format!(
                    "<div class=\"message user\"><div class=\"content\"><p>{}</p></div><div class=\"avatar\">👤</div></div>\n",
                    markdown::escape(&bubble.text)
                ));
            }
            BubbleKind::Bot => {
                html.push_str(&format!(
                    "<div class=\"message bot\"><div class=\"avatar\">🤖</div><div class=\"content\">{}</div></div>\n",
                    markdown::render_html(&bubble.text)
                ));
            }
            BubbleKind::Error => {
                html.push_str(&format!(
                    "<div class=\"message bot error\"><div class=\"avatar\">🤖</div><div class=\"content\"><p>{}</p></div></div>\n",
                    markdown::escape(&bubble.text)
                ));
            }
        }
    }

    html.push_str("</div>\n</body>\n</html>\n");
    html
}
