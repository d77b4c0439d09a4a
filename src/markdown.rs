//! Best-effort Markdown rendering for bot replies.
//!
//! The backend answers in a small Markdown subset: `### ` headings, `**bold**`
//! spans, `* ` list items, and blank-line-separated paragraphs. Replies are
//! parsed into a block model and rendered two ways: as styled ratatui lines
//! for the live chat view, and as HTML for transcript export. All text in the
//! HTML path goes through [`escape`], so only tags generated by the renderer
//! itself are live markup; anything that looks like HTML inside a reply stays
//! literal text.

use once_cell::sync::Lazy;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(Vec<Inline>),
    /// One entry per `* ` item; contiguous items form a single list.
    List(Vec<Vec<Inline>>),
    /// One entry per source line; lines are separated by soft breaks.
    Paragraph(Vec<Vec<Inline>>),
}

/// Entity-encode text for an HTML content context. Total: any string in, a
/// string with no markup-significant characters out.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Split a line into plain and bold runs. An unclosed `**` does not match the
/// pattern and falls through as literal text.
fn parse_inlines(text: &str) -> Vec<Inline> {
    let mut inlines = Vec::new();
    let mut last = 0;
    for caps in BOLD_RE.captures_iter(text) {
        if let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) {
            if whole.start() > last {
                inlines.push(Inline::Text(text[last..whole.start()].to_string()));
            }
            inlines.push(Inline::Bold(inner.as_str().to_string()));
            last = whole.end();
        }
    }
    if last < text.len() {
        inlines.push(Inline::Text(text[last..].to_string()));
    }
    inlines
}

fn flush_paragraph(blocks: &mut Vec<Block>, paragraph: &mut Vec<Vec<Inline>>) {
    if !paragraph.is_empty() {
        blocks.push(Block::Paragraph(std::mem::take(paragraph)));
    }
}

fn flush_list(blocks: &mut Vec<Block>, list: &mut Vec<Vec<Inline>>) {
    if !list.is_empty() {
        blocks.push(Block::List(std::mem::take(list)));
    }
}

/// Parse reply text into blocks. Line-oriented and non-recursive: headings and
/// list markers are recognized per line, contiguous `* ` lines are grouped
/// into one list, and blank lines end the current paragraph. Paragraphs are
/// only ever created non-empty.
pub fn parse(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<Vec<Inline>> = Vec::new();
    let mut list: Vec<Vec<Inline>> = Vec::new();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("### ") {
            flush_list(&mut blocks, &mut list);
            flush_paragraph(&mut blocks, &mut paragraph);
            blocks.push(Block::Heading(parse_inlines(rest.trim())));
        } else if let Some(rest) = line.strip_prefix("* ") {
            flush_paragraph(&mut blocks, &mut paragraph);
            list.push(parse_inlines(rest));
        } else if line.trim().is_empty() {
            flush_list(&mut blocks, &mut list);
            flush_paragraph(&mut blocks, &mut paragraph);
        } else {
            flush_list(&mut blocks, &mut list);
            paragraph.push(parse_inlines(line));
        }
    }

    flush_list(&mut blocks, &mut list);
    flush_paragraph(&mut blocks, &mut paragraph);
    blocks
}

fn inlines_to_html(inlines: &[Inline]) -> String {
    let mut html = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => html.push_str(&escape(text)),
            Inline::Bold(text) => {
                html.push_str("<strong>");
                html.push_str(&escape(text));
                html.push_str("</strong>");
            }
        }
    }
    html
}

pub fn to_html(blocks: &[Block]) -> String {
    let mut html = String::new();
    for block in blocks {
        match block {
            Block::Heading(inlines) => {
                html.push_str("<h3>");
                html.push_str(&inlines_to_html(inlines));
                html.push_str("</h3>");
            }
            Block::List(items) => {
                html.push_str("<ul>");
                for item in items {
                    html.push_str("<li>");
                    html.push_str(&inlines_to_html(item));
                    html.push_str("</li>");
                }
                html.push_str("</ul>");
            }
            Block::Paragraph(lines) => {
                html.push_str("<p>");
                for (i, line) in lines.iter().enumerate() {
                    if i > 0 {
                        html.push_str("<br>");
                    }
                    html.push_str(&inlines_to_html(line));
                }
                html.push_str("</p>");
            }
        }
    }
    html
}

/// Parse and render reply text as HTML in one step.
pub fn render_html(text: &str) -> String {
    to_html(&parse(text))
}

fn inline_spans(inlines: &[Inline], base: Style) -> Vec<Span<'static>> {
    inlines
        .iter()
        .map(|inline| match inline {
            Inline::Text(text) => Span::styled(text.clone(), base),
            Inline::Bold(text) => Span::styled(text.clone(), base.add_modifier(Modifier::BOLD)),
        })
        .collect()
}

/// Render reply text as styled terminal lines, with a blank line between
/// blocks. Spans carry text verbatim, so nothing in a reply can ever be
/// interpreted as markup on this path.
pub fn to_lines(text: &str, base: Style) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, block) in parse(text).iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        match block {
            Block::Heading(inlines) => {
                let style = base.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
                lines.push(Line::from(inline_spans(inlines, style)));
            }
            Block::List(items) => {
                for item in items {
                    let mut spans = vec![Span::styled("• ", base)];
                    spans.extend(inline_spans(item, base));
                    lines.push(Line::from(spans));
                }
            }
            Block::Paragraph(para_lines) => {
                for line in para_lines {
                    lines.push(Line::from(inline_spans(line, base)));
                }
            }
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn bold(s: &str) -> Inline {
        Inline::Bold(s.to_string())
    }

    #[test]
    fn test_escape_markup_characters() {
        assert_eq!(escape("<b>&\"'</b>"), "&lt;b&gt;&amp;&quot;&#39;&lt;/b&gt;");
        assert_eq!(escape(""), "");
        assert_eq!(escape("plain text"), "plain text");
    }

    #[test]
    fn test_bold_inline() {
        assert_eq!(
            parse_inlines("a **b** c"),
            vec![text("a "), bold("b"), text(" c")]
        );
    }

    #[test]
    fn test_unclosed_bold_stays_literal() {
        assert_eq!(parse_inlines("a **b c"), vec![text("a **b c")]);
        assert_eq!(render_html("a **b c"), "<p>a **b c</p>");
    }

    #[test]
    fn test_heading_bold_and_list_document() {
        let blocks = parse("### Title\n**bold** text\n* item1\n* item2");
        assert_eq!(
            blocks,
            vec![
                Block::Heading(vec![text("Title")]),
                Block::Paragraph(vec![vec![bold("bold"), text(" text")]]),
                Block::List(vec![vec![text("item1")], vec![text("item2")]]),
            ]
        );

        let html = to_html(&blocks);
        assert_eq!(
            html,
            "<h3>Title</h3><p><strong>bold</strong> text</p><ul><li>item1</li><li>item2</li></ul>"
        );
        assert!(!html.contains("<p></p>"));
    }

    #[test]
    fn test_contiguous_items_form_one_list() {
        let blocks = parse("* a\n* b\n\ntail\n* c");
        assert_eq!(
            blocks,
            vec![
                Block::List(vec![vec![text("a")], vec![text("b")]]),
                Block::Paragraph(vec![vec![text("tail")]]),
                Block::List(vec![vec![text("c")]]),
            ]
        );
    }

    #[test]
    fn test_blank_lines_split_paragraphs() {
        assert_eq!(
            render_html("one\ntwo\n\nthree"),
            "<p>one<br>two</p><p>three</p>"
        );
    }

    #[test]
    fn test_blank_lines_produce_no_empty_paragraphs() {
        assert_eq!(render_html("a\n\n\n\nb"), "<p>a</p><p>b</p>");
        assert_eq!(render_html("\n\n"), "");
        assert_eq!(render_html(""), "");
    }

    #[test]
    fn test_html_in_reply_is_escaped() {
        let html = render_html("<img src=x onerror=alert(1)>");
        assert_eq!(html, "<p>&lt;img src=x onerror=alert(1)&gt;</p>");
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_html_in_heading_and_list_is_escaped() {
        let html = render_html("### <script>\n* <b>hi</b>");
        assert_eq!(
            html,
            "<h3>&lt;script&gt;</h3><ul><li>&lt;b&gt;hi&lt;/b&gt;</li></ul>"
        );
    }

    #[test]
    fn test_terminal_lines_keep_html_literal() {
        let lines = to_lines("<img src=x onerror=alert(1)>", Style::default());
        assert_eq!(lines.len(), 1);
        let rendered: String = lines[0]
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect();
        assert_eq!(rendered, "<img src=x onerror=alert(1)>");
    }

    #[test]
    fn test_terminal_lines_layout() {
        let lines = to_lines("### Title\n\n* one\n* two", Style::default());
        // Heading, blank separator, two list items.
        assert_eq!(lines.len(), 4);
        let items: Vec<String> = lines[2..]
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(items, vec!["• one".to_string(), "• two".to_string()]);
    }
}
