use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::{App, Bubble, BubbleKind};
use crate::markdown;

pub fn render(app: &mut App, frame: &mut Frame) {
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Gamebot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn bubble_lines(bubble: &Bubble) -> Vec<Line<'static>> {
    match bubble.kind {
        BubbleKind::User => {
            let style = Style::default().fg(Color::Cyan);
            // Content before the avatar, pushed to the right edge.
            vec![Line::from(vec![
                Span::styled(bubble.text.clone(), style),
                Span::styled(" 👤", style),
            ])
            .alignment(Alignment::Right)]
        }
        BubbleKind::Bot => {
            let label_style = Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD);
            let mut lines = vec![Line::from(Span::styled("🤖 Bot", label_style))];
            lines.extend(markdown::to_lines(&bubble.text, Style::default()));
            lines
        }
        BubbleKind::Error => {
            let style = Style::default().fg(Color::Red);
            let mut lines = vec![Line::from(Span::styled(
                "🤖 Bot",
                style.add_modifier(Modifier::BOLD),
            ))];
            // Error text is rendered literally, never through the Markdown
            // pipeline.
            for line in bubble.text.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), style)));
            }
            lines
        }
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Inner size minus borders, kept for scroll calculations.
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let chat_text = if app.bubbles.is_empty() && !app.is_sending() {
        Text::from(Span::styled(
            "Ask anything about video games...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for bubble in &app.bubbles {
            lines.extend(bubble_lines(bubble));
            lines.push(Line::default());
        }

        if app.is_sending() {
            lines.push(Line::from(Span::styled(
                "🤖 Bot",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{dots}"),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    // The busy caption replaces the prompt while a request is in flight and
    // is restored afterwards, whatever the outcome.
    let (title, border_color) = if app.is_sending() {
        (" Sending... ", Color::DarkGray)
    } else {
        (" Message (Enter to send) ", Color::Yellow)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible in a single-line input.
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    frame.set_cursor_position((
        area.x + (app.cursor - scroll_offset) as u16 + 1,
        area.y + 1,
    ));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let line = if let Some(status) = &app.status {
        Line::from(Span::styled(
            format!(" {status} "),
            Style::default().bg(Color::Green).fg(Color::Black),
        ))
    } else {
        let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
        let label_style = Style::default().bg(Color::Black).fg(Color::White);
        Line::from(vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Ctrl+E ", key_style),
            Span::styled(" save transcript ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" quit ", label_style),
        ])
    };

    frame.render_widget(Paragraph::new(line), area);
}
