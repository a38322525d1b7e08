//! UI layout and rendering logic for the TUI.

use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::app::{App, PromptKind};
use super::theme::Theme;
use crate::execution::ExecutionStatus;
use crate::utils::unicode::display_width_of_prefix;

/// Render the main UI
pub fn render_ui(frame: &mut Frame, app: &App) {
    let palette = app.theme.palette();
    frame.render_widget(
        Block::default().style(Style::default().bg(palette.bg).fg(palette.fg)),
        frame.area(),
    );

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(60), // Editor
            Constraint::Min(4),         // Output
            Constraint::Length(1),      // Status bar
        ])
        .split(frame.area());

    render_editor(frame, app, main_layout[0]);
    render_output(frame, app, main_layout[1]);
    render_status_bar(frame, app, main_layout[2]);

    if app.show_help {
        render_help_overlay(frame, app.theme);
    }
    if app.prompt.is_some() {
        render_prompt(frame, app);
    }
}

fn render_editor(frame: &mut Frame, app: &App, area: Rect) {
    let palette = app.theme.palette();
    let lines = app.editor.lines();
    let (row, col) = app.editor.cursor();

    let gutter = lines.len().to_string().len().max(2);
    let height = area.height.saturating_sub(2) as usize;
    let width = (area.width.saturating_sub(2) as usize).saturating_sub(gutter + 1);

    // Keep the cursor on screen
    let top = if height == 0 { 0 } else { row.saturating_sub(height - 1) };
    let cursor_x = display_width_of_prefix(&lines[row], col);
    let left = if width == 0 { 0 } else { cursor_x.saturating_sub(width - 1) };

    let content: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(top)
        .take(height)
        .map(|(i, line)| {
            Line::from(vec![
                Span::styled(
                    format!("{:>gutter$} ", i + 1),
                    Style::default().fg(palette.line_number),
                ),
                Span::raw(line.clone()),
            ])
        })
        .collect();

    let title = format!("Editor - {}", app.file_name());
    let paragraph = Paragraph::new(Text::from(content))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border))
                .title(title),
        )
        .scroll((0, left as u16));
    frame.render_widget(paragraph, area);

    if app.prompt.is_none() && !app.show_help && height > 0 {
        let x = area.x + 1 + (gutter + 1) as u16 + (cursor_x - left) as u16;
        let y = area.y + 1 + (row - top) as u16;
        frame.set_cursor_position(Position::new(x, y));
    }
}

fn render_output(frame: &mut Frame, app: &App, area: Rect) {
    let palette = app.theme.palette();
    let mut content_lines = Vec::new();
    for record in &app.output {
        let style = Style::default().fg(app.theme.channel_color(record.channel));
        for line in record.text.split('\n') {
            content_lines.push(Line::from(Span::styled(line.to_string(), style)));
        }
    }

    let available_height = area.height.saturating_sub(2) as usize;
    let total_lines = content_lines.len();

    let mut paragraph = Paragraph::new(Text::from(content_lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.border))
                .title("Output"),
        )
        .wrap(Wrap { trim: false });

    if total_lines > available_height {
        // Offset 0 follows the newest output
        let max_scroll = total_lines.saturating_sub(available_height);
        let offset = app.output_scroll_offset.min(max_scroll);
        paragraph = paragraph.scroll(((max_scroll - offset) as u16, 0));
    }

    frame.render_widget(paragraph, area);
}

fn status_color(status: ExecutionStatus) -> Color {
    match status {
        ExecutionStatus::Idle => Color::Gray,
        ExecutionStatus::Loading => Color::Cyan,
        ExecutionStatus::Running => Color::Yellow,
        ExecutionStatus::Success => Color::Green,
        ExecutionStatus::Error => Color::Red,
        ExecutionStatus::Stopped => Color::Magenta,
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let palette = app.theme.palette();
    let mut spans = vec![Span::styled(
        format!(" {} ", app.status_label),
        Style::default()
            .fg(Color::Black)
            .bg(status_color(app.status))
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(elapsed) = app.last_elapsed {
        if !matches!(app.status, ExecutionStatus::Running | ExecutionStatus::Loading) {
            spans.push(Span::raw(format!(" {:.2}s", elapsed.as_secs_f64())));
        }
    }
    let run_hint = if app.status.can_stop() { "F6 stop" } else { "F5 run" };
    spans.push(Span::raw(format!(
        " | {} | {} | F1 help | Ctrl+Q quit",
        app.file_name(),
        run_hint
    )));

    let status = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(palette.status_bg).fg(palette.status_fg));
    frame.render_widget(status, area);
}

fn render_help_overlay(frame: &mut Frame, theme: Theme) {
    let popup_area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, popup_area);

    let help_lines = vec![
        Line::from("Code Pad Help"),
        Line::from(""),
        Line::from("Running:"),
        Line::from("  F5 / Ctrl+R   - Run the editor contents"),
        Line::from("  F6 / Ctrl+X   - Stop the running code (restarts Python)"),
        Line::from(""),
        Line::from("Files:"),
        Line::from("  Ctrl+O        - Open a .py or .txt file"),
        Line::from("  Ctrl+S        - Save as .py or .txt"),
        Line::from(""),
        Line::from("View:"),
        Line::from("  PgUp/PgDn     - Scroll output"),
        Line::from("  F2            - Toggle light/dark theme"),
        Line::from("  F1            - Toggle this help"),
        Line::from("  Ctrl+Q        - Quit"),
        Line::from(""),
        Line::from("Imports of process, FFI, and socket modules are blocked,"),
        Line::from("and network access is disabled."),
    ];

    let help_paragraph = Paragraph::new(Text::from(help_lines))
        .style(Style::default().bg(theme.palette().bg).fg(theme.palette().fg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .title_style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(help_paragraph, popup_area);
}

fn render_prompt(frame: &mut Frame, app: &App) {
    let Some(prompt) = app.prompt.as_ref() else {
        return;
    };
    let area = centered_rect(70, 20, frame.area());
    let area = Rect {
        height: area.height.min(3),
        ..area
    };
    frame.render_widget(Clear, area);

    let title = match prompt.kind {
        PromptKind::Open => "Open file (Enter to confirm, Esc to cancel)",
        PromptKind::Save => "Save as (Enter to confirm, Esc to cancel)",
    };
    let palette = app.theme.palette();
    let paragraph = Paragraph::new(prompt.input.as_str())
        .style(Style::default().bg(palette.bg).fg(palette.fg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .title_style(Style::default().fg(Color::Green)),
        );
    frame.render_widget(paragraph, area);

    let width = display_width_of_prefix(&prompt.input, usize::MAX) as u16;
    let x = (area.x + 1 + width).min(area.x + area.width.saturating_sub(2));
    frame.set_cursor_position(Position::new(x, area.y + 1));
}

/// Helper function to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{Channel, OutputRecord};
    use ratatui::{backend::TestBackend, Terminal};

    fn rendered(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render_ui(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn shows_code_output_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new("print('hi')", None, Theme::Dark, dir.path().join("theme"));
        app.output.push(OutputRecord::new(Channel::Stdout, "hi there"));

        let screen = rendered(&app);
        assert!(screen.contains("print('hi')"));
        assert!(screen.contains("hi there"));
        assert!(screen.contains("Ready"));
        assert!(screen.contains("untitled"));
    }

    #[test]
    fn help_and_prompt_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = App::new("", None, Theme::Light, dir.path().join("theme"));
        app.show_help = true;
        assert!(rendered(&app).contains("Code Pad Help"));

        app.show_help = false;
        app.open_prompt(PromptKind::Save);
        assert!(rendered(&app).contains("main.py"));
    }
}
