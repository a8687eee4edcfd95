//! UI rendering

use super::app::App;
use crate::models::Family;
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};
use std::time::Duration;

pub fn render(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search input
            Constraint::Min(8),    // Results and details
            Constraint::Length(1), // Status bar
            Constraint::Length(1), // Toast line
        ])
        .split(frame.area());

    render_search_input(frame, app, chunks[0]);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    render_result_list(frame, app, panels[0]);
    render_details(frame, app.selected(), panels[1]);

    render_status_bar(frame, app, chunks[2]);
    render_toast_line(frame, app, chunks[3]);
}

fn render_search_input(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(" Search by child name or mobile ");
    let inner = block.inner(area);

    frame.render_widget(Paragraph::new(app.input.text.as_str()).block(block), area);

    let col = app.input.text[..app.input.cursor].chars().count() as u16;
    frame.set_cursor_position(Position::new(inner.x + col.min(inner.width), inner.y));
}

fn render_result_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let searching = app.is_searching();
    let (results, list_state) = app.list_view();
    let items: Vec<ListItem> = results.iter().map(family_line).map(ListItem::new).collect();
    let title = if searching {
        format!(" Households [{}] … ", items.len())
    } else {
        format!(" Households [{}] ", items.len())
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green))
                .title(title),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, list_state);
}

fn family_line(family: &Family) -> Line<'_> {
    let dim = Style::default().fg(Color::DarkGray);
    let mut spans = vec![
        Span::styled(&family.child_name, Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("  ({})", family.parent_name), dim),
        Span::raw(format!("  {}", family.village)),
    ];
    if family.plant_distributed {
        spans.push(Span::styled("  ✓", Style::default().fg(Color::Green)));
    }
    Line::from(spans)
}

fn render_details(frame: &mut Frame, family: Option<&Family>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Details ");

    let Some(family) = family else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let row = |name: &'static str, value: &str| {
        Line::from(vec![
            Span::styled(format!("{name:<10}"), label),
            Span::raw(value.to_string()),
        ])
    };

    let mut lines = vec![
        row("Child", &family.child_name),
        row("Parent", &family.parent_name),
        row("Mobile", &family.mobile_number),
        row("Village", &family.village),
        row(
            "Plant",
            if family.plant_distributed {
                "distributed"
            } else {
                "not distributed"
            },
        ),
    ];
    if let Some(center) = family.center_name.as_deref().or(family.center_code.as_deref()) {
        lines.push(row("Center", center));
    }
    if let Some(date) = &family.registration_date {
        lines.push(row("Registered", date));
    }

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status_text = format!(
        " {} households │ Query: {} │ Enter: copy mobile │ Esc: quit",
        app.results().len(),
        format_duration(app.last_duration())
    );
    frame.render_widget(
        Paragraph::new(status_text).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn render_toast_line(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(ref toast) = app.toast {
        let bracket = Style::default().fg(Color::DarkGray);
        let toast_style = if toast.is_error {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Blue).add_modifier(Modifier::DIM)
        };
        let spans = vec![
            Span::styled("  [", bracket),
            Span::styled(&toast.message, toast_style),
            Span::styled("]", bracket),
        ];
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

fn format_duration(d: Duration) -> String {
    let millis = d.as_secs_f64() * 1000.0;
    if millis < 1000.0 {
        format!("{millis:.1}ms")
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
