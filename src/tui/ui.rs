use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::store::{Priority, ProjectStats, TaskStatus};

use super::app::{App, FIELD_DESCRIPTION, FIELD_POINTS, FIELD_TITLE, Focus, InputMode};

pub fn draw(frame: &mut Frame, app: &App) {
    draw_main(frame, app);

    match app.input_mode {
        InputMode::TaskForm => draw_task_form(frame, app),
        InputMode::ProjectForm => draw_project_form(frame, app),
        InputMode::RenameProject => draw_rename_form(frame, app),
        InputMode::MoveTask => draw_move_form(frame, app),
        InputMode::ConfirmDeleteTask | InputMode::ConfirmDeleteProject => {
            draw_confirm(frame, app);
        }
        InputMode::Help => draw_help(frame),
        InputMode::Normal => {}
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Critical => Color::Red,
        Priority::High => Color::Yellow,
        Priority::Medium => Color::Blue,
        Priority::Low => Color::Green,
        Priority::Trivial => Color::DarkGray,
    }
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Todo => Color::White,
        TaskStatus::InProgress => Color::Yellow,
        TaskStatus::Done => Color::DarkGray,
    }
}

fn draw_main(frame: &mut Frame, app: &App) {
    let size = frame.area();

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    // Title bar
    let title = Line::from(vec![
        Span::styled(
            " tudu ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("                                        "),
        Span::styled(
            "a:add  e:edit  x:done  ?:help  q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), outer[0]);

    // Main area: sidebar | task panel
    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(outer[1]);

    draw_projects(frame, app, main[0]);
    draw_tasks(frame, app, main[1]);

    // Status bar
    let status = if !app.status_message.is_empty() {
        Line::from(Span::styled(
            format!(" {} ", app.status_message),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(
            " j/k:navigate  h/l:panels  Enter/Space:cycle status  P:new project",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(status), outer[2]);
}

fn draw_projects(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Projects;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let block = Block::default()
        .title(" Projects ")
        .borders(Borders::ALL)
        .border_style(border_style);

    if app.projects.is_empty() {
        let msg = Paragraph::new("  No projects yet.\n  Press P to create one.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(msg, area);
        return;
    }

    let empty_stats = ProjectStats::default();

    let items: Vec<ListItem> = app
        .projects
        .iter()
        .enumerate()
        .map(|(i, project)| {
            let stats = app.project_stats.get(&project.id).unwrap_or(&empty_stats);

            let mut spans = vec![];
            if i == app.project_index {
                spans.push(Span::styled("▸ ", Style::default().fg(Color::Cyan)));
            } else {
                spans.push(Span::raw("  "));
            }

            spans.push(Span::styled(
                &project.name,
                if i == app.project_index {
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                },
            ));

            let lines = vec![
                Line::from(spans),
                Line::from(vec![Span::styled(
                    format!(
                        "    {}/{} tasks · {} SP · {:.0}%",
                        stats.done_tasks,
                        stats.total_tasks,
                        stats.total_points,
                        stats.completion_pct()
                    ),
                    Style::default().fg(Color::DarkGray),
                )]),
            ];

            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}

fn draw_tasks(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Tasks;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let title = match app.selected_project() {
        Some(project) => format!(" {} ", project.name),
        None => " Tasks ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    if app.tasks.is_empty() {
        let msg = Paragraph::new("  No tasks. Press 'a' to add one.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(msg, area);
        return;
    }

    let items: Vec<ListItem> = app
        .tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let priority = task.priority();
            let sp_style = Style::default()
                .fg(priority_color(priority))
                .add_modifier(Modifier::BOLD);
            let title_style = if task.is_complete() {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default().fg(Color::White)
            };

            let mut spans = vec![];
            if i == app.task_index && focused {
                spans.push(Span::styled("▸ ", Style::default().fg(Color::Cyan)));
            } else {
                spans.push(Span::raw("  "));
            }

            spans.push(Span::styled(
                task.status.icon(),
                Style::default().fg(status_color(task.status)),
            ));
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                format!("SP:{:<3}", task.story_points),
                sp_style,
            ));
            spans.push(Span::raw(" "));
            spans.push(Span::styled(&task.title, title_style));
            spans.push(Span::styled(
                format!("  {}", priority.display()),
                Style::default().fg(priority_color(priority)),
            ));

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items).block(block);
    frame.render_widget(list, area);
}

/// Centered modal rect, cleared before drawing.
fn modal_area(frame: &Frame, width: u16, height: u16) -> Rect {
    let area = frame.area();
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 3;
    Rect::new(x, y, width, height)
}

fn field_line<'a>(label: &'a str, value: &'a str, active: bool) -> Line<'a> {
    let label_style = if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut spans = vec![
        Span::styled(format!("  {label:<14}"), label_style),
        Span::raw(value),
    ];
    if active {
        spans.push(Span::styled("█", Style::default().fg(Color::Cyan)));
    }
    Line::from(spans)
}

fn draw_task_form(frame: &mut Frame, app: &App) {
    let area = modal_area(frame, 56, 8);
    frame.render_widget(Clear, area);

    let heading = if app.editing_task_id.is_some() {
        " Edit Task "
    } else {
        " New Task "
    };
    let block = Block::default()
        .title(heading)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    // The active field renders the live buffer; the others show what was
    // already entered.
    let title = if app.form_field == FIELD_TITLE {
        &app.input_buffer
    } else {
        &app.form_title
    };
    let points = if app.form_field == FIELD_POINTS {
        &app.input_buffer
    } else {
        &app.form_points
    };
    let description = if app.form_field == FIELD_DESCRIPTION {
        &app.input_buffer
    } else {
        &app.form_description
    };

    let lines = vec![
        field_line("Title:", title, app.form_field == FIELD_TITLE),
        field_line("Story points:", points, app.form_field == FIELD_POINTS),
        field_line(
            "Description:",
            description,
            app.form_field == FIELD_DESCRIPTION,
        ),
        Line::from(""),
        Line::from(Span::styled(
            "  Enter: next field / save   Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_project_form(frame: &mut Frame, app: &App) {
    let area = modal_area(frame, 56, 7);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" New Project ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let name = if app.project_form_field == 0 {
        &app.input_buffer
    } else {
        &app.project_form_name
    };
    let description = if app.project_form_field == 1 {
        app.input_buffer.as_str()
    } else {
        ""
    };

    let lines = vec![
        field_line("Name:", name, app.project_form_field == 0),
        field_line("Description:", description, app.project_form_field == 1),
        Line::from(""),
        Line::from(Span::styled(
            "  Enter: next field / create   Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_rename_form(frame: &mut Frame, app: &App) {
    let area = modal_area(frame, 56, 5);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Rename Project ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let lines = vec![
        field_line("New name:", &app.input_buffer, true),
        Line::from(""),
        Line::from(Span::styled(
            "  Enter: rename   Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_move_form(frame: &mut Frame, app: &App) {
    let area = modal_area(frame, 56, 5);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Move Task ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let lines = vec![
        field_line("To project:", &app.input_buffer, true),
        Line::from(""),
        Line::from(Span::styled(
            "  Enter: move   Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_confirm(frame: &mut Frame, app: &App) {
    let area = modal_area(frame, 60, 6);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Confirm Delete ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let what = if app.input_mode == InputMode::ConfirmDeleteProject {
        "project (and all of its tasks)"
    } else {
        "task"
    };

    let lines = vec![
        Line::from(vec![
            Span::raw(format!("  Delete {what} ")),
            Span::styled(
                format!("\"{}\"", app.confirm_target),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("?"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  y: delete   n/Esc: keep",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn draw_help(frame: &mut Frame) {
    let area = modal_area(frame, 48, 16);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Keys ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let key = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let desc = Style::default().fg(Color::White);

    let entry = |k: &'static str, d: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {k:<12}"), key),
            Span::styled(d, desc),
        ])
    };

    let lines = vec![
        entry("j / k", "move down / up"),
        entry("h / l", "focus projects / tasks"),
        entry("Tab", "switch panel"),
        entry("Enter/Space", "cycle task status"),
        entry("x", "toggle task done"),
        entry("a", "add task"),
        entry("e", "edit task"),
        entry("m", "move task to another project"),
        entry("d", "delete task"),
        entry("P", "new project"),
        entry("r", "rename project"),
        entry("D", "delete project"),
        entry("?", "this help"),
        entry("q", "quit"),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
