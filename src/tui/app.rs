#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use time::Date;
use tokio::sync::mpsc;

use crate::ai::{GeneratedTask, GenerationError, TaskGenerator};
use crate::config::Config;
use crate::controller::{GenerationOutcome, GenerationTicket, TaskListController};
use crate::task::due;
use crate::task::model::Task;
use crate::tui::input::{self, TextInput};
use crate::tui::{self, TerminalGuard};

type GenerationResult = Result<Vec<GeneratedTask>, GenerationError>;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const GOAL_PLACEHOLDER: &str = "e.g., Plan a weekend trip to the mountains";
const EMPTY_STATE: &str = "Generate tasks with AI or add one manually to get started.";
const API_KEY_HINT: &str = "Please check your API key and try again.";
const HIGHLIGHT_SYMBOL: &str = "▸ ";
const CHECK_COL_WIDTH: u16 = 3;
const DUE_COL_WIDTH: u16 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Goal,
    List,
}

/// Side effect a key press asks the event loop to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Effect {
    None,
    Generate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddTaskField {
    Text,
    Due,
}

#[derive(Debug, Clone)]
struct AddTaskDialog {
    text: TextInput,
    due: TextInput,
    field: AddTaskField,
    error: Option<String>,
}

impl AddTaskDialog {
    fn new() -> Self {
        Self {
            text: TextInput::new(""),
            due: TextInput::new(""),
            field: AddTaskField::Text,
            error: None,
        }
    }

    fn active_input(&mut self) -> &mut TextInput {
        match self.field {
            AddTaskField::Text => &mut self.text,
            AddTaskField::Due => &mut self.due,
        }
    }
}

/// In-place edit of one task's text; dropping it reverts.
#[derive(Debug, Clone)]
struct InlineEdit {
    id: String,
    input: TextInput,
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    until: Instant,
}

impl Toast {
    fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            until: Instant::now() + Duration::from_secs(3),
        }
    }
}

#[derive(Debug)]
struct AppState {
    cfg: Config,
    controller: TaskListController,

    focus: Focus,
    goal_input: TextInput,
    table_state: TableState,

    add_task: Option<AddTaskDialog>,
    edit: Option<InlineEdit>,
    in_flight: Option<GenerationTicket>,
    show_help: bool,

    toast: Option<Toast>,
    spinner: usize,
    redraw: bool,
    should_quit: bool,
}

impl AppState {
    fn new(cfg: Config) -> Self {
        let mut table_state = TableState::default();
        table_state.select(Some(0));
        Self {
            cfg,
            controller: TaskListController::new(),
            focus: Focus::Goal,
            goal_input: TextInput::new(""),
            table_state,
            add_task: None,
            edit: None,
            in_flight: None,
            show_help: false,
            toast: None,
            spinner: 0,
            redraw: true,
            should_quit: false,
        }
    }

    fn selected_index(&self) -> usize {
        self.table_state.selected().unwrap_or(0)
    }

    fn selected_task(&self) -> Option<&Task> {
        self.controller.tasks().get(self.selected_index())
    }

    fn clamp_selection(&mut self) {
        let len = self.controller.len();
        if len == 0 {
            self.table_state.select(Some(0));
            return;
        }
        let idx = self.selected_index().min(len - 1);
        self.table_state.select(Some(idx));
    }

    fn move_selection(&mut self, delta: i64) {
        let len = self.controller.len();
        if len == 0 {
            return;
        }
        let cur = i64::try_from(self.selected_index()).unwrap_or(0);
        let max = i64::try_from(len - 1).unwrap_or(0);
        let next = usize::try_from((cur + delta).clamp(0, max)).unwrap_or(0);
        self.table_state.select(Some(next));
    }

    fn apply_generation_result(&mut self, result: GenerationResult) {
        let Some(ticket) = self.in_flight.take() else {
            tracing::warn!("generation result arrived with nothing in flight");
            return;
        };
        let first_new = self.controller.len();
        match self.controller.finish_generation(ticket, result) {
            GenerationOutcome::Appended(0) => {
                self.toast = Some(Toast::info("The AI returned no tasks"));
            }
            GenerationOutcome::Appended(n) => {
                self.table_state.select(Some(first_new));
                self.toast = Some(Toast::info(format!(
                    "Added {n} task{}",
                    if n == 1 { "" } else { "s" }
                )));
            }
            GenerationOutcome::Failed(_) | GenerationOutcome::Ignored => {}
        }
        self.goal_input = TextInput::new(self.controller.goal());
        self.redraw = true;
    }
}

pub async fn run(cfg: Config, generator: Arc<dyn TaskGenerator>) -> anyhow::Result<()> {
    let terminal = tui::init_terminal()?;
    let mut guard = TerminalGuard::new(terminal);

    let mut app = AppState::new(cfg);
    let changed = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&changed);
    app.controller.subscribe(move |c| {
        tracing::trace!(
            tasks = c.len(),
            done = c.completed_count(),
            loading = c.is_loading(),
            "task list changed"
        );
        flag.store(true, Ordering::Relaxed);
    });

    let (tx, mut rx) = mpsc::unbounded_channel::<GenerationResult>();

    loop {
        if let Some(toast) = &app.toast
            && Instant::now() >= toast.until
        {
            app.toast = None;
            app.redraw = true;
        }

        while let Ok(result) = rx.try_recv() {
            app.apply_generation_result(result);
        }

        let state_changed = changed.swap(false, Ordering::Relaxed);
        if state_changed || app.redraw || app.controller.is_loading() {
            app.redraw = false;
            app.clamp_selection();
            let Some(terminal) = guard.terminal_mut() else {
                anyhow::bail!("terminal unavailable");
            };
            terminal.draw(|f| draw(f, &mut app))?;
        }

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(80))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.redraw = true;
                    if let Effect::Generate(goal) = handle_key(key, &mut app) {
                        spawn_generation(Arc::clone(&generator), goal, tx.clone());
                    }
                }
                Event::Resize(..) => app.redraw = true,
                _ => {}
            }
        }

        if app.controller.is_loading() {
            app.spinner = app.spinner.wrapping_add(1);
        }
    }

    if app.in_flight.is_some() {
        tracing::info!("session closed with a generation still in flight");
    }
    Ok(())
}

fn spawn_generation(
    generator: Arc<dyn TaskGenerator>,
    goal: String,
    tx: mpsc::UnboundedSender<GenerationResult>,
) {
    tokio::spawn(async move {
        let result = generator.generate(&goal).await;
        if tx.send(result).is_err() {
            tracing::debug!("session ended before generation finished");
        }
    });
}

fn draw(f: &mut Frame<'_>, app: &mut AppState) {
    let area = f.area();
    let today = due::today();

    let banner_height = if app.controller.last_error().is_some() {
        4
    } else {
        0
    };
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(banner_height),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    draw_header(f, root[0], app);
    draw_goal(f, root[1], app);
    if banner_height > 0 {
        draw_error_banner(f, root[2], app);
    }
    draw_task_list(f, root[3], app, today);
    draw_footer(f, root[4], app);

    if let Some(dialog) = &app.add_task {
        draw_add_task_popup(f, dialog);
    }
    if let Some(task) = app.controller.pending_deletion() {
        draw_confirm(f, task);
    }
    if app.show_help {
        draw_help(f);
    }
}

fn draw_header(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let title = Line::from(vec![
        Span::styled(
            " todogen ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "  AI-powered to-do list",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(title), chunks[0]);

    let counts = if app.controller.is_empty() {
        "no tasks".to_owned()
    } else {
        format!(
            "{}/{} done",
            app.controller.completed_count(),
            app.controller.len()
        )
    };
    let counts = Paragraph::new(Line::from(counts))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Right);
    f.render_widget(counts, chunks[1]);
}

fn draw_goal(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let focused = app.focus == Focus::Goal && !modal_open(app);
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title("Enter a goal and let AI generate your tasks");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let line = if app.controller.is_loading() {
        Line::from(vec![
            Span::styled(
                format!("{} Generating your tasks... ", spinner_frame(app)),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled(
                app.goal_input.as_str(),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else if app.goal_input.as_str().is_empty() {
        Line::from(Span::styled(
            GOAL_PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(app.goal_input.as_str())
    };
    f.render_widget(Paragraph::new(line), inner);

    if focused && !app.controller.is_loading() {
        f.set_cursor_position((inner.x + input::cursor_x(&app.goal_input), inner.y));
    }
}

fn draw_error_banner(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let Some(err) = app.controller.last_error() else {
        return;
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from(vec![
            Span::styled(
                "Error: ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled(err, Style::default().fg(Color::Red)),
        ]),
        Line::from(Span::styled(
            API_KEY_HINT,
            Style::default().fg(Color::LightRed),
        )),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );
}

fn draw_task_list(f: &mut Frame<'_>, area: Rect, app: &mut AppState, today: Date) {
    let focused = app.focus == Focus::List && !modal_open(app);
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title("Tasks");
    let inner = block.inner(area);

    if app.controller.is_empty() {
        f.render_widget(block, area);
        let msg = if app.controller.is_loading() {
            Line::from(Span::styled(
                format!("{} Generating your tasks...", spinner_frame(app)),
                Style::default().fg(Color::Cyan),
            ))
        } else {
            Line::from(Span::styled(
                EMPTY_STATE,
                Style::default().fg(Color::DarkGray),
            ))
        };
        let y_pad = inner.height.saturating_sub(1) / 2;
        let centered = Rect {
            y: inner.y + y_pad,
            height: inner.height.saturating_sub(y_pad).min(2),
            ..inner
        };
        f.render_widget(
            Paragraph::new(msg)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            centered,
        );
        return;
    }

    let highlight_overdue = app.cfg.ui.highlight_overdue;
    let icons = app.cfg.ui.icons;
    let edit = app.edit.as_ref();
    let rows = app.controller.tasks().iter().map(|t| {
        let check = checkbox(t.completed, icons);
        let text_cell = match edit {
            Some(e) if e.id == t.id => Cell::from(e.input.as_str().to_owned())
                .style(Style::default().fg(Color::Yellow)),
            _ => Cell::from(t.text.clone()).style(task_text_style(t)),
        };
        let due_cell = match t.due_date.as_deref() {
            Some(d) => {
                let style = if highlight_overdue && due::is_overdue(t, today) {
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                Cell::from(due::format_due_date(d, today)).style(style)
            }
            None => Cell::from(""),
        };
        Row::new(vec![Cell::from(check), text_cell, due_cell])
    });

    let table = Table::new(
        rows,
        vec![
            Constraint::Length(CHECK_COL_WIDTH),
            Constraint::Min(10),
            Constraint::Length(DUE_COL_WIDTH),
        ],
    )
    .block(block)
    .row_highlight_style(if focused {
        Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    })
    .highlight_symbol(HIGHLIGHT_SYMBOL);

    f.render_stateful_widget(table, area, &mut app.table_state);

    if let Some(e) = &app.edit
        && app.add_task.is_none()
        && app.controller.pending_deletion().is_none()
        && let Some(idx) = app.controller.tasks().iter().position(|t| t.id == e.id)
        && idx >= app.table_state.offset()
    {
        let row = u16::try_from(idx - app.table_state.offset()).unwrap_or(u16::MAX);
        if row < inner.height {
            let prefix = u16::try_from(HIGHLIGHT_SYMBOL.chars().count()).unwrap_or(0)
                + CHECK_COL_WIDTH
                + 1;
            f.set_cursor_position((inner.x + prefix + input::cursor_x(&e.input), inner.y + row));
        }
    }
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, app: &AppState) {
    let left = if let Some(toast) = &app.toast {
        toast.message.clone()
    } else if app.controller.pending_deletion().is_some() {
        "Confirm deletion".to_owned()
    } else if app.add_task.is_some() {
        "Add task".to_owned()
    } else if app.edit.is_some() {
        "Editing".to_owned()
    } else if app.focus == Focus::Goal {
        "Goal".to_owned()
    } else {
        "Tasks".to_owned()
    };

    let right = if !app.cfg.ui.show_hints {
        String::new()
    } else if app.controller.pending_deletion().is_some() {
        "y delete • n/Esc cancel".to_owned()
    } else if app.add_task.is_some() {
        "Tab next field • Enter add • Esc close".to_owned()
    } else if app.edit.is_some() {
        "Enter save • Esc revert".to_owned()
    } else if app.focus == Focus::Goal {
        if app.controller.is_loading() {
            "generating… • Tab tasks • Ctrl-C quit".to_owned()
        } else {
            "Enter generate • Tab tasks • Ctrl-C quit".to_owned()
        }
    } else {
        let mut hints =
            "j/k move • Space toggle • e edit • d delete • a add • g goal".to_owned();
        if !app.controller.is_empty() {
            hints.push_str(" • C clear all");
        }
        hints.push_str(" • ? help • q quit");
        hints
    };

    let spans = vec![
        Span::styled(
            format!(" {left} "),
            Style::default().fg(Color::White).bg(Color::Blue),
        ),
        Span::raw(" "),
        Span::styled(
            right,
            Style::default()
                .fg(Color::White)
                .bg(Color::Blue)
                .add_modifier(Modifier::DIM),
        ),
    ];
    let p = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Blue));
    f.render_widget(p, area);
}

fn draw_confirm(f: &mut Frame<'_>, task: &Task) {
    let area = centered_rect(60, 30, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title("Confirm Deletion");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from(format!(
            "Are you sure you want to delete the task: \"{}\"? This action cannot be undone.",
            task.text
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "[y] Delete",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::raw("    "),
            Span::raw("[n] Cancel"),
        ]),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

fn draw_add_task_popup(f: &mut Frame<'_>, dialog: &AddTaskDialog) {
    let area = centered_rect(70, 35, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Add a single task manually");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let active_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let style_for = |field: AddTaskField| {
        if dialog.field == field {
            active_style
        } else {
            Style::default()
        }
    };
    let label = Style::default().add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Task: ", label),
            Span::styled(dialog.text.as_str(), style_for(AddTaskField::Text)),
        ]),
        Line::from(vec![
            Span::styled("Due:  ", label),
            Span::styled(dialog.due.as_str(), style_for(AddTaskField::Due)),
            Span::styled(
                "  (YYYY-MM-DD, optional)",
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    ];

    if let Some(err) = dialog.error.as_deref() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(
                "Error: ",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Span::styled(err, Style::default().fg(Color::Red)),
        ]));
    }
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);

    let (line_idx, input) = match dialog.field {
        AddTaskField::Text => (0u16, &dialog.text),
        AddTaskField::Due => (1u16, &dialog.due),
    };
    let prefix = u16::try_from("Task: ".chars().count()).unwrap_or(0);
    f.set_cursor_position((
        inner.x + prefix + input::cursor_x(input),
        inner.y + line_idx,
    ));
}

fn draw_help(f: &mut Frame<'_>) {
    let area = centered_rect(70, 70, f.area());
    f.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title("Help");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let lines = vec![
        Line::from("Goal input:"),
        Line::from("  Enter       Generate tasks for the goal"),
        Line::from("  Tab/Esc     Switch to the task list"),
        Line::from(""),
        Line::from("Task list:"),
        Line::from("  j/k ↑/↓     Move selection"),
        Line::from("  Space/x     Toggle completed"),
        Line::from("  e/Enter     Edit text (open tasks only)"),
        Line::from("  d/Del       Delete (asks for confirmation)"),
        Line::from("  a           Add a task manually"),
        Line::from("  C           Clear all tasks"),
        Line::from("  g/Tab       Back to the goal input"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from("Ctrl-C quits from anywhere. Tasks are not saved between sessions."),
    ];
    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn handle_key(key: KeyEvent, app: &mut AppState) -> Effect {
    if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c')) {
        app.should_quit = true;
        return Effect::None;
    }

    // Modals take precedence
    if app.controller.pending_deletion().is_some() {
        handle_confirm_key(key, app);
        return Effect::None;
    }
    if app.show_help {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('?' | 'q')
        ) {
            app.show_help = false;
        }
        return Effect::None;
    }
    if app.add_task.is_some() {
        handle_add_task_key(key, app);
        return Effect::None;
    }
    if app.edit.is_some() {
        handle_edit_key(key, app);
        return Effect::None;
    }

    match app.focus {
        Focus::Goal => handle_goal_key(key, app),
        Focus::List => {
            handle_list_key(key, app);
            Effect::None
        }
    }
}

fn handle_goal_key(key: KeyEvent, app: &mut AppState) -> Effect {
    match key.code {
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Esc | KeyCode::Down => {
            app.focus = Focus::List;
            Effect::None
        }
        KeyCode::Enter => {
            let Some(ticket) = app.controller.begin_generation(app.goal_input.as_str()) else {
                return Effect::None;
            };
            let goal = ticket.goal().to_owned();
            app.in_flight = Some(ticket);
            Effect::Generate(goal)
        }
        _ => {
            if app.controller.is_loading() {
                return Effect::None;
            }
            if app.goal_input.handle_key(key) {
                app.controller.set_goal(app.goal_input.as_str());
            }
            Effect::None
        }
    }
}

fn handle_list_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Esc | KeyCode::Char('g' | 'i' | '/') => {
            app.focus = Focus::Goal;
        }
        KeyCode::Char('j') | KeyCode::Down => app.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.move_selection(-1),
        KeyCode::Home => app.move_selection(i64::MIN / 2),
        KeyCode::End => app.move_selection(i64::MAX / 2),
        KeyCode::Char(' ' | 'x') => {
            if let Some(id) = app.selected_task().map(|t| t.id.clone()) {
                app.controller.toggle_task(&id);
            }
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            let Some(task) = app.selected_task() else {
                return;
            };
            if task.completed {
                app.toast = Some(Toast::info("Completed tasks can't be edited"));
                return;
            }
            app.edit = Some(InlineEdit {
                id: task.id.clone(),
                input: TextInput::new(task.text.clone()),
            });
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(id) = app.selected_task().map(|t| t.id.clone()) {
                app.controller.request_delete(&id);
            }
        }
        KeyCode::Char('a') => {
            if app.controller.is_loading() {
                app.toast = Some(Toast::info("Wait for the current generation to finish"));
                return;
            }
            app.add_task = Some(AddTaskDialog::new());
        }
        KeyCode::Char('C') => {
            let n = app.controller.len();
            if n == 0 {
                return;
            }
            app.controller.clear_all();
            app.table_state.select(Some(0));
            app.toast = Some(Toast::info(format!(
                "Cleared {n} task{}",
                if n == 1 { "" } else { "s" }
            )));
        }
        _ => {}
    }
}

fn handle_confirm_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Char('y' | 'Y') => {
            let text = app.controller.pending_deletion().map(|t| t.text.clone());
            app.controller.confirm_delete();
            app.clamp_selection();
            if let Some(text) = text {
                app.toast = Some(Toast::info(format!("Deleted \"{text}\"")));
            }
        }
        KeyCode::Char('n' | 'N' | 'q') | KeyCode::Esc => app.controller.cancel_delete(),
        _ => {}
    }
}

fn handle_edit_key(key: KeyEvent, app: &mut AppState) {
    match key.code {
        KeyCode::Esc => app.edit = None,
        KeyCode::Enter => {
            if let Some(edit) = app.edit.take() {
                // Blank text is rejected by the controller, which is the revert.
                app.controller.update_task(&edit.id, edit.input.as_str());
            }
        }
        _ => {
            if let Some(edit) = app.edit.as_mut() {
                edit.input.handle_key(key);
            }
        }
    }
}

fn handle_add_task_key(key: KeyEvent, app: &mut AppState) {
    let Some(dialog) = app.add_task.as_mut() else {
        return;
    };

    match key.code {
        KeyCode::Esc => app.add_task = None,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            dialog.error = None;
            dialog.field = match dialog.field {
                AddTaskField::Text => AddTaskField::Due,
                AddTaskField::Due => AddTaskField::Text,
            };
        }
        KeyCode::Enter => {
            dialog.error = None;
            if dialog.text.as_str().trim().is_empty() {
                dialog.error = Some("task text is required".to_owned());
                dialog.field = AddTaskField::Text;
                return;
            }
            if dialog.field == AddTaskField::Text {
                dialog.field = AddTaskField::Due;
                return;
            }
            let due_date = due::normalize_due_input(dialog.due.as_str());
            if let Some(d) = due_date.as_deref()
                && due::parse_due_date(d).is_none()
            {
                dialog.error = Some(format!("'{d}' is not a date (YYYY-MM-DD)"));
                return;
            }
            let text = dialog.text.as_str().to_owned();
            app.add_task = None;
            app.controller.add_task(&text, due_date);
            if let Some(last) = app.controller.len().checked_sub(1) {
                app.table_state.select(Some(last));
            }
            app.toast = Some(Toast::info("Task added"));
        }
        _ => {
            dialog.error = None;
            dialog.active_input().handle_key(key);
        }
    }
}

fn modal_open(app: &AppState) -> bool {
    app.add_task.is_some() || app.controller.pending_deletion().is_some() || app.show_help
}

fn spinner_frame(app: &AppState) -> &'static str {
    SPINNER[app.spinner % SPINNER.len()]
}

fn checkbox(completed: bool, icons: bool) -> &'static str {
    match (completed, icons) {
        (true, true) => "✔",
        (false, true) => "☐",
        (true, false) => "[x]",
        (false, false) => "[ ]",
    }
}

fn task_text_style(task: &Task) -> Style {
    if task.completed {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        Style::default()
    }
}

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
