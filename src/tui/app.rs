use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::DefaultTerminal;

use crate::config::Config;
use crate::error;
use crate::store::{Project, ProjectStats, Store, Task};

use super::event::{self, AppEvent};
use super::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Projects,
    Tasks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    TaskForm,
    ProjectForm,
    RenameProject,
    MoveTask,
    ConfirmDeleteTask,
    ConfirmDeleteProject,
    Help,
}

/// Which task-form field `input_buffer` currently edits.
pub const FIELD_TITLE: u8 = 0;
pub const FIELD_POINTS: u8 = 1;
pub const FIELD_DESCRIPTION: u8 = 2;

pub struct App {
    pub store: Store,
    pub should_quit: bool,
    pub focus: Focus,
    pub input_mode: InputMode,

    // Data
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,

    // Pre-fetched per-project stats for the sidebar (avoids DB queries
    // during rendering)
    pub project_stats: HashMap<String, ProjectStats>,

    // Selection indices
    pub project_index: usize,
    pub task_index: usize,

    // Input buffer for the field currently being edited
    pub input_buffer: String,

    // Task form state (shared by add and edit; `editing_task_id` decides)
    pub form_field: u8,
    pub form_title: String,
    pub form_points: String,
    pub form_description: String,
    pub editing_task_id: Option<String>,

    // Project form state
    pub project_form_field: u8,
    pub project_form_name: String,

    // Confirm delete state
    pub confirm_target: String,
    pub confirm_id: String,

    // Recoverable errors and notices shown in the status bar
    pub status_message: String,

    default_story_points: i64,
}

impl App {
    pub fn new(store: Store, config: &Config) -> Result<Self> {
        let mut app = App {
            store,
            should_quit: false,
            focus: Focus::Projects,
            input_mode: InputMode::Normal,
            projects: vec![],
            tasks: vec![],
            project_stats: HashMap::new(),
            project_index: 0,
            task_index: 0,
            input_buffer: String::new(),
            form_field: FIELD_TITLE,
            form_title: String::new(),
            form_points: String::new(),
            form_description: String::new(),
            editing_task_id: None,
            project_form_field: 0,
            project_form_name: String::new(),
            confirm_target: String::new(),
            confirm_id: String::new(),
            status_message: String::new(),
            default_story_points: config.default_story_points,
        };
        app.refresh_data()?;
        Ok(app)
    }

    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let tick_rate = Duration::from_millis(250);

        loop {
            terminal.draw(|frame| ui::draw(frame, self))?;

            match event::poll(tick_rate)? {
                AppEvent::Key(key) => match self.input_mode {
                    InputMode::Normal => self.handle_normal_key(key.code, key.modifiers)?,
                    InputMode::TaskForm => self.handle_task_form_key(key.code)?,
                    InputMode::ProjectForm => self.handle_project_form_key(key.code)?,
                    InputMode::RenameProject => self.handle_rename_key(key.code)?,
                    InputMode::MoveTask => self.handle_move_key(key.code)?,
                    InputMode::ConfirmDeleteTask | InputMode::ConfirmDeleteProject => {
                        self.handle_confirm_key(key.code)?;
                    }
                    InputMode::Help => self.handle_help_key(key.code),
                },
                AppEvent::Tick => {
                    // Pick up changes written by a concurrent CLI invocation
                    self.refresh_data()?;
                }
            }

            if self.should_quit {
                return Ok(());
            }
        }
    }

    /// Report a repository result: recoverable domain errors land in the
    /// status bar, everything else aborts the TUI.
    fn report<T>(&mut self, result: error::Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_recoverable() => {
                self.status_message = e.to_string();
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn refresh_data(&mut self) -> Result<()> {
        let projects = self.store.list_projects();
        let Some(projects) = self.report(projects)? else {
            return Ok(());
        };
        self.projects = projects;

        if self.project_index >= self.projects.len() && !self.projects.is_empty() {
            self.project_index = self.projects.len() - 1;
        }

        let selected = self.projects.get(self.project_index).map(|p| p.id.clone());
        if let Some(id) = selected {
            let tasks = self.store.list_tasks_for_project(&id);
            if let Some(tasks) = self.report(tasks)? {
                self.tasks = tasks;
            }
        } else {
            self.tasks.clear();
        }

        let mut stats = HashMap::new();
        for project in &self.projects {
            if let Ok(s) = self.store.project_stats(&project.id) {
                stats.insert(project.id.clone(), s);
            }
        }
        self.project_stats = stats;

        if self.task_index >= self.tasks.len() && !self.tasks.is_empty() {
            self.task_index = self.tasks.len() - 1;
        } else if self.tasks.is_empty() {
            self.task_index = 0;
        }

        Ok(())
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.projects.get(self.project_index)
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.tasks.get(self.task_index)
    }

    fn handle_normal_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Result<()> {
        self.status_message.clear();

        match (code, modifiers) {
            (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }

            (KeyCode::Char('?'), _) => {
                self.input_mode = InputMode::Help;
            }

            // Navigation
            (KeyCode::Char('j') | KeyCode::Down, _) => self.move_down(),
            (KeyCode::Char('k') | KeyCode::Up, _) => self.move_up(),

            // Focus switching
            (KeyCode::Char('h') | KeyCode::Left, _) => self.focus = Focus::Projects,
            (KeyCode::Char('l') | KeyCode::Right, _) => self.focus = Focus::Tasks,
            (KeyCode::Tab, _) => {
                self.focus = match self.focus {
                    Focus::Projects => Focus::Tasks,
                    Focus::Tasks => Focus::Projects,
                };
            }

            // Cycle status: Todo -> InProgress -> Done -> Todo
            (KeyCode::Enter | KeyCode::Char(' '), _) => {
                if self.focus == Focus::Tasks
                    && let Some(id) = self.selected_task().map(|t| t.id.clone())
                {
                    let result = self.store.cycle_task(&id);
                    self.report(result)?;
                    self.refresh_data()?;
                }
            }

            // Toggle done directly
            (KeyCode::Char('x'), _) => {
                if let Some(id) = self.selected_task().map(|t| t.id.clone()) {
                    let result = self.store.toggle_task(&id);
                    self.report(result)?;
                    self.refresh_data()?;
                }
            }

            // Add task
            (KeyCode::Char('a'), _) => {
                if self.selected_project().is_some() {
                    self.open_task_form(None);
                } else {
                    self.status_message = "create a project first (P)".into();
                }
            }

            // Edit task
            (KeyCode::Char('e'), _) => {
                if let Some(task) = self.selected_task().cloned() {
                    self.open_task_form(Some(task));
                }
            }

            // Move task to another project
            (KeyCode::Char('m'), _) => {
                if let Some(task) = self.selected_task() {
                    self.confirm_id = task.id.clone();
                    self.input_buffer.clear();
                    self.input_mode = InputMode::MoveTask;
                }
            }

            // Delete task (with confirmation)
            (KeyCode::Char('d'), _) => {
                if let Some(task) = self.selected_task().cloned() {
                    self.confirm_target = task.title.clone();
                    self.confirm_id = task.id.clone();
                    self.input_mode = InputMode::ConfirmDeleteTask;
                }
            }

            // New project
            (KeyCode::Char('P'), _) => {
                self.input_buffer.clear();
                self.project_form_name.clear();
                self.project_form_field = 0;
                self.input_mode = InputMode::ProjectForm;
            }

            // Rename project
            (KeyCode::Char('r'), _) => {
                if let Some(project) = self.selected_project() {
                    self.input_buffer = project.name.clone();
                    self.input_mode = InputMode::RenameProject;
                }
            }

            // Delete project (with confirmation; cascades to its tasks)
            (KeyCode::Char('D'), _) => {
                if let Some((name, id)) = self
                    .selected_project()
                    .map(|p| (p.name.clone(), p.id.clone()))
                {
                    self.confirm_target = name;
                    self.confirm_id = id;
                    self.input_mode = InputMode::ConfirmDeleteProject;
                }
            }

            _ => {}
        }
        Ok(())
    }

    fn open_task_form(&mut self, task: Option<Task>) {
        match task {
            Some(task) => {
                self.form_title = task.title.clone();
                self.form_points = task.story_points.to_string();
                self.form_description = task.description.clone();
                self.editing_task_id = Some(task.id);
            }
            None => {
                self.form_title.clear();
                self.form_points = self.default_story_points.to_string();
                self.form_description.clear();
                self.editing_task_id = None;
            }
        }
        self.form_field = FIELD_TITLE;
        self.input_buffer = self.form_title.clone();
        self.input_mode = InputMode::TaskForm;
    }

    /// One buffer, three fields: Enter stores the buffer into the current
    /// field and advances; on the last field it submits.
    fn handle_task_form_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Enter => match self.form_field {
                FIELD_TITLE => {
                    self.form_title = std::mem::take(&mut self.input_buffer);
                    self.form_field = FIELD_POINTS;
                    self.input_buffer = self.form_points.clone();
                }
                FIELD_POINTS => {
                    self.form_points = std::mem::take(&mut self.input_buffer);
                    self.form_field = FIELD_DESCRIPTION;
                    self.input_buffer = self.form_description.clone();
                }
                _ => {
                    self.form_description = std::mem::take(&mut self.input_buffer);
                    self.submit_task_form()?;
                }
            },
            KeyCode::Esc => {
                self.input_buffer.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            _ => {}
        }
        Ok(())
    }

    fn submit_task_form(&mut self) -> Result<()> {
        let points = self
            .form_points
            .trim()
            .parse::<i64>()
            .unwrap_or(self.default_story_points);

        let result = match &self.editing_task_id {
            Some(id) => {
                let id = id.clone();
                self.store
                    .edit_task(&id, &self.form_title, points, &self.form_description)
            }
            None => match self.selected_project().map(|p| p.id.clone()) {
                Some(project_id) => self.store.create_task(
                    &project_id,
                    &self.form_title,
                    points,
                    &self.form_description,
                ),
                None => {
                    self.input_mode = InputMode::Normal;
                    return Ok(());
                }
            },
        };

        if self.report(result)?.is_some() {
            self.input_mode = InputMode::Normal;
            self.refresh_data()?;
        } else {
            // Validation failed: back to the title field for another try
            self.form_field = FIELD_TITLE;
            self.input_buffer = self.form_title.clone();
        }
        Ok(())
    }

    fn handle_project_form_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Enter => {
                if self.project_form_field == 0 {
                    self.project_form_name = std::mem::take(&mut self.input_buffer);
                    self.project_form_field = 1;
                } else {
                    let description = std::mem::take(&mut self.input_buffer);
                    let name = self.project_form_name.clone();
                    let result = self.store.create_project(&name, &description);
                    if self.report(result)?.is_some() {
                        self.input_mode = InputMode::Normal;
                        self.refresh_data()?;
                        // Jump to the new project
                        if let Some(idx) = self
                            .projects
                            .iter()
                            .position(|p| p.name.eq_ignore_ascii_case(name.trim()))
                        {
                            self.project_index = idx;
                            self.refresh_data()?;
                        }
                    } else {
                        self.project_form_field = 0;
                        self.input_buffer = self.project_form_name.clone();
                    }
                }
            }
            KeyCode::Esc => {
                self.input_buffer.clear();
                self.project_form_name.clear();
                self.project_form_field = 0;
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_rename_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Enter => {
                if let Some(id) = self.selected_project().map(|p| p.id.clone()) {
                    let new_name = std::mem::take(&mut self.input_buffer);
                    let result = self.store.rename_project(&id, &new_name);
                    if self.report(result)?.is_some() {
                        self.input_mode = InputMode::Normal;
                        self.refresh_data()?;
                    }
                } else {
                    self.input_mode = InputMode::Normal;
                }
            }
            KeyCode::Esc => {
                self.input_buffer.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            _ => {}
        }
        Ok(())
    }

    /// Reassign the remembered task to the project named in the buffer.
    fn handle_move_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Enter => {
                let name = std::mem::take(&mut self.input_buffer);
                let task_id = std::mem::take(&mut self.confirm_id);
                let target = self.store.find_project(&name);
                if let Some(project) = self.report(target)? {
                    let result = self.store.move_task(&task_id, &project.id);
                    if self.report(result)?.is_some() {
                        self.status_message = format!("moved to '{}'", project.name);
                    }
                    self.input_mode = InputMode::Normal;
                    self.refresh_data()?;
                } else {
                    self.input_mode = InputMode::Normal;
                }
            }
            KeyCode::Esc => {
                self.input_buffer.clear();
                self.confirm_id.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Char(c) => {
                self.input_buffer.push(c);
            }
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_confirm_key(&mut self, code: KeyCode) -> Result<()> {
        match code {
            KeyCode::Char('y') => {
                if !self.confirm_id.is_empty() {
                    let id = std::mem::take(&mut self.confirm_id);
                    let result = match self.input_mode {
                        InputMode::ConfirmDeleteProject => {
                            self.project_index = 0;
                            self.store.delete_project(&id)
                        }
                        _ => self.store.delete_task(&id),
                    };
                    self.report(result)?;
                    self.confirm_target.clear();
                    self.input_mode = InputMode::Normal;
                    self.refresh_data()?;
                }
            }
            KeyCode::Esc | KeyCode::Char('n') => {
                self.confirm_id.clear();
                self.confirm_target.clear();
                self.input_mode = InputMode::Normal;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_help_key(&mut self, code: KeyCode) {
        if matches!(code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            self.input_mode = InputMode::Normal;
        }
    }

    fn move_down(&mut self) {
        match self.focus {
            Focus::Projects => {
                if !self.projects.is_empty() {
                    self.project_index = (self.project_index + 1).min(self.projects.len() - 1);
                    self.task_index = 0;
                    let _ = self.refresh_data();
                }
            }
            Focus::Tasks => {
                if !self.tasks.is_empty() {
                    self.task_index = (self.task_index + 1).min(self.tasks.len() - 1);
                }
            }
        }
    }

    fn move_up(&mut self) {
        match self.focus {
            Focus::Projects => {
                self.project_index = self.project_index.saturating_sub(1);
                self.task_index = 0;
                let _ = self.refresh_data();
            }
            Focus::Tasks => {
                self.task_index = self.task_index.saturating_sub(1);
            }
        }
    }
}
