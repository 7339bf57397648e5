use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: String,
}

impl Project {
    pub fn new(name: &str, description: &str) -> Self {
        Project {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "in_progress" => TaskStatus::InProgress,
            "done" => TaskStatus::Done,
            _ => TaskStatus::Todo,
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Done => "Done",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "[ ]",
            TaskStatus::InProgress => "[~]",
            TaskStatus::Done => "[x]",
        }
    }

    /// Advance one step: Todo -> InProgress -> Done -> Todo.
    pub fn cycle(self) -> Self {
        match self {
            TaskStatus::Todo => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Todo,
        }
    }

    /// Flip between Todo and Done, bypassing InProgress.
    pub fn toggle(self) -> Self {
        match self {
            TaskStatus::Done => TaskStatus::Todo,
            TaskStatus::Todo | TaskStatus::InProgress => TaskStatus::Done,
        }
    }
}

/// Priority tier, a pure function of story points. Never stored; always
/// derived at the point of display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Trivial,
}

impl Priority {
    /// Non-positive story points clamp to the lowest tier.
    pub fn from_story_points(points: i64) -> Self {
        match points {
            13.. => Priority::Critical,
            8..=12 => Priority::High,
            5..=7 => Priority::Medium,
            3..=4 => Priority::Low,
            _ => Priority::Trivial,
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Trivial => "Trivial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub story_points: i64,
    pub status: TaskStatus,
    /// Manual ordering within a project; the last tie-breaker in listings.
    #[serde(default)]
    pub position: i64,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl Task {
    pub fn new(
        project_id: &str,
        title: &str,
        story_points: i64,
        description: &str,
        position: i64,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Task {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            story_points,
            status: TaskStatus::Todo,
            position,
            created_at: now.clone(),
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn priority(&self) -> Priority {
        Priority::from_story_points(self.story_points)
    }

    pub fn is_complete(&self) -> bool {
        self.status == TaskStatus::Done
    }

    /// Advance status one step, stamping `updated_at`/`completed_at`.
    pub fn cycle_status(&mut self) {
        self.set_status(self.status.cycle());
    }

    /// Flip between Todo and Done, stamping `updated_at`/`completed_at`.
    pub fn toggle_status(&mut self) {
        self.set_status(self.status.toggle());
    }

    pub fn set_status(&mut self, status: TaskStatus) {
        let now = chrono::Utc::now().to_rfc3339();
        self.status = status;
        self.completed_at = if status == TaskStatus::Done {
            Some(now.clone())
        } else {
            None
        };
        self.updated_at = now;
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

/// Listing order: incomplete before done, then higher story points
/// first, then manual position, then creation time.
pub fn compare_for_listing(a: &Task, b: &Task) -> Ordering {
    a.is_complete()
        .cmp(&b.is_complete())
        .then(b.story_points.cmp(&a.story_points))
        .then(a.position.cmp(&b.position))
        .then(a.created_at.cmp(&b.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_table_with_boundaries() {
        let cases = [
            (-5, Priority::Trivial),
            (0, Priority::Trivial),
            (1, Priority::Trivial),
            (2, Priority::Trivial),
            (3, Priority::Low),
            (4, Priority::Low),
            (5, Priority::Medium),
            (7, Priority::Medium),
            (8, Priority::High),
            (12, Priority::High),
            (13, Priority::Critical),
            (14, Priority::Critical),
            (100, Priority::Critical),
        ];
        for (points, expected) in cases {
            assert_eq!(
                Priority::from_story_points(points),
                expected,
                "story points {points}"
            );
        }
    }

    #[test]
    fn status_round_trip() {
        for status in [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done] {
            assert_eq!(TaskStatus::from_str(status.as_str()), status);
        }
    }

    #[test]
    fn status_unknown_defaults_to_todo() {
        assert_eq!(TaskStatus::from_str("nonsense"), TaskStatus::Todo);
        assert_eq!(TaskStatus::from_str(""), TaskStatus::Todo);
    }

    #[test]
    fn cycle_three_times_is_identity() {
        for start in [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done] {
            assert_eq!(start.cycle().cycle().cycle(), start);
        }
    }

    #[test]
    fn cycle_order() {
        assert_eq!(TaskStatus::Todo.cycle(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::InProgress.cycle(), TaskStatus::Done);
        assert_eq!(TaskStatus::Done.cycle(), TaskStatus::Todo);
    }

    #[test]
    fn toggle_is_self_inverse_from_todo_and_done() {
        assert_eq!(TaskStatus::Todo.toggle().toggle(), TaskStatus::Todo);
        assert_eq!(TaskStatus::Done.toggle().toggle(), TaskStatus::Done);
        // From InProgress, toggle skips straight to Done
        assert_eq!(TaskStatus::InProgress.toggle(), TaskStatus::Done);
    }

    #[test]
    fn toggling_done_stamps_completed_at() {
        let mut task = Task::new("p", "t", 1, "", 0);
        assert!(task.completed_at.is_none());

        task.toggle_status();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.completed_at.is_some());

        task.toggle_status();
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn listing_order_incomplete_first_then_points() {
        let mut low = Task::new("p", "Write tests", 3, "", 1);
        let high = Task::new("p", "Create app", 4, "", 0);
        let mut done = Task::new("p", "Ship it", 13, "", 2);
        done.set_status(TaskStatus::Done);

        let mut tasks = vec![done.clone(), low.clone(), high.clone()];
        tasks.sort_by(compare_for_listing);

        // Incomplete first, higher points first; done last despite 13 points
        assert_eq!(tasks[0].title, "Create app");
        assert_eq!(tasks[1].title, "Write tests");
        assert_eq!(tasks[2].title, "Ship it");

        // Completing the 4-pointer moves it behind the incomplete one
        let mut tasks = vec![low.clone(), high.clone()];
        tasks[1].set_status(TaskStatus::Done);
        tasks.sort_by(compare_for_listing);
        assert_eq!(tasks[0].title, "Write tests");
        assert_eq!(tasks[1].title, "Create app");

        // Equal points and completeness fall back to position
        low.position = 5;
        let mut twin = low.clone();
        twin.id = "other".into();
        twin.position = 2;
        let mut tasks = vec![low, twin];
        tasks.sort_by(compare_for_listing);
        assert_eq!(tasks[0].position, 2);
    }

    #[test]
    fn status_icons() {
        assert_eq!(TaskStatus::Todo.icon(), "[ ]");
        assert_eq!(TaskStatus::InProgress.icon(), "[~]");
        assert_eq!(TaskStatus::Done.icon(), "[x]");
    }
}
