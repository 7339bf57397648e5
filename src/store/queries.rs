use rusqlite::params;

use super::Store;
use super::models::{Project, Task, TaskStatus, compare_for_listing};
use crate::error::{Error, Result};

impl Store {
    // ── Projects ──

    pub fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("project name must not be empty".into()));
        }
        if self.lookup_project(name)?.is_some() {
            return Err(Error::Validation(format!(
                "project '{name}' already exists"
            )));
        }
        let project = Project::new(name, description.trim());
        self.put_project(&project)?;
        tracing::debug!("created project {} ({})", project.name, project.id);
        Ok(project)
    }

    fn put_project(&self, project: &Project) -> Result<()> {
        let data = self.cipher.encrypt(project)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO projects (id, data) VALUES (?1, ?2)",
            params![project.id, data],
        )?;
        Ok(())
    }

    pub fn get_project(&self, id: &str) -> Result<Project> {
        let token: String = match self.conn.query_row(
            "SELECT data FROM projects WHERE id = ?1",
            params![id],
            |row| row.get(0),
        ) {
            Ok(token) => token,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(Error::ProjectNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        self.cipher.decrypt(id, &token)
    }

    /// All projects, name order. Names live inside encrypted payloads,
    /// so ordering happens after decryption.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare("SELECT id, data FROM projects")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut projects = rows
            .iter()
            .map(|(id, token)| self.cipher.decrypt(id, token))
            .collect::<Result<Vec<Project>>>()?;
        projects.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(projects)
    }

    fn lookup_project(&self, name: &str) -> Result<Option<Project>> {
        let wanted = name.trim().to_lowercase();
        Ok(self
            .list_projects()?
            .into_iter()
            .find(|p| p.name.to_lowercase() == wanted))
    }

    /// Case-insensitive name lookup; errors when the project is missing.
    pub fn find_project(&self, name: &str) -> Result<Project> {
        self.lookup_project(name)?
            .ok_or_else(|| Error::ProjectNotFound(name.to_string()))
    }

    pub fn get_or_create_project(&self, name: &str) -> Result<Project> {
        match self.lookup_project(name)? {
            Some(project) => Ok(project),
            None => self.create_project(name, ""),
        }
    }

    pub fn rename_project(&self, id: &str, new_name: &str) -> Result<Project> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(Error::Validation("project name must not be empty".into()));
        }
        let mut project = self.get_project(id)?;
        if let Some(existing) = self.lookup_project(new_name)?
            && existing.id != project.id
        {
            return Err(Error::Validation(format!(
                "project '{new_name}' already exists"
            )));
        }
        project.name = new_name.to_string();
        self.put_project(&project)?;
        Ok(project)
    }

    /// Delete a project and every task that belongs to it, atomically.
    pub fn delete_project(&self, id: &str) -> Result<()> {
        self.get_project(id)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM tasks WHERE project_id = ?1", params![id])?;
        tx.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        tx.commit()?;
        tracing::debug!("deleted project {id} with cascade");
        Ok(())
    }

    // ── Tasks ──

    pub fn create_task(
        &self,
        project_id: &str,
        title: &str,
        story_points: i64,
        description: &str,
    ) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::Validation("task title must not be empty".into()));
        }
        if story_points < 0 {
            return Err(Error::Validation(
                "story points must not be negative".into(),
            ));
        }
        self.get_project(project_id)?;

        let position = self.next_position(project_id)?;
        let task = Task::new(project_id, title, story_points, description.trim(), position);
        self.put_task(&task)?;
        tracing::debug!("created task {} ({})", task.title, task.id);
        Ok(task)
    }

    /// The plaintext `project_id`/`status` columns exist only to back the
    /// indices; they are rewritten on every save so they always mirror
    /// the encrypted payload.
    fn put_task(&self, task: &Task) -> Result<()> {
        let data = self.cipher.encrypt(task)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO tasks (id, project_id, status, data) VALUES (?1, ?2, ?3, ?4)",
            params![task.id, task.project_id, task.status.as_str(), data],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Task> {
        let token: String = match self.conn.query_row(
            "SELECT data FROM tasks WHERE id = ?1",
            params![id],
            |row| row.get(0),
        ) {
            Ok(token) => token,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(Error::TaskNotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        self.cipher.decrypt(id, &token)
    }

    fn load_tasks(&self, project_id: Option<&str>) -> Result<Vec<Task>> {
        let mut rows: Vec<(String, String)> = Vec::new();
        match project_id {
            Some(project_id) => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT id, data FROM tasks WHERE project_id = ?1")?;
                let mapped = stmt.query_map(params![project_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;
                for row in mapped {
                    rows.push(row?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare("SELECT id, data FROM tasks")?;
                let mapped = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;
                for row in mapped {
                    rows.push(row?);
                }
            }
        }

        rows.iter()
            .map(|(id, token)| self.cipher.decrypt(id, token))
            .collect()
    }

    /// Every task across all projects, in listing order.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = self.load_tasks(None)?;
        tasks.sort_by(compare_for_listing);
        Ok(tasks)
    }

    /// Tasks of one project, in listing order: incomplete before done,
    /// then story points descending.
    pub fn list_tasks_for_project(&self, project_id: &str) -> Result<Vec<Task>> {
        let mut tasks = self.load_tasks(Some(project_id))?;
        tasks.sort_by(compare_for_listing);
        Ok(tasks)
    }

    /// Case-insensitive substring search over titles, creation order.
    /// The CLI complete/delete flows use this to resolve a title query
    /// to exactly one task.
    pub fn find_tasks_by_title(&self, query: &str) -> Result<Vec<Task>> {
        let needle = query.to_lowercase();
        let mut tasks: Vec<Task> = self
            .load_tasks(None)?
            .into_iter()
            .filter(|t| t.title.to_lowercase().contains(&needle))
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tasks)
    }

    /// Advance the task's status one step (Todo -> InProgress -> Done -> Todo).
    pub fn cycle_task(&self, id: &str) -> Result<Task> {
        let mut task = self.get_task(id)?;
        task.cycle_status();
        self.put_task(&task)?;
        Ok(task)
    }

    /// Flip the task between Todo and Done.
    pub fn toggle_task(&self, id: &str) -> Result<Task> {
        let mut task = self.get_task(id)?;
        task.toggle_status();
        self.put_task(&task)?;
        Ok(task)
    }

    pub fn edit_task(
        &self,
        id: &str,
        title: &str,
        story_points: i64,
        description: &str,
    ) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::Validation("task title must not be empty".into()));
        }
        if story_points < 0 {
            return Err(Error::Validation(
                "story points must not be negative".into(),
            ));
        }
        let mut task = self.get_task(id)?;
        task.title = title.to_string();
        task.story_points = story_points;
        task.description = description.trim().to_string();
        task.touch();
        self.put_task(&task)?;
        Ok(task)
    }

    /// Reassign a task to another project, which must exist.
    pub fn move_task(&self, id: &str, project_id: &str) -> Result<Task> {
        self.get_project(project_id)?;
        let mut task = self.get_task(id)?;
        task.project_id = project_id.to_string();
        task.position = self.next_position(project_id)?;
        task.touch();
        self.put_task(&task)?;
        Ok(task)
    }

    pub fn delete_task(&self, id: &str) -> Result<()> {
        let task = self.get_task(id)?;
        self.conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        tracing::debug!("deleted task {} ({})", task.title, id);
        Ok(())
    }

    /// Next manual-ordering slot within a project.
    pub fn next_position(&self, project_id: &str) -> Result<i64> {
        let tasks = self.load_tasks(Some(project_id))?;
        Ok(tasks.iter().map(|t| t.position + 1).max().unwrap_or(0))
    }

    // ── Stats ──

    pub fn project_stats(&self, project_id: &str) -> Result<ProjectStats> {
        self.get_project(project_id)?;

        // Status counts come from the indexed mirror column; only the
        // point sums need decrypted payloads.
        let mut stats = ProjectStats::default();
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM tasks WHERE project_id = ?1 GROUP BY status",
        )?;
        let counts = stmt.query_map(params![project_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in counts {
            let (status, count) = row?;
            match TaskStatus::from_str(&status) {
                TaskStatus::Done => stats.done_tasks += count,
                TaskStatus::InProgress => stats.in_progress_tasks += count,
                TaskStatus::Todo => stats.todo_tasks += count,
            }
            stats.total_tasks += count;
        }

        for task in self.load_tasks(Some(project_id))? {
            stats.total_points += task.story_points;
            if task.is_complete() {
                stats.done_points += task.story_points;
            }
        }

        Ok(stats)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectStats {
    pub total_tasks: i64,
    pub done_tasks: i64,
    pub in_progress_tasks: i64,
    pub todo_tasks: i64,
    pub total_points: i64,
    pub done_points: i64,
}

impl ProjectStats {
    /// Share of tasks done, in percent. Zero when the project is empty.
    pub fn completion_pct(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            self.done_tasks as f64 / self.total_tasks as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::TaskStatus;

    #[test]
    fn test_create_and_get_project() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("Tudu", "terminal todo").unwrap();
        assert_eq!(project.name, "Tudu");
        assert_eq!(project.description, "terminal todo");

        let fetched = store.get_project(&project.id).unwrap();
        assert_eq!(fetched, project);
    }

    #[test]
    fn test_project_name_must_not_be_empty() {
        let store = Store::open_in_memory().unwrap();
        let err = store.create_project("   ", "").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_duplicate_project_name_rejected_case_insensitively() {
        let store = Store::open_in_memory().unwrap();
        store.create_project("Tudu", "").unwrap();

        let err = store.create_project("tudu", "").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_list_projects_ordered_by_name() {
        let store = Store::open_in_memory().unwrap();
        store.create_project("beta", "").unwrap();
        store.create_project("Alpha", "").unwrap();

        let projects = store.list_projects().unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name, "Alpha");
        assert_eq!(projects[1].name, "beta");
    }

    #[test]
    fn test_find_project_ignores_case() {
        let store = Store::open_in_memory().unwrap();
        let created = store.create_project("Tudu", "").unwrap();

        let found = store.find_project("TUDU").unwrap();
        assert_eq!(found.id, created.id);

        let err = store.find_project("missing").unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[test]
    fn test_get_or_create_project() {
        let store = Store::open_in_memory().unwrap();
        let first = store.get_or_create_project("Tudu").unwrap();
        let second = store.get_or_create_project("tudu").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_projects().unwrap().len(), 1);
    }

    #[test]
    fn test_rename_project() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("old", "").unwrap();
        store.create_project("taken", "").unwrap();

        let renamed = store.rename_project(&project.id, "new").unwrap();
        assert_eq!(renamed.name, "new");
        assert_eq!(store.get_project(&project.id).unwrap().name, "new");

        // Renaming onto another project's name is rejected
        let err = store.rename_project(&project.id, "Taken").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Renaming to its own name is a no-op, not a collision
        store.rename_project(&project.id, "new").unwrap();
    }

    #[test]
    fn test_delete_project_cascades_to_tasks() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("doomed", "").unwrap();
        let keeper = store.create_project("keeper", "").unwrap();

        let t1 = store.create_task(&project.id, "one", 1, "").unwrap();
        let t2 = store.create_task(&project.id, "two", 2, "").unwrap();
        let kept = store.create_task(&keeper.id, "survives", 3, "").unwrap();

        store.delete_project(&project.id).unwrap();

        assert!(matches!(
            store.get_project(&project.id).unwrap_err(),
            Error::ProjectNotFound(_)
        ));
        assert!(matches!(
            store.get_task(&t1.id).unwrap_err(),
            Error::TaskNotFound(_)
        ));
        assert!(matches!(
            store.get_task(&t2.id).unwrap_err(),
            Error::TaskNotFound(_)
        ));
        // The other project's task is untouched
        assert_eq!(store.get_task(&kept.id).unwrap().title, "survives");
    }

    #[test]
    fn test_create_task_requires_existing_project() {
        let store = Store::open_in_memory().unwrap();
        let err = store.create_task("no-such-id", "title", 1, "").unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[test]
    fn test_create_task_validation() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("p", "").unwrap();

        let err = store.create_task(&project.id, "  ", 1, "").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = store.create_task(&project.id, "ok", -1, "").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // Zero story points are allowed and clamp to the lowest tier
        let task = store.create_task(&project.id, "ok", 0, "").unwrap();
        assert_eq!(task.priority(), crate::store::Priority::Trivial);
    }

    #[test]
    fn test_positions_increment_per_project() {
        let store = Store::open_in_memory().unwrap();
        let a = store.create_project("a", "").unwrap();
        let b = store.create_project("b", "").unwrap();

        let t1 = store.create_task(&a.id, "first", 1, "").unwrap();
        let t2 = store.create_task(&a.id, "second", 1, "").unwrap();
        let other = store.create_task(&b.id, "elsewhere", 1, "").unwrap();

        assert_eq!(t1.position, 0);
        assert_eq!(t2.position, 1);
        assert_eq!(other.position, 0);
    }

    #[test]
    fn test_cycle_and_toggle_lifecycle() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("p", "").unwrap();
        let task = store.create_task(&project.id, "lifecycle", 2, "").unwrap();
        assert_eq!(task.status, TaskStatus::Todo);

        let task = store.cycle_task(&task.id).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.completed_at.is_none());

        let task = store.cycle_task(&task.id).unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.completed_at.is_some());

        let task = store.cycle_task(&task.id).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
        assert!(task.completed_at.is_none());

        let task = store.toggle_task(&task.id).unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        let task = store.toggle_task(&task.id).unwrap();
        assert_eq!(task.status, TaskStatus::Todo);
    }

    #[test]
    fn test_listing_order_and_toggle_scenario() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("Tudu", "").unwrap();

        let create_app = store
            .create_task(&project.id, "Create app", 4, "")
            .unwrap();
        assert_eq!(create_app.priority(), crate::store::Priority::Low);

        let write_tests = store
            .create_task(&project.id, "Write tests", 3, "")
            .unwrap();
        assert_eq!(write_tests.priority(), crate::store::Priority::Low);

        // Both incomplete: higher story points first
        let tasks = store.list_tasks_for_project(&project.id).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Create app");
        assert_eq!(tasks[1].title, "Write tests");

        // Completing "Create app" moves it behind the incomplete task
        store.toggle_task(&create_app.id).unwrap();
        let tasks = store.list_tasks_for_project(&project.id).unwrap();
        assert_eq!(tasks[0].title, "Write tests");
        assert_eq!(tasks[1].title, "Create app");
    }

    #[test]
    fn test_find_tasks_by_title() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("p", "").unwrap();
        store.create_task(&project.id, "Create app", 4, "").unwrap();
        store.create_task(&project.id, "Write tests", 3, "").unwrap();

        let matches = store.find_tasks_by_title("create").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].title, "Create app");

        // Substring shared by both titles
        let matches = store.find_tasks_by_title("e").unwrap();
        assert_eq!(matches.len(), 2);

        assert!(store.find_tasks_by_title("nothing").unwrap().is_empty());
    }

    #[test]
    fn test_edit_task() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("p", "").unwrap();
        let task = store.create_task(&project.id, "draft", 1, "").unwrap();

        let edited = store.edit_task(&task.id, "final", 8, "polished").unwrap();
        assert_eq!(edited.title, "final");
        assert_eq!(edited.story_points, 8);
        assert_eq!(edited.priority(), crate::store::Priority::High);
        assert_eq!(edited.description, "polished");

        let err = store.edit_task(&task.id, "", 1, "").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_move_task() {
        let store = Store::open_in_memory().unwrap();
        let from = store.create_project("from", "").unwrap();
        let to = store.create_project("to", "").unwrap();
        let task = store.create_task(&from.id, "migrant", 2, "").unwrap();

        let moved = store.move_task(&task.id, &to.id).unwrap();
        assert_eq!(moved.project_id, to.id);
        assert!(store.list_tasks_for_project(&from.id).unwrap().is_empty());
        assert_eq!(store.list_tasks_for_project(&to.id).unwrap().len(), 1);

        let err = store.move_task(&task.id, "no-such-project").unwrap_err();
        assert!(matches!(err, Error::ProjectNotFound(_)));
    }

    #[test]
    fn test_delete_task() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("p", "").unwrap();
        let task = store.create_task(&project.id, "gone soon", 1, "").unwrap();

        store.delete_task(&task.id).unwrap();
        assert!(matches!(
            store.get_task(&task.id).unwrap_err(),
            Error::TaskNotFound(_)
        ));

        // Deleting again reports not-found
        assert!(matches!(
            store.delete_task(&task.id).unwrap_err(),
            Error::TaskNotFound(_)
        ));

        // A later task gets a fresh identifier, never the deleted one
        let next = store.create_task(&project.id, "new", 1, "").unwrap();
        assert_ne!(next.id, task.id);
    }

    #[test]
    fn test_project_stats() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("p", "").unwrap();

        let stats = store.project_stats(&project.id).unwrap();
        assert_eq!(stats.total_tasks, 0);
        assert_eq!(stats.completion_pct(), 0.0);

        let t1 = store.create_task(&project.id, "a", 4, "").unwrap();
        store.create_task(&project.id, "b", 3, "").unwrap();
        let t3 = store.create_task(&project.id, "c", 5, "").unwrap();

        store.toggle_task(&t1.id).unwrap();
        store.cycle_task(&t3.id).unwrap();

        let stats = store.project_stats(&project.id).unwrap();
        assert_eq!(stats.total_tasks, 3);
        assert_eq!(stats.done_tasks, 1);
        assert_eq!(stats.in_progress_tasks, 1);
        assert_eq!(stats.todo_tasks, 1);
        assert_eq!(stats.total_points, 12);
        assert_eq!(stats.done_points, 4);
        assert!((stats.completion_pct() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_tampered_record_fails_with_decryption_error() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("p", "").unwrap();
        let task = store.create_task(&project.id, "secret", 1, "").unwrap();

        // Corrupt the stored ciphertext behind the repository's back
        let token: String = store
            .conn
            .query_row(
                "SELECT data FROM tasks WHERE id = ?1",
                params![task.id],
                |row| row.get(0),
            )
            .unwrap();
        let mut bytes = token.into_bytes();
        let mid = bytes.len() / 2;
        bytes[mid] = if bytes[mid] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        store
            .conn
            .execute(
                "UPDATE tasks SET data = ?1 WHERE id = ?2",
                params![tampered, task.id],
            )
            .unwrap();

        let err = store.get_task(&task.id).unwrap_err();
        assert!(matches!(err, Error::Decryption { .. }));

        // The failure is scoped to the affected record
        let other = store.create_task(&project.id, "fine", 1, "").unwrap();
        assert_eq!(store.get_task(&other.id).unwrap().title, "fine");
    }

    #[test]
    fn test_stored_payloads_are_not_plaintext() {
        let store = Store::open_in_memory().unwrap();
        let project = store.create_project("Very Secret Plans", "").unwrap();
        store
            .create_task(&project.id, "hide the bodies of evidence", 2, "")
            .unwrap();

        let mut stmt = store
            .conn
            .prepare("SELECT data FROM projects UNION ALL SELECT data FROM tasks")
            .unwrap();
        let blobs: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();

        for blob in blobs {
            assert!(!blob.contains("Secret"));
            assert!(!blob.contains("bodies"));
        }
    }
}
