use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::validation::{is_email, Patch, ValidationErrors};

pub const NAME_MAX_LEN: usize = 100;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const TITLE_MAX_LEN: usize = 255;
pub const DESCRIPTION_MAX_LEN: usize = 5000;

// --- Domain Models (Mapped to DB) ---

#[derive(Debug, FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// What a user looks like to clients: never the hash.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq, Eq, ToSchema)]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Request DTOs ---
//
// Fields arrive as loose options so every problem can be reported per field
// instead of failing on the first serde error.

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(self) -> Result<NewUser, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = self.name.unwrap_or_default();
        if name.trim().is_empty() {
            errors.add("name", "Name is required");
        }
        errors.check_max_len("name", &name, NAME_MAX_LEN);

        let email = self.email.unwrap_or_default();
        if !is_email(&email) {
            errors.add("email", "Invalid email address");
        }

        let password = self.password.unwrap_or_default();
        if password.chars().count() < PASSWORD_MIN_LEN {
            errors.add("password", format!("Must be at least {PASSWORD_MIN_LEN} characters"));
        }

        errors.finish(NewUser { name, email, password })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(self) -> Result<Credentials, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let email = self.email.unwrap_or_default();
        if !is_email(&email) {
            errors.add("email", "Invalid email address");
        }
        let password = self.password.unwrap_or_default();
        if password.is_empty() {
            errors.add("password", "Password is required");
        }

        errors.finish(Credentials { email, password })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<TaskStatus>)]
    pub status: Option<String>,
}

pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
}

impl CreateTask {
    pub fn validate(self) -> Result<NewTask, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = match self.title {
            Some(title) => {
                check_title(&mut errors, &title);
                title
            }
            None => {
                errors.add("title", "Title is required");
                String::new()
            }
        };
        if let Some(description) = &self.description {
            errors.check_max_len("description", description, DESCRIPTION_MAX_LEN);
        }
        let status = match self.status {
            Some(raw) => parse_status(&mut errors, &raw),
            None => TaskStatus::default(),
        };

        errors.finish(NewTask {
            title,
            description: self.description,
            status,
        })
    }
}

/// Partial update body: omitted fields stay as they are, `description: null` clears it.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateTask {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub title: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, nullable)]
    pub description: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<TaskStatus>)]
    pub status: Patch<String>,
}

#[derive(Debug, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Patch<String>,
    pub status: Option<TaskStatus>,
}

impl UpdateTask {
    pub fn validate(self) -> Result<TaskChanges, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let title = match self.title {
            Patch::Missing => None,
            Patch::Null => {
                errors.add("title", "Title cannot be null");
                None
            }
            Patch::Value(title) => {
                check_title(&mut errors, &title);
                Some(title)
            }
        };
        if let Patch::Value(description) = &self.description {
            errors.check_max_len("description", description, DESCRIPTION_MAX_LEN);
        }
        let status = match self.status {
            Patch::Missing => None,
            Patch::Null => {
                errors.add("status", "Status cannot be null");
                None
            }
            Patch::Value(raw) => Some(parse_status(&mut errors, &raw)),
        };

        errors.finish(TaskChanges {
            title,
            description: self.description,
            status,
        })
    }
}

impl TaskChanges {
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        match self.description {
            Patch::Missing => {}
            Patch::Null => task.description = None,
            Patch::Value(description) => task.description = Some(description),
        }
        if let Some(status) = self.status {
            task.status = status;
        }
    }
}

fn check_title(errors: &mut ValidationErrors, title: &str) {
    if title.is_empty() {
        errors.add("title", "Title is required");
    }
    errors.check_max_len("title", title, TITLE_MAX_LEN);
}

fn parse_status(errors: &mut ValidationErrors, raw: &str) -> TaskStatus {
    raw.parse().unwrap_or_else(|()| {
        errors.add("status", "Expected one of: pending, in_progress, completed");
        TaskStatus::default()
    })
}

// --- Response DTOs ---

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskList {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskEnvelope {
    pub task: Task,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_reports_every_bad_field() {
        let errors = RegisterRequest {
            name: Some("  ".into()),
            email: Some("nope".into()),
            password: Some("short".into()),
        }
        .validate()
        .err()
        .unwrap();

        assert!(errors.contains("name"));
        assert!(errors.contains("email"));
        assert!(errors.contains("password"));
    }

    #[test]
    fn create_defaults_to_pending() {
        let task = CreateTask {
            title: Some("x".into()),
            description: None,
            status: None,
        }
        .validate()
        .ok()
        .unwrap();

        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[test]
    fn create_enforces_lengths_and_status() {
        let errors = CreateTask {
            title: Some("t".repeat(TITLE_MAX_LEN + 1)),
            description: Some("d".repeat(DESCRIPTION_MAX_LEN + 1)),
            status: Some("done".into()),
        }
        .validate()
        .err()
        .unwrap();

        assert!(errors.contains("title"));
        assert!(errors.contains("description"));
        assert!(errors.contains("status"));
    }

    #[test]
    fn update_rejects_null_title_but_clears_description() {
        let null_title: UpdateTask = serde_json::from_str(r#"{"title":null}"#).unwrap();
        assert!(null_title.validate().err().unwrap().contains("title"));

        let clear: UpdateTask = serde_json::from_str(r#"{"description":null}"#).unwrap();
        let changes = clear.validate().ok().unwrap();
        assert_eq!(changes.description, Patch::Null);
        assert!(changes.title.is_none());
        assert!(changes.status.is_none());
    }
}
