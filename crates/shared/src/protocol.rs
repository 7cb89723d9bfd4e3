use serde::{Deserialize, Serialize};

use crate::domain::{Task, TaskPriority, TaskStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub text: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

impl CreateTaskRequest {
    /// New tasks always start pending at medium priority; the server owns any
    /// other initial state.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            status: TaskStatus::Pending,
            priority: TaskPriority::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTextRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePriorityRequest {
    pub priority: TaskPriority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

/// The list endpoint answers with either a bare array or a `{"tasks": [...]}`
/// wrapper depending on server version. Decoded explicitly; any other shape
/// is a deserialization error rather than an empty list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TaskListResponse {
    Bare(Vec<Task>),
    Wrapped { tasks: Vec<Task> },
}

impl TaskListResponse {
    pub fn into_tasks(self) -> Vec<Task> {
        match self {
            Self::Bare(tasks) | Self::Wrapped { tasks } => tasks,
        }
    }
}
