use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{PriorityFilter, StatusFilter, Task, TaskId, TaskPriority, TaskStatus},
    protocol::{
        CreateTaskRequest, LoginRequest, LoginResponse, TaskListResponse, UpdatePriorityRequest,
        UpdateStatusRequest, UpdateTextRequest,
    },
};
use tracing::{info, warn};

pub mod error;
pub mod session_store;

pub use error::ClientError;
pub use session_store::{DurableSessionStore, InMemorySessionStore, SessionStore};

/// In-progress rename of a single task. Starting an edit copies the task's
/// current text in; saving or cancelling clears the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEdit {
    pub id: TaskId,
    pub text: String,
}

/// Holds the authoritative local copy of the user's task collection and
/// applies mutations by calling the remote API, adopting each response as the
/// sole source of truth for the touched entry. Never optimistic: local state
/// changes only after a request resolves successfully, and a failed request
/// leaves the prior state intact.
///
/// Single logical thread of control. Two in-flight mutations on the same task
/// are last-response-wins; the client does not deduplicate, cancel, or retry.
pub struct TaskListClient {
    http: Client,
    base_url: String,
    session_store: Arc<dyn SessionStore>,
    token: Option<String>,
    tasks: Vec<Task>,
    edit: Option<TaskEdit>,
}

impl TaskListClient {
    pub fn new(base_url: impl Into<String>, session_store: Arc<dyn SessionStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            session_store,
            token: None,
            tasks: Vec::new(),
            edit: None,
        }
    }

    /// Reads the persisted token, if any. An empty stored token counts as
    /// unauthenticated.
    pub async fn restore_session(&mut self) -> Result<bool, ClientError> {
        let token = self
            .session_store
            .load_token()
            .await
            .map_err(ClientError::Session)?;
        self.token = token.filter(|token| !token.is_empty());
        Ok(self.token.is_some())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn editing(&self) -> Option<&TaskEdit> {
        self.edit.as_ref()
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ClientError> {
        let url = format!("{}/login", self.base_url);
        let request = self.http.post(&url).json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        });
        let response = self.dispatch(request, &url).await?;
        let body: LoginResponse = read_json(response, &url).await?;

        self.session_store
            .save_token(&body.token)
            .await
            .map_err(ClientError::Session)?;
        self.token = Some(body.token);
        info!("session: login succeeded");
        Ok(())
    }

    /// Destroys the session and drops all local task state.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        self.session_store
            .clear_token()
            .await
            .map_err(ClientError::Session)?;
        self.token = None;
        self.tasks.clear();
        self.edit = None;
        info!("session: logged out");
        Ok(())
    }

    /// Fetches the full collection and replaces the local copy with it. On
    /// failure the previous collection is kept as-is.
    pub async fn load_all(&mut self) -> Result<&[Task], ClientError> {
        let url = format!("{}/tasks", self.base_url);
        let request = self.authorized(self.http.get(&url))?;
        let response = self.dispatch(request, &url).await?;
        let decoded: TaskListResponse = read_json(response, &url).await?;

        self.tasks = decoded.into_tasks();
        info!(count = self.tasks.len(), "tasks: collection replaced");
        Ok(&self.tasks)
    }

    /// Creates a task with the fixed defaults (pending, medium) and appends
    /// the server-assigned result to the end of the collection.
    pub async fn create(&mut self, text: &str) -> Result<Task, ClientError> {
        let url = format!("{}/tasks", self.base_url);
        let request = self
            .authorized(self.http.post(&url))?
            .json(&CreateTaskRequest::new(text));
        let response = self.dispatch(request, &url).await?;
        let created: Task = read_json(response, &url).await?;

        self.tasks.push(created.clone());
        info!(task_id = %created.id, "tasks: created");
        Ok(created)
    }

    /// Submits new text for a task and adopts the returned entry. Clears any
    /// in-progress edit state on success.
    pub async fn rename(&mut self, id: &TaskId, new_text: &str) -> Result<Task, ClientError> {
        let url = format!("{}/tasks/{}/text", self.base_url, id);
        let request = self
            .authorized(self.http.patch(&url))?
            .json(&UpdateTextRequest {
                text: new_text.to_string(),
            });
        let response = self.dispatch(request, &url).await?;
        let updated: Task = read_json(response, &url).await?;

        self.adopt_update(id, &updated);
        self.edit = None;
        Ok(updated)
    }

    pub async fn set_priority(
        &mut self,
        id: &TaskId,
        priority: TaskPriority,
    ) -> Result<Task, ClientError> {
        // The deployed backend registers the priority and status routes at the
        // root, without the /tasks segment. That asymmetry is its contract.
        let url = format!("{}/{}/priority", self.base_url, id);
        let request = self
            .authorized(self.http.patch(&url))?
            .json(&UpdatePriorityRequest { priority });
        let response = self.dispatch(request, &url).await?;
        let updated: Task = read_json(response, &url).await?;

        self.adopt_update(id, &updated);
        Ok(updated)
    }

    /// Flips pending ↔ completed relative to `current` and submits the result.
    pub async fn toggle_status(
        &mut self,
        id: &TaskId,
        current: TaskStatus,
    ) -> Result<Task, ClientError> {
        let url = format!("{}/{}/status", self.base_url, id);
        let request = self
            .authorized(self.http.patch(&url))?
            .json(&UpdateStatusRequest {
                status: current.toggled(),
            });
        let response = self.dispatch(request, &url).await?;
        let updated: Task = read_json(response, &url).await?;

        self.adopt_update(id, &updated);
        Ok(updated)
    }

    /// Deletes a task remotely, then locally. The delete response body is
    /// ignored whatever its shape.
    pub async fn remove(&mut self, id: &TaskId) -> Result<(), ClientError> {
        let url = format!("{}/tasks/{}", self.base_url, id);
        let request = self.authorized(self.http.delete(&url))?;
        let _ = self.dispatch(request, &url).await?;

        self.tasks.retain(|task| &task.id != id);
        if self.edit.as_ref().is_some_and(|edit| &edit.id == id) {
            self.edit = None;
        }
        info!(task_id = %id, "tasks: removed");
        Ok(())
    }

    /// Lazy view of the collection limited to entries matching both filters.
    /// Pure: restartable, finite, does not touch state.
    pub fn filtered_view(
        &self,
        status: StatusFilter,
        priority: PriorityFilter,
    ) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(move |task| status.matches(task.status) && priority.matches(task.priority))
    }

    /// Starts editing a task by copying its current text into the draft.
    /// Returns false (and changes nothing) for an unknown id.
    pub fn begin_edit(&mut self, id: &TaskId) -> bool {
        let Some(task) = self.tasks.iter().find(|task| &task.id == id) else {
            return false;
        };
        self.edit = Some(TaskEdit {
            id: task.id.clone(),
            text: task.text.clone(),
        });
        true
    }

    pub fn set_editing_text(&mut self, text: impl Into<String>) {
        if let Some(edit) = &mut self.edit {
            edit.text = text.into();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.edit = None;
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = match self.token.as_deref() {
            Some(token) if !token.is_empty() => token,
            _ => return Err(ClientError::NotAuthenticated),
        };
        Ok(request.bearer_auth(token))
    }

    async fn dispatch(&self, request: RequestBuilder, url: &str) -> Result<Response, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response)
    }

    fn adopt_update(&mut self, id: &TaskId, updated: &Task) {
        match self.tasks.iter_mut().find(|task| &task.id == id) {
            Some(slot) => *slot = updated.clone(),
            None => warn!(task_id = %id, "tasks: server updated a task missing locally"),
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ClientError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|source| ClientError::Transport {
            url: url.to_string(),
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
