use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AiError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Description,
    Image,
    Video,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Description => write!(f, "description"),
            TaskType::Image => write!(f, "image"),
            TaskType::Video => write!(f, "video"),
        }
    }
}

/// Lifecycle of an AI task. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Asynchronous generation request queued by the API layer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AiTask {
    pub id: Uuid,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub prompt: String,
    pub model: Option<String>,
    /// Raw per-type parameters; decode with [`AiTask::arguments`].
    pub arguments: Json<serde_json::Value>,
    pub external_task_id: Option<String>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AiTask {
    /// Decodes the stored parameters into the variant matching `task_type`.
    pub fn arguments(&self) -> Result<TaskArguments, AiError> {
        TaskArguments::decode(self.task_type, &self.arguments.0)
    }

    pub fn complete(&mut self, result: Option<String>, now: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.result = result;
        self.completed_at = Some(now);
    }

    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(now);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionArguments {
    /// Falls back to the configured `AI_MAX_TOKENS` when absent.
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageArguments {
    #[serde(default = "default_image_side")]
    pub width: u32,
    #[serde(default = "default_image_side")]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoArguments {
    #[serde(default = "default_video_width")]
    pub width: u32,
    #[serde(default = "default_video_height")]
    pub height: u32,
    #[serde(default = "default_video_duration")]
    pub duration: u32,
    /// Source image; when present the video is animated from it.
    #[serde(default)]
    pub image_url: Option<String>,
}

impl VideoArguments {
    /// Size string in the `W*H` form expected by image-to-video models.
    pub fn size(&self) -> String {
        format!("{}*{}", self.width, self.height)
    }
}

fn default_image_side() -> u32 {
    1024
}

fn default_video_width() -> u32 {
    832
}

fn default_video_height() -> u32 {
    480
}

fn default_video_duration() -> u32 {
    5
}

/// Typed per-task parameters, keyed by [`TaskType`].
#[derive(Debug, Clone, PartialEq)]
pub enum TaskArguments {
    Description(DescriptionArguments),
    Image(ImageArguments),
    Video(VideoArguments),
}

impl TaskArguments {
    pub fn decode(task_type: TaskType, raw: &serde_json::Value) -> Result<Self, AiError> {
        // Rows created without parameters store NULL or {}; both mean defaults.
        let raw = if raw.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            raw.clone()
        };

        let decoded = match task_type {
            TaskType::Description => serde_json::from_value(raw).map(TaskArguments::Description),
            TaskType::Image => serde_json::from_value(raw).map(TaskArguments::Image),
            TaskType::Video => serde_json::from_value(raw).map(TaskArguments::Video),
        };

        decoded.map_err(|e| AiError::InvalidArguments(format!("{} task: {}", task_type, e)))
    }
}

#[cfg(test)]
pub(crate) fn test_task(task_type: TaskType, status: TaskStatus) -> AiTask {
    AiTask {
        id: Uuid::new_v4(),
        task_type,
        status,
        prompt: "a golden bull charging through confetti".to_string(),
        model: None,
        arguments: Json(serde_json::json!({})),
        external_task_id: None,
        result: None,
        error: None,
        created_at: Utc::now(),
        completed_at: None,
    }
}
