//! Advances queued AI generation tasks.
//!
//! Pending text tasks complete in one step. Pending media tasks are submitted
//! and move to `PROCESSING`; on later runs they are polled until the provider
//! finishes, at which point the first output is downloaded under the static
//! directory. Each task fails on its own; one bad task never stops the batch.
//! All task updates are saved together at the end of the run.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::AiConfig;
use crate::errors::{AiError, AppError};
use crate::external::ProviderTaskStatus;
use crate::models::{AiTask, TaskArguments, TaskStatus, TaskType};
use crate::services::ai_service::AiClient;
use crate::services::job_scheduler_service::{JobContext, JobResult};

const IMAGE_DIR: &str = "ai_images";
const VIDEO_DIR: &str = "ai_videos";

pub async fn run_ai_tasks(ctx: JobContext) -> Result<JobResult, AppError> {
    let mut tasks = ctx.store.fetch_open_ai_tasks().await?;
    if tasks.is_empty() {
        return Ok(JobResult { items_processed: 0, items_failed: 0 });
    }

    let mut failed = 0;
    for task in tasks.iter_mut() {
        if let Err(e) = advance_task(task, &ctx.ai, &ctx.ai_config).await {
            error!("AI task {} failed: {}", task.id, e);
            task.fail(e.to_string(), Utc::now());
            failed += 1;
        } else if task.status == TaskStatus::Failed {
            failed += 1;
        }
    }

    ctx.store.save_ai_tasks(&tasks).await?;

    Ok(JobResult { items_processed: tasks.len() as i32, items_failed: failed })
}

async fn advance_task(task: &mut AiTask, ai: &AiClient, config: &AiConfig) -> Result<(), AiError> {
    debug_assert!(!task.status.is_terminal(), "finished task {} was fetched as open", task.id);
    match task.status {
        TaskStatus::Pending => submit(task, ai, config).await,
        TaskStatus::Processing => poll(task, ai, config).await,
        TaskStatus::Completed | TaskStatus::Failed => Ok(()),
    }
}

async fn submit(task: &mut AiTask, ai: &AiClient, config: &AiConfig) -> Result<(), AiError> {
    let model = task.model.as_deref();

    let external_id = match task.arguments()? {
        TaskArguments::Description(args) => {
            let max_tokens = args.max_tokens.unwrap_or(config.max_tokens);
            let text = ai.generate_text(&task.prompt, max_tokens, model).await?;
            task.complete(Some(text.trim().to_string()), Utc::now());
            info!("AI task {} completed (description)", task.id);
            return Ok(());
        }
        TaskArguments::Image(args) => {
            ai.generate_image(&task.prompt, args.width, args.height, model).await?
        }
        TaskArguments::Video(args) => match args.image_url.as_deref() {
            Some(image_url) => {
                ai.generate_video_from_image(&task.prompt, image_url, args.duration, &args.size(), model)
                    .await?
            }
            None => {
                ai.generate_video_from_text(&task.prompt, args.width, args.height, args.duration, model)
                    .await?
            }
        },
    };

    info!("AI task {} submitted as {}", task.id, external_id);
    task.external_task_id = Some(external_id);
    task.status = TaskStatus::Processing;
    Ok(())
}

async fn poll(task: &mut AiTask, ai: &AiClient, config: &AiConfig) -> Result<(), AiError> {
    let external_id = task.external_task_id.clone().ok_or(AiError::MissingExternalId)?;

    let elapsed = Utc::now().signed_duration_since(task.created_at);
    if elapsed.to_std().map_or(false, |e| e > config.task_timeout) {
        warn!("AI task {} timed out after {}s", task.id, elapsed.num_seconds());
        return Err(AiError::Timeout);
    }

    let poll = ai.get_task_status(&external_id).await?;
    match poll.status {
        ProviderTaskStatus::Completed => {
            let result = match poll.outputs.first() {
                Some(url) => {
                    let bytes = ai.download_file(url).await?;
                    let path = output_path(&config.static_dir, task)?;
                    save_output(&path, &bytes).await?;
                    Some(path.to_string_lossy().into_owned())
                }
                None => None,
            };
            task.complete(result, Utc::now());
            info!("AI task {} completed ({})", task.id, task.task_type);
        }
        ProviderTaskStatus::Failed => {
            let error = poll.error.unwrap_or_else(|| "Unknown error".to_string());
            warn!("AI task {} failed on provider: {}", task.id, error);
            task.fail(error, Utc::now());
        }
        status => debug!("AI task {} still running ({:?})", task.id, status),
    }

    Ok(())
}

fn output_path(static_dir: &Path, task: &AiTask) -> Result<PathBuf, AiError> {
    let (dir, ext) = match task.task_type {
        TaskType::Image => (IMAGE_DIR, "png"),
        TaskType::Video => (VIDEO_DIR, "mp4"),
        TaskType::Description => {
            return Err(AiError::InvalidArguments("description tasks have no file output".to_string()))
        }
    };
    Ok(static_dir.join(dir).join(format!("{}.{}", task.id, ext)))
}

async fn save_output(path: &Path, bytes: &[u8]) -> Result<(), AiError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(())
}
