/// API Request Handlers
/// Each one delegates to a `Console` operation and shapes the response

use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use super::error::result_response;
use super::AppState;
use crate::core::{Console, ConsoleError, OperationResult, StagedFile, StatusReport};
use crate::utils::{BACKUP_CONTENT_TYPE, BACKUP_DOWNLOAD_NAME, RESTORE_FIELD};

const NO_FILE_PROVIDED: &str = "No backup file provided.";

// ============================================================================
// Lifecycle Handlers
// ============================================================================

pub async fn deploy(State(state): State<AppState>) -> Json<OperationResult> {
    Json(state.console.deploy().await)
}

pub async fn logs(State(state): State<AppState>) -> Json<OperationResult> {
    Json(state.console.logs().await)
}

pub async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.console.status().await)
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "success": true, "status": "healthy" }))
}

// ============================================================================
// Backup / Restore Handlers
// ============================================================================

pub async fn backup(State(state): State<AppState>) -> Result<Response, ConsoleError> {
    let archive = state.console.backup().await?;
    let size = archive.size();
    let stream = archive.into_stream().await?;

    let headers = [
        (header::CONTENT_TYPE, BACKUP_CONTENT_TYPE.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", BACKUP_DOWNLOAD_NAME),
        ),
        (header::CONTENT_LENGTH, size.to_string()),
    ];

    Ok((StatusCode::OK, headers, Body::from_stream(stream)).into_response())
}

pub async fn restore(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ConsoleError> {
    // Refuse before accepting a potentially large upload
    state.console.guard().check().await?;

    let multipart = multipart.map_err(|e| {
        warn!(error = %e, "restore request is not a multipart upload");
        ConsoleError::validation(NO_FILE_PROVIDED)
    })?;

    let upload = receive_upload(&state.console, multipart, state.max_upload_bytes).await?;
    let result = state.console.restore(upload).await?;
    Ok(result_response(result))
}

/// Write the `backupFile` field to a fresh staging file
async fn receive_upload(
    console: &Console,
    mut multipart: Multipart,
    limit: usize,
) -> Result<StagedFile, ConsoleError> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| upload_error(e, "Invalid upload", limit))?;

        let Some(mut field) = field else {
            return Err(ConsoleError::validation(NO_FILE_PROVIDED));
        };

        if field.name() != Some(RESTORE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let staged = console.stage_upload(&file_name)?;

        let mut file = tokio::fs::File::create(staged.path()).await?;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| upload_error(e, "Upload interrupted", limit))?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        return Ok(staged);
    }
}

/// Keep the size-limit cause distinct from malformed uploads
fn upload_error(e: MultipartError, context: &str, limit: usize) -> ConsoleError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(limit, error = %e.body_text(), "restore upload exceeds the size limit");
        ConsoleError::UploadTooLarge { limit }
    } else {
        ConsoleError::validation(format!("{}: {}", context, e.body_text()))
    }
}

// ============================================================================
// Firewall Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddRuleRequest {
    #[serde(default)]
    ip: Option<String>,
}

pub async fn add_rule(
    State(state): State<AppState>,
    payload: Result<Json<AddRuleRequest>, JsonRejection>,
) -> Result<Json<OperationResult>, ConsoleError> {
    let ip = payload.ok().and_then(|Json(req)| req.ip);
    let result = state.console.add_network_rule(ip.as_deref()).await?;
    Ok(Json(result))
}
