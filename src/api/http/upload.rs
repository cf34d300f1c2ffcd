// src/api/http/upload.rs

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::{
    api::error::{ApiError, ApiResult},
    state::AppState,
    upload::{is_spreadsheet_filename, parse_workbook},
};

use super::auth::require_user;

/// POST /upload/excel
///
/// Converts an uploaded workbook into the bounded text block users paste into
/// their context data.
pub async fn upload_excel(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    require_user(&app, &headers).await?;

    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.xlsx").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
        file = Some((file_name, bytes.to_vec()));
    }

    let (file_name, bytes) = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;

    if !is_spreadsheet_filename(&file_name) {
        return Err(ApiError::bad_request(
            "Invalid file type. Please upload an Excel file (.xlsx or .xls)",
        ));
    }

    let parsed = parse_workbook(bytes)
        .map_err(|e| ApiError::bad_request(format!("Failed to parse Excel file: {e}")))?;

    info!(file = %file_name, sheets = parsed.sheets.len(), "spreadsheet converted");

    Ok(Json(json!({
        "success": true,
        "fileName": file_name,
        "sheets": parsed.sheets,
        "formattedContext": parsed.formatted_context,
    })))
}
