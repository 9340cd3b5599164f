//! Session API: upload, commands, previews and final files.

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, Multipart, Path, Query, Request, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use pyro_pipeline::SheetSize;
use pyro_pipeline::command::{HELP_TEXT, parse_size_token};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::app::SharedState;
use crate::services::ServiceError;
use crate::services::workflow::SessionService;

use super::{err_json, service_err};

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// Multipart field names accepted as the uploaded photo.
const UPLOAD_FIELDS: [&str; 4] = ["image", "photo", "file", "document"];

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    filename: Option<String>,
}

/// GET /api/help
pub async fn get_help() -> Json<Value> {
    Json(json!({ "status": "ok", "help": HELP_TEXT }))
}

/// POST /api/sessions/{id}/image – Upload a photo (raw body or multipart)
pub async fn upload_image(
    State(state): State<SharedState>,
    Path(user_id): Path<i64>,
    Query(query): Query<UploadQuery>,
    req: Request,
) -> ApiResult {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let (data, mime, filename) = if content_type
        .as_deref()
        .is_some_and(|t| t.starts_with("multipart/form-data"))
    {
        let mut multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|e| err_json(e.status().as_u16(), &e.body_text()))?;
        read_upload_field(&mut multipart).await?
    } else {
        let data = Bytes::from_request(req, &state)
            .await
            .map_err(|e| err_json(e.status().as_u16(), &e.body_text()))?;
        (data.to_vec(), content_type, query.filename)
    };

    let view = SessionService::new(state)
        .upload(user_id, data, mime.as_deref(), filename.as_deref())
        .await
        .map_err(service_err)?;
    Ok(Json(json!({ "status": "ok", "session": view })))
}

async fn read_upload_field(
    multipart: &mut Multipart,
) -> Result<(Vec<u8>, Option<String>, Option<String>), (StatusCode, Json<Value>)> {
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        if !UPLOAD_FIELDS.contains(&name.as_str()) && field.file_name().is_none() {
            continue;
        }
        let mime = field.content_type().map(str::to_string);
        let filename = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| err_json(400, &e.to_string()))?;
        return Ok((data.to_vec(), mime, filename));
    }
    Err(err_json(400, "No image file provided"))
}

/// POST /api/sessions/{id}/commands/{token} – Apply a control token
pub async fn apply_command(
    State(state): State<SharedState>,
    Path((user_id, token)): Path<(i64, String)>,
) -> ApiResult {
    let view = SessionService::new(state)
        .command(user_id, &token)
        .await
        .map_err(service_err)?;
    Ok(Json(json!({ "status": "ok", "session": view })))
}

/// GET /api/sessions/{id}/state – Caption, parameters and available tokens
pub async fn get_state(
    State(state): State<SharedState>,
    Path(user_id): Path<i64>,
) -> ApiResult {
    let view = SessionService::new(state)
        .snapshot(user_id)
        .map_err(service_err)?;
    Ok(Json(json!({ "status": "ok", "session": view })))
}

/// GET /api/sessions/{id}/preview – Raw preview JPEG
pub async fn get_preview(
    State(state): State<SharedState>,
    Path(user_id): Path<i64>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let data = SessionService::new(state)
        .preview(user_id)
        .await
        .map_err(service_err)?;

    Response::builder()
        .header(header::CONTENT_TYPE, "image/jpeg")
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(data))
        .map_err(|e| err_json(500, &e.to_string()))
}

/// GET /api/sessions/{id}/final/{sheet} – Full-resolution file for A4 or A3
pub async fn get_final(
    State(state): State<SharedState>,
    Path((user_id, sheet)): Path<(i64, String)>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let sheet = sheet
        .parse::<SheetSize>()
        .ok()
        .or_else(|| parse_size_token(&sheet))
        .ok_or_else(|| {
            service_err(ServiceError::BadRequest(format!("unknown sheet size: {sheet}")))
        })?;

    let delivery = SessionService::new(state)
        .final_render(user_id, sheet)
        .await
        .map_err(service_err)?;
    let render = delivery.render;

    Response::builder()
        .header(header::CONTENT_TYPE, render.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", render.filename),
        )
        .header("x-render-caption", delivery.caption)
        .body(Body::from(render.bytes))
        .map_err(|e| err_json(500, &e.to_string()))
}
