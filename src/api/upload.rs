/// File upload endpoint
use crate::{
    api::pages,
    blob_store::UploadResponse,
    context::AppContext,
    error::{RelayError, RelayResult},
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::post,
    Json, Router,
};

/// Multipart field carrying the file
pub const FILE_FIELD: &str = "file";

/// Build upload routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/upload", post(upload_file))
        // The blob store enforces its own size limit while streaming
        .layer(DefaultBodyLimit::disable())
}

/// Upload a file
///
/// Accepts `multipart/form-data` with a `file` field. Browsers get an HTML
/// page with the download link; clients that ask for JSON get an
/// `UploadResponse`.
async fn upload_file(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> RelayResult<Response> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        RelayError::InvalidInput(format!("Failed to parse multipart data: {}", e))
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().map(String::from);

        let object = match ctx.blob_store.store(field, original_name.as_deref()).await {
            Ok(object) => object,
            Err(e @ RelayError::StorageExhausted { .. }) => {
                tracing::error!(error = %e, "Upload rejected: identifier space exhausted");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let download_path = format!("/download/{}", object.stored_name);

        if wants_json(&headers) {
            let base = ctx.service_url();
            let response = UploadResponse {
                download_url: format!("{}{}", base, download_path),
                view_url: format!("{}/uploads/{}", base, object.stored_name),
                stored_name: object.stored_name,
                size: object.size_bytes,
            };
            return Ok((StatusCode::CREATED, Json(response)).into_response());
        }

        let display_name = original_name.unwrap_or_else(|| object.stored_name.clone());
        let page = pages::UploadSuccessTemplate {
            download_link: &download_path,
            file_name: &display_name,
        }
        .to_html()?;
        return Ok(Html(page).into_response());
    }

    Err(RelayError::InvalidInput(format!(
        "Missing '{}' field in upload form",
        FILE_FIELD
    )))
}

/// True when the client prefers JSON over HTML
fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/json") && !accept.contains("text/html"))
        .unwrap_or(false)
}
