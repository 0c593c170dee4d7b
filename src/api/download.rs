/// File download and inline view endpoints
use crate::{
    blob_store::RetrievedBlob,
    context::AppContext,
    error::{RelayError, RelayResult},
    metrics,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use tokio_util::io::ReaderStream;

/// Build download routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/download/:name", get(download_file))
        .route("/uploads/:name", get(view_file))
}

/// How the browser should treat a served object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Attachment,
    Inline,
}

/// Download a stored file as an attachment
async fn download_file(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> RelayResult<Response> {
    serve_blob(&ctx, &name, Disposition::Attachment).await
}

/// Serve a stored file for viewing in the browser
async fn view_file(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> RelayResult<Response> {
    serve_blob(&ctx, &name, Disposition::Inline).await
}

async fn serve_blob(ctx: &AppContext, name: &str, disposition: Disposition) -> RelayResult<Response> {
    let blob = match ctx.blob_store.retrieve(name).await {
        Ok(blob) => blob,
        Err(e) => {
            metrics::record_download(match &e {
                RelayError::NotFound(_) => "not_found",
                RelayError::InvalidIdentifier(_) => "invalid_identifier",
                _ => "error",
            });
            return Err(e);
        }
    };

    metrics::record_download("success");
    tracing::debug!(stored_name = %blob.stored_name, size_bytes = blob.size_bytes, "Serving stored object");

    build_response(blob, disposition)
}

fn build_response(blob: RetrievedBlob, disposition: Disposition) -> RelayResult<Response> {
    let mime = mime_guess::from_path(&blob.stored_name).first_or_octet_stream();

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref())
        .header(header::CONTENT_LENGTH, blob.size_bytes.to_string())
        // Stored objects never change
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff");

    builder = match disposition {
        Disposition::Attachment => builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", blob.stored_name),
        ),
        // Uploaded HTML must not run with this origin's privileges
        Disposition::Inline => builder
            .header(header::CONTENT_DISPOSITION, "inline")
            .header(header::CONTENT_SECURITY_POLICY, "sandbox"),
    };

    builder
        .body(Body::from_stream(ReaderStream::new(blob.file)))
        .map_err(|e| RelayError::Internal(format!("Failed to build response: {}", e)))
}
