/// HTML rendering for browser clients
use crate::error::{RelayError, RelayResult};
use askama::Template;

/// Page shown after a successful browser upload
///
/// Both fields are HTML-escaped on render.
#[derive(Template)]
#[template(path = "upload_success.html")]
pub struct UploadSuccessTemplate<'a> {
    pub download_link: &'a str,
    pub file_name: &'a str,
}

impl UploadSuccessTemplate<'_> {
    pub fn to_html(&self) -> RelayResult<String> {
        self.render()
            .map_err(|e| RelayError::Internal(format!("Failed to render upload page: {}", e)))
    }
}
