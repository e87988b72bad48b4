use serde_json::{json, Value};
use thiserror::Error;

use super::encoded_form::{parse_json, parse_urlencoded, EncodedFormError};
use super::multipart::{boundary_from_content_type, parse, MultipartError, MultipartForm};

#[derive(Error, Debug)]
enum UploadError {
    #[error("request has no content type")]
    MissingContentType,
    #[error("unsupported content type {0:?}")]
    UnsupportedContentType(String),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Encoded(#[from] EncodedFormError),
}

/// Transport-neutral view of an incoming upload request.
#[derive(Debug, Clone, Copy)]
pub struct UploadRequest<'a> {
    pub method: &'a str,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadResponse {
    pub status: u16,
    pub body: Value,
    /// Value for the `Allow` header, set on 405 responses.
    pub allow: Option<&'static str>,
}

impl UploadResponse {
    fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            allow: None,
        }
    }

    pub fn body_string(&self) -> String {
        self.body.to_string()
    }
}

/// Accepts a form upload and acknowledges it. The upload is parsed but
/// nothing is stored or processed.
///
/// `multipart/form-data`, `application/x-www-form-urlencoded` and
/// `application/json` bodies are understood; any other content type fails
/// like an unparsable body.
pub fn handle(request: &UploadRequest<'_>) -> UploadResponse {
    if !request.method.eq_ignore_ascii_case("POST") {
        log::debug!("Rejected {} request to upload endpoint", request.method);
        return UploadResponse {
            allow: Some("POST"),
            ..UploadResponse::json(405, json!({ "error": "Method not allowed" }))
        };
    }

    match parse_form(request) {
        Ok(form) => {
            log::info!(
                "Upload received: {} field(s), {} file(s)",
                form.fields().count(),
                form.files().count()
            );
            UploadResponse::json(200, json!({ "message": "Image processed" }))
        }
        Err(e) => {
            log::warn!("Upload parse failed: {e}");
            UploadResponse::json(500, json!({ "error": "File upload failed" }))
        }
    }
}

fn parse_form(request: &UploadRequest<'_>) -> Result<MultipartForm, UploadError> {
    let content_type = request.content_type.ok_or(UploadError::MissingContentType)?;
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "multipart/form-data" => {
            let boundary = boundary_from_content_type(content_type)?;
            Ok(parse(request.body, &boundary)?)
        }
        "application/x-www-form-urlencoded" => Ok(parse_urlencoded(request.body)),
        "application/json" => Ok(parse_json(request.body)?),
        _ => Err(UploadError::UnsupportedContentType(content_type.to_string())),
    }
}
