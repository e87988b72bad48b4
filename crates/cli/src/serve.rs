use std::io::Read;

use tiny_http::{Header, Request, Response, Server};

use facecam_core::upload::upload_handler::{handle, UploadRequest, UploadResponse};

pub const UPLOAD_PATH: &str = "/api/upload";

/// Largest request body read into memory.
const MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Serves the upload endpoint until the process is stopped.
pub fn serve(listen: &str) -> Result<(), Box<dyn std::error::Error>> {
    let server = Server::http(listen).map_err(|e| format!("cannot listen on {listen}: {e}"))?;
    log::info!("Upload endpoint listening on http://{listen}{UPLOAD_PATH}");

    for request in server.incoming_requests() {
        if let Err(e) = respond(request) {
            log::warn!("Failed to answer request: {e}");
        }
    }
    Ok(())
}

fn respond(mut request: Request) -> std::io::Result<()> {
    let path = request.url().split('?').next().unwrap_or_default().to_string();
    if path != UPLOAD_PATH {
        return request.respond(json_response(404, r#"{"error":"Not found"}"#.into(), None));
    }

    let method = request.method().as_str().to_string();
    let Some(body) = read_limited(request.as_reader(), MAX_UPLOAD_BYTES)? else {
        log::warn!("{method} {path} -> 413, body exceeds {MAX_UPLOAD_BYTES} bytes");
        return request.respond(json_response(
            413,
            r#"{"error":"File upload failed"}"#.into(),
            None,
        ));
    };
    let content_type = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Content-Type"))
        .map(|h| h.value.as_str().to_string());

    let response = handle(&UploadRequest {
        method: &method,
        content_type: content_type.as_deref(),
        body: &body,
    });
    log::info!("{method} {path} -> {}", response.status);
    request.respond(to_http(&response))
}

/// Reads at most `limit` bytes; `None` if the body is longer.
fn read_limited<R: Read>(reader: R, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut body = Vec::new();
    reader.take(limit + 1).read_to_end(&mut body)?;
    if body.len() as u64 > limit {
        return Ok(None);
    }
    Ok(Some(body))
}

fn to_http(response: &UploadResponse) -> Response<std::io::Cursor<Vec<u8>>> {
    json_response(response.status, response.body_string(), response.allow)
}

fn json_response(
    status: u16,
    body: String,
    allow: Option<&str>,
) -> Response<std::io::Cursor<Vec<u8>>> {
    let mut response = Response::from_string(body).with_status_code(status);
    if let Ok(header) = Header::from_bytes("Content-Type", "application/json") {
        response.add_header(header);
    }
    if let Some(allow) = allow {
        if let Ok(header) = Header::from_bytes("Allow", allow) {
            response.add_header(header);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header<'a>(
        response: &'a Response<std::io::Cursor<Vec<u8>>>,
        name: &'static str,
    ) -> Option<&'a str> {
        response
            .headers()
            .iter()
            .find(|h| h.field.equiv(name))
            .map(|h| h.value.as_str())
    }

    #[test]
    fn test_method_not_allowed_carries_allow_header() {
        let response = to_http(&UploadResponse {
            status: 405,
            body: json!({ "error": "Method not allowed" }),
            allow: Some("POST"),
        });
        assert_eq!(response.status_code().0, 405);
        assert_eq!(header(&response, "Allow"), Some("POST"));
        assert_eq!(header(&response, "Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_success_has_no_allow_header() {
        let response = to_http(&UploadResponse {
            status: 200,
            body: json!({ "message": "Image processed" }),
            allow: None,
        });
        assert_eq!(response.status_code().0, 200);
        assert_eq!(header(&response, "Allow"), None);
    }

    #[test]
    fn test_body_within_limit_is_read_whole() {
        let body = read_limited(std::io::Cursor::new(vec![1u8; 16]), 16).unwrap();
        assert_eq!(body, Some(vec![1u8; 16]));
    }

    #[test]
    fn test_body_over_limit_is_refused() {
        let body = read_limited(std::io::Cursor::new(vec![1u8; 17]), 16).unwrap();
        assert_eq!(body, None);
    }
}
