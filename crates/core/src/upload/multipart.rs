//! Minimal `multipart/form-data` body parser.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultipartError {
    #[error("content type {0:?} is not multipart/form-data")]
    NotMultipart(String),
    #[error("multipart content type has no boundary")]
    MissingBoundary,
    #[error("body does not start with the boundary delimiter")]
    MissingOpeningDelimiter,
    #[error("body ends before the closing delimiter")]
    Unterminated,
    #[error("malformed part headers: {0}")]
    MalformedHeaders(String),
    #[error("part has no form-data name")]
    MissingName,
}

/// One form field or uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl Part {
    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MultipartForm {
    pub parts: Vec<Part>,
}

impl MultipartForm {
    pub fn fields(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| !p.is_file())
    }

    pub fn files(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| p.is_file())
    }
}

/// Extracts the boundary from a `Content-Type` header value.
pub fn boundary_from_content_type(content_type: &str) -> Result<String, MultipartError> {
    let mut params = content_type.split(';').map(str::trim);
    let mime = params.next().unwrap_or_default();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return Err(MultipartError::NotMultipart(content_type.to_string()));
    }

    params
        .filter_map(|p| p.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| unquote(value.trim()).to_string())
        .filter(|b| !b.is_empty())
        .ok_or(MultipartError::MissingBoundary)
}

/// Parses a complete request body delimited by `boundary`.
pub fn parse(body: &[u8], boundary: &str) -> Result<MultipartForm, MultipartError> {
    let delimiter = format!("--{boundary}").into_bytes();
    let separator = [b"\r\n".as_slice(), &delimiter].concat();

    let mut pos = find(body, &delimiter, 0).ok_or(MultipartError::MissingOpeningDelimiter)?
        + delimiter.len();
    let mut form = MultipartForm::default();

    loop {
        let rest = &body[pos..];
        if rest.starts_with(b"--") {
            return Ok(form);
        }
        if !rest.starts_with(b"\r\n") {
            return Err(MultipartError::Unterminated);
        }
        pos += 2;

        let header_end = find(body, b"\r\n\r\n", pos).ok_or(MultipartError::Unterminated)?;
        let headers = std::str::from_utf8(&body[pos..header_end])
            .map_err(|e| MultipartError::MalformedHeaders(e.to_string()))?;
        let content_start = header_end + 4;
        let content_end = find(body, &separator, content_start).ok_or(MultipartError::Unterminated)?;

        form.parts
            .push(parse_part(headers, body[content_start..content_end].to_vec())?);
        pos = content_end + separator.len();
    }
}

fn parse_part(headers: &str, data: Vec<u8>) -> Result<Part, MultipartError> {
    let mut name = None;
    let mut file_name = None;
    let mut content_type = None;

    for line in headers.split("\r\n").filter(|l| !l.is_empty()) {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| MultipartError::MalformedHeaders(line.to_string()))?;
        let key = key.trim();
        let value = value.trim();

        if key.eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';').skip(1) {
                if let Some((k, v)) = param.split_once('=') {
                    match k.trim().to_ascii_lowercase().as_str() {
                        "name" => name = Some(unquote(v.trim()).to_string()),
                        "filename" => file_name = Some(unquote(v.trim()).to_string()),
                        _ => {}
                    }
                }
            }
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        }
    }

    Ok(Part {
        name: name.ok_or(MultipartError::MissingName)?,
        file_name,
        content_type,
        data,
    })
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + from)
}
