//! Non-multipart form bodies: `application/x-www-form-urlencoded` and JSON.
//!
//! Both produce the same [`MultipartForm`] shape, with every entry a field.

use serde_json::Value;
use thiserror::Error;

use super::multipart::{MultipartForm, Part};

#[derive(Error, Debug)]
pub enum EncodedFormError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("JSON body must be an object")]
    NotAnObject,
}

pub fn parse_urlencoded(body: &[u8]) -> MultipartForm {
    let parts = form_urlencoded::parse(body)
        .map(|(name, value)| field(name.into_owned(), value.into_owned().into_bytes()))
        .collect();
    MultipartForm { parts }
}

/// Top-level keys become fields. String values keep their text, anything
/// else is stored as its JSON encoding.
pub fn parse_json(body: &[u8]) -> Result<MultipartForm, EncodedFormError> {
    let Value::Object(map) = serde_json::from_slice(body)? else {
        return Err(EncodedFormError::NotAnObject);
    };
    let parts = map
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(text) => field(name, text.into_bytes()),
            other => field(name, other.to_string().into_bytes()),
        })
        .collect();
    Ok(MultipartForm { parts })
}

fn field(name: String, data: Vec<u8>) -> Part {
    Part {
        name,
        file_name: None,
        content_type: None,
        data,
    }
}
