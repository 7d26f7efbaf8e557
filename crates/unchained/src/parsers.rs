//! Content negotiation between request headers and wire formats.

use axum::http::{header, HeaderMap};
use strum::IntoEnumIterator;
use unchained_core::Format;

use crate::error::ApiError;

/// Every media type a body may be sent as, canonical types first.
pub fn accepted_media_types() -> Vec<&'static str> {
    Format::iter()
        .flat_map(|format| format.media_types().iter().copied())
        .collect()
}

/// The format of a request body, from its `Content-Type`.
///
/// With `enforce`, a missing or unrecognized content type is rejected;
/// otherwise it falls back to `default`.
pub fn request_format(headers: &HeaderMap, enforce: bool, default: Format) -> Result<Format, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    match content_type.and_then(Format::from_media_type) {
        Some(format) => Ok(format),
        None if enforce => Err(ApiError::NotAcceptable(format!(
            "unaccepted content-type {:?}; expected one of {}",
            content_type.unwrap_or_default(),
            accepted_media_types().join(", ")
        ))),
        None => Ok(default),
    }
}

/// The format to answer in, from the first recognized `Accept` entry.
/// Wildcards and unrecognized types fall back to `default`.
pub fn response_format(headers: &HeaderMap, default: Format) -> Format {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(Format::from_media_type)
        .unwrap_or(default)
}
