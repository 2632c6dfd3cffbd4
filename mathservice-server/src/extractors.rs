//! Request extractors for the endpoint handlers.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::{HeaderMap, header};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

/// An extractor that deserializes the request body as JSON.
///
/// As opposed to [`axum::Json`], a missing `Content-Type` header is accepted and treated as JSON.
/// A header naming any other media type than `application/json` or `application/*+json` is
/// rejected. Syntax errors and schema violations are rejected alike with `422 Unprocessable
/// Entity`.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> ApiResult<Self> {
        check_content_type(request.headers())?;

        let bytes = Bytes::from_request(request, state).await?;
        let value = serde_json::from_slice(&bytes)?;
        Ok(Self(value))
    }
}

fn check_content_type(headers: &HeaderMap) -> ApiResult<()> {
    let Some(value) = headers.get(header::CONTENT_TYPE) else {
        return Ok(());
    };

    let content_type = String::from_utf8_lossy(value.as_bytes());
    let is_json = content_type.parse::<mime::Mime>().is_ok_and(|mime| {
        mime.type_() == "application"
            && (mime.subtype() == "json" || mime.suffix().is_some_and(|name| name == "json"))
    });

    if is_json {
        Ok(())
    } else {
        Err(ApiError::UnsupportedContentType(content_type.into_owned()))
    }
}
