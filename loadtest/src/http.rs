//! Contains a remote implementation using HTTP to interact with the math service.

use std::time::Duration;

use bytes::Bytes;
use mathservice_types::{AddRequest, AddResponse};
use reqwest::StatusCode;
use thiserror::Error;

/// Errors that fail a single iteration of a virtual user.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request could not be sent or the response could not be received.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service responded with a non-success status code.
    #[error("request failed with status code: {status}, response: {body}")]
    Status {
        /// The status code of the response.
        status: StatusCode,
        /// The response body, lossily decoded as UTF-8.
        body: String,
    },

    /// The response body is not a valid addition response.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service computed a different result than expected.
    #[error("unexpected result: expected {expected}, got {actual}")]
    Mismatch {
        /// The sum of the request operands.
        expected: f64,
        /// The result returned by the service.
        actual: f64,
    },
}

/// A remote implementation using HTTP to interact with the math service.
#[derive(Debug)]
pub struct HttpRemote {
    /// The URL of the addition endpoint.
    url: String,
    /// The HTTP client used to talk to the service.
    client: reqwest::Client,
}

impl HttpRemote {
    /// Creates a new `HttpRemote` for the service at the given base URL.
    pub fn new(remote: impl AsRef<str>) -> Self {
        let url = format!("{}/", remote.as_ref().trim_end_matches('/'));
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }

    /// Aborts requests that take longer than `timeout` to complete.
    ///
    /// The service holds every request for several seconds, so the timeout should be generous.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, reqwest::Error> {
        self.client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// The URL of the addition endpoint.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends an addition request and returns the raw response body.
    ///
    /// Non-success status codes are returned as [`RequestError::Status`].
    pub async fn add(&self, request: &AddRequest) -> Result<Bytes, RequestError> {
        let response = self.client.post(&self.url).json(request).send().await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            return Err(RequestError::Status { status, body });
        }

        Ok(body)
    }

    /// Sends an addition request and checks that the result is `a + b`.
    pub async fn add_checked(&self, request: &AddRequest) -> Result<AddResponse, RequestError> {
        let body = self.add(request).await?;
        let response: AddResponse = serde_json::from_slice(&body)?;

        let expected = request.compute().result;
        if response.result != expected {
            return Err(RequestError::Mismatch {
                expected,
                actual: response.result,
            });
        }

        Ok(response)
    }
}
