use std::time::Duration;

use axum::{Json, Router, routing};
use mathservice_types::{AddRequest, AddResponse};

use crate::error::{ApiError, ApiResult};
use crate::extractors::JsonBody;

/// Time every addition takes before its result is returned.
///
/// This simulates a slow backend. The wait is a timer on the async runtime, so requests that are
/// waiting do not occupy a worker thread.
pub const SIMULATED_DELAY: Duration = Duration::from_secs(5);

pub fn router() -> Router {
    Router::new().route("/", routing::post(add))
}

async fn add(JsonBody(request): JsonBody<AddRequest>) -> ApiResult<Json<AddResponse>> {
    tracing::info!(a = request.a, b = request.b, "Received addition request");
    let response = request.compute();

    tokio::time::sleep(SIMULATED_DELAY).await;

    tracing::info!(result = response.result, "Computed result");
    if !response.is_representable() {
        return Err(ApiError::NonFiniteResult(response.result));
    }

    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tokio::time::Instant;
    use tower::ServiceExt;

    use super::*;
    use crate::observability::CapturedLogs;

    fn post(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test(start_paused = true)]
    async fn returns_sum() {
        let (status, body) = send(router(), post(r#"{"a": 10, "b": 5}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": 15.0}));
    }

    #[tokio::test(start_paused = true)]
    async fn fractional_operands() {
        let (status, body) = send(router(), post(r#"{"a": 0.1, "b": 0.2}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], 0.1 + 0.2);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_simulated_delay() {
        let start = Instant::now();
        let (status, _) = send(router(), post(r#"{"a": 1, "b": 2}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(start.elapsed() >= SIMULATED_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_do_not_serialize() {
        let router = router();
        let start = Instant::now();

        let requests = (0..50).map(|i| {
            let router = router.clone();
            async move {
                let body = json!({"a": i, "b": i * 1000}).to_string();
                let (status, body) = send(router, post(body)).await;
                (i, status, body)
            }
        });
        let responses = futures::future::join_all(requests).await;

        for (i, status, body) in responses {
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["result"], f64::from(i * 1001));
        }

        // All delays overlap, so the batch takes about as long as a single request.
        assert!(start.elapsed() >= SIMULATED_DELAY);
        assert!(start.elapsed() < SIMULATED_DELAY * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn logs_request_and_result() {
        let logs = CapturedLogs::start();
        let (status, _) = send(router(), post(r#"{"a": 10, "b": 5}"#)).await;
        assert_eq!(status, StatusCode::OK);

        let records: Vec<_> = logs
            .records()
            .into_iter()
            .filter(|record| record["logger"] == "mathservice_server::endpoints::add")
            .collect();
        assert_eq!(records.len(), 2, "{records:?}");

        assert_eq!(records[0]["event"], "Received addition request");
        assert_eq!(records[0]["level"], "info");
        assert_eq!(records[0]["a"], 10.0);
        assert_eq!(records[0]["b"], 5.0);
        assert!(records[0].get("result").is_none());

        assert_eq!(records[1]["event"], "Computed result");
        assert_eq!(records[1]["level"], "info");
        assert_eq!(records[1]["result"], 15.0);
    }

    #[tokio::test(start_paused = true)]
    async fn overflowing_sum_is_server_error() {
        let start = Instant::now();
        let (status, body) = send(router(), post(r#"{"a": 1e308, "b": 1e308}"#)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.get("result").is_none());
        assert!(start.elapsed() >= SIMULATED_DELAY);
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_operands_propagate() {
        let logs = CapturedLogs::start();
        let (status, _) = send(router(), post(r#"{"a": 1e309, "b": 0}"#)).await;

        // The operand saturates to infinity, only the sum fails to serialize.
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let records = logs.records();
        let received = records
            .iter()
            .find(|record| record["event"] == "Received addition request")
            .unwrap();
        assert_eq!(received["a"], "inf");
        assert_eq!(received["b"], 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn accepts_numeric_strings() {
        let (status, body) = send(router(), post(r#"{"a": "10", "b": 5}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": 15.0}));
    }

    #[tokio::test]
    async fn rejects_non_numeric_operand() {
        let (status, body) = send(router(), post(r#"{"a": "ten", "b": 5}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.get("result").is_none());
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn rejects_missing_operand() {
        let (status, body) = send(router(), post(r#"{"a": 1}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.get("result").is_none());
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let (status, body) = send(router(), post(r#"{"a": 1, "b": "#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.get("result").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn content_type_is_optional() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from(r#"{"a": 2, "b": 3}"#))
            .unwrap();

        let (status, body) = send(router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": 5.0}));
    }

    #[tokio::test(start_paused = true)]
    async fn json_content_type_parameters() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(r#"{"a": 2, "b": 3}"#))
            .unwrap();

        let (status, body) = send(router(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"result": 5.0}));
    }

    #[tokio::test]
    async fn rejects_non_json_content_type() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(r#"{"a": 2, "b": 3}"#))
            .unwrap();

        let (status, body) = send(router(), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.get("result").is_none());
        assert!(body["detail"].as_str().unwrap().contains("text/plain"));
    }

    #[tokio::test]
    async fn only_post_is_allowed() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
